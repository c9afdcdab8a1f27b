use crate::{
    traits::{Entity, FieldValue},
    value::ValueKind,
};
use std::any::type_name;

///
/// KeyGeneration
///
/// Who produces a key value.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeyGeneration {
    /// The store assigns it on insert; the engine reads it back.
    Database,

    /// The engine assigns a fresh ULID on insert when the key is default.
    Ulid,

    /// The caller sets it before insert.
    Supplied,
}

///
/// RelationKind
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RelationKind {
    /// Related rows carry `foreign_key` pointing at the owner key.
    HasMany { foreign_key: &'static str },

    /// A junction table pairs owner keys with related keys.
    ManyToMany {
        junction: &'static str,
        owner_column: &'static str,
        related_column: &'static str,
    },
}

///
/// FieldShape
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FieldShape {
    Scalar { kind: ValueKind, nullable: bool },

    /// An entity-typed property with no relation declared on it.
    Reference { target: &'static str },

    Relation {
        target: &'static str,
        kind: RelationKind,
    },
}

///
/// FieldDecl
///
/// Raw per-field declaration. Nothing here is validated; the registry
/// rejects inconsistent markers when it builds the descriptor.
///

#[derive(Clone, Debug)]
pub struct FieldDecl {
    pub(crate) name: &'static str,
    pub(crate) column: Option<&'static str>,
    pub(crate) shape: FieldShape,
    pub(crate) key: Option<KeyGeneration>,
    pub(crate) allow_null: bool,
    pub(crate) lock_version: bool,
    pub(crate) counter: bool,
    pub(crate) lazy: bool,
    pub(crate) unique: bool,
    pub(crate) max_length: Option<usize>,
}

impl FieldDecl {
    const fn with_shape(name: &'static str, shape: FieldShape) -> Self {
        Self {
            name,
            column: None,
            shape,
            key: None,
            allow_null: false,
            lock_version: false,
            counter: false,
            lazy: false,
            unique: false,
            max_length: None,
        }
    }

    /// Scalar field typed after `T`; `Option<T>` declares a nullable column.
    #[must_use]
    pub const fn of<T: FieldValue>(name: &'static str) -> Self {
        Self::with_shape(
            name,
            FieldShape::Scalar {
                kind: T::KIND,
                nullable: T::NULLABLE,
            },
        )
    }

    /// Entity-typed property without a relation declaration.
    #[must_use]
    pub fn reference<T: Entity>(name: &'static str) -> Self {
        Self::with_shape(
            name,
            FieldShape::Reference {
                target: type_name::<T>(),
            },
        )
    }

    /// One-to-many relation; `foreign_key` lives on `T`'s table.
    #[must_use]
    pub fn has_many<T: Entity>(name: &'static str, foreign_key: &'static str) -> Self {
        Self::with_shape(
            name,
            FieldShape::Relation {
                target: type_name::<T>(),
                kind: RelationKind::HasMany { foreign_key },
            },
        )
    }

    /// Many-to-many relation through `junction`.
    #[must_use]
    pub fn many_to_many<T: Entity>(
        name: &'static str,
        junction: &'static str,
        owner_column: &'static str,
        related_column: &'static str,
    ) -> Self {
        Self::with_shape(
            name,
            FieldShape::Relation {
                target: type_name::<T>(),
                kind: RelationKind::ManyToMany {
                    junction,
                    owner_column,
                    related_column,
                },
            },
        )
    }

    // ------------------------------------------------------------------
    // Markers
    // ------------------------------------------------------------------

    /// Database column name when it differs from the field name.
    #[must_use]
    pub const fn column(mut self, column: &'static str) -> Self {
        self.column = Some(column);
        self
    }

    #[must_use]
    pub const fn key(mut self, generation: KeyGeneration) -> Self {
        self.key = Some(generation);
        self
    }

    #[must_use]
    pub const fn allow_null(mut self) -> Self {
        self.allow_null = true;
        self
    }

    #[must_use]
    pub const fn lock_version(mut self) -> Self {
        self.lock_version = true;
        self
    }

    #[must_use]
    pub const fn counter(mut self) -> Self {
        self.counter = true;
        self
    }

    #[must_use]
    pub const fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    #[must_use]
    pub const fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }
}

///
/// EntityDecl
///
/// Raw per-type declaration: the table name override plus ordered fields.
///

#[derive(Clone, Debug)]
pub struct EntityDecl {
    pub(crate) name: &'static str,
    pub(crate) table: Option<&'static str>,
    pub(crate) fields: Vec<FieldDecl>,
}

impl EntityDecl {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            table: None,
            fields: Vec::new(),
        }
    }

    /// Table name when it differs from the entity name.
    #[must_use]
    pub const fn table(mut self, table: &'static str) -> Self {
        self.table = Some(table);
        self
    }

    #[must_use]
    pub fn field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }
}
