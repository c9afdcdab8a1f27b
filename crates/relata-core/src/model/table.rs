use crate::{
    error::{ErrorOrigin, InternalError, MappingError},
    model::declare::{EntityDecl, FieldDecl, FieldShape, KeyGeneration, RelationKind},
    value::{Value, ValueKind},
};

///
/// ColumnSpecial
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ColumnSpecial {
    None,
    Key,
    LockVersion,
    Counter,
}

///
/// ColumnDescriptor
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ColumnDescriptor {
    /// Logical name used by conditions, hydration and placeholders.
    pub name: &'static str,
    /// Physical database column.
    pub column: &'static str,
    pub kind: ValueKind,
    pub nullable: bool,
    pub special: ColumnSpecial,
    pub unique: bool,
    pub max_length: Option<usize>,
}

impl ColumnDescriptor {
    #[must_use]
    pub const fn is_key(&self) -> bool {
        matches!(self.special, ColumnSpecial::Key)
    }

    /// True when the physical column differs from the logical name.
    #[must_use]
    pub fn is_aliased(&self) -> bool {
        self.name != self.column
    }

    /// The value an unsaved object holds in this column.
    #[must_use]
    pub fn default_value(&self) -> Value {
        if self.nullable {
            Value::Null
        } else {
            Value::default_for(self.kind)
        }
    }
}

///
/// RelationDescriptor
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RelationDescriptor {
    pub name: &'static str,
    pub target: &'static str,
    pub kind: RelationKind,
    pub lazy: bool,
}

///
/// TableDescriptor
///
/// Immutable mapping of one entity type onto one table.
/// Built and validated once by the registry.
///

#[derive(Clone, Debug)]
pub struct TableDescriptor {
    entity: &'static str,
    name: &'static str,
    columns: Vec<ColumnDescriptor>,
    keys: Vec<usize>,
    key_generation: Option<KeyGeneration>,
    lock_version: Option<usize>,
    counter: Option<usize>,
    relations: Vec<RelationDescriptor>,
}

impl TableDescriptor {
    /// Validate a raw declaration and build its descriptor.
    pub fn build(decl: EntityDecl) -> Result<Self, InternalError> {
        DescriptorBuilder::new(&decl).build()
    }

    #[must_use]
    pub const fn entity(&self) -> &'static str {
        self.entity
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    #[must_use]
    pub fn relations(&self) -> &[RelationDescriptor] {
        &self.relations
    }

    #[must_use]
    pub const fn key_generation(&self) -> Option<KeyGeneration> {
        self.key_generation
    }

    #[must_use]
    pub fn is_generated_key(&self) -> bool {
        self.key_generation == Some(KeyGeneration::Database)
    }

    /// Key column positions, in declaration order.
    #[must_use]
    pub fn key_indexes(&self) -> &[usize] {
        &self.keys
    }

    pub fn key_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.keys.iter().map(|&i| &self.columns[i])
    }

    #[must_use]
    pub const fn lock_version_index(&self) -> Option<usize> {
        self.lock_version
    }

    #[must_use]
    pub const fn counter_index(&self) -> Option<usize> {
        self.counter
    }

    /// Resolve a column by logical name, falling back to the physical name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.column_index(name).map(|i| &self.columns[i])
    }

    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .or_else(|| self.columns.iter().position(|c| c.column == name))
    }

    /// Like `column`, failing with `UnknownColumn`.
    pub fn require_column(
        &self,
        name: &str,
        origin: ErrorOrigin,
    ) -> Result<&ColumnDescriptor, InternalError> {
        self.require_index(name, origin).map(|i| &self.columns[i])
    }

    /// Like `column_index`, failing with `UnknownColumn`.
    pub fn require_index(&self, name: &str, origin: ErrorOrigin) -> Result<usize, InternalError> {
        self.column_index(name).ok_or_else(|| {
            InternalError::mapping(
                origin,
                MappingError::UnknownColumn {
                    table: self.name.to_string(),
                    column: name.to_string(),
                },
            )
        })
    }

    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&RelationDescriptor> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// The single key column, or a `KeyArity` error naming `operation`.
    pub fn single_key(
        &self,
        operation: &'static str,
        origin: ErrorOrigin,
    ) -> Result<(usize, &ColumnDescriptor), InternalError> {
        match self.keys.as_slice() {
            [index] => Ok((*index, &self.columns[*index])),
            keys => Err(InternalError::mapping(
                origin,
                MappingError::KeyArity {
                    table: self.name.to_string(),
                    operation,
                    count: keys.len(),
                },
            )),
        }
    }
}

///
/// DescriptorBuilder
///
/// Single pass over the declared fields; every rule failure is a
/// `MappingError` raised before the descriptor is installed.
///

struct DescriptorBuilder<'a> {
    decl: &'a EntityDecl,
    columns: Vec<ColumnDescriptor>,
    keys: Vec<usize>,
    key_generation: Option<KeyGeneration>,
    lock_version: Option<usize>,
    counter: Option<usize>,
    relations: Vec<RelationDescriptor>,
}

impl<'a> DescriptorBuilder<'a> {
    const fn new(decl: &'a EntityDecl) -> Self {
        Self {
            decl,
            columns: Vec::new(),
            keys: Vec::new(),
            key_generation: None,
            lock_version: None,
            counter: None,
            relations: Vec::new(),
        }
    }

    fn build(mut self) -> Result<TableDescriptor, InternalError> {
        let decl = self.decl;
        for (i, field) in decl.fields.iter().enumerate() {
            if decl.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(registry_error(MappingError::DuplicateField {
                    entity: self.decl.name.to_string(),
                    field: field.name.to_string(),
                }));
            }

            match &field.shape {
                FieldShape::Reference { .. } => {
                    return Err(registry_error(if field.lazy {
                        MappingError::LazyWithoutRelation {
                            entity: self.decl.name.to_string(),
                            field: field.name.to_string(),
                        }
                    } else {
                        MappingError::ReferenceWithoutRelation {
                            entity: self.decl.name.to_string(),
                            field: field.name.to_string(),
                        }
                    }));
                }
                FieldShape::Relation { target, kind } => {
                    self.relations.push(RelationDescriptor {
                        name: field.name,
                        target: *target,
                        kind: kind.clone(),
                        lazy: field.lazy,
                    });
                }
                FieldShape::Scalar { kind, nullable } => {
                    self.push_column(field, *kind, *nullable)?;
                }
            }
        }

        self.check_keys()?;

        if let Some(relation) = self.relations.first()
            && self.keys.len() != 1
        {
            return Err(registry_error(MappingError::RelationOwnerKey {
                entity: self.decl.name.to_string(),
                relation: relation.name.to_string(),
                count: self.keys.len(),
            }));
        }

        Ok(TableDescriptor {
            entity: self.decl.name,
            name: self.decl.table.unwrap_or(self.decl.name),
            columns: self.columns,
            keys: self.keys,
            key_generation: self.key_generation,
            lock_version: self.lock_version,
            counter: self.counter,
            relations: self.relations,
        })
    }

    fn push_column(
        &mut self,
        field: &FieldDecl,
        kind: ValueKind,
        nullable: bool,
    ) -> Result<(), InternalError> {
        let entity = self.decl.name.to_string();
        let name = field.name.to_string();

        if field.allow_null && !nullable {
            return Err(registry_error(MappingError::AllowNullOnValueType {
                entity,
                field: name,
            }));
        }

        let markers = [
            (field.key.is_some(), "key"),
            (field.lock_version, "lock-version"),
            (field.counter, "counter"),
        ];
        let mut set = markers.iter().filter(|(on, _)| *on).map(|(_, marker)| *marker);
        if let (Some(first), Some(second)) = (set.next(), set.next()) {
            return Err(registry_error(MappingError::ConflictingMarkers {
                entity,
                field: name,
                first,
                second,
            }));
        }

        let special = match (field.key.is_some(), field.lock_version, field.counter) {
            (true, _, _) => ColumnSpecial::Key,
            (false, true, _) => ColumnSpecial::LockVersion,
            (false, false, true) => ColumnSpecial::Counter,
            (false, false, false) => ColumnSpecial::None,
        };

        if field.lazy {
            return Err(registry_error(match special {
                ColumnSpecial::LockVersion | ColumnSpecial::Counter => {
                    MappingError::LazySystemColumn {
                        entity,
                        field: name,
                    }
                }
                ColumnSpecial::Key | ColumnSpecial::None => MappingError::LazyScalarColumn {
                    entity,
                    field: name,
                },
            }));
        }

        let index = self.columns.len();
        match special {
            ColumnSpecial::Key => self.keys.push(index),
            ColumnSpecial::LockVersion => {
                if !claim(&mut self.lock_version, index) {
                    return Err(self.duplicate_special("lock-version"));
                }
                self.require_int(field, kind, "lock-version")?;
            }
            ColumnSpecial::Counter => {
                if !claim(&mut self.counter, index) {
                    return Err(self.duplicate_special("counter"));
                }
                self.require_int(field, kind, "counter")?;
            }
            ColumnSpecial::None => {}
        }

        if let Some(generation) = field.key {
            match self.key_generation {
                None => self.key_generation = Some(generation),
                Some(existing) if existing == generation => {}
                Some(_) => {
                    return Err(registry_error(MappingError::MixedKeyGeneration { entity }));
                }
            }
        }

        self.columns.push(ColumnDescriptor {
            name: field.name,
            column: field.column.unwrap_or(field.name),
            kind,
            nullable,
            special,
            unique: field.unique,
            max_length: field.max_length,
        });

        Ok(())
    }

    // Generated keys are a single column of the kind the generator produces.
    fn check_keys(&self) -> Result<(), InternalError> {
        let expected = match self.key_generation {
            Some(KeyGeneration::Database) => ValueKind::Int,
            Some(KeyGeneration::Ulid) => ValueKind::Ulid,
            Some(KeyGeneration::Supplied) | None => return Ok(()),
        };

        match self.keys.as_slice() {
            [index] => {
                let column = &self.columns[*index];
                if column.kind == expected {
                    Ok(())
                } else {
                    Err(registry_error(MappingError::GeneratedKeyKind {
                        entity: self.decl.name.to_string(),
                        field: column.name.to_string(),
                    }))
                }
            }
            keys => Err(registry_error(MappingError::GeneratedKeyArity {
                entity: self.decl.name.to_string(),
                count: keys.len(),
            })),
        }
    }

    fn require_int(
        &self,
        field: &FieldDecl,
        kind: ValueKind,
        marker: &'static str,
    ) -> Result<(), InternalError> {
        if kind == ValueKind::Int {
            return Ok(());
        }

        Err(registry_error(MappingError::SystemColumnKind {
            entity: self.decl.name.to_string(),
            field: field.name.to_string(),
            marker,
        }))
    }

    fn duplicate_special(&self, marker: &'static str) -> InternalError {
        registry_error(MappingError::DuplicateSpecialColumn {
            entity: self.decl.name.to_string(),
            marker,
        })
    }
}

// Returns false when the slot is already taken.
const fn claim(slot: &mut Option<usize>, index: usize) -> bool {
    if slot.is_some() {
        return false;
    }
    *slot = Some(index);

    true
}

fn registry_error(err: MappingError) -> InternalError {
    InternalError::mapping(ErrorOrigin::Registry, err)
}
