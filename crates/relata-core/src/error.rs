use crate::value::ValueKind;
use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured runtime error with a stable classification.
/// `class` follows the four failure kinds callers must tell apart; `detail`
/// carries the typed cause when one exists.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Optional structured error detail.
    /// The variant (if present) must correspond to `class`.
    pub detail: Option<ErrorDetail>,
}

impl InternalError {
    /// Construct a mapping error (bad declaration, unknown column, malformed query).
    pub fn mapping(origin: ErrorOrigin, err: MappingError) -> Self {
        Self {
            class: ErrorClass::Mapping,
            origin,
            message: err.to_string(),
            detail: Some(ErrorDetail::Mapping(err)),
        }
    }

    /// Construct a validation error raised before a write is attempted.
    pub fn validation(err: ValidationError) -> Self {
        Self {
            class: ErrorClass::Validation,
            origin: ErrorOrigin::Persist,
            message: err.to_string(),
            detail: Some(ErrorDetail::Validation(err)),
        }
    }

    /// Construct an optimistic-lock conflict.
    pub fn concurrency(err: ConcurrencyError) -> Self {
        Self {
            class: ErrorClass::Concurrency,
            origin: ErrorOrigin::Persist,
            message: err.to_string(),
            detail: Some(ErrorDetail::Concurrency(err)),
        }
    }

    /// Wrap a driver failure, keeping the driver message verbatim and the
    /// statement text as context.
    pub fn storage(err: StorageError, sql: &str) -> Self {
        Self {
            class: ErrorClass::Storage,
            origin: ErrorOrigin::Connection,
            message: format!("{err} (statement: {sql})"),
            detail: Some(ErrorDetail::Storage(err)),
        }
    }

    #[must_use]
    pub const fn is_mapping(&self) -> bool {
        matches!(self.class, ErrorClass::Mapping)
    }

    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self.class, ErrorClass::Validation)
    }

    #[must_use]
    pub const fn is_concurrency(&self) -> bool {
        matches!(self.class, ErrorClass::Concurrency)
    }

    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self.class, ErrorClass::Storage)
    }

    #[must_use]
    pub const fn mapping_detail(&self) -> Option<&MappingError> {
        match &self.detail {
            Some(ErrorDetail::Mapping(err)) => Some(err),
            _ => None,
        }
    }

    #[must_use]
    pub const fn validation_detail(&self) -> Option<&ValidationError> {
        match &self.detail {
            Some(ErrorDetail::Validation(err)) => Some(err),
            _ => None,
        }
    }
}

///
/// ErrorDetail
///

#[derive(Debug, ThisError)]
pub enum ErrorDetail {
    #[error("{0}")]
    Mapping(MappingError),

    #[error("{0}")]
    Validation(ValidationError),

    #[error("{0}")]
    Concurrency(ConcurrencyError),

    #[error("{0}")]
    Storage(StorageError),
}

///
/// MappingError
///
/// Declaration and compile-time failures. Fatal; never retried.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum MappingError {
    #[error("'{entity}.{field}': field must be declared as a relation to use lazy loading")]
    LazyWithoutRelation { entity: String, field: String },

    #[error("'{entity}.{field}': field references another entity but is not declared as a relation")]
    ReferenceWithoutRelation { entity: String, field: String },

    #[error(
        "'{entity}.{field}': do not mark a value type field nullable; use an optional/nullable wrapper type instead"
    )]
    AllowNullOnValueType { entity: String, field: String },

    #[error("'{entity}.{field}': a system-managed column cannot be lazily loaded")]
    LazySystemColumn { entity: String, field: String },

    #[error("'{entity}.{field}': only relation fields can be lazily loaded")]
    LazyScalarColumn { entity: String, field: String },

    #[error("'{entity}.{field}': {marker} column must be an integer column")]
    SystemColumnKind {
        entity: String,
        field: String,
        marker: &'static str,
    },

    #[error("'{entity}.{field}': a field cannot be both {first} and {second}")]
    ConflictingMarkers {
        entity: String,
        field: String,
        first: &'static str,
        second: &'static str,
    },

    #[error("entity '{entity}' declares more than one {marker} column")]
    DuplicateSpecialColumn { entity: String, marker: &'static str },

    #[error("entity '{entity}' declares field '{field}' twice")]
    DuplicateField { entity: String, field: String },

    #[error("entity '{entity}' has a database-generated key over {count} columns; exactly one is required")]
    GeneratedKeyArity { entity: String, count: usize },

    #[error("entity '{entity}' has a database-generated key on non-integer column '{field}'")]
    GeneratedKeyKind { entity: String, field: String },

    #[error("entity '{entity}' mixes key generation strategies across its key columns")]
    MixedKeyGeneration { entity: String },

    #[error("entity '{entity}' declares relation '{relation}' but has {count} key columns; exactly one is required")]
    RelationOwnerKey {
        entity: String,
        relation: String,
        count: usize,
    },

    #[error("unknown column '{column}' on table '{table}'")]
    UnknownColumn { table: String, column: String },

    #[error("unknown relation '{relation}' on entity '{entity}'")]
    UnknownRelation { entity: String, relation: String },

    #[error("column '{column}' cannot be compared with NULL using '{op}'")]
    NullComparison { column: String, op: &'static str },

    #[error("invalid range [{start}, {end}]; ranges are 1-based and inclusive")]
    InvalidRange { start: u64, end: u64 },

    #[error("page size must be greater than zero")]
    InvalidPageSize,

    #[error("paged query on '{table}' requires an ORDER BY")]
    UnorderedPaging { table: String },

    #[error("table '{table}' needs exactly one key column for {operation}, found {count}")]
    KeyArity {
        table: String,
        operation: &'static str,
        count: usize,
    },

    #[error("entity '{entity}' produced {found} values for {expected} columns")]
    ValueArity {
        entity: String,
        expected: usize,
        found: usize,
    },

    #[error("sql template expects {expected} arguments, got {found}")]
    TemplateArity { expected: usize, found: usize },

    #[error("column '{column}' expected a {expected} value, found {found}")]
    TypeMismatch {
        column: String,
        expected: ValueKind,
        found: String,
    },

    #[error("result set has no column for '{column}'")]
    MissingResultColumn { column: String },
}

///
/// ValidationError
///
/// The object fails a declared constraint; the write is not attempted.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ValidationError {
    #[error("key column '{column}' on table '{table}' must be set before {operation}")]
    MissingKey {
        table: String,
        column: String,
        operation: &'static str,
    },

    #[error("column '{column}' on table '{table}' does not allow NULL")]
    NotNull { table: String, column: String },

    #[error("column '{column}' on table '{table}' exceeds max length {max} (found {found})")]
    MaxLength {
        table: String,
        column: String,
        max: usize,
        found: usize,
    },

    #[error("Invalid Field {column} Should be UNIQUED.")]
    NotUnique { table: String, column: String },
}

///
/// ConcurrencyError
///
/// An optimistic-lock update affected zero rows: the row changed since it was
/// read. Callers re-read and retry.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ConcurrencyError {
    #[error("stale lock version {version} for key {key} on table '{table}'")]
    StaleLockVersion {
        table: String,
        key: String,
        version: i64,
    },
}

///
/// StorageError
///
/// Execution-layer failure reported by a connection, message kept verbatim.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("storage error: {message}")]
pub struct StorageError {
    pub message: String,
}

impl StorageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

///
/// ErrorClass
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Mapping,
    Validation,
    Concurrency,
    Storage,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Mapping => "mapping",
            Self::Validation => "validation",
            Self::Concurrency => "concurrency",
            Self::Storage => "storage",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Registry,
    Compile,
    Hydrate,
    Persist,
    Selector,
    Relation,
    Connection,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Registry => "registry",
            Self::Compile => "compile",
            Self::Hydrate => "hydrate",
            Self::Persist => "persist",
            Self::Selector => "selector",
            Self::Relation => "relation",
            Self::Connection => "connection",
        };
        write!(f, "{label}")
    }
}
