use derive_more::Display;
use relata_core::error::{
    ErrorClass, ErrorDetail, ErrorOrigin as CoreErrorOrigin, InternalError, ValidationError,
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// Error
/// Public error type with a stable kind + origin taxonomy.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
        }
    }

    /// Only storage failures may succeed on a plain retry; a concurrency
    /// conflict needs a re-read first.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.kind, ErrorKind::Storage)
    }
}

impl From<InternalError> for Error {
    fn from(err: InternalError) -> Self {
        let kind = match (&err.class, &err.detail) {
            (ErrorClass::Validation, Some(ErrorDetail::Validation(detail))) => {
                ErrorKind::Validation(detail.into())
            }
            (ErrorClass::Validation, _) => ErrorKind::Validation(ValidationErrorKind::Other),
            (ErrorClass::Mapping, _) => ErrorKind::Mapping,
            (ErrorClass::Concurrency, _) => ErrorKind::Concurrency,
            (ErrorClass::Storage, _) => ErrorKind::Storage,
        };

        Self::new(kind, err.origin.into(), err.message)
    }
}

///
/// ErrorKind
/// Public error taxonomy; one variant per failure class callers act on.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ErrorKind {
    /// Bad declaration or malformed query. Fatal; fix the code.
    Mapping,

    /// A declared constraint failed; nothing was written.
    Validation(ValidationErrorKind),

    /// Optimistic-lock conflict; re-read and retry.
    Concurrency,

    /// Driver or connection failure.
    Storage,
}

///
/// ValidationErrorKind
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ValidationErrorKind {
    MissingKey,
    NotNull,
    MaxLength,
    NotUnique,
    Other,
}

impl From<&ValidationError> for ValidationErrorKind {
    fn from(err: &ValidationError) -> Self {
        match err {
            ValidationError::MissingKey { .. } => Self::MissingKey,
            ValidationError::NotNull { .. } => Self::NotNull,
            ValidationError::MaxLength { .. } => Self::MaxLength,
            ValidationError::NotUnique { .. } => Self::NotUnique,
        }
    }
}

///
/// ErrorOrigin
/// Public origin taxonomy, mirrored from the core.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorOrigin {
    Registry,
    Compile,
    Hydrate,
    Persist,
    Selector,
    Relation,
    Connection,
}

impl From<CoreErrorOrigin> for ErrorOrigin {
    fn from(origin: CoreErrorOrigin) -> Self {
        match origin {
            CoreErrorOrigin::Registry => Self::Registry,
            CoreErrorOrigin::Compile => Self::Compile,
            CoreErrorOrigin::Hydrate => Self::Hydrate,
            CoreErrorOrigin::Persist => Self::Persist,
            CoreErrorOrigin::Selector => Self::Selector,
            CoreErrorOrigin::Relation => Self::Relation,
            CoreErrorOrigin::Connection => Self::Connection,
        }
    }
}
