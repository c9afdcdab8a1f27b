#[cfg(test)]
mod tests;

use chrono::NaiveDateTime;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

///
/// CONSTANTS
///

/// Text layout used when a timestamp travels as text.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

///
/// ValueKind
///
/// Storage type of a column. `Value::Null` has no kind.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
pub enum ValueKind {
    #[display("bool")]
    Bool,
    #[display("int")]
    Int,
    #[display("float")]
    Float,
    #[display("text")]
    Text,
    #[display("blob")]
    Blob,
    #[display("timestamp")]
    Timestamp,
    #[display("ulid")]
    Ulid,
}

///
/// Value
///
/// Dynamically typed cell value, used for parameters, hydrated rows and
/// condition operands.
///
/// Null → SQL NULL; the column must be nullable to store it.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
    Timestamp(NaiveDateTime),
    Ulid(Ulid),
}

impl Value {
    #[must_use]
    pub const fn kind(&self) -> Option<ValueKind> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(ValueKind::Bool),
            Self::Int(_) => Some(ValueKind::Int),
            Self::Float(_) => Some(ValueKind::Float),
            Self::Text(_) => Some(ValueKind::Text),
            Self::Blob(_) => Some(ValueKind::Blob),
            Self::Timestamp(_) => Some(ValueKind::Timestamp),
            Self::Ulid(_) => Some(ValueKind::Ulid),
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The zero value a fresh, never-persisted object carries for `kind`.
    #[must_use]
    pub fn default_for(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Bool => Self::Bool(false),
            ValueKind::Int => Self::Int(0),
            ValueKind::Float => Self::Float(0.0),
            ValueKind::Text => Self::Text(String::new()),
            ValueKind::Blob => Self::Blob(Vec::new()),
            ValueKind::Timestamp => Self::Timestamp(NaiveDateTime::default()),
            ValueKind::Ulid => Self::Ulid(Ulid::nil()),
        }
    }

    /// True when the value equals its kind's default, or is NULL.
    ///
    /// Key columns use this to decide whether an object was ever persisted.
    #[must_use]
    pub fn is_default(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Bool(v) => !v,
            Self::Int(v) => *v == 0,
            Self::Float(v) => *v == 0.0,
            Self::Text(v) => v.is_empty(),
            Self::Blob(v) => v.is_empty(),
            Self::Timestamp(v) => *v == NaiveDateTime::default(),
            Self::Ulid(v) => v.is_nil(),
        }
    }

    /// Short type label for diagnostics.
    #[must_use]
    pub fn type_label(&self) -> String {
        self.kind()
            .map_or_else(|| "null".to_string(), |kind| kind.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
            Self::Blob(v) => write!(f, "<{} bytes>", v.len()),
            Self::Timestamp(v) => write!(f, "{}", v.format(TIMESTAMP_FORMAT)),
            Self::Ulid(v) => write!(f, "{v}"),
        }
    }
}
