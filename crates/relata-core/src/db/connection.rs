//! Execution boundary.
//!
//! The engine never talks to a driver directly: compiled statements go through
//! a `Connection`, and rows come back as `RowSet`s of `Value`s.

use crate::{db::sql::SqlStatement, error::StorageError, value::Value};
use derive_more::{Deref, From, IntoIterator};

///
/// Connection
///
/// One statement per call; implementations report driver failures as
/// `StorageError` with the driver's own message.
///
/// A statement's text may carry an identity retrieval after the write,
/// separated by a newline; `query_scalar` returns the value of the last part.
///

pub trait Connection {
    /// Run a write statement, returning the affected-row count.
    fn execute(&self, statement: &SqlStatement) -> Result<u64, StorageError>;

    /// Run a row-returning statement.
    fn query(&self, statement: &SqlStatement) -> Result<RowSet, StorageError>;

    /// Run a statement returning a single value.
    fn query_scalar(&self, statement: &SqlStatement) -> Result<Value, StorageError>;
}

///
/// Row
///

#[derive(Clone, Debug, Default, Deref, From, IntoIterator, PartialEq)]
pub struct Row(Vec<Value>);

impl Row {
    #[must_use]
    pub const fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.0
    }
}

///
/// RowSet
///
/// Result rows with their column names as reported by the store.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl RowSet {
    #[must_use]
    pub const fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Case-insensitive position of a result column.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First column of the first row, or `Null` for an empty set.
    #[must_use]
    pub fn first_value(&self) -> Value {
        self.rows
            .first()
            .and_then(|row| row.first().cloned())
            .unwrap_or(Value::Null)
    }
}
