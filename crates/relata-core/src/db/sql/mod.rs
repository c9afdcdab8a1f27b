//! Dialect compiler.
//!
//! Renders conditions, orderings, paging and write statements into dialect
//! SQL text plus an ordered parameter list. Compilation is a pure function of
//! the inputs; identical inputs always produce identical statements.

pub mod compile;
pub mod dialect;
pub mod template;


pub use compile::{Aggregate, Assignment, JunctionFilter, RowRange, SelectPlan};
pub use dialect::{Dialect, PagingStyle};

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

///
/// SqlParam
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SqlParam {
    /// Placeholder as written in the text, prefix included (`@Age_0`).
    pub name: String,
    pub value: Value,
}

///
/// SqlStatement
///
/// Statement text and its parameters in placeholder order.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct SqlStatement {
    text: String,
    params: Vec<SqlParam>,
}

impl SqlStatement {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_params(text: String, params: Vec<SqlParam>) -> Self {
        Self { text, params }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn params(&self) -> &[SqlParam] {
        &self.params
    }

    /// Value bound to `name`, prefix included.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.iter().find(|p| p.name == name).map(|p| &p.value)
    }

    /// Parameter names in order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|p| p.name.as_str())
    }
}

impl fmt::Display for SqlStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
