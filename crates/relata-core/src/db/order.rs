use serde::{Deserialize, Serialize};

///
/// Direction
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    #[must_use]
    pub const fn sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

///
/// OrderTerm
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct OrderTerm {
    pub column: String,
    pub direction: Direction,
}

///
/// OrderBy
///
/// Ordered sort terms. Terms name logical columns, or `COUNT_COLUMN` and
/// aggregate aliases on grouped queries.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct OrderBy {
    terms: Vec<OrderTerm>,
}

impl OrderBy {
    #[must_use]
    pub const fn new() -> Self {
        Self { terms: Vec::new() }
    }

    #[must_use]
    pub fn asc(mut self, column: impl Into<String>) -> Self {
        self.push(column, Direction::Asc);
        self
    }

    #[must_use]
    pub fn desc(mut self, column: impl Into<String>) -> Self {
        self.push(column, Direction::Desc);
        self
    }

    pub fn push(&mut self, column: impl Into<String>, direction: Direction) {
        self.terms.push(OrderTerm {
            column: column.into(),
            direction,
        });
    }

    #[must_use]
    pub fn terms(&self) -> &[OrderTerm] {
        &self.terms
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}
