use serde::{Deserialize, Serialize};

///
/// PagingStyle
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PagingStyle {
    /// Native `LIMIT n OFFSET m`.
    LimitOffset,

    /// Derived table numbered by `ROW_NUMBER() OVER (ORDER BY ...)`,
    /// range filtered in the outer query.
    RowNumber,
}

///
/// Dialect
///
/// Every rendering switch the compiler needs for one database family.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Dialect {
    #[default]
    Sqlite,
    MySql,
    SqlServer2005,
}

impl Dialect {
    #[must_use]
    pub fn quote(self, name: &str) -> String {
        match self {
            Self::Sqlite | Self::SqlServer2005 => format!("[{name}]"),
            Self::MySql => format!("`{name}`"),
        }
    }

    #[must_use]
    pub const fn param_prefix(self) -> char {
        match self {
            Self::Sqlite | Self::SqlServer2005 => '@',
            Self::MySql => '?',
        }
    }

    #[must_use]
    pub const fn paging(self) -> PagingStyle {
        match self {
            Self::Sqlite | Self::MySql => PagingStyle::LimitOffset,
            Self::SqlServer2005 => PagingStyle::RowNumber,
        }
    }

    /// Statement returning the key generated by the preceding insert.
    #[must_use]
    pub const fn identity_select(self) -> &'static str {
        match self {
            Self::Sqlite => "SELECT last_insert_rowid();",
            Self::MySql => "SELECT LAST_INSERT_ID();",
            Self::SqlServer2005 => "SELECT SCOPE_IDENTITY();",
        }
    }
}
