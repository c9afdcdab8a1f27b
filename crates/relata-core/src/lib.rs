//! Core runtime for relata: entity declarations, the descriptor registry,
//! conditions, the dialect compiler, the persistence engine, selectors and
//! lazy relation collections.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod db;
pub mod error;
pub mod model;
pub mod obs;
pub mod traits;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// CONSTANTS
///

/// Pseudo column naming the `COUNT(*)` output of count and group queries.
///
/// Usable in an `OrderBy` over a grouped query.
pub const COUNT_COLUMN: &str = "it__count__";

/// Pseudo column carrying the window row number in ROW_NUMBER paging.
pub const ROW_NUMBER_COLUMN: &str = "__rownumber__";

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, executors, connections or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        COUNT_COLUMN,
        db::{
            order::{Direction, OrderBy},
            predicate::{Condition, col},
            relation::LazyList,
        },
        model::{EntityDecl, FieldDecl, KeyGeneration},
        traits::{Entity, FieldValue},
        value::Value,
    };
}
