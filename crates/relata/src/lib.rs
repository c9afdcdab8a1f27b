//! ## Crate layout
//! - `core`: runtime descriptors, conditions, the dialect compiler, the
//!   persistence engine, selectors, relation collections and observability.
//! - `error`: the public error type returned across the crate boundary.
//!
//! The `prelude` module carries the vocabulary entity code is written in.

pub use relata_core as core;

pub mod error;

pub use error::{Error, ErrorKind, ErrorOrigin, ValidationErrorKind};

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use relata_core::{COUNT_COLUMN, ROW_NUMBER_COLUMN, db, obs};

/// Result alias for calls made through the facade.
pub type Result<T> = std::result::Result<T, Error>;

///
/// Prelude
/// using _ brings traits into scope and avoids name conflicts
///

pub mod prelude {
    pub use crate::core::{
        COUNT_COLUMN,
        db::{
            Connection, DbSession, Dialect, PagedSelector as _, Record, SqlStatement,
            order::{Direction, OrderBy},
            predicate::{Condition, col},
            relation::{LazyList, RelationBinder},
        },
        error::InternalError,
        model::{EntityDecl, FieldDecl, KeyGeneration},
        traits::{Entity, EntityRow, FieldValue, assign},
        value::Value,
    };
    pub use crate::{Error, Result};
    pub use serde::{Deserialize, Serialize};
}
