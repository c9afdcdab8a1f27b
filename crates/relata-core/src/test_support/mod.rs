//! Test-only connections, fixture entities and session helpers.

pub(crate) mod fixtures;
pub(crate) mod recording;
pub(crate) mod sqlite;

pub(crate) use recording::{Recording, StatementLog};
pub(crate) use sqlite::SqliteConnection;

use crate::{
    db::{DbSession, Dialect},
    error::{ErrorOrigin, InternalError, MappingError},
};

///
/// test_entity
///
/// Test-only helper implementing `Entity` for a plain struct whose fields map
/// one-to-one onto declared columns, in declaration order.
///

macro_rules! test_entity {
    (
        $name:ident,
        decl = $decl:expr,
        fields = [ $( $field:ident : $ty:ty => $logical:literal ),+ $(,)? ] $(,)?
    ) => {
        #[derive(Clone, Debug, Default, PartialEq)]
        pub(crate) struct $name {
            $( pub(crate) $field: $ty, )+
        }

        impl $crate::traits::Entity for $name {
            fn declare() -> $crate::model::EntityDecl {
                $decl
            }

            fn values(&self) -> Vec<$crate::value::Value> {
                vec![$( $crate::traits::FieldValue::to_value(&self.$field) ),+]
            }

            fn from_row(
                row: &$crate::traits::EntityRow<'_>,
            ) -> Result<Self, $crate::error::InternalError> {
                Ok(Self {
                    $( $field: row.get($logical)?, )+
                })
            }

            fn set_value(
                &mut self,
                column: &str,
                value: &$crate::value::Value,
            ) -> Result<(), $crate::error::InternalError> {
                match column {
                    $( $logical => $crate::traits::assign(&mut self.$field, column, value), )+
                    _ => Err($crate::test_support::unknown_column(stringify!($name), column)),
                }
            }
        }
    };
}

pub(crate) use test_entity;

pub(crate) fn unknown_column(table: &str, column: &str) -> InternalError {
    InternalError::mapping(
        ErrorOrigin::Hydrate,
        MappingError::UnknownColumn {
            table: table.to_string(),
            column: column.to_string(),
        },
    )
}

/// Fresh in-memory database with the fixture schema plus `seed`, behind a
/// statement log. Setup statements are not logged.
pub(crate) fn session(dialect: Dialect, seed: &str) -> (DbSession, StatementLog) {
    let connection = SqliteConnection::memory().expect("in-memory sqlite should open");
    connection
        .batch(fixtures::SCHEMA)
        .expect("fixture schema should apply");
    connection.batch(seed).expect("fixture seed should apply");

    let recording = Recording::new(connection);
    let log = recording.log();

    (DbSession::new(dialect, recording), log)
}

/// Both paging dialects that run on SQLite.
pub(crate) const PAGING_DIALECTS: [Dialect; 2] = [Dialect::Sqlite, Dialect::SqlServer2005];
