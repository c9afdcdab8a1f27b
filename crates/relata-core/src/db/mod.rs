pub mod connection;
pub mod executor;
pub mod order;
pub mod persist;
pub mod predicate;
pub mod query;
pub mod record;
pub mod relation;
pub mod selector;
pub mod sql;

// re-exports
pub use connection::{Connection, Row, RowSet};
pub use query::{GroupCount, GroupValue, Query};
pub use record::Record;
pub use selector::{DistinctPagedSelector, DynamicPagedSelector, PagedSelector, StaticPagedSelector};
pub use sql::{Dialect, SqlStatement};

use crate::{
    db::predicate::col,
    error::{ErrorOrigin, InternalError},
    model::descriptor,
    obs::sink::{self, MetricsEvent, MetricsSink, with_metrics_sink},
    traits::{Entity, FieldValue},
    value::Value,
};
use std::{fmt, rc::Rc};

///
/// DbSession
///
/// Explicit execution context: one dialect, one connection, optional metrics
/// sink. Every query, write and lazy load takes a session; nothing resolves a
/// dialect or connection from global state.
///

pub struct DbSession {
    dialect: Dialect,
    connection: Box<dyn Connection>,
    metrics: Option<Rc<dyn MetricsSink>>,
}

impl DbSession {
    #[must_use]
    pub fn new(dialect: Dialect, connection: impl Connection + 'static) -> Self {
        Self {
            dialect,
            connection: Box::new(connection),
            metrics: None,
        }
    }

    /// Route this session's metrics events to `sink` instead of the global one.
    #[must_use]
    pub fn metrics_sink(mut self, sink: Rc<dyn MetricsSink>) -> Self {
        self.metrics = Some(sink);
        self
    }

    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub(crate) fn connection(&self) -> &dyn Connection {
        self.connection.as_ref()
    }

    pub(crate) fn with_metrics<T>(&self, f: impl FnOnce() -> T) -> T {
        match &self.metrics {
            Some(metrics) => with_metrics_sink(Rc::clone(metrics), f),
            None => f(),
        }
    }

    pub(crate) fn emit(&self, event: MetricsEvent) {
        self.with_metrics(|| sink::record(event));
    }

    // ---------------------------------------------------------------------
    // Query entry points
    // ---------------------------------------------------------------------

    /// Start a fluent query over `E`.
    #[must_use]
    pub const fn from<E: Entity>(&self) -> Query<'_, E> {
        Query::new(self)
    }

    /// Load one object by its single key column.
    pub fn get<E: Entity>(&self, key: impl FieldValue) -> Result<Option<E>, InternalError> {
        let table = descriptor::<E>()?;
        let (_, column) = table.single_key("get", ErrorOrigin::Compile)?;

        self.from::<E>()
            .filter(col(column.name).eq(key.to_value()))
            .first()
    }

    // ---------------------------------------------------------------------
    // Raw SQL
    // ---------------------------------------------------------------------

    /// Build a statement from a raw template, one `?` per argument.
    pub fn statement(&self, template: &str, args: &[Value]) -> Result<SqlStatement, InternalError> {
        sql::template::expand(self.dialect, template, args)
    }

    /// Run a raw statement and hydrate `E` by result-column name.
    pub fn execute_list<E: Entity>(&self, statement: &SqlStatement) -> Result<Vec<E>, InternalError> {
        let table = descriptor::<E>()?;

        self.load_entities(&table, statement)
    }

    /// Run a raw write statement.
    pub fn execute(&self, statement: &SqlStatement) -> Result<u64, InternalError> {
        self.run_execute(statement)
    }

    /// Run a raw row-returning statement.
    pub fn query(&self, statement: &SqlStatement) -> Result<RowSet, InternalError> {
        self.run_query(statement)
    }

    /// Run a raw single-value statement.
    pub fn query_scalar(&self, statement: &SqlStatement) -> Result<Value, InternalError> {
        self.run_scalar(statement)
    }
}

impl fmt::Debug for DbSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbSession")
            .field("dialect", &self.dialect)
            .field("metrics", &self.metrics.is_some())
            .finish_non_exhaustive()
    }
}
