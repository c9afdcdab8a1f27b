use crate::{
    db::{Connection, RowSet, SqlStatement},
    error::StorageError,
    value::Value,
};
use std::{cell::RefCell, rc::Rc};

///
/// StatementLog
///
/// Shared view of every statement a `Recording` connection received.
///

#[derive(Clone, Debug, Default)]
pub(crate) struct StatementLog(Rc<RefCell<Vec<SqlStatement>>>);

impl StatementLog {
    fn push(&self, statement: &SqlStatement) {
        self.0.borrow_mut().push(statement.clone());
    }

    pub(crate) fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub(crate) fn texts(&self) -> Vec<String> {
        self.0.borrow().iter().map(|s| s.text().to_string()).collect()
    }

    pub(crate) fn last(&self) -> Option<SqlStatement> {
        self.0.borrow().last().cloned()
    }

    pub(crate) fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

///
/// Recording
///
/// Connection wrapper logging each statement before delegating.
///

pub(crate) struct Recording<C> {
    inner: C,
    log: StatementLog,
}

impl<C: Connection> Recording<C> {
    pub(crate) fn new(inner: C) -> Self {
        Self {
            inner,
            log: StatementLog::default(),
        }
    }

    pub(crate) fn log(&self) -> StatementLog {
        self.log.clone()
    }
}

impl<C: Connection> Connection for Recording<C> {
    fn execute(&self, statement: &SqlStatement) -> Result<u64, StorageError> {
        self.log.push(statement);
        self.inner.execute(statement)
    }

    fn query(&self, statement: &SqlStatement) -> Result<RowSet, StorageError> {
        self.log.push(statement);
        self.inner.query(statement)
    }

    fn query_scalar(&self, statement: &SqlStatement) -> Result<Value, StorageError> {
        self.log.push(statement);
        self.inner.query_scalar(statement)
    }
}
