use crate::{
    db::{Connection, Row, RowSet, SqlStatement},
    error::StorageError,
    value::{TIMESTAMP_FORMAT, Value},
};
use rusqlite::types::Value as SqlValue;

///
/// SqliteConnection
///
/// Bundled in-memory SQLite. A statement may hold several parts separated by
/// newlines (an insert followed by its identity select); parameters bind by
/// placeholder name, so each part takes only the values it names.
///

pub(crate) struct SqliteConnection {
    conn: rusqlite::Connection,
}

impl SqliteConnection {
    pub(crate) fn memory() -> Result<Self, StorageError> {
        let conn = rusqlite::Connection::open_in_memory().map_err(storage)?;

        Ok(Self { conn })
    }

    /// Run setup SQL directly, bypassing the engine.
    pub(crate) fn batch(&self, sql: &str) -> Result<(), StorageError> {
        self.conn.execute_batch(sql).map_err(storage)
    }

    fn prepare(
        &self,
        text: &str,
        statement: &SqlStatement,
    ) -> Result<rusqlite::Statement<'_>, StorageError> {
        let mut stmt = self.conn.prepare(text).map_err(storage)?;

        for index in 1..=stmt.parameter_count() {
            let name = stmt.parameter_name(index).map(ToString::to_string);
            let value = name
                .as_deref()
                .and_then(|name| statement.param(name))
                .ok_or_else(|| {
                    StorageError::new(format!("no value bound for parameter {name:?}"))
                })?;
            stmt.raw_bind_parameter(index, to_sql(value))
                .map_err(storage)?;
        }

        Ok(stmt)
    }

    fn execute_part(&self, text: &str, statement: &SqlStatement) -> Result<u64, StorageError> {
        let mut stmt = self.prepare(text, statement)?;
        let rows = stmt.raw_execute().map_err(storage)?;

        Ok(rows as u64)
    }

    fn query_part(&self, text: &str, statement: &SqlStatement) -> Result<RowSet, StorageError> {
        let mut stmt = self.prepare(text, statement)?;
        let columns = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();
        let width = columns.len();

        let mut rows = Vec::new();
        let mut cursor = stmt.raw_query();
        while let Some(row) = cursor.next().map_err(storage)? {
            let values = (0..width)
                .map(|i| row.get::<_, SqlValue>(i).map(from_sql))
                .collect::<Result<Vec<_>, _>>()
                .map_err(storage)?;
            rows.push(Row::new(values));
        }

        Ok(RowSet::new(columns, rows))
    }
}

impl Connection for SqliteConnection {
    fn execute(&self, statement: &SqlStatement) -> Result<u64, StorageError> {
        let mut total = 0;
        for part in parts(statement.text()) {
            total += self.execute_part(part, statement)?;
        }

        Ok(total)
    }

    fn query(&self, statement: &SqlStatement) -> Result<RowSet, StorageError> {
        let parts = parts(statement.text()).collect::<Vec<_>>();
        let Some((last, writes)) = parts.split_last() else {
            return Ok(RowSet::default());
        };

        for part in writes {
            self.execute_part(part, statement)?;
        }

        self.query_part(last, statement)
    }

    fn query_scalar(&self, statement: &SqlStatement) -> Result<Value, StorageError> {
        Ok(self.query(statement)?.first_value())
    }
}

fn parts(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n').map(str::trim).filter(|part| !part.is_empty())
}

fn storage(err: rusqlite::Error) -> StorageError {
    StorageError::new(err.to_string())
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(v) => SqlValue::Integer(i64::from(*v)),
        Value::Int(v) => SqlValue::Integer(*v),
        Value::Float(v) => SqlValue::Real(*v),
        Value::Text(v) => SqlValue::Text(v.clone()),
        Value::Blob(v) => SqlValue::Blob(v.clone()),
        Value::Timestamp(v) => SqlValue::Text(v.format(TIMESTAMP_FORMAT).to_string()),
        Value::Ulid(v) => SqlValue::Text(v.to_string()),
    }
}

fn from_sql(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(v) => Value::Int(v),
        SqlValue::Real(v) => Value::Float(v),
        SqlValue::Text(v) => Value::Text(v),
        SqlValue::Blob(v) => Value::Blob(v),
    }
}
