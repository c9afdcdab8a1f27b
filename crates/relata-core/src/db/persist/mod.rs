//! Module: db::persist
//! Responsibility: insert, update, delete and save with key generation,
//! lock-version and counter rules.
//! Does not own: statement text (see `sql::compile`).
//!
//! Every write is a single statement. Values the engine changes (generated
//! keys, lock versions, reset keys) are written back into the caller's object
//! only after the statement succeeds.

mod validate;


use crate::{
    db::{
        DbSession,
        record::Record,
        relation::BindMode,
        sql::{Assignment, compile},
    },
    error::{ConcurrencyError, ErrorOrigin, InternalError, MappingError, ValidationError},
    model::{ColumnSpecial, KeyGeneration, TableDescriptor, descriptor},
    obs::sink::MetricsEvent,
    traits::{Entity, convert},
    value::Value,
};
use ulid::Ulid;

impl DbSession {
    // ---------------------------------------------------------------------
    // Entities
    // ---------------------------------------------------------------------

    /// Insert every column of `entity`. Generated keys and an initialized
    /// lock version are written back, then written relation collections are
    /// saved against the new key.
    pub fn insert<E: Entity>(&self, entity: &mut E) -> Result<u64, InternalError> {
        let table = descriptor::<E>()?;
        let mut values = entity.values();
        let before = values.clone();

        let rows = self.insert_values(&table, &mut values)?;
        write_back(&table, entity, &before, &values)?;
        self.bind_relations(&table, entity, BindMode::Persist)?;

        Ok(rows)
    }

    /// Update every non-key column of `entity`, keyed on its key columns,
    /// then save its written relation collections.
    pub fn update<E: Entity>(&self, entity: &mut E) -> Result<u64, InternalError> {
        let table = descriptor::<E>()?;
        let mut values = entity.values();
        let before = values.clone();

        let rows = self.update_values(&table, &mut values, None)?;
        write_back(&table, entity, &before, &values)?;
        self.bind_relations(&table, entity, BindMode::Persist)?;

        Ok(rows)
    }

    /// Delete the row of `entity`; its key is reset to the default value.
    pub fn delete<E: Entity>(&self, entity: &mut E) -> Result<u64, InternalError> {
        let table = descriptor::<E>()?;
        let mut values = entity.values();
        let before = values.clone();

        let rows = self.delete_values(&table, &mut values)?;
        write_back(&table, entity, &before, &values)?;

        Ok(rows)
    }

    /// Insert when the key is at its default value, update otherwise.
    pub fn save<E: Entity>(&self, entity: &mut E) -> Result<u64, InternalError> {
        let table = descriptor::<E>()?;

        if is_new(&table, &entity.values()) {
            self.insert(entity)
        } else {
            self.update(entity)
        }
    }

    // ---------------------------------------------------------------------
    // Records
    // ---------------------------------------------------------------------

    pub fn insert_record<E: Entity>(&self, record: &mut Record<E>) -> Result<u64, InternalError> {
        let (table, values, _) = record.parts_mut();
        let rows = self.insert_values(table, values)?;
        record.clear_touched();

        Ok(rows)
    }

    /// Update only the touched columns of `record`, plus counter and
    /// lock-version increments.
    pub fn update_record<E: Entity>(&self, record: &mut Record<E>) -> Result<u64, InternalError> {
        let (table, values, touched) = record.parts_mut();
        let touched = touched.to_vec();
        let rows = self.update_values(table, values, Some(&touched))?;
        record.clear_touched();

        Ok(rows)
    }

    pub fn delete_record<E: Entity>(&self, record: &mut Record<E>) -> Result<u64, InternalError> {
        let (table, values, _) = record.parts_mut();
        let rows = self.delete_values(table, values)?;
        record.clear_touched();

        Ok(rows)
    }

    pub fn save_record<E: Entity>(&self, record: &mut Record<E>) -> Result<u64, InternalError> {
        if is_new(record.table(), record.values()) {
            self.insert_record(record)
        } else {
            self.update_record(record)
        }
    }

    // ---------------------------------------------------------------------
    // Column values
    // ---------------------------------------------------------------------

    fn insert_values(
        &self,
        table: &TableDescriptor,
        values: &mut [Value],
    ) -> Result<u64, InternalError> {
        check_arity(table, values)?;

        match table.key_generation() {
            Some(KeyGeneration::Ulid) => {
                for &index in table.key_indexes() {
                    if values[index].is_default() {
                        values[index] = Value::Ulid(Ulid::new());
                    }
                }
            }
            Some(KeyGeneration::Supplied) => self.require_key(table, values, "insert")?,
            Some(KeyGeneration::Database) | None => {}
        }

        if let Some(index) = table.lock_version_index()
            && values[index].is_default()
        {
            values[index] = Value::Int(1);
        }

        let generated = table.is_generated_key();
        self.validate(table, values, |index| !(generated && table.columns()[index].is_key()), false)?;

        let statement = compile::insert(self.dialect(), table, values)?;
        if !generated {
            return self.run_execute(&statement);
        }

        let (index, column) = table.single_key("insert", ErrorOrigin::Persist)?;
        let key = self.run_scalar(&statement)?;
        values[index] = Value::Int(convert::<i64>(column.name, &key)?);

        Ok(1)
    }

    fn update_values(
        &self,
        table: &TableDescriptor,
        values: &mut [Value],
        touched: Option<&[bool]>,
    ) -> Result<u64, InternalError> {
        check_arity(table, values)?;
        self.require_key(table, values, "update")?;

        let mut assignments = Vec::new();
        for (index, column) in table.columns().iter().enumerate() {
            match column.special {
                ColumnSpecial::Key => {}
                ColumnSpecial::Counter | ColumnSpecial::LockVersion => {
                    assignments.push(Assignment::Increment(index));
                }
                ColumnSpecial::None => {
                    if touched.is_none_or(|flags| flags[index]) {
                        assignments.push(Assignment::Set(index, values[index].clone()));
                    }
                }
            }
        }

        if assignments.is_empty() {
            tracing::debug!(table = table.name(), "update skipped: nothing to set");
            return Ok(0);
        }

        let is_set = |index: usize| {
            assignments
                .iter()
                .any(|a| matches!(a, Assignment::Set(i, _) if *i == index))
        };
        self.validate(table, values, is_set, true)?;

        let key = key_values(table, values);
        let lock = table.lock_version_index().map(|index| values[index].clone());
        let statement = compile::update(self.dialect(), table, &assignments, &key, lock.as_ref())?;
        let rows = self.run_execute(&statement)?;

        if let (Some(index), Some(version)) = (table.lock_version_index(), lock) {
            let version = convert::<i64>(table.columns()[index].name, &version)?;
            if rows == 0 {
                return Err(self.lock_conflict(table, &key, version));
            }
            values[index] = Value::Int(version + 1);
        }

        Ok(rows)
    }

    fn delete_values(
        &self,
        table: &TableDescriptor,
        values: &mut [Value],
    ) -> Result<u64, InternalError> {
        check_arity(table, values)?;
        self.require_key(table, values, "delete")?;

        let key = key_values(table, values);
        let statement = compile::delete(self.dialect(), table, &key)?;
        let rows = self.run_execute(&statement)?;

        for column_index in table.key_indexes() {
            values[*column_index] = table.columns()[*column_index].default_value();
        }

        Ok(rows)
    }

    // ---------------------------------------------------------------------
    // Helpers
    // ---------------------------------------------------------------------

    fn require_key(
        &self,
        table: &TableDescriptor,
        values: &[Value],
        operation: &'static str,
    ) -> Result<(), InternalError> {
        if let Some(&index) = table
            .key_indexes()
            .iter()
            .find(|&&index| values[index].is_default())
        {
            let column = &table.columns()[index];
            self.emit(MetricsEvent::ValidationFailure {
                table: table.name(),
            });
            return Err(InternalError::validation(ValidationError::MissingKey {
                table: table.name().to_string(),
                column: column.name.to_string(),
                operation,
            }));
        }

        Ok(())
    }

    fn lock_conflict(&self, table: &TableDescriptor, key: &[Value], version: i64) -> InternalError {
        let key = key
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");

        tracing::warn!(
            table = table.name(),
            key = %key,
            version,
            "optimistic lock conflict: row changed since it was read"
        );
        self.emit(MetricsEvent::LockConflict {
            table: table.name(),
        });

        InternalError::concurrency(ConcurrencyError::StaleLockVersion {
            table: table.name().to_string(),
            key,
            version,
        })
    }
}

/// True when every key column holds its default value. Keyless tables
/// always insert.
pub(crate) fn is_new(table: &TableDescriptor, values: &[Value]) -> bool {
    table
        .key_indexes()
        .iter()
        .all(|&index| values.get(index).is_none_or(Value::is_default))
}

fn key_values(table: &TableDescriptor, values: &[Value]) -> Vec<Value> {
    table
        .key_indexes()
        .iter()
        .map(|&index| values[index].clone())
        .collect()
}

fn check_arity(table: &TableDescriptor, values: &[Value]) -> Result<(), InternalError> {
    if values.len() == table.columns().len() {
        return Ok(());
    }

    Err(InternalError::mapping(
        ErrorOrigin::Persist,
        MappingError::ValueArity {
            entity: table.entity().to_string(),
            expected: table.columns().len(),
            found: values.len(),
        },
    ))
}

// Copy engine-changed values back into the entity.
fn write_back<E: Entity>(
    table: &TableDescriptor,
    entity: &mut E,
    before: &[Value],
    after: &[Value],
) -> Result<(), InternalError> {
    for ((column, old), new) in table.columns().iter().zip(before).zip(after) {
        if old != new {
            entity.set_value(column.name, new)?;
        }
    }

    Ok(())
}
