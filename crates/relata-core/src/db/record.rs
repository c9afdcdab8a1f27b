use crate::{
    error::{ErrorOrigin, InternalError, MappingError},
    model::{TableDescriptor, descriptor},
    traits::{Entity, EntityRow, FieldValue, convert},
    value::Value,
};
use std::{marker::PhantomData, sync::Arc};

///
/// Record
///
/// Column values of one `E` plus per-column touched flags.
///
/// `update_record` writes only touched columns (and any counter or
/// lock-version column); flags clear after each successful write.
///

pub struct Record<E: Entity> {
    table: Arc<TableDescriptor>,
    values: Vec<Value>,
    touched: Vec<bool>,
    _marker: PhantomData<E>,
}

impl<E: Entity> Record<E> {
    /// A fresh record holding each column's default value.
    pub fn new() -> Result<Self, InternalError> {
        let table = descriptor::<E>()?;
        let values = table
            .columns()
            .iter()
            .map(|column| column.default_value())
            .collect();

        Ok(Self::from_parts(table, values))
    }

    /// Snapshot an entity; nothing is touched yet.
    pub fn from_entity(entity: &E) -> Result<Self, InternalError> {
        let table = descriptor::<E>()?;

        Ok(Self::from_parts(table, entity.values()))
    }

    pub(crate) fn from_parts(table: Arc<TableDescriptor>, values: Vec<Value>) -> Self {
        let touched = vec![false; values.len()];

        Self {
            table,
            values,
            touched,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn table(&self) -> &TableDescriptor {
        &self.table
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub(crate) fn parts_mut(&mut self) -> (&TableDescriptor, &mut Vec<Value>, &[bool]) {
        (&self.table, &mut self.values, &self.touched)
    }

    pub fn get(&self, column: &str) -> Result<&Value, InternalError> {
        let index = self.index(column)?;

        Ok(&self.values[index])
    }

    pub fn get_as<T: FieldValue>(&self, column: &str) -> Result<T, InternalError> {
        convert(column, self.get(column)?)
    }

    /// Assign a column and mark it touched. The value's kind must match the
    /// column's declared kind.
    pub fn set<T: FieldValue>(&mut self, column: &str, value: T) -> Result<(), InternalError> {
        let index = self.index(column)?;
        let declared = &self.table.columns()[index];
        if T::KIND != declared.kind {
            return Err(InternalError::mapping(
                ErrorOrigin::Persist,
                MappingError::TypeMismatch {
                    column: declared.name.to_string(),
                    expected: declared.kind,
                    found: T::KIND.to_string(),
                },
            ));
        }

        self.values[index] = value.to_value();
        self.touched[index] = true;

        Ok(())
    }

    pub fn is_touched(&self, column: &str) -> Result<bool, InternalError> {
        Ok(self.touched[self.index(column)?])
    }

    pub fn clear_touched(&mut self) {
        self.touched.fill(false);
    }

    /// Rebuild the entity from the current values.
    pub fn to_entity(&self) -> Result<E, InternalError> {
        E::from_row(&EntityRow::new(&self.table, self.values.clone()))
    }

    fn index(&self, column: &str) -> Result<usize, InternalError> {
        self.table.require_index(column, ErrorOrigin::Persist)
    }
}

impl<E: Entity> Clone for Record<E> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
            values: self.values.clone(),
            touched: self.touched.clone(),
            _marker: PhantomData,
        }
    }
}

impl<E: Entity> std::fmt::Debug for Record<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("table", &self.table.name())
            .field("values", &self.values)
            .field("touched", &self.touched)
            .finish()
    }
}
