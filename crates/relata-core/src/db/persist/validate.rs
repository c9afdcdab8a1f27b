use crate::{
    db::{DbSession, predicate::col, sql::compile},
    error::{InternalError, ValidationError},
    model::{ColumnDescriptor, TableDescriptor},
    obs::sink::MetricsEvent,
    traits::convert,
    value::Value,
};

impl DbSession {
    /// Check declared column constraints before a write. `checked` selects the
    /// column positions the write will set; `existing` excludes the row's own
    /// key from uniqueness checks.
    pub(super) fn validate(
        &self,
        table: &TableDescriptor,
        values: &[Value],
        checked: impl Fn(usize) -> bool,
        existing: bool,
    ) -> Result<(), InternalError> {
        for (index, column) in table.columns().iter().enumerate() {
            if !checked(index) {
                continue;
            }

            let failure = match check_value(table, column, &values[index]) {
                Some(err) => Some(err),
                None if column.unique && !values[index].is_null() => self
                    .unique_taken(table, column, values, index, existing)?
                    .then(|| ValidationError::NotUnique {
                        table: table.name().to_string(),
                        column: column.name.to_string(),
                    }),
                None => None,
            };

            if let Some(err) = failure {
                tracing::debug!(
                    table = table.name(),
                    column = column.name,
                    error = %err,
                    "validation failed"
                );
                self.emit(MetricsEvent::ValidationFailure {
                    table: table.name(),
                });

                return Err(InternalError::validation(err));
            }
        }

        Ok(())
    }

    // COUNT rows already holding the value, the row itself excluded.
    fn unique_taken(
        &self,
        table: &TableDescriptor,
        column: &ColumnDescriptor,
        values: &[Value],
        index: usize,
        existing: bool,
    ) -> Result<bool, InternalError> {
        let mut condition = col(column.name).eq(values[index].clone());
        if existing {
            let key = table
                .key_indexes()
                .iter()
                .map(|&i| values[i].clone())
                .collect::<Vec<_>>();
            let own = compile::key_condition(table, &key, "unique check")?;
            condition = condition.and(own.negate());
        }

        let statement = compile::count(self.dialect(), table, &condition, false)?;
        let count = convert::<i64>(column.name, &self.run_scalar(&statement)?)?;

        Ok(count > 0)
    }
}

// Constraints decidable without a query.
fn check_value(
    table: &TableDescriptor,
    column: &ColumnDescriptor,
    value: &Value,
) -> Option<ValidationError> {
    if value.is_null() && !column.nullable {
        return Some(ValidationError::NotNull {
            table: table.name().to_string(),
            column: column.name.to_string(),
        });
    }

    if let (Some(max), Value::Text(text)) = (column.max_length, value) {
        let found = text.chars().count();
        if found > max {
            return Some(ValidationError::MaxLength {
                table: table.name().to_string(),
                column: column.name.to_string(),
                max,
                found,
            });
        }
    }

    None
}
