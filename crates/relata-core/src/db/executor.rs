//! Module: db::executor
//! Responsibility: hand compiled statements to the connection and hydrate rows.
//! Does not own: statement text (see `sql`).

use crate::{
    db::{
        DbSession,
        connection::RowSet,
        relation::{BindMode, RelationBinder},
        sql::SqlStatement,
    },
    error::{ErrorOrigin, InternalError, MappingError},
    model::TableDescriptor,
    obs::sink::{ExecKind, Span},
    traits::{Entity, EntityRow},
    value::Value,
};

impl DbSession {
    pub(crate) fn run_execute(&self, statement: &SqlStatement) -> Result<u64, InternalError> {
        self.with_metrics(|| {
            trace_statement(ExecKind::Execute, statement);
            let span = Span::new(ExecKind::Execute);
            let rows = self
                .connection()
                .execute(statement)
                .map_err(|err| InternalError::storage(err, statement.text()))?;
            span.finish(rows);

            Ok(rows)
        })
    }

    pub(crate) fn run_query(&self, statement: &SqlStatement) -> Result<RowSet, InternalError> {
        self.with_metrics(|| {
            trace_statement(ExecKind::Query, statement);
            let span = Span::new(ExecKind::Query);
            let rows = self
                .connection()
                .query(statement)
                .map_err(|err| InternalError::storage(err, statement.text()))?;
            span.finish(rows.len() as u64);

            Ok(rows)
        })
    }

    pub(crate) fn run_scalar(&self, statement: &SqlStatement) -> Result<Value, InternalError> {
        self.with_metrics(|| {
            trace_statement(ExecKind::Scalar, statement);
            let span = Span::new(ExecKind::Scalar);
            let value = self
                .connection()
                .query_scalar(statement)
                .map_err(|err| InternalError::storage(err, statement.text()))?;
            span.finish(1);

            Ok(value)
        })
    }

    /// Run `statement` and hydrate every row into `E`, loading its non-lazy
    /// relations.
    pub(crate) fn load_entities<E: Entity>(
        &self,
        table: &TableDescriptor,
        statement: &SqlStatement,
    ) -> Result<Vec<E>, InternalError> {
        self.load_with(table, statement, BindMode::Load)
    }

    /// Rows reached through a relation: bound, never loaded eagerly, so
    /// relations declared in both directions stop after one level.
    pub(crate) fn load_related<E: Entity>(
        &self,
        table: &TableDescriptor,
        statement: &SqlStatement,
    ) -> Result<Vec<E>, InternalError> {
        self.load_with(table, statement, BindMode::Bind)
    }

    fn load_with<E: Entity>(
        &self,
        table: &TableDescriptor,
        statement: &SqlStatement,
        mode: BindMode,
    ) -> Result<Vec<E>, InternalError> {
        let rows = self.run_query(statement)?;

        hydrate_values(table, rows)?
            .into_iter()
            .map(|values| self.hydrate_with(table, values, mode))
            .collect()
    }

    pub(crate) fn hydrate_entity<E: Entity>(
        &self,
        table: &TableDescriptor,
        values: Vec<Value>,
    ) -> Result<E, InternalError> {
        self.hydrate_with(table, values, BindMode::Load)
    }

    fn hydrate_with<E: Entity>(
        &self,
        table: &TableDescriptor,
        values: Vec<Value>,
        mode: BindMode,
    ) -> Result<E, InternalError> {
        let mut entity = E::from_row(&EntityRow::new(table, values))?;
        self.bind_relations(table, &mut entity, mode)?;

        Ok(entity)
    }

    /// Bind `entity`'s relation collections to its key; `mode` decides what
    /// else happens to each collection.
    pub(crate) fn bind_relations<E: Entity>(
        &self,
        table: &TableDescriptor,
        entity: &mut E,
        mode: BindMode,
    ) -> Result<(), InternalError> {
        if table.relations().is_empty() {
            return Ok(());
        }

        let (index, _) = table.single_key("relation binding", ErrorOrigin::Relation)?;
        let owner_key = entity.values().swap_remove(index);
        let binder = RelationBinder::new(self, table, owner_key, mode);

        entity.bind_relations(&binder)
    }
}

/// Reorder each row's values into descriptor column order, matching result
/// columns by logical name first, then by database column name.
pub(crate) fn hydrate_values(
    table: &TableDescriptor,
    rows: RowSet,
) -> Result<Vec<Vec<Value>>, InternalError> {
    let positions = table
        .columns()
        .iter()
        .map(|column| {
            rows.column_index(column.name)
                .or_else(|| rows.column_index(column.column))
                .ok_or_else(|| {
                    InternalError::mapping(
                        ErrorOrigin::Hydrate,
                        MappingError::MissingResultColumn {
                            column: column.name.to_string(),
                        },
                    )
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows
        .rows
        .into_iter()
        .map(|row| {
            positions
                .iter()
                .map(|&i| row.get(i).cloned().unwrap_or(Value::Null))
                .collect()
        })
        .collect())
}

fn trace_statement(kind: ExecKind, statement: &SqlStatement) {
    tracing::debug!(
        kind = ?kind,
        sql = statement.text(),
        params = ?statement.params(),
        "executing statement"
    );
}
