//! Module: db::query
//! Responsibility: fluent query surface over one entity type.
//! Does not own: SQL rendering or paging cursors.

#[cfg(test)]
mod tests;

use crate::{
    COUNT_COLUMN,
    db::{
        DbSession,
        executor::hydrate_values,
        order::{Direction, OrderBy},
        predicate::Condition,
        record::Record,
        selector::{DistinctPagedSelector, DynamicPagedSelector, StaticPagedSelector},
        sql::{Aggregate, RowRange, SelectPlan, SqlStatement, compile},
    },
    error::{ErrorOrigin, InternalError, MappingError},
    model::{TableDescriptor, descriptor},
    traits::{Entity, FieldValue, convert},
    value::Value,
};
use serde::{Deserialize, Serialize};
use std::{marker::PhantomData, sync::Arc};

///
/// GroupCount
///
/// One `GROUP BY` row: the grouped column value and its row count.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct GroupCount<K> {
    pub column: K,
    pub count: u64,
}

///
/// GroupValue
///
/// One `GROUP BY` row: the grouped column value and an aggregate.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct GroupValue<K, V> {
    pub column: K,
    pub value: V,
}

///
/// Query
///
/// Fluent, session-bound query over `E`. Builders consume and return the
/// query; terminal methods compile and execute it.
///

pub struct Query<'s, E: Entity> {
    session: &'s DbSession,
    condition: Condition,
    order: OrderBy,
    range: Option<(u64, u64)>,
    _marker: PhantomData<E>,
}

impl<'s, E: Entity> Query<'s, E> {
    #[must_use]
    pub(crate) const fn new(session: &'s DbSession) -> Self {
        Self {
            session,
            condition: Condition::Empty,
            order: OrderBy::new(),
            range: None,
            _marker: PhantomData,
        }
    }

    // ------------------------------------------------------------------
    // Builders
    // ------------------------------------------------------------------

    /// Add a condition, combined with any existing one by `and`.
    #[must_use]
    pub fn filter(mut self, condition: Condition) -> Self {
        self.condition = std::mem::take(&mut self.condition).and(condition);
        self
    }

    /// Replace the ordering.
    #[must_use]
    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub fn order_by_asc(mut self, column: impl Into<String>) -> Self {
        self.order.push(column, Direction::Asc);
        self
    }

    #[must_use]
    pub fn order_by_desc(mut self, column: impl Into<String>) -> Self {
        self.order.push(column, Direction::Desc);
        self
    }

    /// Restrict to rows `start..=end`, one-based. Requires an ordering.
    #[must_use]
    pub const fn range(mut self, start: u64, end: u64) -> Self {
        self.range = Some((start, end));
        self
    }

    #[must_use]
    pub const fn condition(&self) -> &Condition {
        &self.condition
    }

    #[must_use]
    pub const fn order(&self) -> &OrderBy {
        &self.order
    }

    #[must_use]
    pub const fn session(&self) -> &'s DbSession {
        self.session
    }

    // ------------------------------------------------------------------
    // Row results
    // ------------------------------------------------------------------

    pub fn select(&self) -> Result<Vec<E>, InternalError> {
        self.select_with(false)
    }

    /// Rows deduplicated by their full column tuple.
    pub fn select_distinct(&self) -> Result<Vec<E>, InternalError> {
        self.select_with(true)
    }

    /// Rows as tracked records, for touched-column updates.
    pub fn select_records(&self) -> Result<Vec<Record<E>>, InternalError> {
        let table = descriptor::<E>()?;
        let statement = self.compile_select(&table, false)?;
        let rows = self.session.run_query(&statement)?;

        Ok(hydrate_values(&table, rows)?
            .into_iter()
            .map(|values| Record::from_parts(Arc::clone(&table), values))
            .collect())
    }

    /// First row in order; key order when no ordering was given.
    pub fn first(&self) -> Result<Option<E>, InternalError> {
        let table = descriptor::<E>()?;
        let mut order = self.order.clone();
        if order.is_empty() {
            for column in table.key_columns() {
                order.push(column.name, Direction::Asc);
            }
        }
        let plan = SelectPlan::new(&self.condition, &order).range(Some(RowRange::new(1, 1)?));
        let statement = compile::select(self.session.dialect(), &table, &plan)?;

        Ok(self.session.load_entities(&table, &statement)?.into_iter().next())
    }

    fn select_with(&self, distinct: bool) -> Result<Vec<E>, InternalError> {
        let table = descriptor::<E>()?;
        let statement = self.compile_select(&table, distinct)?;

        self.session.load_entities(&table, &statement)
    }

    pub(crate) fn compile_select(
        &self,
        table: &TableDescriptor,
        distinct: bool,
    ) -> Result<SqlStatement, InternalError> {
        let range = self
            .range
            .map(|(start, end)| RowRange::new(start, end))
            .transpose()?;
        let plan = SelectPlan::new(&self.condition, &self.order)
            .range(range)
            .distinct(distinct);

        compile::select(self.session.dialect(), table, &plan)
    }

    // ------------------------------------------------------------------
    // Aggregates
    // ------------------------------------------------------------------

    pub fn count(&self) -> Result<u64, InternalError> {
        self.count_with(false)
    }

    pub fn count_distinct(&self) -> Result<u64, InternalError> {
        self.count_with(true)
    }

    pub(crate) fn count_with(&self, distinct: bool) -> Result<u64, InternalError> {
        let table = descriptor::<E>()?;
        let statement = compile::count(self.session.dialect(), &table, &self.condition, distinct)?;
        let value = self.session.run_scalar(&statement)?;

        to_count(&value)
    }

    /// `MAX(column)`; `None` when no row matches.
    pub fn max<T: FieldValue>(&self, column: &str) -> Result<Option<T>, InternalError> {
        self.scalar(&Aggregate::Max(column.to_string()), column)
    }

    /// `MIN(column)`; `None` when no row matches.
    pub fn min<T: FieldValue>(&self, column: &str) -> Result<Option<T>, InternalError> {
        self.scalar(&Aggregate::Min(column.to_string()), column)
    }

    /// `SUM(column)`; `None` when no row matches.
    pub fn sum<T: FieldValue>(&self, column: &str) -> Result<Option<T>, InternalError> {
        self.scalar(&Aggregate::Sum(column.to_string()), column)
    }

    fn scalar<T: FieldValue>(
        &self,
        aggregate: &Aggregate,
        column: &str,
    ) -> Result<Option<T>, InternalError> {
        let table = descriptor::<E>()?;
        let statement =
            compile::aggregate(self.session.dialect(), &table, &self.condition, aggregate)?;

        match self.session.run_scalar(&statement)? {
            Value::Null => Ok(None),
            value => convert(column, &value).map(Some),
        }
    }

    // ------------------------------------------------------------------
    // Grouping
    // ------------------------------------------------------------------

    /// `SELECT column, COUNT(*) ... GROUP BY column`, ordered by this
    /// query's ordering (which may name `COUNT_COLUMN`).
    pub fn group_by<K: FieldValue>(&self, column: &str) -> Result<Vec<GroupCount<K>>, InternalError> {
        self.group_rows(column, &Aggregate::Count)?
            .into_iter()
            .map(|(key, count)| {
                Ok(GroupCount {
                    column: convert(column, &key)?,
                    count: to_count(&count)?,
                })
            })
            .collect()
    }

    /// `SELECT column, SUM(value) ... GROUP BY column`.
    pub fn group_by_sum<K: FieldValue, V: FieldValue>(
        &self,
        column: &str,
        value: &str,
    ) -> Result<Vec<GroupValue<K, V>>, InternalError> {
        self.group_by_aggregate(column, &Aggregate::Sum(value.to_string()))
    }

    /// Any aggregate grouped by `column`.
    pub fn group_by_aggregate<K: FieldValue, V: FieldValue>(
        &self,
        column: &str,
        aggregate: &Aggregate,
    ) -> Result<Vec<GroupValue<K, V>>, InternalError> {
        let value_column = match aggregate {
            Aggregate::Count => COUNT_COLUMN,
            Aggregate::Sum(c) | Aggregate::Max(c) | Aggregate::Min(c) => c.as_str(),
        };

        self.group_rows(column, aggregate)?
            .into_iter()
            .map(|(key, value)| {
                Ok(GroupValue {
                    column: convert(column, &key)?,
                    value: convert(value_column, &value)?,
                })
            })
            .collect()
    }

    fn group_rows(
        &self,
        column: &str,
        aggregate: &Aggregate,
    ) -> Result<Vec<(Value, Value)>, InternalError> {
        let table = descriptor::<E>()?;
        let statement = compile::group(
            self.session.dialect(),
            &table,
            &self.condition,
            column,
            aggregate,
            &self.order,
        )?;
        let rows = self.session.run_query(&statement)?;

        rows.rows
            .into_iter()
            .map(|row| {
                let mut values = row.into_values().into_iter();
                match (values.next(), values.next()) {
                    (Some(key), Some(value)) => Ok((key, value)),
                    _ => Err(InternalError::mapping(
                        ErrorOrigin::Hydrate,
                        MappingError::MissingResultColumn {
                            column: column.to_string(),
                        },
                    )),
                }
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Paging
    // ------------------------------------------------------------------

    /// Pages re-counted and re-queried on every call.
    pub fn paged_selector(self, page_size: u64) -> Result<DynamicPagedSelector<'s, E>, InternalError> {
        DynamicPagedSelector::new(self, page_size)
    }

    /// Count and ordered key set fetched once; pages fetch only their keys.
    pub fn static_paged_selector(
        self,
        page_size: u64,
    ) -> Result<StaticPagedSelector<'s, E>, InternalError> {
        StaticPagedSelector::new(self, page_size)
    }

    /// Dynamic paging over distinct rows.
    pub fn distinct_paged_selector(
        self,
        page_size: u64,
    ) -> Result<DistinctPagedSelector<'s, E>, InternalError> {
        DistinctPagedSelector::new(self, page_size)
    }
}

/// Read a `COUNT(*)` result.
pub(crate) fn to_count(value: &Value) -> Result<u64, InternalError> {
    let count = convert::<i64>(COUNT_COLUMN, value)?;

    Ok(u64::try_from(count).unwrap_or_default())
}

impl<E: Entity> Clone for Query<'_, E> {
    fn clone(&self) -> Self {
        Self {
            session: self.session,
            condition: self.condition.clone(),
            order: self.order.clone(),
            range: self.range,
            _marker: PhantomData,
        }
    }
}
