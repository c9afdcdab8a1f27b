//! Module: db::selector
//! Responsibility: page cursors over an ordered query.
//!
//! Pages are zero-based for every selector: page 0 holds rows 1 through
//! `page_size` of the ordering.


use crate::{
    db::{
        executor::hydrate_values,
        order::OrderBy,
        predicate::col,
        query::Query,
        sql::{RowRange, SelectPlan, compile},
    },
    error::{ErrorOrigin, InternalError, MappingError},
    model::descriptor,
    traits::Entity,
    value::Value,
};

///
/// PagedSelector
///

pub trait PagedSelector<E: Entity> {
    fn page_size(&self) -> u64;

    /// Number of rows the query matches.
    fn result_count(&mut self) -> Result<u64, InternalError>;

    /// Rows of one zero-based page; past the end yields an empty page.
    fn current_page(&mut self, page: u64) -> Result<Vec<E>, InternalError>;

    fn page_count(&mut self) -> Result<u64, InternalError> {
        Ok(self.result_count()?.div_ceil(self.page_size()))
    }
}

fn check_query<E: Entity>(query: &Query<'_, E>, page_size: u64) -> Result<(), InternalError> {
    if page_size == 0 {
        return Err(InternalError::mapping(
            ErrorOrigin::Selector,
            MappingError::InvalidPageSize,
        ));
    }

    if query.order().is_empty() {
        let table = descriptor::<E>()?;
        return Err(InternalError::mapping(
            ErrorOrigin::Selector,
            MappingError::UnorderedPaging {
                table: table.name().to_string(),
            },
        ));
    }

    Ok(())
}

///
/// DynamicPagedSelector
///
/// Counts on every `result_count` and issues a fresh range query per page,
/// so concurrent inserts show up in later calls.
///

pub struct DynamicPagedSelector<'s, E: Entity> {
    query: Query<'s, E>,
    page_size: u64,
    distinct: bool,
}

impl<'s, E: Entity> DynamicPagedSelector<'s, E> {
    pub(crate) fn new(query: Query<'s, E>, page_size: u64) -> Result<Self, InternalError> {
        check_query(&query, page_size)?;

        Ok(Self {
            query,
            page_size,
            distinct: false,
        })
    }
}

impl<E: Entity> PagedSelector<E> for DynamicPagedSelector<'_, E> {
    fn page_size(&self) -> u64 {
        self.page_size
    }

    fn result_count(&mut self) -> Result<u64, InternalError> {
        self.query.count_with(self.distinct)
    }

    fn current_page(&mut self, page: u64) -> Result<Vec<E>, InternalError> {
        let table = descriptor::<E>()?;
        let plan = SelectPlan::new(self.query.condition(), self.query.order())
            .range(Some(RowRange::for_page(page, self.page_size)?))
            .distinct(self.distinct);
        let session = self.query.session();
        let statement = compile::select(session.dialect(), &table, &plan)?;

        session.load_entities(&table, &statement)
    }
}

///
/// DistinctPagedSelector
///
/// Dynamic paging over rows deduplicated by their full column tuple; the
/// count is taken over the same distinct set.
///

pub struct DistinctPagedSelector<'s, E: Entity> {
    inner: DynamicPagedSelector<'s, E>,
}

impl<'s, E: Entity> DistinctPagedSelector<'s, E> {
    pub(crate) fn new(query: Query<'s, E>, page_size: u64) -> Result<Self, InternalError> {
        let mut inner = DynamicPagedSelector::new(query, page_size)?;
        inner.distinct = true;

        Ok(Self { inner })
    }
}

impl<E: Entity> PagedSelector<E> for DistinctPagedSelector<'_, E> {
    fn page_size(&self) -> u64 {
        self.inner.page_size()
    }

    fn result_count(&mut self) -> Result<u64, InternalError> {
        self.inner.result_count()
    }

    fn current_page(&mut self, page: u64) -> Result<Vec<E>, InternalError> {
        self.inner.current_page(page)
    }
}

///
/// StaticPagedSelector
///
/// Snapshot paging: the ordered key set is fetched once and the count is its
/// length. Each page fetches only the rows for its slice of keys. Rows inserted after
/// the snapshot never appear; deleted rows drop out of their page.
///

pub struct StaticPagedSelector<'s, E: Entity> {
    query: Query<'s, E>,
    page_size: u64,
    keys: Option<Vec<Value>>,
}

impl<'s, E: Entity> StaticPagedSelector<'s, E> {
    pub(crate) fn new(query: Query<'s, E>, page_size: u64) -> Result<Self, InternalError> {
        check_query(&query, page_size)?;
        descriptor::<E>()?.single_key("static paging", ErrorOrigin::Selector)?;

        Ok(Self {
            query,
            page_size,
            keys: None,
        })
    }

    fn keys(&mut self) -> Result<&[Value], InternalError> {
        if self.keys.is_none() {
            let table = descriptor::<E>()?;
            let plan = SelectPlan::new(self.query.condition(), self.query.order()).keys_only();
            let session = self.query.session();
            let statement = compile::select(session.dialect(), &table, &plan)?;
            let rows = session.run_query(&statement)?;
            let keys = rows
                .rows
                .into_iter()
                .filter_map(|row| row.into_values().into_iter().next())
                .collect::<Vec<_>>();

            tracing::trace!(table = table.name(), keys = keys.len(), "static page keys cached");
            self.keys = Some(keys);
        }

        Ok(self.keys.as_deref().unwrap_or_default())
    }
}

impl<E: Entity> PagedSelector<E> for StaticPagedSelector<'_, E> {
    fn page_size(&self) -> u64 {
        self.page_size
    }

    // The count is the size of the key snapshot, never a separate COUNT.
    fn result_count(&mut self) -> Result<u64, InternalError> {
        let len = self.keys()?.len();

        Ok(u64::try_from(len).unwrap_or(u64::MAX))
    }

    fn current_page(&mut self, page: u64) -> Result<Vec<E>, InternalError> {
        let page_size = usize::try_from(self.page_size).unwrap_or(usize::MAX);
        let start = usize::try_from(page)
            .unwrap_or(usize::MAX)
            .saturating_mul(page_size);
        let slice = {
            let keys = self.keys()?;
            if start >= keys.len() {
                return Ok(Vec::new());
            }
            keys[start..keys.len().min(start.saturating_add(page_size))].to_vec()
        };

        let table = descriptor::<E>()?;
        let (key_index, key_column) = table.single_key("static paging", ErrorOrigin::Selector)?;
        let condition = col(key_column.name).in_values(slice.clone());
        let order = OrderBy::new();
        let session = self.query.session();
        let statement = compile::select(
            session.dialect(),
            &table,
            &SelectPlan::new(&condition, &order),
        )?;
        let fetched = session.run_query(&statement)?;

        // Restore snapshot order; the IN fetch is unordered.
        let mut rows: Vec<(usize, E)> = Vec::with_capacity(slice.len());
        for values in hydrate_values(&table, fetched)? {
            let Some(position) = slice.iter().position(|k| *k == values[key_index]) else {
                continue;
            };
            rows.push((position, session.hydrate_entity(&table, values)?));
        }
        rows.sort_by_key(|(position, _)| *position);

        Ok(rows.into_iter().map(|(_, entity)| entity).collect())
    }
}
