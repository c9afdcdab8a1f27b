//! Module: db::sql::compile
//! Responsibility: condition, select, aggregate and write statement rendering.
//! Does not own: execution or hydration.
//!
//! Placeholders are named `<logical>_<n>` where `n` counts every parameter
//! bound so far in the statement, so a column used twice binds twice and
//! numbering follows the left-to-right walk.

use crate::{
    COUNT_COLUMN, ROW_NUMBER_COLUMN,
    db::{
        order::OrderBy,
        predicate::{ColumnExpr, CompareOp, Condition, Operand, all, col},
        sql::{Dialect, PagingStyle, SqlParam, SqlStatement},
    },
    error::{ErrorOrigin, InternalError, MappingError},
    model::{ColumnDescriptor, TableDescriptor},
    value::Value,
};

///
/// RowRange
///
/// One-based, inclusive row window: `RowRange::new(3, 5)` is rows 3, 4 and 5.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RowRange {
    start: u64,
    end: u64,
}

impl RowRange {
    pub fn new(start: u64, end: u64) -> Result<Self, InternalError> {
        if start == 0 || end < start {
            return Err(InternalError::mapping(
                ErrorOrigin::Compile,
                MappingError::InvalidRange { start, end },
            ));
        }

        Ok(Self { start, end })
    }

    /// Window of a zero-based page.
    pub fn for_page(page: u64, page_size: u64) -> Result<Self, InternalError> {
        if page_size == 0 {
            return Err(InternalError::mapping(
                ErrorOrigin::Selector,
                MappingError::InvalidPageSize,
            ));
        }
        let start = page.saturating_mul(page_size).saturating_add(1);

        Self::new(start, start.saturating_add(page_size - 1))
    }

    #[must_use]
    pub const fn start(self) -> u64 {
        self.start
    }

    #[must_use]
    pub const fn end(self) -> u64 {
        self.end
    }

    #[must_use]
    pub const fn offset(self) -> u64 {
        self.start - 1
    }

    #[must_use]
    pub const fn limit(self) -> u64 {
        self.end - self.start + 1
    }
}

///
/// Aggregate
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Aggregate {
    /// `COUNT(*)`, exposed as `COUNT_COLUMN`.
    Count,
    Sum(String),
    Max(String),
    Min(String),
}

impl Aggregate {
    const fn function(&self) -> &'static str {
        match self {
            Self::Count => "COUNT",
            Self::Sum(_) => "SUM",
            Self::Max(_) => "MAX",
            Self::Min(_) => "MIN",
        }
    }

    fn column(&self) -> Option<&str> {
        match self {
            Self::Count => None,
            Self::Sum(c) | Self::Max(c) | Self::Min(c) => Some(c),
        }
    }
}

///
/// Assignment
///
/// One `SET` entry of an update, by column position.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Assignment {
    Set(usize, Value),

    /// `[c]=[c]+1`, evaluated by the store.
    Increment(usize),
}

///
/// JunctionFilter
///
/// Restricts a select to rows paired with `owner_key` in a junction table.
///

#[derive(Clone, Debug, PartialEq)]
pub struct JunctionFilter {
    pub junction: &'static str,
    pub owner_column: &'static str,
    pub related_column: &'static str,
    pub owner_key: Value,
}

///
/// SelectPlan
///

#[derive(Clone, Debug)]
pub struct SelectPlan<'q> {
    pub condition: &'q Condition,
    pub order: &'q OrderBy,
    pub range: Option<RowRange>,
    pub distinct: bool,
    pub keys_only: bool,
    pub junction: Option<JunctionFilter>,
}

impl<'q> SelectPlan<'q> {
    #[must_use]
    pub const fn new(condition: &'q Condition, order: &'q OrderBy) -> Self {
        Self {
            condition,
            order,
            range: None,
            distinct: false,
            keys_only: false,
            junction: None,
        }
    }

    #[must_use]
    pub const fn range(mut self, range: Option<RowRange>) -> Self {
        self.range = range;
        self
    }

    #[must_use]
    pub const fn distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }

    #[must_use]
    pub const fn keys_only(mut self) -> Self {
        self.keys_only = true;
        self
    }

    #[must_use]
    pub fn junction(mut self, junction: JunctionFilter) -> Self {
        self.junction = Some(junction);
        self
    }
}

// ============================================================================
// STATEMENTS
// ============================================================================

/// Compile a row select, with optional DISTINCT and paging.
pub fn select(
    dialect: Dialect,
    table: &TableDescriptor,
    plan: &SelectPlan<'_>,
) -> Result<SqlStatement, InternalError> {
    let mut c = Compiler::new(dialect, table);
    let filter = c.where_clause(plan.condition, plan.junction.as_ref())?;
    let columns = c.select_list(plan.keys_only);
    let from = c.quote(table.name());
    let distinct = if plan.distinct { "DISTINCT " } else { "" };

    let Some(range) = plan.range else {
        let order = c.order_clause(plan.order, Names::Physical)?;
        return Ok(c.finish(format!(
            "SELECT {distinct}{columns} FROM {from}{filter}{order};"
        )));
    };

    if plan.order.is_empty() {
        return Err(InternalError::mapping(
            ErrorOrigin::Compile,
            MappingError::UnorderedPaging {
                table: table.name().to_string(),
            },
        ));
    }

    let text = match dialect.paging() {
        PagingStyle::LimitOffset => {
            let order = c.order_list(plan.order, Names::Physical)?;
            format!(
                "SELECT {distinct}{columns} FROM {from}{filter} ORDER BY {order} LIMIT {} OFFSET {};",
                range.limit(),
                range.offset()
            )
        }
        PagingStyle::RowNumber => {
            let outer = c.logical_list(plan.keys_only);
            let (inner_columns, order, source) = if plan.distinct {
                (
                    outer.clone(),
                    c.order_list(plan.order, Names::Logical)?,
                    format!("(SELECT DISTINCT {columns} FROM {from}{filter}) AS D"),
                )
            } else {
                (
                    columns,
                    c.order_list(plan.order, Names::Physical)?,
                    format!("{from}{filter}"),
                )
            };
            format!(
                "SELECT {outer} FROM (SELECT {inner_columns}, ROW_NUMBER() OVER (ORDER BY {order}) AS {ROW_NUMBER_COLUMN} FROM {source}) AS T WHERE T.{ROW_NUMBER_COLUMN} >= {} AND T.{ROW_NUMBER_COLUMN} <= {} ORDER BY T.{ROW_NUMBER_COLUMN};",
                range.start(),
                range.end()
            )
        }
    };

    Ok(c.finish(text))
}

/// Compile `SELECT COUNT(*)`, over distinct rows when `distinct` is set.
pub fn count(
    dialect: Dialect,
    table: &TableDescriptor,
    condition: &Condition,
    distinct: bool,
) -> Result<SqlStatement, InternalError> {
    let mut c = Compiler::new(dialect, table);
    let filter = c.where_clause(condition, None)?;
    let from = c.quote(table.name());

    let text = if distinct {
        let columns = c.select_list(false);
        format!(
            "SELECT COUNT(*) AS {COUNT_COLUMN} FROM (SELECT DISTINCT {columns} FROM {from}{filter}) AS D;"
        )
    } else {
        format!("SELECT COUNT(*) AS {COUNT_COLUMN} FROM {from}{filter};")
    };

    Ok(c.finish(text))
}

/// Compile a single-value aggregate such as `SELECT MAX([Id]) AS [Id] FROM [People];`.
pub fn aggregate(
    dialect: Dialect,
    table: &TableDescriptor,
    condition: &Condition,
    aggregate: &Aggregate,
) -> Result<SqlStatement, InternalError> {
    let mut c = Compiler::new(dialect, table);
    let filter = c.where_clause(condition, None)?;
    let from = c.quote(table.name());
    let expr = c.aggregate_expr(aggregate)?;

    Ok(c.finish(format!("SELECT {expr} FROM {from}{filter};")))
}

/// Compile a grouped aggregate: key column first, aggregate second.
pub fn group(
    dialect: Dialect,
    table: &TableDescriptor,
    condition: &Condition,
    key: &str,
    aggregate: &Aggregate,
    order: &OrderBy,
) -> Result<SqlStatement, InternalError> {
    let mut c = Compiler::new(dialect, table);
    let key = c.column(key)?;
    let filter = c.where_clause(condition, None)?;
    let from = c.quote(table.name());
    let expr = c.aggregate_expr(aggregate)?;
    let order = c.order_clause(order, Names::Logical)?;

    let selected = c.aliased(key);
    let grouped = c.quote(key.column);
    let text = format!("SELECT {selected},{expr} FROM {from}{filter} GROUP BY {grouped}{order};");

    Ok(c.finish(text))
}

/// Compile an insert of every column; a database-generated key is omitted and
/// the dialect's identity retrieval follows on its own line.
pub fn insert(
    dialect: Dialect,
    table: &TableDescriptor,
    values: &[Value],
) -> Result<SqlStatement, InternalError> {
    check_arity(table, values)?;

    let mut c = Compiler::new(dialect, table);
    let generated = table.is_generated_key();
    let mut columns = Vec::new();
    let mut placeholders = Vec::new();

    for (column, value) in table.columns().iter().zip(values) {
        if generated && column.is_key() {
            continue;
        }
        columns.push(c.quote(column.column));
        placeholders.push(c.bind(column.name, value.clone()));
    }

    let from = c.quote(table.name());
    let mut text = if columns.is_empty() {
        format!("INSERT INTO {from} DEFAULT VALUES;")
    } else {
        format!(
            "INSERT INTO {from} ({}) VALUES ({});",
            columns.join(","),
            placeholders.join(",")
        )
    };
    if generated {
        text.push('\n');
        text.push_str(dialect.identity_select());
    }

    Ok(c.finish(text))
}

/// Compile an update keyed on `key`; `lock` adds the optimistic version check.
pub fn update(
    dialect: Dialect,
    table: &TableDescriptor,
    assignments: &[Assignment],
    key: &[Value],
    lock: Option<&Value>,
) -> Result<SqlStatement, InternalError> {
    let mut c = Compiler::new(dialect, table);
    let mut sets = Vec::with_capacity(assignments.len());

    for assignment in assignments {
        match assignment {
            Assignment::Set(index, value) => {
                let column = &table.columns()[*index];
                let placeholder = c.bind(column.name, value.clone());
                sets.push(format!("{}={placeholder}", c.quote(column.column)));
            }
            Assignment::Increment(index) => {
                let quoted = c.quote(table.columns()[*index].column);
                sets.push(format!("{quoted}={quoted}+1"));
            }
        }
    }

    let mut filter = key_condition(table, key, "update")?;
    if let (Some(index), Some(version)) = (table.lock_version_index(), lock) {
        filter = filter.and(col(table.columns()[index].name).eq(version.clone()));
    }
    let filter = c.condition(&filter)?.unwrap_or_default();
    let from = c.quote(table.name());

    Ok(c.finish(format!(
        "UPDATE {from} SET {} WHERE {filter};",
        sets.join(",")
    )))
}

/// Compile a delete keyed on `key`.
pub fn delete(
    dialect: Dialect,
    table: &TableDescriptor,
    key: &[Value],
) -> Result<SqlStatement, InternalError> {
    let mut c = Compiler::new(dialect, table);
    let filter = key_condition(table, key, "delete")?;
    let filter = c.condition(&filter)?.unwrap_or_default();
    let from = c.quote(table.name());

    Ok(c.finish(format!("DELETE FROM {from} WHERE {filter};")))
}

/// Compile removal of every junction row paired with the filter's owner key.
pub fn junction_delete(
    dialect: Dialect,
    owner: &TableDescriptor,
    link: &JunctionFilter,
) -> SqlStatement {
    let mut c = Compiler::new(dialect, owner);
    let placeholder = c.bind(link.owner_column, link.owner_key.clone());
    let text = format!(
        "DELETE FROM {} WHERE {} = {placeholder};",
        c.quote(link.junction),
        c.quote(link.owner_column)
    );

    c.finish(text)
}

/// Compile one junction row pairing the filter's owner key with `related_key`.
pub fn junction_insert(
    dialect: Dialect,
    owner: &TableDescriptor,
    link: &JunctionFilter,
    related_key: Value,
) -> SqlStatement {
    let mut c = Compiler::new(dialect, owner);
    let owner_param = c.bind(link.owner_column, link.owner_key.clone());
    let related_param = c.bind(link.related_column, related_key);
    let text = format!(
        "INSERT INTO {} ({},{}) VALUES ({owner_param},{related_param});",
        c.quote(link.junction),
        c.quote(link.owner_column),
        c.quote(link.related_column)
    );

    c.finish(text)
}

/// Render only a condition, for inspection and raw composition.
pub fn condition(
    dialect: Dialect,
    table: &TableDescriptor,
    condition: &Condition,
) -> Result<SqlStatement, InternalError> {
    let mut c = Compiler::new(dialect, table);
    let text = c.condition(condition)?.unwrap_or_default();

    Ok(c.finish(text))
}

/// Equality on every key column, in key order.
pub(crate) fn key_condition(
    table: &TableDescriptor,
    key: &[Value],
    operation: &'static str,
) -> Result<Condition, InternalError> {
    let count = table.key_indexes().len();
    if count == 0 || key.len() != count {
        return Err(InternalError::mapping(
            ErrorOrigin::Compile,
            MappingError::KeyArity {
                table: table.name().to_string(),
                operation,
                count,
            },
        ));
    }

    Ok(all(table
        .key_columns()
        .zip(key)
        .map(|(column, value)| col(column.name).eq(value.clone()))))
}

fn check_arity(table: &TableDescriptor, values: &[Value]) -> Result<(), InternalError> {
    if values.len() == table.columns().len() {
        return Ok(());
    }

    Err(InternalError::mapping(
        ErrorOrigin::Compile,
        MappingError::ValueArity {
            entity: table.entity().to_string(),
            expected: table.columns().len(),
            found: values.len(),
        },
    ))
}

// ============================================================================
// COMPILER
// ============================================================================

///
/// Names
///
/// Which side of the alias an ORDER BY refers to.
///

#[derive(Clone, Copy)]
enum Names {
    Physical,
    Logical,
}

///
/// Compiler
///
/// Per-statement rendering state: the dialect, the table columns resolve
/// against, and parameters bound so far.
///

struct Compiler<'a> {
    dialect: Dialect,
    table: &'a TableDescriptor,
    params: Vec<SqlParam>,
}

impl<'a> Compiler<'a> {
    const fn new(dialect: Dialect, table: &'a TableDescriptor) -> Self {
        Self {
            dialect,
            table,
            params: Vec::new(),
        }
    }

    fn finish(self, text: String) -> SqlStatement {
        SqlStatement::with_params(text, self.params)
    }

    fn bind(&mut self, logical: &str, value: Value) -> String {
        let name = format!(
            "{}{logical}_{}",
            self.dialect.param_prefix(),
            self.params.len()
        );
        self.params.push(SqlParam {
            name: name.clone(),
            value,
        });

        name
    }

    fn quote(&self, name: &str) -> String {
        self.dialect.quote(name)
    }

    fn column(&self, name: &str) -> Result<&'a ColumnDescriptor, InternalError> {
        self.table.require_column(name, ErrorOrigin::Compile)
    }

    // `[phys] AS [logical]` when aliased, `[phys]` otherwise.
    fn aliased(&self, column: &ColumnDescriptor) -> String {
        if column.is_aliased() {
            format!("{} AS {}", self.quote(column.column), self.quote(column.name))
        } else {
            self.quote(column.column)
        }
    }

    fn projected(&self, keys_only: bool) -> Vec<&'a ColumnDescriptor> {
        let table = self.table;
        if keys_only {
            table.key_columns().collect()
        } else {
            table.columns().iter().collect()
        }
    }

    fn select_list(&self, keys_only: bool) -> String {
        self.projected(keys_only)
            .into_iter()
            .map(|column| self.aliased(column))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn logical_list(&self, keys_only: bool) -> String {
        self.projected(keys_only)
            .into_iter()
            .map(|column| self.quote(column.name))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn column_ref(
        &self,
        expr: &ColumnExpr,
    ) -> Result<(String, &'a ColumnDescriptor), InternalError> {
        let column = self.column(expr.name())?;
        let quoted = self.quote(column.column);
        let rendered = match expr.function() {
            Some(function) => format!("{}({quoted})", function.sql()),
            None => quoted,
        };

        Ok((rendered, column))
    }

    fn aggregate_expr(&self, aggregate: &Aggregate) -> Result<String, InternalError> {
        match aggregate.column() {
            None => Ok(format!("COUNT(*) AS {COUNT_COLUMN}")),
            Some(name) => {
                let column = self.column(name)?;
                Ok(format!(
                    "{}({}) AS {}",
                    aggregate.function(),
                    self.quote(column.column),
                    self.quote(column.name)
                ))
            }
        }
    }

    // ---- Ordering ----

    fn order_list(&self, order: &OrderBy, names: Names) -> Result<String, InternalError> {
        let mut terms = Vec::with_capacity(order.terms().len());
        for term in order.terms() {
            let target = if term.column == COUNT_COLUMN {
                COUNT_COLUMN.to_string()
            } else {
                let column = self.column(&term.column)?;
                match names {
                    Names::Physical => self.quote(column.column),
                    Names::Logical => self.quote(column.name),
                }
            };
            terms.push(format!("{target} {}", term.direction.sql()));
        }

        Ok(terms.join(","))
    }

    fn order_clause(&self, order: &OrderBy, names: Names) -> Result<String, InternalError> {
        if order.is_empty() {
            return Ok(String::new());
        }

        Ok(format!(" ORDER BY {}", self.order_list(order, names)?))
    }

    // ---- Conditions ----

    fn where_clause(
        &mut self,
        condition: &Condition,
        junction: Option<&JunctionFilter>,
    ) -> Result<String, InternalError> {
        let rendered = self.condition(condition)?;
        let junction = junction
            .map(|filter| self.junction(filter))
            .transpose()?;

        Ok(match (rendered, junction) {
            (Some(a), Some(b)) => format!(" WHERE ({a}) AND ({b})"),
            (Some(one), None) | (None, Some(one)) => format!(" WHERE {one}"),
            (None, None) => String::new(),
        })
    }

    fn junction(&mut self, filter: &JunctionFilter) -> Result<String, InternalError> {
        let (_, key) = self.table.single_key("relation load", ErrorOrigin::Relation)?;
        let key = self.quote(key.column);
        let related = self.quote(filter.related_column);
        let junction = self.quote(filter.junction);
        let owner = self.quote(filter.owner_column);
        let placeholder = self.bind(filter.owner_column, filter.owner_key.clone());

        Ok(format!(
            "{key} IN (SELECT {related} FROM {junction} WHERE {owner} = {placeholder})"
        ))
    }

    fn condition(&mut self, condition: &Condition) -> Result<Option<String>, InternalError> {
        let sql = match condition {
            Condition::Empty => return Ok(None),
            Condition::And(left, right) => return self.combine(left, right, "AND"),
            Condition::Or(left, right) => return self.combine(left, right, "OR"),
            Condition::Not(inner) => match self.condition(inner)? {
                Some(inner) => format!("NOT ({inner})"),
                None => return Ok(None),
            },
            Condition::Compare {
                column,
                op,
                operand,
            } => self.compare(column, *op, operand)?,
            Condition::Like { column, pattern } => {
                let (lhs, descriptor) = self.column_ref(column)?;
                let placeholder = self.bind(descriptor.name, Value::Text(pattern.clone()));
                format!("{lhs} LIKE {placeholder}")
            }
            Condition::IsNull { column } => format!("{} IS NULL", self.column_ref(column)?.0),
            Condition::IsNotNull { column } => {
                format!("{} IS NOT NULL", self.column_ref(column)?.0)
            }
            Condition::In { column, values } => {
                let (lhs, descriptor) = self.column_ref(column)?;
                if values.is_empty() {
                    "1 = 0".to_string()
                } else {
                    let placeholders = values
                        .iter()
                        .map(|value| self.bind(descriptor.name, value.clone()))
                        .collect::<Vec<_>>();
                    format!("{lhs} IN ({})", placeholders.join(","))
                }
            }
        };

        Ok(Some(sql))
    }

    fn combine(
        &mut self,
        left: &Condition,
        right: &Condition,
        keyword: &str,
    ) -> Result<Option<String>, InternalError> {
        let left = self.condition(left)?;
        let right = self.condition(right)?;

        Ok(match (left, right) {
            (Some(a), Some(b)) => Some(format!("({a}) {keyword} ({b})")),
            (one, None) | (None, one) => one,
        })
    }

    fn compare(
        &mut self,
        column: &ColumnExpr,
        op: CompareOp,
        operand: &Operand,
    ) -> Result<String, InternalError> {
        let (lhs, descriptor) = self.column_ref(column)?;

        match operand {
            Operand::Column(other) => {
                let (rhs, _) = self.column_ref(other)?;
                Ok(format!("{lhs} {} {rhs}", op.sql()))
            }
            Operand::Value(Value::Null) => match op {
                CompareOp::Eq => Ok(format!("{lhs} IS NULL")),
                CompareOp::Ne => Ok(format!("{lhs} IS NOT NULL")),
                _ => Err(InternalError::mapping(
                    ErrorOrigin::Compile,
                    MappingError::NullComparison {
                        column: column.name().to_string(),
                        op: op.sql(),
                    },
                )),
            },
            Operand::Value(value) => {
                let placeholder = self.bind(descriptor.name, value.clone());
                Ok(format!("{lhs} {} {placeholder}", op.sql()))
            }
        }
    }
}
