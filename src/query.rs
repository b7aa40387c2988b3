//! SELECT and aggregation builders.
//!
//! The selection walker turns `true` picks into aliased columns, lowers
//! computed expressions, and descends into nested selections through the
//! join planner. Nested output columns are aliased by their dotted path
//! (`"posts.title"`), so a row deserializes unambiguously.

use crate::ast::{
    AggregateTarget, AggregationQuery, Selection, SelectionValue, SelectQuery,
};
use crate::dialect::SqlDialect;
use crate::error::{Error, Result};
use crate::lowering::condition::implicit_table_conditions;
use crate::lowering::{lower_condition, lower_expression, resolve_field, Lowered, ParserState};

/// Assemble a SELECT statement.
pub fn build_select_query(query: &SelectQuery, state: &mut ParserState) -> Result<String> {
    let root = state.root_table.clone();

    let mut items = Vec::new();
    walk_selection(&query.selection, &root, "", state, &mut items)?;
    if items.is_empty() {
        return Err(Error::EmptySelection);
    }

    let where_clause = build_where(query.condition.as_ref(), &root, state)?;

    let from = from_table(state);
    let mut sql = format!("SELECT {} FROM {}", items.join(", "), from);
    for join in &state.joins {
        sql.push(' ');
        sql.push_str(join);
    }
    if let Some(where_clause) = where_clause {
        sql.push_str(" WHERE ");
        sql.push_str(&where_clause);
    }
    if let Some(pagination) = state.dialect.limit_clause(query.limit, query.offset) {
        sql.push(' ');
        sql.push_str(&pagination);
    }
    Ok(sql)
}

/// Assemble a GROUP BY + aggregates statement.
pub fn build_aggregation_query(query: &AggregationQuery, state: &mut ParserState) -> Result<String> {
    let root = state.root_table.clone();

    let mut group_columns = Vec::with_capacity(query.group_by.len());
    let mut items = Vec::with_capacity(query.group_by.len() + query.aggregated_fields.len());
    for path in &query.group_by {
        let typed = resolve_field(path, &root, state)?;
        items.push(format!(
            "{} AS {}",
            typed.sql,
            state.dialect.quote_alias(path)
        ));
        group_columns.push(typed.sql);
    }

    for (alias, aggregated) in &query.aggregated_fields {
        let inner = match &aggregated.field {
            AggregateTarget::Star => "*".to_string(),
            AggregateTarget::Path(path) => resolve_field(path, &root, state)?.sql,
            AggregateTarget::Expression(expr) => lower_expression(expr, &root, state)?.sql,
        };
        items.push(format!(
            "{}({}) AS {}",
            aggregated.operator.sql_name(),
            inner,
            state.dialect.quote_alias(alias)
        ));
    }

    let where_clause = build_where(query.condition.as_ref(), &root, state)?;

    let from = from_table(state);
    let mut sql = format!("SELECT {} FROM {}", items.join(", "), from);
    for join in &state.joins {
        sql.push(' ');
        sql.push_str(join);
    }
    if let Some(where_clause) = where_clause {
        sql.push_str(" WHERE ");
        sql.push_str(&where_clause);
    }
    if !group_columns.is_empty() {
        sql.push_str(" GROUP BY ");
        sql.push_str(&group_columns.join(", "));
    }
    Ok(sql)
}

fn from_table(state: &ParserState) -> String {
    match &state.config.data_table {
        Some(data_table) => data_table.table.clone(),
        None => state.root_table.clone(),
    }
}

/// The data-table discriminator and constraints, ANDed with the caller's
/// condition. A condition folding to FALSE is emitted literally: the query
/// is valid SQL that matches nothing.
fn build_where(
    condition: Option<&crate::ast::Condition>,
    root: &str,
    state: &mut ParserState,
) -> Result<Option<String>> {
    let mut parts = implicit_table_conditions(root, state)?;
    if let Some(condition) = condition {
        match lower_condition(condition, root, state)? {
            Lowered::Const(true) => {}
            other => parts.push(other.into_sql()),
        }
    }
    Ok(if parts.is_empty() {
        None
    } else {
        Some(parts.join(" AND "))
    })
}

fn walk_selection(
    selection: &Selection,
    current: &str,
    prefix: &str,
    state: &mut ParserState,
    items: &mut Vec<String>,
) -> Result<()> {
    for (key, value) in &selection.fields {
        match value {
            SelectionValue::Include(false) => {}
            SelectionValue::Include(true) => {
                let typed = resolve_field(key, current, state)?;
                let alias = format!("{}{}", prefix, key);
                items.push(format!(
                    "{} AS {}",
                    typed.sql,
                    state.dialect.quote_alias(&alias)
                ));
            }
            SelectionValue::Expression(expr) => {
                let typed = lower_expression(expr, current, state)?;
                let alias = format!("{}{}", prefix, key);
                items.push(format!(
                    "{} AS {}",
                    typed.sql,
                    state.dialect.quote_alias(&alias)
                ));
            }
            SelectionValue::Nested(nested) => {
                let effective = state.ensure_join(current, key)?;
                let nested_prefix = format!("{}{}.", prefix, key);
                walk_selection(nested, &effective, &nested_prefix, state, items)?;
            }
        }
    }
    Ok(())
}
