//! INSERT, UPDATE, and DELETE builders.
//!
//! All three share the two-phase condition handling: the condition is first
//! folded against the incoming row by [`crate::eval`], then the residual
//! (if any) lowers into a WHERE clause. INSERT conditions must be fully
//! decidable from the new row - a surviving residual is an error.
//!
//! Mutations embed literals: the returned statement never carries
//! parameters.

use crate::ast::{Condition, DeleteQuery, Expr, InsertQuery, Primitive, UpdateQuery};
use crate::config::{Field, SemanticType};
use crate::dialect::SqlDialect;
use crate::error::{Error, MutationKind, Result};
use crate::eval::{evaluate, EvalContext, Outcome};
use crate::lowering::{lower_condition, lower_expression, Lowered, ParserState};
use crate::validation;

// ============================================================================
// INSERT
// ============================================================================

/// Assemble an INSERT statement.
///
/// Columns appear in the caller's order, followed by materialized defaults
/// in schema order. Non-nullable fields without a value or default are
/// rejected, as are unknown fields.
pub fn build_insert_query(query: &InsertQuery, state: &mut ParserState) -> Result<String> {
    if state.config.data_table.is_some() {
        return Err(Error::DataTableUnsupported("INSERT"));
    }
    let table = query.table.clone();

    // Any residual references a stored row, which an INSERT cannot see.
    if check_condition(
        query.condition.as_ref(),
        MutationKind::Insert,
        &table,
        &query.new_row,
        state,
    )?
    .is_some()
    {
        return Err(Error::ForbiddenExistingRowEvaluationOnInsert);
    }

    let mut columns = Vec::with_capacity(query.new_row.len());
    let mut values = Vec::with_capacity(query.new_row.len());
    for (name, expr) in &query.new_row {
        let field = state.config.field(&table, name)?.clone();
        columns.push(name.clone());
        values.push(lower_row_value(&field, expr, &table, state)?);
    }

    // Defaults for omitted fields, in schema order.
    let declared = state.config.table(&table)?.allowed_fields.clone();
    for field in &declared {
        if columns.iter().any(|c| c == &field.name) {
            continue;
        }
        if let Some(raw) = &field.default {
            let mut path = crate::diagnostics::JsonPath::root("default");
            let expr = crate::ast::parse::expression(raw, &mut path)?;
            columns.push(field.name.clone());
            values.push(lower_row_value(field, &expr, &table, state)?);
        }
    }

    for field in &declared {
        if !field.nullable && !columns.iter().any(|c| c == &field.name) {
            return Err(Error::MissingField {
                table: table.clone(),
                field: field.name.clone(),
            });
        }
    }

    let quoted: Vec<String> = columns
        .iter()
        .map(|c| state.dialect.quote_alias(c))
        .collect();
    Ok(format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        quoted.join(", "),
        values.join(", ")
    ))
}

// ============================================================================
// UPDATE
// ============================================================================

/// Assemble an UPDATE statement with `SET "col" = expr` entries and the
/// residual condition as WHERE.
pub fn build_update_query(query: &UpdateQuery, state: &mut ParserState) -> Result<String> {
    if state.config.data_table.is_some() {
        return Err(Error::DataTableUnsupported("UPDATE"));
    }
    let table = query.table.clone();

    let residual = check_condition(
        query.condition.as_ref(),
        MutationKind::Update,
        &table,
        &query.changes,
        state,
    )?;

    let mut assignments = Vec::with_capacity(query.changes.len());
    for (name, expr) in &query.changes {
        let field = state.config.field(&table, name)?.clone();
        let value = lower_row_value(&field, expr, &table, state)?;
        assignments.push(format!(
            "{} = {}",
            state.dialect.quote_alias(name),
            value
        ));
    }

    let where_clause = lower_residual(residual, MutationKind::Update, &table, state)?;

    let mut sql = format!("UPDATE {} SET {}", table, assignments.join(", "));
    if let Some(where_clause) = where_clause {
        sql.push_str(" WHERE ");
        sql.push_str(&where_clause);
    }
    Ok(sql)
}

// ============================================================================
// DELETE
// ============================================================================

/// Assemble a DELETE statement.
pub fn build_delete_query(query: &DeleteQuery, state: &mut ParserState) -> Result<String> {
    if state.config.data_table.is_some() {
        return Err(Error::DataTableUnsupported("DELETE"));
    }
    let table = query.table.as_str();
    state.config.table(table)?;

    let residual = check_condition(
        query.condition.as_ref(),
        MutationKind::Delete,
        table,
        &[],
        state,
    )?;
    let where_clause = lower_residual(residual, MutationKind::Delete, table, state)?;

    let mut sql = format!("DELETE FROM {}", table);
    if let Some(where_clause) = where_clause {
        sql.push_str(" WHERE ");
        sql.push_str(&where_clause);
    }
    Ok(sql)
}

// ============================================================================
// Shared pieces
// ============================================================================

/// Phase one: fold the condition against the new row. `Ok(None)` means
/// proceed without WHERE; `Ok(Some(_))` carries the residual.
fn check_condition(
    condition: Option<&Condition>,
    kind: MutationKind,
    table: &str,
    new_row: &[(String, Expr)],
    state: &ParserState,
) -> Result<Option<Condition>> {
    let Some(condition) = condition else {
        return Ok(None);
    };
    let ctx = EvalContext {
        config: state.config,
        table,
        kind,
        new_row,
    };
    match evaluate(condition, &ctx)? {
        Outcome::True => Ok(None),
        Outcome::False => Err(Error::ConditionNotMet(kind)),
        Outcome::Residual(residual) => Ok(Some(residual)),
    }
}

/// Phase two: lower the residual into WHERE. Folding to FALSE after
/// lowering (degenerate `$in`) is still a failed condition; relationship
/// traversal cannot appear in a mutation's WHERE.
fn lower_residual(
    residual: Option<Condition>,
    kind: MutationKind,
    table: &str,
    state: &mut ParserState,
) -> Result<Option<String>> {
    let Some(residual) = residual else {
        return Ok(None);
    };
    let lowered = lower_condition(&residual, table, state)?;
    if !state.joins.is_empty() {
        return Err(Error::MutationJoin);
    }
    match lowered {
        Lowered::Const(true) => Ok(None),
        Lowered::Const(false) => Err(Error::ConditionNotMet(kind)),
        Lowered::Sql(sql) => Ok(Some(sql)),
    }
}

/// Lower one row value, validating typed-literal strings against the
/// column's declared type and inserting the dialect cast (uuid columns
/// accept plain UUID strings, date/datetime columns plain ISO strings).
fn lower_row_value(
    field: &Field,
    expr: &Expr,
    table: &str,
    state: &mut ParserState,
) -> Result<String> {
    if let Expr::Value(Primitive::Null) = expr {
        if !field.nullable {
            return Err(Error::MissingField {
                table: table.to_string(),
                field: field.name.clone(),
            });
        }
        return Ok("NULL".to_string());
    }

    if let Expr::Value(Primitive::String(raw)) = expr {
        let cast_ty = match field.field_type {
            SemanticType::Uuid => {
                validation::ensure_uuid(raw)?;
                Some(SemanticType::Uuid)
            }
            SemanticType::Date => {
                validation::ensure_date(raw)?;
                Some(SemanticType::Date)
            }
            SemanticType::Datetime => {
                validation::ensure_timestamp(raw)?;
                Some(SemanticType::Datetime)
            }
            _ => None,
        };
        if let Some(ty) = cast_ty {
            let literal = state.dialect.quote_string(raw);
            return Ok(state.dialect.cast_literal(&literal, ty));
        }
    }

    Ok(lower_expression(expr, table, state)?.sql)
}
