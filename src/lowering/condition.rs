//! Condition lowering: logical combinators, field-operator expansion,
//! EXISTS sub-query synthesis, and NULL-aware equality.
//!
//! Boolean literals fold at compile time and surface up through the
//! combinators (`$and: [true, X]` is `X`; `$and: [false, X]` is FALSE).

use super::expr::{cast_sides, emit_comparison, lower_expression};
use super::fields::resolve_field;
use super::{ParserState, Typed};
use crate::ast::{CompareOp, Condition, Expr, FieldCondition, OpRhs, Primitive};
use crate::config::SemanticType;
use crate::diagnostics::JsonPath;
use crate::dialect::SqlDialect;
use crate::error::{Error, Result};

/// A lowered condition: a compile-time constant or a SQL fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum Lowered {
    Const(bool),
    Sql(String),
}

impl Lowered {
    pub fn into_sql(self) -> String {
        match self {
            Lowered::Const(true) => "TRUE".to_string(),
            Lowered::Const(false) => "FALSE".to_string(),
            Lowered::Sql(sql) => sql,
        }
    }
}

/// AND-combine already-lowered children, folding constants. Single
/// survivors stay unparenthesized; combined groups get one pair of parens.
fn fold_and(children: Vec<Lowered>) -> Lowered {
    let mut parts = Vec::with_capacity(children.len());
    for child in children {
        match child {
            Lowered::Const(false) => return Lowered::Const(false),
            Lowered::Const(true) => {}
            Lowered::Sql(sql) => parts.push(sql),
        }
    }
    match parts.len() {
        0 => Lowered::Const(true),
        1 => Lowered::Sql(parts.pop().expect("len checked above")),
        _ => Lowered::Sql(format!("({})", parts.join(" AND "))),
    }
}

fn fold_or(children: Vec<Lowered>) -> Lowered {
    let mut parts = Vec::with_capacity(children.len());
    for child in children {
        match child {
            Lowered::Const(true) => return Lowered::Const(true),
            Lowered::Const(false) => {}
            Lowered::Sql(sql) => parts.push(sql),
        }
    }
    match parts.len() {
        0 => Lowered::Const(false),
        1 => Lowered::Sql(parts.pop().expect("len checked above")),
        _ => Lowered::Sql(format!("({})", parts.join(" OR "))),
    }
}

/// Lower a condition tree in the context of `current`.
pub fn lower_condition(
    condition: &Condition,
    current: &str,
    state: &mut ParserState,
) -> Result<Lowered> {
    match condition {
        Condition::Bool(b) => Ok(Lowered::Const(*b)),

        Condition::And(children) => {
            let lowered = children
                .iter()
                .map(|child| lower_condition(child, current, state))
                .collect::<Result<Vec<_>>>()?;
            Ok(fold_and(lowered))
        }

        Condition::Or(children) => {
            let lowered = children
                .iter()
                .map(|child| lower_condition(child, current, state))
                .collect::<Result<Vec<_>>>()?;
            Ok(fold_or(lowered))
        }

        Condition::Not(child) => match lower_condition(child, current, state)? {
            Lowered::Const(b) => Ok(Lowered::Const(!b)),
            Lowered::Sql(sql) => Ok(Lowered::Sql(format!("NOT ({})", sql))),
        },

        Condition::Exists { table, condition } => lower_exists(table, condition, state),

        Condition::Field { path, condition } => {
            lower_field_condition(path, condition, current, state)
        }

        Condition::Expression(expr) => {
            let typed = lower_expression(expr, current, state)?;
            if !matches!(typed.ty, SemanticType::Boolean | SemanticType::Unknown) {
                return Err(Error::NonBooleanCondition {
                    ty: typed.ty.to_string(),
                });
            }
            Ok(Lowered::Sql(typed.sql))
        }
    }
}

// =============================================================================
// EXISTS
// =============================================================================

fn lower_exists(table: &str, condition: &Condition, state: &mut ParserState) -> Result<Lowered> {
    let mut child = state.subquery(table)?;

    let result = (|| {
        let implicit = implicit_table_conditions(table, &mut child)?;
        let inner = lower_condition(condition, table, &mut child)?;
        let from = match &child.config.data_table {
            Some(data_table) => data_table.table.clone(),
            None => table.to_string(),
        };

        let inner_sql = match inner {
            Lowered::Const(false) => return Ok(Lowered::Const(false)),
            Lowered::Const(true) => None,
            Lowered::Sql(sql) => Some(sql),
        };

        let mut where_parts = implicit;
        where_parts.extend(inner_sql);

        let mut sql = format!("EXISTS (SELECT 1 FROM {}", from);
        for join in &child.joins {
            sql.push(' ');
            sql.push_str(join);
        }
        if !where_parts.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_parts.join(" AND "));
        }
        sql.push(')');
        Ok(Lowered::Sql(sql))
    })();

    let lowered = result?;
    state.absorb(child);
    Ok(lowered)
}

/// Implicit predicates for a logical table under a data-table config: the
/// `table_field` discriminator plus the table's declared constraints.
pub fn implicit_table_conditions(table: &str, state: &mut ParserState) -> Result<Vec<String>> {
    let Some(data_table) = state.config.data_table.clone() else {
        return Ok(Vec::new());
    };

    let mut parts = vec![format!(
        "{}.{} = {}",
        data_table.table,
        data_table.table_field,
        state.dialect.quote_string(table)
    )];

    if let Some(raw) = state.config.table(table)?.constraints.clone() {
        let mut path = JsonPath::root("constraints");
        let parsed = crate::ast::parse::condition(&raw, &mut path)?;
        match lower_condition(&parsed, table, state)? {
            Lowered::Const(true) => {}
            other => parts.push(other.into_sql()),
        }
    }

    Ok(parts)
}

// =============================================================================
// Field conditions
// =============================================================================

fn lower_field_condition(
    path: &str,
    condition: &FieldCondition,
    current: &str,
    state: &mut ParserState,
) -> Result<Lowered> {
    let lhs = resolve_field(path, current, state)?;

    let mut clauses = Vec::with_capacity(condition.ops.len());
    for (op, rhs) in condition.sorted_ops() {
        clauses.push(lower_field_operator(&lhs, *op, rhs, current, state)?);
    }
    Ok(fold_and(clauses))
}

fn lower_field_operator(
    lhs: &Typed,
    op: CompareOp,
    rhs: &OpRhs,
    current: &str,
    state: &mut ParserState,
) -> Result<Lowered> {
    match (op, rhs) {
        // NULL-aware equality.
        (CompareOp::Eq, OpRhs::One(Expr::Value(Primitive::Null))) => {
            Ok(Lowered::Sql(format!("{} IS NULL", lhs.sql)))
        }
        (CompareOp::Ne, OpRhs::One(Expr::Value(Primitive::Null))) => {
            Ok(Lowered::Sql(format!("{} IS NOT NULL", lhs.sql)))
        }

        (CompareOp::In, OpRhs::Many(elements)) | (CompareOp::Nin, OpRhs::Many(elements)) => {
            if elements.is_empty() {
                // IN () matches nothing; NOT IN () matches everything.
                return Ok(Lowered::Const(op == CompareOp::Nin));
            }
            let lowered = elements
                .iter()
                .map(|element| lower_expression(element, current, state))
                .collect::<Result<Vec<_>>>()?;
            let left = cast_sides(lhs, &lowered[0], state).0;
            let items: Vec<String> = lowered
                .iter()
                .map(|element| cast_sides(lhs, element, state).1)
                .collect();
            let keyword = if op == CompareOp::In { "IN" } else { "NOT IN" };
            Ok(Lowered::Sql(format!(
                "{} {} ({})",
                left,
                keyword,
                items.join(", ")
            )))
        }

        (_, OpRhs::One(expr)) => {
            let op_sql = match op {
                CompareOp::Eq => "=",
                CompareOp::Ne => "<>",
                CompareOp::Gt => ">",
                CompareOp::Gte => ">=",
                CompareOp::Lt => "<",
                CompareOp::Lte => "<=",
                CompareOp::Like => "LIKE",
                CompareOp::Ilike => state.dialect.ilike_operator(),
                CompareOp::Regex => state.dialect.regex_operator().ok_or_else(|| {
                    Error::UnsupportedByDialect {
                        name: "$regex".to_string(),
                        dialect: state.dialect.name(),
                    }
                })?,
                CompareOp::In | CompareOp::Nin => {
                    return Err(Error::Internal(
                        "array operator reached scalar lowering".to_string(),
                    ))
                }
            };
            let rhs = lower_expression(expr, current, state)?;
            Ok(Lowered::Sql(emit_comparison(lhs, op_sql, &rhs, state)))
        }

        (_, OpRhs::Many(_)) => Err(Error::Internal(
            "scalar operator received an array right-hand side".to_string(),
        )),
    }
}
