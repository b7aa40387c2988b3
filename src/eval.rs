//! Partial evaluation of mutation conditions against the in-memory new row.
//!
//! A second interpreter over the condition tree with a three-valued domain:
//! `True` (proceed), `False` (reject with "<Kind> condition not met"), or
//! `Residual` (the portion referencing stored columns, emitted as WHERE).
//! Combinators short-circuit: `And` with `True` returns the other side,
//! `And` with `False` is `False`, residuals recombine structurally.
//!
//! `NEW_ROW.<col>` resolves against the provided row. On INSERT a missing
//! column falls back to the field's default, then NULL; bare paths are
//! forbidden (`FORBIDDEN_EXISTING_ROW_EVALUATION_ON_INSERT`). On UPDATE a
//! `NEW_ROW` reference to an unchanged column rewrites to a residual over
//! the stored column, since the column keeps its stored value.

use regex::Regex;

use crate::ast::{CompareOp, Condition, Expr, FieldCondition, OpRhs, Primitive};
use crate::config::Config;
use crate::diagnostics::JsonPath;
use crate::error::{Error, MutationKind, Result};

// =============================================================================
// Outcome domain
// =============================================================================

/// The result of partially evaluating a condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    True,
    False,
    Residual(Condition),
}

// =============================================================================
// Evaluation context
// =============================================================================

/// Everything needed to fold a mutation condition.
#[derive(Debug)]
pub struct EvalContext<'a> {
    pub config: &'a Config,
    pub table: &'a str,
    pub kind: MutationKind,
    /// The incoming row (INSERT `newRow` or UPDATE `changes`), caller order.
    pub new_row: &'a [(String, Expr)],
}

impl<'a> EvalContext<'a> {
    /// The effective value of `NEW_ROW.<column>`, or `None` when it cannot
    /// be decided in memory (UPDATE of an unchanged column).
    fn new_row_value(&self, column: &str) -> Result<Option<Primitive>> {
        if let Some((_, expr)) = self.new_row.iter().find(|(name, _)| name == column) {
            let value = eval_scalar(expr, self.config)?
                .ok_or_else(|| Error::NotEvaluable(format!("NEW_ROW.{}", column)))?;
            return Ok(Some(value));
        }

        match self.kind {
            MutationKind::Insert => {
                let field = self.config.field(self.table, column)?;
                match &field.default {
                    Some(raw) => {
                        let mut path = JsonPath::root("default");
                        let expr = crate::ast::parse::expression(raw, &mut path)?;
                        let value = eval_scalar(&expr, self.config)?.ok_or_else(|| {
                            Error::NotEvaluable(format!("default for '{}'", column))
                        })?;
                        Ok(Some(value))
                    }
                    None => Ok(Some(Primitive::Null)),
                }
            }
            // An unchanged column keeps its stored value.
            _ => Ok(None),
        }
    }
}

/// Reduce an expression to a primitive when it is decidable without the
/// database: literals, typed literals, and variable lookups.
pub fn eval_scalar(expr: &Expr, config: &Config) -> Result<Option<Primitive>> {
    Ok(match expr {
        Expr::Value(primitive) => Some(primitive.clone()),
        Expr::Var(name) => Some(config.variable(name)?.clone()),
        Expr::Uuid(raw) | Expr::Date(raw) | Expr::Timestamp(raw) => {
            Some(Primitive::String(raw.clone()))
        }
        Expr::Field(_) | Expr::Jsonb(_) | Expr::Func { .. } | Expr::Cond { .. } => None,
    })
}

// =============================================================================
// Evaluator
// =============================================================================

/// Partially evaluate a mutation condition.
pub fn evaluate(condition: &Condition, ctx: &EvalContext) -> Result<Outcome> {
    match condition {
        Condition::Bool(true) => Ok(Outcome::True),
        Condition::Bool(false) => Ok(Outcome::False),

        Condition::And(children) => {
            let mut residuals = Vec::new();
            for child in children {
                match evaluate(child, ctx)? {
                    Outcome::False => return Ok(Outcome::False),
                    Outcome::True => {}
                    Outcome::Residual(cond) => residuals.push(cond),
                }
            }
            Ok(recombine(residuals, Outcome::True, Condition::And))
        }

        Condition::Or(children) => {
            let mut residuals = Vec::new();
            for child in children {
                match evaluate(child, ctx)? {
                    Outcome::True => return Ok(Outcome::True),
                    Outcome::False => {}
                    Outcome::Residual(cond) => residuals.push(cond),
                }
            }
            Ok(recombine(residuals, Outcome::False, Condition::Or))
        }

        Condition::Not(child) => Ok(match evaluate(child, ctx)? {
            Outcome::True => Outcome::False,
            Outcome::False => Outcome::True,
            Outcome::Residual(cond) => Outcome::Residual(Condition::Not(Box::new(cond))),
        }),

        // Subqueries always touch stored rows.
        Condition::Exists { .. } => Ok(Outcome::Residual(condition.clone())),

        Condition::Expression(expr) => match eval_scalar(expr, ctx.config)? {
            Some(Primitive::Bool(true)) => Ok(Outcome::True),
            Some(Primitive::Bool(false)) => Ok(Outcome::False),
            Some(other) => Err(Error::NonBooleanCondition {
                ty: primitive_kind(&other).to_string(),
            }),
            None => Ok(Outcome::Residual(condition.clone())),
        },

        Condition::Field { path, condition } => evaluate_field(path, condition, ctx),
    }
}

fn recombine(
    residuals: Vec<Condition>,
    empty: Outcome,
    combine: fn(Vec<Condition>) -> Condition,
) -> Outcome {
    let mut residuals = residuals;
    match residuals.len() {
        0 => empty,
        1 => Outcome::Residual(residuals.pop().expect("len checked above")),
        _ => Outcome::Residual(combine(residuals)),
    }
}

fn evaluate_field(path: &str, condition: &FieldCondition, ctx: &EvalContext) -> Result<Outcome> {
    let Some(column) = path.strip_prefix("NEW_ROW.") else {
        if path == "NEW_ROW" {
            return Err(Error::InvalidNewRowReference);
        }
        // A stored-column reference.
        return match ctx.kind {
            MutationKind::Insert => Err(Error::ForbiddenExistingRowEvaluationOnInsert),
            _ => Ok(Outcome::Residual(Condition::Field {
                path: path.to_string(),
                condition: condition.clone(),
            })),
        };
    };

    if ctx.kind == MutationKind::Delete {
        return Err(Error::InvalidNewRowReference);
    }
    if column.contains('.') || column.contains("->") {
        return Err(Error::NotEvaluable(format!("NEW_ROW.{}", column)));
    }
    ctx.config.field(ctx.table, column)?;

    let Some(value) = ctx.new_row_value(column)? else {
        // UPDATE of an unchanged column: defer to the stored value.
        return Ok(Outcome::Residual(Condition::Field {
            path: column.to_string(),
            condition: condition.clone(),
        }));
    };

    for (op, rhs) in &condition.ops {
        if !evaluate_operator(&value, *op, rhs, ctx)? {
            return Ok(Outcome::False);
        }
    }
    Ok(Outcome::True)
}

fn evaluate_operator(
    value: &Primitive,
    op: CompareOp,
    rhs: &OpRhs,
    ctx: &EvalContext,
) -> Result<bool> {
    let scalar = |expr: &Expr| -> Result<Primitive> {
        eval_scalar(expr, ctx.config)?.ok_or(match ctx.kind {
            MutationKind::Insert => Error::ForbiddenExistingRowEvaluationOnInsert,
            _ => Error::NotEvaluable(format!("operand of {}", op.key())),
        })
    };

    match (op, rhs) {
        (CompareOp::In, OpRhs::Many(elements)) => {
            for element in elements {
                if primitive_eq(value, &scalar(element)?) {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        (CompareOp::Nin, OpRhs::Many(elements)) => {
            for element in elements {
                if primitive_eq(value, &scalar(element)?) {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (_, OpRhs::One(expr)) => {
            let rhs = scalar(expr)?;
            Ok(match op {
                CompareOp::Eq => primitive_eq(value, &rhs),
                CompareOp::Ne => !primitive_eq(value, &rhs),
                CompareOp::Gt => primitive_cmp(value, &rhs, |o| o.is_gt()),
                CompareOp::Gte => primitive_cmp(value, &rhs, |o| o.is_ge()),
                CompareOp::Lt => primitive_cmp(value, &rhs, |o| o.is_lt()),
                CompareOp::Lte => primitive_cmp(value, &rhs, |o| o.is_le()),
                CompareOp::Like => like_match(value, &rhs, false)?,
                CompareOp::Ilike => like_match(value, &rhs, true)?,
                CompareOp::Regex => regex_match(value, &rhs)?,
                CompareOp::In | CompareOp::Nin => {
                    return Err(Error::Internal(
                        "array operator reached scalar evaluation".to_string(),
                    ))
                }
            })
        }
        (_, OpRhs::Many(_)) => Err(Error::Internal(
            "scalar operator received an array right-hand side".to_string(),
        )),
    }
}

// =============================================================================
// Primitive comparisons
// =============================================================================

fn primitive_kind(value: &Primitive) -> &'static str {
    match value {
        Primitive::String(_) => "string",
        Primitive::Number(_) => "number",
        Primitive::Bool(_) => "boolean",
        Primitive::Null => "null",
    }
}

/// IS-style equality: NULL equals NULL, cross-type comparisons are false.
fn primitive_eq(left: &Primitive, right: &Primitive) -> bool {
    match (left, right) {
        (Primitive::Null, Primitive::Null) => true,
        (Primitive::String(a), Primitive::String(b)) => a == b,
        (Primitive::Number(a), Primitive::Number(b)) => a == b,
        (Primitive::Bool(a), Primitive::Bool(b)) => a == b,
        _ => false,
    }
}

/// Ordered comparison: numbers numerically, strings lexically (which is
/// chronological for ISO dates and timestamps). Anything else is false.
fn primitive_cmp(
    left: &Primitive,
    right: &Primitive,
    check: fn(std::cmp::Ordering) -> bool,
) -> bool {
    match (left, right) {
        (Primitive::Number(a), Primitive::Number(b)) => {
            a.partial_cmp(b).map(check).unwrap_or(false)
        }
        (Primitive::String(a), Primitive::String(b)) => check(a.cmp(b)),
        _ => false,
    }
}

/// SQL LIKE over in-memory strings: `%` any run, `_` one character.
fn like_match(value: &Primitive, pattern: &Primitive, case_insensitive: bool) -> Result<bool> {
    let (Primitive::String(value), Primitive::String(pattern)) = (value, pattern) else {
        return Ok(false);
    };
    let mut regex_src = String::from("^");
    if case_insensitive {
        regex_src.insert_str(0, "(?i)");
    }
    regex_src.push_str(
        &regex::escape(pattern)
            .replace('%', ".*")
            .replace('_', "."),
    );
    regex_src.push('$');
    let re = Regex::new(&regex_src).map_err(|e| Error::InvalidRegex {
        pattern: pattern.clone(),
        message: e.to_string(),
    })?;
    Ok(re.is_match(value))
}

fn regex_match(value: &Primitive, pattern: &Primitive) -> Result<bool> {
    let (Primitive::String(value), Primitive::String(pattern)) = (value, pattern) else {
        return Ok(false);
    };
    let re = Regex::new(pattern).map_err(|e| Error::InvalidRegex {
        pattern: pattern.clone(),
        message: e.to_string(),
    })?;
    Ok(re.is_match(value))
}
