//! Expression lowering: type-assigning emission of scalar and non-scalar
//! expressions, plus the comparison cast policy.

use super::condition::lower_condition;
use super::fields::resolve_field;
use super::functions::lower_function;
use super::{ParamMode, ParserState, Typed};
use crate::ast::{Expr, Primitive};
use crate::config::SemanticType;
use crate::dialect::SqlDialect;
use crate::error::{Error, Result};

/// Lower an expression in the context of `current`, recording its type.
pub fn lower_expression(expr: &Expr, current: &str, state: &mut ParserState) -> Result<Typed> {
    let typed = match expr {
        Expr::Value(primitive) => lower_primitive(primitive, state),
        Expr::Field(path) => resolve_field(path, current, state)?,
        Expr::Var(name) => {
            let value = state.config.variable(name)?.clone();
            lower_primitive(&value, state)
        }
        Expr::Uuid(raw) => lower_typed_literal(raw, SemanticType::Uuid, state),
        Expr::Date(raw) => lower_typed_literal(raw, SemanticType::Date, state),
        Expr::Timestamp(raw) => lower_typed_literal(raw, SemanticType::Datetime, state),
        Expr::Jsonb(document) => {
            let text = serde_json::to_string(document)
                .map_err(|e| Error::Internal(format!("unserializable $jsonb value: {}", e)))?;
            let literal = match state.param_mode {
                ParamMode::Inline => state.dialect.quote_string(&text),
                ParamMode::Placeholders => state.push_param(Primitive::String(text)),
            };
            Typed::new(state.dialect.json_literal(&literal), SemanticType::Object)
        }
        Expr::Func { name, args } => lower_function(name, args, current, state)?,
        Expr::Cond {
            when,
            then,
            otherwise,
        } => {
            let when = lower_condition(when, current, state)?.into_sql();
            let then = lower_expression(then, current, state)?;
            let otherwise = lower_expression(otherwise, current, state)?;
            let ty = merge_branch_types(then.ty, otherwise.ty);
            Typed::new(
                format!(
                    "(CASE WHEN {} THEN {} ELSE {} END)",
                    when, then.sql, otherwise.sql
                ),
                ty,
            )
        }
    };

    state.record(&typed.sql, typed.ty)?;
    Ok(typed)
}

/// Numbers and booleans verbatim, strings single-quoted (or a placeholder),
/// null as NULL.
pub fn lower_primitive(primitive: &Primitive, state: &mut ParserState) -> Typed {
    match primitive {
        Primitive::Null => Typed::new("NULL", SemanticType::Unknown),
        Primitive::Bool(b) => match state.param_mode {
            ParamMode::Inline => {
                Typed::new(if *b { "TRUE" } else { "FALSE" }, SemanticType::Boolean)
            }
            ParamMode::Placeholders => Typed::new(
                state.push_param(Primitive::Bool(*b)),
                SemanticType::Boolean,
            ),
        },
        Primitive::Number(n) => match state.param_mode {
            ParamMode::Inline => Typed::new(format_number(*n), SemanticType::Number),
            ParamMode::Placeholders => Typed::new(
                state.push_param(Primitive::Number(*n)),
                SemanticType::Number,
            ),
        },
        Primitive::String(s) => match state.param_mode {
            ParamMode::Inline => {
                Typed::new(state.dialect.quote_string(s), SemanticType::String)
            }
            ParamMode::Placeholders => Typed::new(
                state.push_param(Primitive::String(s.clone())),
                SemanticType::String,
            ),
        },
    }
}

fn lower_typed_literal(raw: &str, ty: SemanticType, state: &mut ParserState) -> Typed {
    let literal = match state.param_mode {
        ParamMode::Inline => state.dialect.quote_string(raw),
        ParamMode::Placeholders => state.push_param(Primitive::String(raw.to_string())),
    };
    Typed::new(state.dialect.cast_literal(&literal, ty), ty)
}

/// Integral doubles print without a fractional part.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn merge_branch_types(then: SemanticType, otherwise: SemanticType) -> SemanticType {
    if then == otherwise {
        then
    } else if then == SemanticType::Unknown {
        otherwise
    } else if otherwise == SemanticType::Unknown {
        then
    } else {
        SemanticType::Unknown
    }
}

// =============================================================================
// Comparison cast policy
// =============================================================================

/// Emit `lhs <op> rhs`, inserting dialect casts where the side types
/// disagree:
///
/// - a JSON leaf is cast to the other side's type
/// - an unknown-typed side is cast to the typed side
/// - a uuid side compared against non-uuid text is cast to TEXT
/// - a date/datetime side against a plain string literal falls back to TEXT
/// - a remaining stringly-typed side gets an explicit TEXT cast
pub fn emit_comparison(lhs: &Typed, op_sql: &str, rhs: &Typed, state: &ParserState) -> String {
    let (left, right) = cast_sides(lhs, rhs, state);
    format!("{} {} {}", left, op_sql, right)
}

/// Apply the cast policy to both sides, returning the final fragments.
pub fn cast_sides(lhs: &Typed, rhs: &Typed, state: &ParserState) -> (String, String) {
    use SemanticType::*;
    let dialect = &state.dialect;

    if lhs.ty == rhs.ty {
        return (lhs.sql.clone(), rhs.sql.clone());
    }

    if lhs.json_leaf && rhs.ty != Unknown && rhs.ty != String {
        return (dialect.cast_expr(&lhs.sql, rhs.ty), rhs.sql.clone());
    }
    if rhs.json_leaf && lhs.ty != Unknown && lhs.ty != String {
        return (lhs.sql.clone(), dialect.cast_expr(&rhs.sql, lhs.ty));
    }

    if lhs.ty == Unknown && rhs.ty != Unknown {
        return (dialect.cast_expr(&lhs.sql, rhs.ty), rhs.sql.clone());
    }
    if rhs.ty == Unknown && lhs.ty != Unknown {
        return (lhs.sql.clone(), dialect.cast_expr(&rhs.sql, lhs.ty));
    }

    if lhs.ty == Uuid {
        return (dialect.cast_expr(&lhs.sql, String), rhs.sql.clone());
    }
    if rhs.ty == Uuid {
        return (lhs.sql.clone(), dialect.cast_expr(&rhs.sql, String));
    }

    if matches!(lhs.ty, Date | Datetime) && rhs.ty == String {
        return (dialect.cast_expr(&lhs.sql, String), rhs.sql.clone());
    }
    if matches!(rhs.ty, Date | Datetime) && lhs.ty == String {
        return (lhs.sql.clone(), dialect.cast_expr(&rhs.sql, String));
    }

    if lhs.ty == String {
        return (dialect.cast_expr(&lhs.sql, String), rhs.sql.clone());
    }
    if rhs.ty == String {
        return (lhs.sql.clone(), dialect.cast_expr(&rhs.sql, String));
    }

    (lhs.sql.clone(), rhs.sql.clone())
}
