//! The closed function catalog and its dispatch.
//!
//! Binary arithmetic and CONCAT lower to infix operators with parentheses;
//! the temporal entries delegate to dialect hooks; everything else renders
//! as `NAME(arg1, arg2, ...)`. Unknown names are rejected.

use super::expr::lower_expression;
use super::{ParserState, Typed};
use crate::ast::{Expr, Primitive};
use crate::config::SemanticType;
use crate::dialect::{DatePart, SqlDialect};
use crate::error::{Error, Result};

/// Every callable function name, case-sensitive.
pub const FUNCTION_CATALOG: &[&str] = &[
    // Arithmetic
    "ADD",
    "SUBTRACT",
    "MULTIPLY",
    "DIVIDE",
    "GREATEST_NUMBER",
    "LEAST_NUMBER",
    "COALESCE_NUMBER",
    // String
    "CONCAT",
    "UPPER",
    "LOWER",
    "LENGTH",
    "SUBSTR",
    "SUBSTRING",
    "COALESCE_STRING",
    // Temporal
    "EXTRACT",
    "EXTRACT_EPOCH",
    "DATE_FORMAT",
    "DATEDIFF",
    // Data
    "JSON_EXTRACT",
    "COALESCE",
    "GEN_RANDOM_UUID",
];

pub fn is_known_function(name: &str) -> bool {
    FUNCTION_CATALOG.contains(&name)
}

fn arity(name: &str, expected: &'static str, ok: bool, got: usize) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(Error::FunctionArity {
            name: name.to_string(),
            expected,
            got,
        })
    }
}

fn lower_args(args: &[Expr], current: &str, state: &mut ParserState) -> Result<Vec<Typed>> {
    args.iter()
        .map(|arg| lower_expression(arg, current, state))
        .collect()
}

fn join_sql(args: &[Typed]) -> String {
    args.iter()
        .map(|a| a.sql.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A string-literal argument consumed at compile time (EXTRACT part,
/// DATE_FORMAT format, JSON_EXTRACT path).
fn literal_string_arg<'e>(name: &str, args: &'e [Expr], index: usize) -> Result<&'e str> {
    match args.get(index) {
        Some(Expr::Value(Primitive::String(s))) => Ok(s),
        _ => Err(Error::FunctionArity {
            name: name.to_string(),
            expected: "a string literal argument",
            got: args.len(),
        }),
    }
}

/// Dispatch a catalog function by name.
pub fn lower_function(
    name: &str,
    args: &[Expr],
    current: &str,
    state: &mut ParserState,
) -> Result<Typed> {
    match name {
        "ADD" | "SUBTRACT" | "MULTIPLY" | "DIVIDE" => {
            arity(name, "exactly 2 arguments", args.len() == 2, args.len())?;
            let lowered = lower_args(args, current, state)?;
            let op = match name {
                "ADD" => "+",
                "SUBTRACT" => "-",
                "MULTIPLY" => "*",
                _ => "/",
            };
            Ok(Typed::new(
                format!("({} {} {})", lowered[0].sql, op, lowered[1].sql),
                SemanticType::Number,
            ))
        }

        "CONCAT" => {
            arity(name, "at least 2 arguments", args.len() >= 2, args.len())?;
            let lowered = lower_args(args, current, state)?;
            let parts: Vec<String> = lowered
                .iter()
                .map(|arg| {
                    if arg.ty == SemanticType::String {
                        arg.sql.clone()
                    } else {
                        state.dialect.cast_expr(&arg.sql, SemanticType::String)
                    }
                })
                .collect();
            Ok(Typed::new(
                format!("({})", parts.join(" || ")),
                SemanticType::String,
            ))
        }

        "GREATEST_NUMBER" | "LEAST_NUMBER" => {
            arity(name, "at least 2 arguments", args.len() >= 2, args.len())?;
            let lowered = lower_args(args, current, state)?;
            let function = if name == "GREATEST_NUMBER" {
                state.dialect.greatest_function()
            } else {
                state.dialect.least_function()
            };
            Ok(Typed::new(
                format!("{}({})", function, join_sql(&lowered)),
                SemanticType::Number,
            ))
        }

        "COALESCE" | "COALESCE_NUMBER" | "COALESCE_STRING" => {
            arity(name, "at least 1 argument", !args.is_empty(), args.len())?;
            let lowered = lower_args(args, current, state)?;
            let ty = match name {
                "COALESCE_NUMBER" => SemanticType::Number,
                "COALESCE_STRING" => SemanticType::String,
                _ => lowered
                    .iter()
                    .map(|a| a.ty)
                    .find(|ty| *ty != SemanticType::Unknown)
                    .unwrap_or(SemanticType::Unknown),
            };
            Ok(Typed::new(
                format!("COALESCE({})", join_sql(&lowered)),
                ty,
            ))
        }

        "UPPER" | "LOWER" => {
            arity(name, "exactly 1 argument", args.len() == 1, args.len())?;
            let lowered = lower_args(args, current, state)?;
            Ok(Typed::new(
                format!("{}({})", name, lowered[0].sql),
                SemanticType::String,
            ))
        }

        "LENGTH" => {
            arity(name, "exactly 1 argument", args.len() == 1, args.len())?;
            let lowered = lower_args(args, current, state)?;
            Ok(Typed::new(
                format!("LENGTH({})", lowered[0].sql),
                SemanticType::Number,
            ))
        }

        "SUBSTR" | "SUBSTRING" => {
            arity(name, "2 or 3 arguments", args.len() == 2 || args.len() == 3, args.len())?;
            let lowered = lower_args(args, current, state)?;
            Ok(Typed::new(
                format!("SUBSTR({})", join_sql(&lowered)),
                SemanticType::String,
            ))
        }

        "EXTRACT" => {
            arity(name, "exactly 2 arguments", args.len() == 2, args.len())?;
            let part_name = literal_string_arg(name, args, 0)?;
            let part = DatePart::from_name(part_name).ok_or_else(|| Error::InvalidLiteral {
                kind: "date part",
                value: part_name.to_string(),
            })?;
            let source = lower_expression(&args[1], current, state)?;
            Ok(Typed::new(
                state.dialect.extract(part, &source.sql),
                SemanticType::Number,
            ))
        }

        "EXTRACT_EPOCH" => {
            arity(name, "exactly 1 argument", args.len() == 1, args.len())?;
            let source = lower_expression(&args[0], current, state)?;
            Ok(Typed::new(
                state.dialect.extract_epoch(&source.sql),
                SemanticType::Number,
            ))
        }

        "DATE_FORMAT" => {
            arity(name, "exactly 2 arguments", args.len() == 2, args.len())?;
            let source = lower_expression(&args[0], current, state)?;
            let format = literal_string_arg(name, args, 1)?;
            Ok(Typed::new(
                state.dialect.date_format(&source.sql, format),
                SemanticType::String,
            ))
        }

        "DATEDIFF" => {
            arity(name, "exactly 2 arguments", args.len() == 2, args.len())?;
            let lowered = lower_args(args, current, state)?;
            Ok(Typed::new(
                state.dialect.date_diff(&lowered[0].sql, &lowered[1].sql),
                SemanticType::Number,
            ))
        }

        "JSON_EXTRACT" => {
            arity(name, "exactly 2 arguments", args.len() == 2, args.len())?;
            let base = lower_expression(&args[0], current, state)?;
            let path = literal_string_arg(name, args, 1)?;
            let segments: Vec<&str> = path.split('.').collect();
            if segments.iter().any(|s| !crate::validation::is_valid_identifier(s)) {
                return Err(Error::InvalidLiteral {
                    kind: "JSON path",
                    value: path.to_string(),
                });
            }
            // Value access (not text): the result stays JSON-typed and
            // requires an explicit cast for non-string comparisons.
            Ok(Typed::new(
                state.dialect.json_access(&base.sql, &segments, false),
                SemanticType::Unknown,
            ))
        }

        "GEN_RANDOM_UUID" => {
            arity(name, "no arguments", args.is_empty(), args.len())?;
            let sql = state
                .dialect
                .random_uuid()
                .ok_or_else(|| Error::UnsupportedByDialect {
                    name: name.to_string(),
                    dialect: state.dialect.name(),
                })?;
            Ok(Typed::new(sql, SemanticType::Uuid))
        }

        other => Err(Error::UnknownFunction(other.to_string())),
    }
}
