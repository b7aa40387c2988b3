//! The public facade: raw JSON query descriptions in, SQL out.
//!
//! ```text
//! Raw Query -> Validate(Config) -> AST -> Lowering -> SQL Assembler -> {sql, params}
//! ```
//!
//! SELECT and aggregation compile to a [`Statement`] (SQL plus collected
//! parameters; empty in the default literal-inline mode). Mutations return
//! a literal-embedded statement string and never carry parameters.
//!
//! # Example
//!
//! ```ignore
//! use sdql::{build_select, Config};
//! use serde_json::json;
//!
//! let config = Config::from_value(json!({
//!     "dialect": "postgresql",
//!     "tables": {
//!         "users": {"allowedFields": [{"name": "id", "type": "uuid", "nullable": false}]}
//!     }
//! }))?;
//! let statement = build_select(
//!     &json!({"rootTable": "users", "selection": {"id": true}}),
//!     &config,
//! )?;
//! assert_eq!(statement.sql, "SELECT users.id AS \"id\" FROM users");
//! ```

use serde_json::Value;

use crate::ast::{parse, Condition};
use crate::config::Config;
use crate::diagnostics::JsonPath;
use crate::dml;
use crate::error::Result;
use crate::lowering::{lower_expression, ParamMode, ParserState};
use crate::query;

// ============================================================================
// Result type
// ============================================================================

/// A compiled statement: SQL text and the parameters it references, in
/// order of first emission. `params` is empty in inline mode.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<crate::ast::Primitive>,
}

// ============================================================================
// SELECT
// ============================================================================

/// Compile a SELECT description with literals embedded inline.
pub fn build_select(raw: &Value, config: &Config) -> Result<Statement> {
    build_select_with(raw, config, ParamMode::Inline)
}

/// Compile a SELECT description with an explicit parameter mode.
pub fn build_select_with(raw: &Value, config: &Config, mode: ParamMode) -> Result<Statement> {
    let parsed = parse::select_query(raw)?;
    let mut state = ParserState::with_param_mode(config, &parsed.root_table, mode)?;
    let sql = query::build_select_query(&parsed, &mut state)?;
    Ok(Statement {
        sql,
        params: state.params,
    })
}

// ============================================================================
// Aggregation
// ============================================================================

/// Compile a GROUP BY + aggregates description.
pub fn build_aggregation(raw: &Value, config: &Config) -> Result<Statement> {
    build_aggregation_with(raw, config, ParamMode::Inline)
}

/// Compile an aggregation description with an explicit parameter mode.
pub fn build_aggregation_with(
    raw: &Value,
    config: &Config,
    mode: ParamMode,
) -> Result<Statement> {
    let parsed = parse::aggregation_query(raw)?;
    let mut state = ParserState::with_param_mode(config, &parsed.table, mode)?;
    let sql = query::build_aggregation_query(&parsed, &mut state)?;
    Ok(Statement {
        sql,
        params: state.params,
    })
}

// ============================================================================
// Mutations
// ============================================================================

/// Compile an INSERT description to a literal-embedded statement.
pub fn build_insert(raw: &Value, config: &Config) -> Result<String> {
    let parsed = parse::insert_query(raw)?;
    let mut state = ParserState::new(config, &parsed.table)?;
    dml::build_insert_query(&parsed, &mut state)
}

/// Compile an UPDATE description to a literal-embedded statement.
pub fn build_update(raw: &Value, config: &Config) -> Result<String> {
    let parsed = parse::update_query(raw)?;
    let mut state = ParserState::new(config, &parsed.table)?;
    dml::build_update_query(&parsed, &mut state)
}

/// Compile a DELETE description to a literal-embedded statement.
pub fn build_delete(raw: &Value, config: &Config) -> Result<String> {
    let parsed = parse::delete_query(raw)?;
    let mut state = ParserState::new(config, &parsed.table)?;
    dml::build_delete_query(&parsed, &mut state)
}

// ============================================================================
// Host-testing hooks
// ============================================================================

/// Recognize and lower a raw expression in an existing state, returning the
/// SQL fragment. Exposed for host testing.
pub fn parse_expression(raw: &Value, state: &mut ParserState) -> Result<String> {
    let expr = parse::expression(raw, &mut JsonPath::new())?;
    let current = state.root_table.clone();
    Ok(lower_expression(&expr, &current, state)?.sql)
}

/// Strictly recognize a raw condition tree. Failures carry the JSON path of
/// the first offending node.
pub fn ensure_condition_object(raw: &Value) -> Result<Condition> {
    parse::condition(raw, &mut JsonPath::new())
}
