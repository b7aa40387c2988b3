//! # sdql
//!
//! Compiles JSON-shaped SDQL query descriptions into multi-dialect SQL.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │        Raw Query (JSON-shaped SDQL description)          │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [ast::parse - strict recognition]
//! ┌─────────────────────────────────────────────────────────┐
//! │                     AST (sum types)                      │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [lowering - types, casts, joins]
//! ┌─────────────────────────────────────────────────────────┐
//! │          Typed SQL fragments + join plan                 │
//! │     (mutations first fold conditions via [eval])         │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [query / dml assemblers]
//! ┌─────────────────────────────────────────────────────────┐
//! │                  SQL + parameters                        │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Identifiers in emitted SQL are strictly drawn from the schema-bound
//! [`Config`]; caller-provided values only ever appear as escaped literals
//! or parameters. Compilation is single-threaded per call and keeps no
//! state across calls beyond the read-only config.

pub mod ast;
pub mod compile;
pub mod config;
pub mod diagnostics;
pub mod dialect;
pub mod dml;
pub mod error;
pub mod eval;
pub mod lowering;
pub mod query;
pub mod validation;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::ast::{Condition, Expr, Primitive, Selection};
    pub use crate::compile::{
        build_aggregation, build_delete, build_insert, build_select, build_update,
        ensure_condition_object, parse_expression, Statement,
    };
    pub use crate::config::{Config, Field, Relationship, SemanticType, TableConfig};
    pub use crate::dialect::{Dialect, SqlDialect};
    pub use crate::error::{Error, MutationKind, Result};
    pub use crate::lowering::{ParamMode, ParserState};
}

// Also export the primary entry points at the crate root.
pub use compile::{
    build_aggregation, build_aggregation_with, build_delete, build_insert, build_select,
    build_select_with, build_update, ensure_condition_object, parse_expression, Statement,
};
pub use config::{Config, SemanticType};
pub use dialect::Dialect;
pub use error::{Error, MutationKind, Result};
pub use lowering::{ParamMode, ParserState};
