//! Unified error types for SDQL compilation.
//!
//! Every failure is a synchronous, catchable value. Errors produced while
//! recognizing raw query trees carry the JSON path of the offending node
//! (see [`crate::diagnostics`]); schema and semantic errors name the table,
//! field, or function involved.

use std::fmt;

/// Result type for SDQL compilation.
pub type Result<T> = std::result::Result<T, Error>;

/// The kind of mutation being compiled.
///
/// Used for condition-not-met reporting: the display form is the capitalized
/// statement kind ("Insert", "Update", "Delete").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationKind::Insert => write!(f, "Insert"),
            MutationKind::Update => write!(f, "Update"),
            MutationKind::Delete => write!(f, "Delete"),
        }
    }
}

/// Errors that can occur while compiling an SDQL query.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    // === Schema errors ===
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Unknown table: '{0}'")]
    UnknownTable(String),

    #[error("Field '{field}' is not allowed on table '{table}'")]
    DisallowedField { table: String, field: String },

    #[error("Field '{field}' on table '{table}' is not a JSON field and cannot be traversed")]
    NotAJsonField { table: String, field: String },

    #[error("No relationship between '{from}' and '{to}'")]
    NoRelationship { from: String, to: String },

    #[error("Missing non-nullable field '{field}' on table '{table}'")]
    MissingField { table: String, field: String },

    #[error("Unknown function: '{0}'")]
    UnknownFunction(String),

    #[error("Function '{name}' expects {expected}, got {got} arguments")]
    FunctionArity {
        name: String,
        expected: &'static str,
        got: usize,
    },

    #[error("'{name}' is not supported by dialect '{dialect}'")]
    UnsupportedByDialect { name: String, dialect: &'static str },

    #[error("Unknown variable: '{0}'")]
    UnknownVariable(String),

    #[error("Selection is empty")]
    EmptySelection,

    // === Validation errors ===
    #[error("Invalid {kind} literal: '{value}'")]
    InvalidLiteral { kind: &'static str, value: String },

    #[error("Invalid regular expression '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },

    /// A structural issue in a raw query tree, annotated with the JSON path
    /// of the first offending node.
    #[error("Invalid expression at \"{path}\": {message}")]
    InvalidQuery { path: String, message: String },

    // === Semantic errors ===
    #[error("{0} condition not met")]
    ConditionNotMet(MutationKind),

    #[error("FORBIDDEN_EXISTING_ROW_EVALUATION_ON_INSERT")]
    ForbiddenExistingRowEvaluationOnInsert,

    #[error("NEW_ROW references are only valid inside INSERT and UPDATE conditions")]
    InvalidNewRowReference,

    #[error("Cannot evaluate '{0}' against the new row")]
    NotEvaluable(String),

    #[error("Expression used as a condition must be boolean-typed, got {ty}")]
    NonBooleanCondition { ty: String },

    #[error("Mutation conditions cannot traverse relationships; use $exists")]
    MutationJoin,

    #[error("Relationship traversal is not supported for data-table configurations")]
    DataTableJoin,

    #[error("{0} is not supported for data-table configurations")]
    DataTableUnsupported(&'static str),

    // === Internal invariants ===
    /// A compiler bug: type-map collision, unreachable AST shape. Never the
    /// caller's fault.
    #[error("Internal compiler error: {0}")]
    Internal(String),
}
