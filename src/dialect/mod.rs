//! SQL dialect definitions and formatting rules.
//!
//! A trait-based abstraction over the differences between targets:
//!
//! - Cast syntax: `expr::TYPE` (PostgreSQL) vs `CAST(expr AS TYPE)` (SQLite)
//! - JSON access: `->` / `->>` operator chains vs `JSON_EXTRACT(col, '$.a.b')`
//! - Pagination: SQLite needs `LIMIT -1` when only OFFSET is present
//! - Placeholders: `$1, $2, ...` vs `?`
//! - Function spellings for the temporal catalog entries
//!
//! Aliases are double-quoted in every dialect; table and column identifiers
//! are emitted bare (they are validated against the allowed set, never
//! caller-controlled free text).

mod postgres;
mod sqlite;

pub mod helpers;

pub use postgres::Postgresql;
pub use sqlite::{SqliteExtensions, SqliteMinimal};

use serde::Deserialize;

use crate::config::SemanticType;

// =============================================================================
// Date parts
// =============================================================================

/// Components extractable from a date or timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePart {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Dow,
    Doy,
    Epoch,
}

impl DatePart {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "YEAR" => DatePart::Year,
            "MONTH" => DatePart::Month,
            "DAY" => DatePart::Day,
            "HOUR" => DatePart::Hour,
            "MINUTE" => DatePart::Minute,
            "SECOND" => DatePart::Second,
            "DOW" => DatePart::Dow,
            "DOY" => DatePart::Doy,
            "EPOCH" => DatePart::Epoch,
            _ => return None,
        })
    }

    /// PostgreSQL EXTRACT field name.
    pub fn pg_name(&self) -> &'static str {
        match self {
            DatePart::Year => "YEAR",
            DatePart::Month => "MONTH",
            DatePart::Day => "DAY",
            DatePart::Hour => "HOUR",
            DatePart::Minute => "MINUTE",
            DatePart::Second => "SECOND",
            DatePart::Dow => "DOW",
            DatePart::Doy => "DOY",
            DatePart::Epoch => "EPOCH",
        }
    }

    /// SQLite STRFTIME format code.
    pub fn strftime_code(&self) -> &'static str {
        match self {
            DatePart::Year => "%Y",
            DatePart::Month => "%m",
            DatePart::Day => "%d",
            DatePart::Hour => "%H",
            DatePart::Minute => "%M",
            DatePart::Second => "%S",
            DatePart::Dow => "%w",
            DatePart::Doy => "%j",
            DatePart::Epoch => "%s",
        }
    }
}

// =============================================================================
// Dialect trait
// =============================================================================

/// SQL dialect trait - defines how dialect-sensitive constructs render.
///
/// The default implementations follow PostgreSQL-flavored ANSI where the
/// dialects agree.
pub trait SqlDialect: std::fmt::Debug {
    /// Dialect name for display and error messages.
    fn name(&self) -> &'static str;

    /// Quote an output alias. Always double quotes.
    fn quote_alias(&self, alias: &str) -> String {
        helpers::quote_double(alias)
    }

    /// Quote a string literal with `''` escaping.
    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_single(s)
    }

    /// SQL type name for a semantic type.
    fn sql_type(&self, ty: SemanticType) -> &'static str;

    /// Cast a simple literal: PostgreSQL `'x'::UUID`, SQLite
    /// `CAST('x' AS TEXT)`.
    fn cast_literal(&self, literal: &str, ty: SemanticType) -> String;

    /// Cast a compound expression: PostgreSQL `(expr)::TEXT`, SQLite
    /// `CAST(expr AS TEXT)`.
    fn cast_expr(&self, expr: &str, ty: SemanticType) -> String;

    /// JSON traversal from a base column through path segments. `as_text`
    /// controls whether the leaf is read as text or kept as JSON.
    fn json_access(&self, base: &str, segments: &[&str], as_text: bool) -> String;

    /// Wrap an already-rendered literal (a quoted string or a placeholder)
    /// as a JSON document value.
    fn json_literal(&self, literal_sql: &str) -> String;

    /// Pagination clause, or `None` when neither limit nor offset is set.
    fn limit_clause(&self, limit: Option<u64>, offset: Option<u64>) -> Option<String> {
        helpers::limit_offset_standard(limit, offset)
    }

    /// Positional placeholder for the 1-based position.
    fn placeholder(&self, position: usize) -> String;

    /// Case-insensitive LIKE operator. SQLite LIKE is already
    /// case-insensitive for ASCII, so it maps `$ilike` to plain LIKE.
    fn ilike_operator(&self) -> &'static str {
        "LIKE"
    }

    /// Regular-expression match operator, if the dialect has one.
    fn regex_operator(&self) -> Option<&'static str> {
        None
    }

    /// Scalar greatest/least across arguments.
    fn greatest_function(&self) -> &'static str {
        "GREATEST"
    }
    fn least_function(&self) -> &'static str {
        "LEAST"
    }

    /// `EXTRACT(part FROM expr)` or the STRFTIME equivalent.
    fn extract(&self, part: DatePart, expr: &str) -> String;

    /// Seconds since the epoch.
    fn extract_epoch(&self, expr: &str) -> String {
        self.extract(DatePart::Epoch, expr)
    }

    /// Format a temporal value with a dialect-native format string.
    fn date_format(&self, expr: &str, format: &str) -> String;

    /// Difference between two dates in whole days.
    fn date_diff(&self, left: &str, right: &str) -> String;

    /// Server-side random UUID generation, if available.
    fn random_uuid(&self) -> Option<&'static str> {
        None
    }
}

// =============================================================================
// Dialect enum
// =============================================================================

/// Supported SQL dialects.
///
/// The legacy `sqlite-3.44-*` names are accepted as aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Dialect {
    #[serde(rename = "postgresql", alias = "postgres")]
    Postgresql,
    #[serde(rename = "sqlite-minimal", alias = "sqlite-3.44-minimal")]
    SqliteMinimal,
    #[serde(rename = "sqlite-extensions", alias = "sqlite-3.44-extensions")]
    SqliteExtensions,
}

impl Dialect {
    /// Get the dialect implementation.
    pub fn ops(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::Postgresql => &Postgresql,
            Dialect::SqliteMinimal => &SqliteMinimal,
            Dialect::SqliteExtensions => &SqliteExtensions,
        }
    }
}

impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.ops().name()
    }

    fn quote_alias(&self, alias: &str) -> String {
        self.ops().quote_alias(alias)
    }

    fn quote_string(&self, s: &str) -> String {
        self.ops().quote_string(s)
    }

    fn sql_type(&self, ty: SemanticType) -> &'static str {
        self.ops().sql_type(ty)
    }

    fn cast_literal(&self, literal: &str, ty: SemanticType) -> String {
        self.ops().cast_literal(literal, ty)
    }

    fn cast_expr(&self, expr: &str, ty: SemanticType) -> String {
        self.ops().cast_expr(expr, ty)
    }

    fn json_access(&self, base: &str, segments: &[&str], as_text: bool) -> String {
        self.ops().json_access(base, segments, as_text)
    }

    fn json_literal(&self, literal_sql: &str) -> String {
        self.ops().json_literal(literal_sql)
    }

    fn limit_clause(&self, limit: Option<u64>, offset: Option<u64>) -> Option<String> {
        self.ops().limit_clause(limit, offset)
    }

    fn placeholder(&self, position: usize) -> String {
        self.ops().placeholder(position)
    }

    fn ilike_operator(&self) -> &'static str {
        self.ops().ilike_operator()
    }

    fn regex_operator(&self) -> Option<&'static str> {
        self.ops().regex_operator()
    }

    fn greatest_function(&self) -> &'static str {
        self.ops().greatest_function()
    }

    fn least_function(&self) -> &'static str {
        self.ops().least_function()
    }

    fn extract(&self, part: DatePart, expr: &str) -> String {
        self.ops().extract(part, expr)
    }

    fn extract_epoch(&self, expr: &str) -> String {
        self.ops().extract_epoch(expr)
    }

    fn date_format(&self, expr: &str, format: &str) -> String {
        self.ops().date_format(expr, format)
    }

    fn date_diff(&self, left: &str, right: &str) -> String {
        self.ops().date_diff(left, right)
    }

    fn random_uuid(&self) -> Option<&'static str> {
        self.ops().random_uuid()
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.ops().name())
    }
}
