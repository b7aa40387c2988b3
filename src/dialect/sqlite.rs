//! SQLite dialects.
//!
//! Two profiles of the same engine:
//!
//! - `sqlite-minimal`: no loadable extensions assumed. JSON access goes
//!   through `JSON_EXTRACT`, there is no REGEXP and no UUID generation.
//! - `sqlite-extensions`: 3.38+ JSON operators (`->` / `->>`) plus the
//!   REGEXP and uuid extension functions.
//!
//! Shared quirks: `CAST(expr AS TYPE)` syntax, `?` placeholders, type
//! affinities instead of rich types (UUID and temporal values live in
//! TEXT), `LIMIT -1` required when only OFFSET is given, LIKE already
//! case-insensitive for ASCII.

use super::helpers;
use super::{DatePart, SqlDialect};
use crate::config::SemanticType;

fn sqlite_type(ty: SemanticType) -> &'static str {
    match ty {
        SemanticType::String => "TEXT",
        SemanticType::Number => "REAL",
        SemanticType::Boolean => "INTEGER",
        SemanticType::Uuid => "TEXT",
        SemanticType::Date => "TEXT",
        SemanticType::Datetime => "TEXT",
        SemanticType::Object => "TEXT",
        SemanticType::Unknown => "TEXT",
    }
}

fn sqlite_cast(expr: &str, ty: SemanticType) -> String {
    format!("CAST({} AS {})", expr, sqlite_type(ty))
}

fn sqlite_limit(limit: Option<u64>, offset: Option<u64>) -> Option<String> {
    match (limit, offset) {
        // OFFSET without LIMIT is a syntax error in SQLite.
        (None, Some(o)) => Some(format!("LIMIT -1 OFFSET {}", o)),
        _ => helpers::limit_offset_standard(limit, offset),
    }
}

fn sqlite_json_path(base: &str, segments: &[&str]) -> String {
    let mut path = String::from("$");
    for segment in segments {
        path.push('.');
        path.push_str(segment);
    }
    format!("JSON_EXTRACT({}, '{}')", base, path)
}

fn sqlite_extract(part: DatePart, expr: &str) -> String {
    format!(
        "CAST(STRFTIME('{}', {}) AS INTEGER)",
        part.strftime_code(),
        expr
    )
}

fn sqlite_date_diff(left: &str, right: &str) -> String {
    format!("CAST(JULIANDAY({}) - JULIANDAY({}) AS INTEGER)", left, right)
}

// =============================================================================
// Minimal profile
// =============================================================================

/// SQLite without loadable extensions.
#[derive(Debug, Clone, Copy)]
pub struct SqliteMinimal;

impl SqlDialect for SqliteMinimal {
    fn name(&self) -> &'static str {
        "sqlite-minimal"
    }

    fn sql_type(&self, ty: SemanticType) -> &'static str {
        sqlite_type(ty)
    }

    fn cast_literal(&self, literal: &str, ty: SemanticType) -> String {
        sqlite_cast(literal, ty)
    }

    fn cast_expr(&self, expr: &str, ty: SemanticType) -> String {
        sqlite_cast(expr, ty)
    }

    fn json_access(&self, base: &str, segments: &[&str], _as_text: bool) -> String {
        if segments.is_empty() {
            return base.to_string();
        }
        sqlite_json_path(base, segments)
    }

    fn json_literal(&self, literal_sql: &str) -> String {
        format!("JSON({})", literal_sql)
    }

    fn limit_clause(&self, limit: Option<u64>, offset: Option<u64>) -> Option<String> {
        sqlite_limit(limit, offset)
    }

    fn placeholder(&self, _position: usize) -> String {
        "?".to_string()
    }

    fn extract(&self, part: DatePart, expr: &str) -> String {
        sqlite_extract(part, expr)
    }

    fn date_format(&self, expr: &str, format: &str) -> String {
        format!("STRFTIME({}, {})", self.quote_string(format), expr)
    }

    fn date_diff(&self, left: &str, right: &str) -> String {
        sqlite_date_diff(left, right)
    }
}

// =============================================================================
// Extensions profile
// =============================================================================

/// SQLite 3.38+ with the REGEXP and uuid extension functions loaded.
#[derive(Debug, Clone, Copy)]
pub struct SqliteExtensions;

impl SqlDialect for SqliteExtensions {
    fn name(&self) -> &'static str {
        "sqlite-extensions"
    }

    fn sql_type(&self, ty: SemanticType) -> &'static str {
        sqlite_type(ty)
    }

    fn cast_literal(&self, literal: &str, ty: SemanticType) -> String {
        sqlite_cast(literal, ty)
    }

    fn cast_expr(&self, expr: &str, ty: SemanticType) -> String {
        sqlite_cast(expr, ty)
    }

    fn json_access(&self, base: &str, segments: &[&str], as_text: bool) -> String {
        helpers::json_operator_chain(base, segments, as_text)
    }

    fn json_literal(&self, literal_sql: &str) -> String {
        format!("JSON({})", literal_sql)
    }

    fn limit_clause(&self, limit: Option<u64>, offset: Option<u64>) -> Option<String> {
        sqlite_limit(limit, offset)
    }

    fn placeholder(&self, _position: usize) -> String {
        "?".to_string()
    }

    fn regex_operator(&self) -> Option<&'static str> {
        Some("REGEXP")
    }

    fn extract(&self, part: DatePart, expr: &str) -> String {
        sqlite_extract(part, expr)
    }

    fn date_format(&self, expr: &str, format: &str) -> String {
        format!("STRFTIME({}, {})", self.quote_string(format), expr)
    }

    fn date_diff(&self, left: &str, right: &str) -> String {
        sqlite_date_diff(left, right)
    }

    fn random_uuid(&self) -> Option<&'static str> {
        Some("UUID()")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_only_needs_limit_minus_one() {
        assert_eq!(
            sqlite_limit(None, Some(7)),
            Some("LIMIT -1 OFFSET 7".into())
        );
        assert_eq!(
            sqlite_limit(Some(3), Some(7)),
            Some("LIMIT 3 OFFSET 7".into())
        );
    }

    #[test]
    fn test_json_extract_path() {
        assert_eq!(
            sqlite_json_path("users.meta", &["a", "b"]),
            "JSON_EXTRACT(users.meta, '$.a.b')"
        );
    }

    #[test]
    fn test_extract_strftime() {
        assert_eq!(
            sqlite_extract(DatePart::Year, "users.created_at"),
            "CAST(STRFTIME('%Y', users.created_at) AS INTEGER)"
        );
    }
}
