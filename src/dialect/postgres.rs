//! PostgreSQL dialect.
//!
//! - `expr::TYPE` cast syntax
//! - `->` / `->>` JSON operators
//! - `$1, $2, ...` placeholders
//! - Native ILIKE, `~` regex match, GEN_RANDOM_UUID()

use super::helpers;
use super::{DatePart, SqlDialect};
use crate::config::SemanticType;

/// PostgreSQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Postgresql;

impl SqlDialect for Postgresql {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn sql_type(&self, ty: SemanticType) -> &'static str {
        match ty {
            SemanticType::String => "TEXT",
            SemanticType::Number => "DOUBLE PRECISION",
            SemanticType::Boolean => "BOOLEAN",
            SemanticType::Uuid => "UUID",
            SemanticType::Date => "DATE",
            SemanticType::Datetime => "TIMESTAMP",
            SemanticType::Object => "JSONB",
            SemanticType::Unknown => "TEXT",
        }
    }

    fn cast_literal(&self, literal: &str, ty: SemanticType) -> String {
        format!("{}::{}", literal, self.sql_type(ty))
    }

    fn cast_expr(&self, expr: &str, ty: SemanticType) -> String {
        format!("({})::{}", expr, self.sql_type(ty))
    }

    fn json_access(&self, base: &str, segments: &[&str], as_text: bool) -> String {
        helpers::json_operator_chain(base, segments, as_text)
    }

    fn json_literal(&self, literal_sql: &str) -> String {
        format!("{}::JSONB", literal_sql)
    }

    fn placeholder(&self, position: usize) -> String {
        format!("${}", position)
    }

    fn ilike_operator(&self) -> &'static str {
        "ILIKE"
    }

    fn regex_operator(&self) -> Option<&'static str> {
        Some("~")
    }

    fn extract(&self, part: DatePart, expr: &str) -> String {
        format!("EXTRACT({} FROM {})", part.pg_name(), expr)
    }

    fn date_format(&self, expr: &str, format: &str) -> String {
        format!("TO_CHAR({}, {})", expr, self.quote_string(format))
    }

    fn date_diff(&self, left: &str, right: &str) -> String {
        format!("(({})::DATE - ({})::DATE)", left, right)
    }

    fn random_uuid(&self) -> Option<&'static str> {
        Some("GEN_RANDOM_UUID()")
    }
}
