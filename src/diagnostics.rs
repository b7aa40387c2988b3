//! Path-annotated diagnostics for raw query trees.
//!
//! Recognizers walk raw JSON values and report the first offending node as
//! `Invalid expression at "a.$cond.then": ...` with keys joined by `.` and
//! array positions as `[i]`. This keeps strict-parse failures specific
//! instead of surfacing a schema-wide error.

use serde_json::Value;

use crate::error::Error;

// =============================================================================
// JSON paths
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Key(String),
    Index(usize),
}

/// A path into a raw JSON value, built up during recognition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonPath {
    segments: Vec<Segment>,
}

impl JsonPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a path at a named root key (e.g. `"condition"`).
    pub fn root(key: impl Into<String>) -> Self {
        let mut path = Self::new();
        path.push_key(key);
        path
    }

    pub fn push_key(&mut self, key: impl Into<String>) {
        self.segments.push(Segment::Key(key.into()));
    }

    pub fn push_index(&mut self, index: usize) {
        self.segments.push(Segment::Index(index));
    }

    pub fn pop(&mut self) {
        self.segments.pop();
    }

    /// Build a path-annotated error for the current position.
    pub fn error(&self, message: impl Into<String>) -> Error {
        Error::InvalidQuery {
            path: self.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for JsonPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Key(k) => {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{}", k)?;
                }
                Segment::Index(n) => write!(f, "[{}]", n)?,
            }
        }
        Ok(())
    }
}

// =============================================================================
// Value helpers
// =============================================================================

/// JSON type name for error messages.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// Issue walkers
// =============================================================================

/// Report the first issue in a raw expression tree, or `None` if it parses.
pub fn find_expression_issue(value: &Value) -> Option<String> {
    crate::ast::parse::expression(value, &mut JsonPath::new())
        .err()
        .map(|e| e.to_string())
}

/// Report the first issue in a raw condition tree, or `None` if it parses.
pub fn find_condition_issue(value: &Value) -> Option<String> {
    crate::ast::parse::condition(value, &mut JsonPath::new())
        .err()
        .map(|e| e.to_string())
}
