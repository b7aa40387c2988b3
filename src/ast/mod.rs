//! The SDQL abstract syntax tree.
//!
//! Raw queries arrive as JSON-shaped trees with marker keys (`$and`,
//! `$cond`, `$field`, ...). Recognition is a two-step parse: the
//! [`parse`] recognizers convert raw [`serde_json::Value`] trees into the
//! sum types here (purely syntactic, with path-annotated errors), and the
//! lowering pass assigns semantics against a schema-bound config.
//!
//! Every variant must be handled in lowering - the compiler enforces this.

use serde::de::{Deserialize, Deserializer};
use serde_json::Value;

pub mod parse;

// =============================================================================
// Primitives
// =============================================================================

/// A scalar leaf value: string, double-precision number, boolean, or null.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    String(String),
    Number(f64),
    Bool(bool),
    Null,
}

impl Primitive {
    /// Recognize a JSON scalar. Arrays and objects are not primitives.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Primitive::Null),
            Value::Bool(b) => Some(Primitive::Bool(*b)),
            Value::Number(n) => n.as_f64().map(Primitive::Number),
            Value::String(s) => Some(Primitive::String(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Primitive::Null)
    }
}

impl<'de> Deserialize<'de> for Primitive {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Primitive::from_value(&value).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "expected a scalar value, got {}",
                crate::diagnostics::type_name(&value)
            ))
        })
    }
}

// =============================================================================
// Expressions
// =============================================================================

/// A scalar or non-scalar expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal scalar, emitted verbatim (strings quoted).
    Value(Primitive),
    /// `{$field: "t.c"}` or `{$field: "t.a->b->c"}` - a field path.
    Field(String),
    /// `{$var: "name"}` - a runtime variable lookup.
    Var(String),
    /// `{$uuid: "..."}` - a validated UUID literal, cast on emission.
    Uuid(String),
    /// `{$date: "YYYY-MM-DD"}` - a validated date literal, cast on emission.
    Date(String),
    /// `{$timestamp: "..."}` - a validated timestamp literal, cast on emission.
    Timestamp(String),
    /// `{$jsonb: {...}}` - an inline JSON document.
    Jsonb(Value),
    /// `{$func: {NAME: [args...]}}` - a call into the closed function catalog.
    Func { name: String, args: Vec<Expr> },
    /// `{$cond: {if, then, else}}` - a conditional expression.
    Cond {
        when: Box<Condition>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
}

// =============================================================================
// Conditions
// =============================================================================

/// Comparison operators usable inside a field condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Nin,
    Like,
    Ilike,
    Regex,
}

impl CompareOp {
    pub fn from_key(key: &str) -> Option<Self> {
        Some(match key {
            "$eq" => CompareOp::Eq,
            "$ne" => CompareOp::Ne,
            "$gt" => CompareOp::Gt,
            "$gte" => CompareOp::Gte,
            "$lt" => CompareOp::Lt,
            "$lte" => CompareOp::Lte,
            "$in" => CompareOp::In,
            "$nin" => CompareOp::Nin,
            "$like" => CompareOp::Like,
            "$ilike" => CompareOp::Ilike,
            "$regex" => CompareOp::Regex,
            _ => return None,
        })
    }

    pub fn key(&self) -> &'static str {
        match self {
            CompareOp::Eq => "$eq",
            CompareOp::Ne => "$ne",
            CompareOp::Gt => "$gt",
            CompareOp::Gte => "$gte",
            CompareOp::Lt => "$lt",
            CompareOp::Lte => "$lte",
            CompareOp::In => "$in",
            CompareOp::Nin => "$nin",
            CompareOp::Like => "$like",
            CompareOp::Ilike => "$ilike",
            CompareOp::Regex => "$regex",
        }
    }

    /// Whether the right-hand side is an array of expressions.
    pub fn takes_array(&self) -> bool {
        matches!(self, CompareOp::In | CompareOp::Nin)
    }
}

/// The right-hand side of one field operator.
#[derive(Debug, Clone, PartialEq)]
pub enum OpRhs {
    One(Expr),
    Many(Vec<Expr>),
}

/// A mapping from field operators to expressions, e.g.
/// `{$gte: 18, $lt: 65}`. Operators are emitted in a deterministic
/// (alphabetical) order regardless of input order.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCondition {
    pub ops: Vec<(CompareOp, OpRhs)>,
}

impl FieldCondition {
    /// Shorthand `{field: primitive}` - plain equality.
    pub fn equality(expr: Expr) -> Self {
        Self {
            ops: vec![(CompareOp::Eq, OpRhs::One(expr))],
        }
    }

    /// Operators sorted by key for stable emission.
    pub fn sorted_ops(&self) -> Vec<&(CompareOp, OpRhs)> {
        let mut ops: Vec<_> = self.ops.iter().collect();
        ops.sort_by_key(|(op, _)| op.key());
        ops
    }
}

/// A boolean condition tree.
///
/// Exactly one logical key is allowed per object level; several field paths
/// at one level combine as an implicit AND.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Bool(bool),
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
    Exists {
        table: String,
        condition: Box<Condition>,
    },
    Field {
        path: String,
        condition: FieldCondition,
    },
    /// An expression object in condition position (`$cond`, `$func`, ...);
    /// must lower to a boolean-typed fragment.
    Expression(Expr),
}

// =============================================================================
// Selections
// =============================================================================

/// One value in a selection object.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionValue {
    /// `true` picks the column (aliased); `false` skips it.
    Include(bool),
    /// A computed column.
    Expression(Expr),
    /// A nested selection at a relationship name - adds a JOIN and recurses.
    Nested(Selection),
}

/// An ordered selection: `{fieldName: true|false|Expr|Selection}`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Selection {
    pub fields: Vec<(String, SelectionValue)>,
}

// =============================================================================
// Queries
// =============================================================================

/// A SELECT query description.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    pub root_table: String,
    pub selection: Selection,
    pub condition: Option<Condition>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Aggregate operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateOp {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "COUNT" => AggregateOp::Count,
            "SUM" => AggregateOp::Sum,
            "AVG" => AggregateOp::Avg,
            "MIN" => AggregateOp::Min,
            "MAX" => AggregateOp::Max,
            _ => return None,
        })
    }

    pub fn sql_name(&self) -> &'static str {
        match self {
            AggregateOp::Count => "COUNT",
            AggregateOp::Sum => "SUM",
            AggregateOp::Avg => "AVG",
            AggregateOp::Min => "MIN",
            AggregateOp::Max => "MAX",
        }
    }
}

/// What an aggregate operator applies to.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateTarget {
    /// `"*"` - only meaningful for COUNT.
    Star,
    /// A field path, possibly across a relationship (`"orders.total"`).
    Path(String),
    /// An arbitrary expression.
    Expression(Expr),
}

/// One aggregated output column.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedField {
    pub operator: AggregateOp,
    pub field: AggregateTarget,
}

/// A GROUP BY + aggregates query description.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationQuery {
    pub table: String,
    pub group_by: Vec<String>,
    pub aggregated_fields: Vec<(String, AggregatedField)>,
    pub condition: Option<Condition>,
}

/// An INSERT description. `new_row` preserves the caller's field order.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertQuery {
    pub table: String,
    pub new_row: Vec<(String, Expr)>,
    pub condition: Option<Condition>,
}

/// An UPDATE description.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateQuery {
    pub table: String,
    pub changes: Vec<(String, Expr)>,
    pub condition: Option<Condition>,
}

/// A DELETE description.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteQuery {
    pub table: String,
    pub condition: Option<Condition>,
}
