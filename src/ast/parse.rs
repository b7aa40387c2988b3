//! Recognizers: raw JSON values into AST sum types.
//!
//! Recognition is purely syntactic. Literal formats (UUID, date, timestamp)
//! and name shapes are checked here; schema lookups (allowed fields, the
//! function catalog) belong to lowering. Errors carry the JSON path of the
//! first offending node.

use serde_json::{Map, Value};

use super::{
    AggregateOp, AggregateTarget, AggregatedField, AggregationQuery, CompareOp, Condition,
    DeleteQuery, Expr, FieldCondition, InsertQuery, OpRhs, Primitive, Selection, SelectionValue,
    SelectQuery, UpdateQuery,
};
use crate::diagnostics::{type_name, JsonPath};
use crate::error::{Error, Result};
use crate::validation;

/// Marker keys that begin an expression object.
const EXPRESSION_KEYS: &[&str] = &[
    "$field",
    "$var",
    "$uuid",
    "$date",
    "$timestamp",
    "$jsonb",
    "$func",
    "$cond",
];

fn is_expression_object(map: &Map<String, Value>) -> bool {
    map.len() == 1 && map.keys().all(|k| EXPRESSION_KEYS.contains(&k.as_str()))
}

fn expect_string<'a>(value: &'a Value, path: &JsonPath, what: &str) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| path.error(format!("{} must be a string, got {}", what, type_name(value))))
}

fn expect_object<'a>(
    value: &'a Value,
    path: &JsonPath,
    what: &str,
) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| path.error(format!("{} must be an object, got {}", what, type_name(value))))
}

// =============================================================================
// Expressions
// =============================================================================

/// Recognize an expression: a scalar primitive or a tagged object.
pub fn expression(value: &Value, path: &mut JsonPath) -> Result<Expr> {
    if let Some(primitive) = Primitive::from_value(value) {
        return Ok(Expr::Value(primitive));
    }

    let map = match value {
        Value::Object(map) => map,
        Value::Array(_) => return Err(path.error("unexpected array in expression position")),
        _ => return Err(path.error(format!("expected an expression, got {}", type_name(value)))),
    };

    if map.is_empty() {
        return Err(path.error("empty expression object"));
    }
    if map.len() > 1 {
        return Err(path.error("expression objects must have exactly one marker key"));
    }

    let (key, inner) = map.iter().next().expect("len checked above");
    path.push_key(key);
    let expr = recognize_marker(key, inner, path);
    path.pop();
    expr
}

fn recognize_marker(key: &str, inner: &Value, path: &mut JsonPath) -> Result<Expr> {
    match key {
        "$field" => {
            let field = expect_string(inner, path, "$field")?;
            if !validation::is_valid_field_path(field) {
                return Err(path.error(format!("invalid field path '{}'", field)));
            }
            Ok(Expr::Field(field.to_string()))
        }
        "$var" => Ok(Expr::Var(expect_string(inner, path, "$var")?.to_string())),
        "$uuid" => {
            let raw = expect_string(inner, path, "$uuid")?;
            validation::ensure_uuid(raw)?;
            Ok(Expr::Uuid(raw.to_string()))
        }
        "$date" => {
            let raw = expect_string(inner, path, "$date")?;
            validation::ensure_date(raw)?;
            Ok(Expr::Date(raw.to_string()))
        }
        "$timestamp" => {
            let raw = expect_string(inner, path, "$timestamp")?;
            validation::ensure_timestamp(raw)?;
            Ok(Expr::Timestamp(raw.to_string()))
        }
        "$jsonb" => {
            if !inner.is_object() && !inner.is_array() {
                return Err(path.error(format!(
                    "$jsonb must be an object or array, got {}",
                    type_name(inner)
                )));
            }
            Ok(Expr::Jsonb(inner.clone()))
        }
        "$func" => recognize_func(inner, path),
        "$cond" => recognize_cond(inner, path),
        other => Err(path.error(format!("unrecognized expression marker '{}'", other))),
    }
}

fn recognize_func(inner: &Value, path: &mut JsonPath) -> Result<Expr> {
    let map = expect_object(inner, path, "$func")?;
    if map.len() != 1 {
        return Err(path.error("$func must have exactly one function name key"));
    }
    let (name, raw_args) = map.iter().next().expect("len checked above");
    if !validation::is_valid_function_name(name) {
        return Err(path.error(format!("invalid function name '{}'", name)));
    }

    path.push_key(name);
    let args = match raw_args {
        Value::Array(items) => {
            let mut args = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                path.push_index(i);
                args.push(expression(item, path)?);
                path.pop();
            }
            args
        }
        other => {
            let err = path.error(format!(
                "function arguments must be an array, got {}",
                type_name(other)
            ));
            path.pop();
            return Err(err);
        }
    };
    path.pop();

    Ok(Expr::Func {
        name: name.clone(),
        args,
    })
}

fn recognize_cond(inner: &Value, path: &mut JsonPath) -> Result<Expr> {
    let map = expect_object(inner, path, "$cond")?;
    for key in map.keys() {
        if !matches!(key.as_str(), "if" | "then" | "else") {
            return Err(path.error(format!("unexpected key '{}' in $cond", key)));
        }
    }

    let when = map
        .get("if")
        .ok_or_else(|| path.error("$cond is missing 'if'"))?;
    let then = map
        .get("then")
        .ok_or_else(|| path.error("$cond is missing 'then'"))?;
    let otherwise = map
        .get("else")
        .ok_or_else(|| path.error("$cond is missing 'else'"))?;

    path.push_key("if");
    let when = condition(when, path)?;
    path.pop();
    path.push_key("then");
    let then = expression(then, path)?;
    path.pop();
    path.push_key("else");
    let otherwise = expression(otherwise, path)?;
    path.pop();

    Ok(Expr::Cond {
        when: Box::new(when),
        then: Box::new(then),
        otherwise: Box::new(otherwise),
    })
}

// =============================================================================
// Conditions
// =============================================================================

/// Recognize a condition: a boolean literal, a logical combinator, an
/// `$exists`, a field condition map, or an expression object.
pub fn condition(value: &Value, path: &mut JsonPath) -> Result<Condition> {
    let map = match value {
        Value::Bool(b) => return Ok(Condition::Bool(*b)),
        Value::Object(map) => map,
        other => {
            return Err(path.error(format!("expected a condition, got {}", type_name(other))))
        }
    };

    if map.is_empty() {
        return Err(path.error("condition object is empty"));
    }

    let dollar_keys = map.keys().filter(|k| k.starts_with('$')).count();
    if dollar_keys > 0 {
        if map.len() > 1 {
            return Err(path.error("exactly one logical operator is allowed per object level"));
        }
        let (key, inner) = map.iter().next().expect("len checked above");
        return recognize_logical(key, inner, value, path);
    }

    // Field paths only; several combine as an implicit AND.
    let mut fields = Vec::with_capacity(map.len());
    for (field_path, raw) in map {
        if !validation::is_valid_field_path(field_path) {
            return Err(path.error(format!("invalid field path '{}'", field_path)));
        }
        path.push_key(field_path);
        let field_condition = recognize_field_condition(raw, path)?;
        path.pop();
        fields.push(Condition::Field {
            path: field_path.clone(),
            condition: field_condition,
        });
    }

    Ok(if fields.len() == 1 {
        fields.pop().expect("len checked above")
    } else {
        Condition::And(fields)
    })
}

fn recognize_logical(
    key: &str,
    inner: &Value,
    whole: &Value,
    path: &mut JsonPath,
) -> Result<Condition> {
    match key {
        "$and" | "$or" => {
            path.push_key(key);
            let items = match inner {
                Value::Array(items) if !items.is_empty() => items,
                _ => {
                    let err = path.error(format!("{} requires a non-empty array", key));
                    path.pop();
                    return Err(err);
                }
            };
            let mut children = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                path.push_index(i);
                children.push(condition(item, path)?);
                path.pop();
            }
            path.pop();
            Ok(if key == "$and" {
                Condition::And(children)
            } else {
                Condition::Or(children)
            })
        }
        "$not" => {
            path.push_key("$not");
            let child = condition(inner, path)?;
            path.pop();
            Ok(Condition::Not(Box::new(child)))
        }
        "$exists" => {
            path.push_key("$exists");
            let result = recognize_exists(inner, path);
            path.pop();
            result
        }
        _ if EXPRESSION_KEYS.contains(&key) => Ok(Condition::Expression(expression(whole, path)?)),
        other => Err(path.error(format!("unknown operator '{}'", other))),
    }
}

fn recognize_exists(inner: &Value, path: &mut JsonPath) -> Result<Condition> {
    let map = expect_object(inner, path, "$exists")?;
    for key in map.keys() {
        if !matches!(key.as_str(), "table" | "condition") {
            return Err(path.error(format!("unexpected key '{}' in $exists", key)));
        }
    }
    let table = map
        .get("table")
        .ok_or_else(|| path.error("$exists is missing 'table'"))?;
    let table = expect_string(table, path, "'table'")?;
    if !validation::is_valid_identifier(table) {
        return Err(path.error(format!("invalid table name '{}'", table)));
    }
    let raw_condition = map
        .get("condition")
        .ok_or_else(|| path.error("$exists is missing 'condition'"))?;
    path.push_key("condition");
    let inner_condition = condition(raw_condition, path)?;
    path.pop();

    Ok(Condition::Exists {
        table: table.to_string(),
        condition: Box::new(inner_condition),
    })
}

fn recognize_field_condition(value: &Value, path: &mut JsonPath) -> Result<FieldCondition> {
    // Shorthand: a bare primitive means equality.
    if let Some(primitive) = Primitive::from_value(value) {
        return Ok(FieldCondition::equality(Expr::Value(primitive)));
    }

    let map = match value {
        Value::Object(map) => map,
        other => {
            return Err(path.error(format!(
                "expected a field condition, got {}",
                type_name(other)
            )))
        }
    };

    // An expression object as the value is equality against that expression.
    if is_expression_object(map) {
        return Ok(FieldCondition::equality(expression(value, path)?));
    }

    let mut ops = Vec::with_capacity(map.len());
    for (key, raw) in map {
        let op = CompareOp::from_key(key)
            .ok_or_else(|| path.error(format!("unknown field operator '{}'", key)))?;
        path.push_key(key);
        let rhs = if op.takes_array() {
            let items = match raw {
                Value::Array(items) => items,
                other => {
                    let err = path.error(format!(
                        "{} requires an array, got {}",
                        key,
                        type_name(other)
                    ));
                    path.pop();
                    return Err(err);
                }
            };
            let mut exprs = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                path.push_index(i);
                exprs.push(expression(item, path)?);
                path.pop();
            }
            OpRhs::Many(exprs)
        } else {
            OpRhs::One(expression(raw, path)?)
        };
        path.pop();
        ops.push((op, rhs));
    }

    Ok(FieldCondition { ops })
}

// =============================================================================
// Selections
// =============================================================================

/// Recognize a selection object. An empty selection is a schema error.
pub fn selection(value: &Value, path: &mut JsonPath) -> Result<Selection> {
    let map = expect_object(value, path, "selection")?;
    if map.is_empty() {
        return Err(Error::EmptySelection);
    }

    let mut fields = Vec::with_capacity(map.len());
    for (key, raw) in map {
        if !validation::is_valid_identifier(key) {
            return Err(path.error(format!("invalid selection key '{}'", key)));
        }
        path.push_key(key);
        let entry = match raw {
            Value::Bool(include) => SelectionValue::Include(*include),
            Value::Object(inner_map) => {
                if is_expression_object(inner_map) {
                    SelectionValue::Expression(expression(raw, path)?)
                } else {
                    SelectionValue::Nested(selection(raw, path)?)
                }
            }
            other => {
                let err = path.error(format!(
                    "expected true, false, an expression, or a nested selection, got {}",
                    type_name(other)
                ));
                path.pop();
                return Err(err);
            }
        };
        path.pop();
        fields.push((key.clone(), entry));
    }

    Ok(Selection { fields })
}

// =============================================================================
// Queries
// =============================================================================

fn check_keys(map: &Map<String, Value>, allowed: &[&str], path: &JsonPath) -> Result<()> {
    for key in map.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(path.error(format!("unrecognized key '{}'", key)));
        }
    }
    Ok(())
}

fn required<'a>(
    map: &'a Map<String, Value>,
    key: &str,
    path: &JsonPath,
) -> Result<&'a Value> {
    map.get(key)
        .ok_or_else(|| path.error(format!("missing required key '{}'", key)))
}

fn table_name(map: &Map<String, Value>, key: &str, path: &JsonPath) -> Result<String> {
    let raw = required(map, key, path)?;
    let name = expect_string(raw, path, key)?;
    if !validation::is_valid_identifier(name) {
        return Err(path.error(format!("invalid table name '{}'", name)));
    }
    Ok(name.to_string())
}

fn optional_condition(
    map: &Map<String, Value>,
    path: &mut JsonPath,
) -> Result<Option<Condition>> {
    match map.get("condition") {
        Some(raw) => {
            path.push_key("condition");
            let cond = condition(raw, path)?;
            path.pop();
            Ok(Some(cond))
        }
        None => Ok(None),
    }
}

fn optional_u64(map: &Map<String, Value>, key: &str, path: &JsonPath) -> Result<Option<u64>> {
    match map.get(key) {
        Some(raw) => raw
            .as_u64()
            .map(Some)
            .ok_or_else(|| path.error(format!("{} must be a non-negative integer", key))),
        None => Ok(None),
    }
}

/// Row maps (`newRow`, `changes`): field name to expression, order kept.
fn row_map(raw: &Value, key: &str, path: &mut JsonPath) -> Result<Vec<(String, Expr)>> {
    path.push_key(key);
    let map = expect_object(raw, path, key)?;
    if map.is_empty() {
        let err = path.error(format!("{} must not be empty", key));
        path.pop();
        return Err(err);
    }
    let mut entries = Vec::with_capacity(map.len());
    for (field, value) in map {
        if !validation::is_valid_identifier(field) {
            let err = path.error(format!("invalid field name '{}'", field));
            path.pop();
            return Err(err);
        }
        path.push_key(field);
        entries.push((field.clone(), expression(value, path)?));
        path.pop();
    }
    path.pop();
    Ok(entries)
}

/// Recognize a SELECT query description.
pub fn select_query(value: &Value) -> Result<SelectQuery> {
    let mut path = JsonPath::new();
    let map = expect_object(value, &path, "query")?;
    check_keys(
        map,
        &["rootTable", "table", "selection", "condition", "limit", "offset"],
        &path,
    )?;

    let root_table = if map.contains_key("rootTable") {
        table_name(map, "rootTable", &path)?
    } else if map.contains_key("table") {
        table_name(map, "table", &path)?
    } else {
        return Err(path.error("missing required key 'rootTable'"));
    };

    let raw_selection = required(map, "selection", &path)?;
    path.push_key("selection");
    let selection = selection(raw_selection, &mut path)?;
    path.pop();

    Ok(SelectQuery {
        root_table,
        selection,
        condition: optional_condition(map, &mut path)?,
        limit: optional_u64(map, "limit", &path)?,
        offset: optional_u64(map, "offset", &path)?,
    })
}

/// Recognize an aggregation query description.
pub fn aggregation_query(value: &Value) -> Result<AggregationQuery> {
    let mut path = JsonPath::new();
    let map = expect_object(value, &path, "query")?;
    check_keys(
        map,
        &["table", "groupBy", "aggregatedFields", "condition"],
        &path,
    )?;

    let table = table_name(map, "table", &path)?;

    let mut group_by = Vec::new();
    if let Some(raw) = map.get("groupBy") {
        path.push_key("groupBy");
        let items = raw
            .as_array()
            .ok_or_else(|| path.error("groupBy must be an array"))?;
        for (i, item) in items.iter().enumerate() {
            path.push_index(i);
            let field = expect_string(item, &path, "groupBy entry")?;
            if !validation::is_valid_field_path(field) {
                return Err(path.error(format!("invalid field path '{}'", field)));
            }
            group_by.push(field.to_string());
            path.pop();
        }
        path.pop();
    }

    let raw_fields = required(map, "aggregatedFields", &path)?;
    path.push_key("aggregatedFields");
    let fields_map = expect_object(raw_fields, &path, "aggregatedFields")?;
    let mut aggregated_fields = Vec::with_capacity(fields_map.len());
    for (alias, raw) in fields_map {
        path.push_key(alias);
        aggregated_fields.push((alias.clone(), aggregated_field(raw, &mut path)?));
        path.pop();
    }
    path.pop();

    if group_by.is_empty() && aggregated_fields.is_empty() {
        return Err(Error::EmptySelection);
    }

    Ok(AggregationQuery {
        table,
        group_by,
        aggregated_fields,
        condition: optional_condition(map, &mut path)?,
    })
}

fn aggregated_field(value: &Value, path: &mut JsonPath) -> Result<AggregatedField> {
    let map = expect_object(value, path, "aggregated field")?;
    check_keys(map, &["operator", "field"], path)?;

    let raw_operator = required(map, "operator", path)?;
    let operator_name = expect_string(raw_operator, path, "operator")?;
    let operator = AggregateOp::from_name(operator_name)
        .ok_or_else(|| path.error(format!("unknown aggregate operator '{}'", operator_name)))?;

    let raw_field = required(map, "field", path)?;
    path.push_key("field");
    let field = match raw_field {
        Value::String(s) if s == "*" => AggregateTarget::Star,
        Value::String(s) => {
            if !validation::is_valid_field_path(s) {
                let err = path.error(format!("invalid field path '{}'", s));
                path.pop();
                return Err(err);
            }
            AggregateTarget::Path(s.clone())
        }
        other => AggregateTarget::Expression(expression(other, path)?),
    };
    path.pop();

    if matches!(field, AggregateTarget::Star) && operator != AggregateOp::Count {
        return Err(path.error(format!(
            "aggregate '{}' cannot be applied to \"*\"",
            operator.sql_name()
        )));
    }

    Ok(AggregatedField { operator, field })
}

/// Recognize an INSERT query description.
pub fn insert_query(value: &Value) -> Result<InsertQuery> {
    let mut path = JsonPath::new();
    let map = expect_object(value, &path, "query")?;
    check_keys(map, &["table", "newRow", "condition"], &path)?;

    let table = table_name(map, "table", &path)?;
    let raw_row = required(map, "newRow", &path)?;
    let new_row = row_map(raw_row, "newRow", &mut path)?;

    Ok(InsertQuery {
        table,
        new_row,
        condition: optional_condition(map, &mut path)?,
    })
}

/// Recognize an UPDATE query description.
pub fn update_query(value: &Value) -> Result<UpdateQuery> {
    let mut path = JsonPath::new();
    let map = expect_object(value, &path, "query")?;
    check_keys(map, &["table", "changes", "condition"], &path)?;

    let table = table_name(map, "table", &path)?;
    let raw_changes = required(map, "changes", &path)?;
    let changes = row_map(raw_changes, "changes", &mut path)?;

    Ok(UpdateQuery {
        table,
        changes,
        condition: optional_condition(map, &mut path)?,
    })
}

/// Recognize a DELETE query description.
pub fn delete_query(value: &Value) -> Result<DeleteQuery> {
    let mut path = JsonPath::new();
    let map = expect_object(value, &path, "query")?;
    check_keys(map, &["table", "condition"], &path)?;

    Ok(DeleteQuery {
        table: table_name(map, "table", &path)?,
        condition: optional_condition(map, &mut path)?,
    })
}
