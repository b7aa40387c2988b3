//! Condition semantics: NULL law, degenerate IN, EXISTS, logical folding,
//! and path-annotated diagnostics.

use sdql::{build_select, ensure_condition_object, Config, Error};
use serde_json::json;

fn config() -> Config {
    Config::from_value(json!({
        "dialect": "postgresql",
        "tables": {
            "users": {
                "allowedFields": [
                    {"name": "id", "type": "uuid", "nullable": false},
                    {"name": "email", "type": "string", "nullable": true},
                    {"name": "age", "type": "number", "nullable": true},
                    {"name": "active", "type": "boolean", "nullable": false}
                ]
            },
            "posts": {
                "allowedFields": [
                    {"name": "id", "type": "uuid", "nullable": false},
                    {"name": "user_id", "type": "uuid", "nullable": false},
                    {"name": "published", "type": "boolean", "nullable": false}
                ]
            }
        },
        "relationships": [
            {"fromTable": "users", "fromField": "id",
             "toTable": "posts", "toField": "user_id", "type": "one-to-many"}
        ]
    }))
    .unwrap()
}

fn where_clause(condition: serde_json::Value) -> String {
    let statement = build_select(
        &json!({
            "rootTable": "users",
            "selection": {"id": true},
            "condition": condition
        }),
        &config(),
    )
    .unwrap();
    let sql = statement.sql;
    match sql.find(" WHERE ") {
        Some(at) => sql[at + " WHERE ".len()..].to_string(),
        None => String::new(),
    }
}

#[test]
fn null_law() {
    assert_eq!(
        where_clause(json!({"users.email": {"$eq": null}})),
        "users.email IS NULL"
    );
    assert_eq!(
        where_clause(json!({"users.email": {"$ne": null}})),
        "users.email IS NOT NULL"
    );
}

#[test]
fn degenerate_in_lists() {
    assert_eq!(where_clause(json!({"users.age": {"$in": []}})), "FALSE");
    // NOT IN () holds for every row, so the WHERE disappears.
    assert_eq!(where_clause(json!({"users.age": {"$nin": []}})), "");
}

#[test]
fn logical_folding() {
    assert_eq!(
        where_clause(json!({"$and": [true, {"users.age": {"$gt": 18}}]})),
        "users.age > 18"
    );
    assert_eq!(
        where_clause(json!({"$and": [false, {"users.age": {"$gt": 18}}]})),
        "FALSE"
    );
    assert_eq!(
        where_clause(json!({"$or": [false, {"users.age": {"$gt": 18}}]})),
        "users.age > 18"
    );
    assert_eq!(
        where_clause(json!({"$or": [true, {"users.age": {"$gt": 18}}]})),
        ""
    );
    // Single-child arrays flatten without parentheses.
    assert_eq!(
        where_clause(json!({"$and": [{"users.age": {"$gt": 18}}]})),
        "users.age > 18"
    );
}

#[test]
fn not_wraps_in_parentheses() {
    assert_eq!(
        where_clause(json!({"$not": {"users.active": {"$eq": true}}})),
        "NOT (users.active = TRUE)"
    );
}

#[test]
fn exists_subquery_sees_outer_table() {
    assert_eq!(
        where_clause(json!({"$exists": {
            "table": "posts",
            "condition": {"$and": [
                {"posts.published": true},
                {"posts.user_id": {"$eq": {"$field": "users.id"}}}
            ]}
        }})),
        "EXISTS (SELECT 1 FROM posts WHERE \
         (posts.published = TRUE AND posts.user_id = users.id))"
    );
}

#[test]
fn bare_primitive_is_equality() {
    assert_eq!(
        where_clause(json!({"users.active": true})),
        "users.active = TRUE"
    );
    assert_eq!(
        where_clause(json!({"users.age": 30})),
        "users.age = 30"
    );
}

#[test]
fn multiple_fields_combine_as_and() {
    assert_eq!(
        where_clause(json!({
            "users.active": true,
            "users.age": {"$gte": 18}
        })),
        "(users.active = TRUE AND users.age >= 18)"
    );
}

// =============================================================================
// Diagnostics
// =============================================================================

#[test]
fn diagnostics_annotate_the_offending_path() {
    let err = ensure_condition_object(&json!({
        "$and": [
            {"users.active": true},
            {"$not": {"$cond": true}}
        ]
    }))
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid expression at \"$and[1].$not.$cond\": $cond must be an object, got boolean"
    );
}

#[test]
fn empty_logical_arrays_are_rejected() {
    let err = ensure_condition_object(&json!({"$and": []})).unwrap_err();
    assert!(err.to_string().contains("$and requires a non-empty array"));
    let err = ensure_condition_object(&json!({"$or": []})).unwrap_err();
    assert!(err.to_string().contains("$or requires a non-empty array"));
}

#[test]
fn exists_requires_table_and_condition() {
    let err = ensure_condition_object(&json!({"$exists": {"table": "posts"}})).unwrap_err();
    assert!(err.to_string().contains("missing 'condition'"));
    let err = ensure_condition_object(&json!({"$exists": {"condition": true}})).unwrap_err();
    assert!(err.to_string().contains("missing 'table'"));
}

#[test]
fn malformed_literals_are_validation_errors() {
    let err = ensure_condition_object(&json!({
        "users.id": {"$eq": {"$uuid": "550e8400"}}
    }))
    .unwrap_err();
    assert!(matches!(err, Error::InvalidLiteral { kind: "UUID", .. }));

    let err = ensure_condition_object(&json!({
        "users.age": {"$eq": {"$date": "2023-02-29"}}
    }))
    .unwrap_err();
    assert!(matches!(err, Error::InvalidLiteral { kind: "date", .. }));

    let err = ensure_condition_object(&json!({
        "users.age": {"$eq": {"$timestamp": "2024-01-01T25:00:00"}}
    }))
    .unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidLiteral { kind: "timestamp", .. }
    ));
}

#[test]
fn unknown_function_is_rejected_at_lowering() {
    let err = build_select(
        &json!({
            "rootTable": "users",
            "selection": {"x": {"$func": {"SLEEP": [1]}}}
        }),
        &config(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::UnknownFunction(_)));
}
