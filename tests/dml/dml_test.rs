//! Mutation builders: two-phase condition handling, defaults, and
//! literal-embedded emission.

use sdql::{build_delete, build_insert, build_update, Config, Error, MutationKind};
use serde_json::json;

fn config() -> Config {
    Config::from_value(json!({
        "dialect": "postgresql",
        "tables": {
            "users": {
                "allowedFields": [
                    {"name": "id", "type": "uuid", "nullable": false,
                     "default": {"$func": {"GEN_RANDOM_UUID": []}}},
                    {"name": "name", "type": "string", "nullable": false},
                    {"name": "age", "type": "number", "nullable": true},
                    {"name": "email", "type": "string", "nullable": true},
                    {"name": "role", "type": "string", "nullable": false, "default": "member"},
                    {"name": "active", "type": "boolean", "nullable": false},
                    {"name": "joined_on", "type": "date", "nullable": true}
                ]
            }
        },
        "variables": {"min_age": 18}
    }))
    .unwrap()
}

// =============================================================================
// INSERT
// =============================================================================

#[test]
fn insert_emits_explicit_fields_then_defaults() {
    let sql = build_insert(
        &json!({
            "table": "users",
            "newRow": {"name": "Ada", "age": 36, "active": true}
        }),
        &config(),
    )
    .unwrap();
    assert_eq!(
        sql,
        "INSERT INTO users (\"name\", \"age\", \"active\", \"id\", \"role\") \
         VALUES ('Ada', 36, TRUE, GEN_RANDOM_UUID(), 'member')"
    );
}

#[test]
fn insert_satisfied_new_row_condition_has_no_where() {
    let sql = build_insert(
        &json!({
            "table": "users",
            "newRow": {"name": "Ada", "age": 25, "active": true},
            "condition": {"NEW_ROW.age": {"$gt": 18}}
        }),
        &config(),
    )
    .unwrap();
    assert!(sql.starts_with("INSERT INTO users"));
    assert!(!sql.contains("WHERE"));
}

#[test]
fn insert_condition_not_met() {
    let err = build_insert(
        &json!({
            "table": "users",
            "newRow": {"name": "Ada", "age": 15, "active": true},
            "condition": {"NEW_ROW.age": {"$gt": 18}}
        }),
        &config(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::ConditionNotMet(MutationKind::Insert)));
    assert_eq!(err.to_string(), "Insert condition not met");
}

#[test]
fn insert_condition_against_variable() {
    let sql = build_insert(
        &json!({
            "table": "users",
            "newRow": {"name": "Ada", "age": 25, "active": true},
            "condition": {"NEW_ROW.age": {"$gte": {"$var": "min_age"}}}
        }),
        &config(),
    )
    .unwrap();
    assert!(sql.starts_with("INSERT INTO users"));
}

#[test]
fn insert_rejects_stored_row_references() {
    let err = build_insert(
        &json!({
            "table": "users",
            "newRow": {"name": "Ada", "age": 25, "active": true},
            "condition": {"users.email": {"$ne": null}}
        }),
        &config(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::ForbiddenExistingRowEvaluationOnInsert));
    assert_eq!(
        err.to_string(),
        "FORBIDDEN_EXISTING_ROW_EVALUATION_ON_INSERT"
    );
}

#[test]
fn insert_condition_on_omitted_column_uses_default() {
    // role defaults to 'member', so the condition holds without the caller
    // providing it.
    let sql = build_insert(
        &json!({
            "table": "users",
            "newRow": {"name": "Ada", "active": true},
            "condition": {"NEW_ROW.role": {"$eq": "member"}}
        }),
        &config(),
    )
    .unwrap();
    assert!(sql.contains("'member'"));
}

#[test]
fn insert_validates_typed_columns() {
    let sql = build_insert(
        &json!({
            "table": "users",
            "newRow": {
                "id": "550e8400-e29b-41d4-a716-446655440000",
                "name": "Ada",
                "active": true,
                "joined_on": "2024-02-29"
            }
        }),
        &config(),
    )
    .unwrap();
    assert!(sql.contains("'550e8400-e29b-41d4-a716-446655440000'::UUID"));
    assert!(sql.contains("'2024-02-29'::DATE"));

    let err = build_insert(
        &json!({
            "table": "users",
            "newRow": {"name": "Ada", "active": true, "joined_on": "2023-02-29"}
        }),
        &config(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidLiteral { kind: "date", .. }));
}

#[test]
fn insert_missing_non_nullable_field() {
    let err = build_insert(
        &json!({"table": "users", "newRow": {"name": "Ada"}}),
        &config(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        Error::MissingField { ref field, .. } if field == "active"
    ));
}

#[test]
fn insert_unknown_field() {
    let err = build_insert(
        &json!({
            "table": "users",
            "newRow": {"name": "Ada", "active": true, "is_admin": true}
        }),
        &config(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::DisallowedField { ref field, .. } if field == "is_admin"));
}

// =============================================================================
// UPDATE
// =============================================================================

#[test]
fn update_emits_residual_where() {
    let sql = build_update(
        &json!({
            "table": "users",
            "changes": {"role": "admin", "active": true},
            "condition": {"$and": [
                {"users.email": {"$ne": null}},
                {"NEW_ROW.role": {"$ne": "banned"}}
            ]}
        }),
        &config(),
    )
    .unwrap();
    assert_eq!(
        sql,
        "UPDATE users SET \"role\" = 'admin', \"active\" = TRUE \
         WHERE users.email IS NOT NULL"
    );
}

#[test]
fn update_new_row_reference_to_unchanged_column_targets_stored_value() {
    let sql = build_update(
        &json!({
            "table": "users",
            "changes": {"role": "admin"},
            "condition": {"NEW_ROW.age": {"$gte": 18}}
        }),
        &config(),
    )
    .unwrap();
    assert_eq!(
        sql,
        "UPDATE users SET \"role\" = 'admin' WHERE users.age >= 18"
    );
}

#[test]
fn update_condition_not_met() {
    let err = build_update(
        &json!({
            "table": "users",
            "changes": {"age": 12},
            "condition": {"NEW_ROW.age": {"$gte": 18}}
        }),
        &config(),
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "Update condition not met");
}

#[test]
fn update_rejects_unknown_change_fields() {
    let err = build_update(
        &json!({"table": "users", "changes": {"is_admin": true}}),
        &config(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::DisallowedField { .. }));
}

// =============================================================================
// DELETE
// =============================================================================

#[test]
fn delete_with_residual_condition() {
    let sql = build_delete(
        &json!({
            "table": "users",
            "condition": {"users.active": {"$eq": false}}
        }),
        &config(),
    )
    .unwrap();
    assert_eq!(sql, "DELETE FROM users WHERE users.active = FALSE");
}

#[test]
fn delete_without_condition() {
    assert_eq!(
        build_delete(&json!({"table": "users"}), &config()).unwrap(),
        "DELETE FROM users"
    );
}

#[test]
fn delete_unreachable_condition() {
    let err = build_delete(&json!({"table": "users", "condition": false}), &config())
        .unwrap_err();
    assert!(matches!(err, Error::ConditionNotMet(MutationKind::Delete)));
    assert_eq!(err.to_string(), "Delete condition not met");
}

#[test]
fn delete_rejects_new_row_paths() {
    let err = build_delete(
        &json!({"table": "users", "condition": {"NEW_ROW.age": {"$gt": 1}}}),
        &config(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidNewRowReference));
}

#[test]
fn mutations_embed_literals() {
    // Strings with quotes survive '' escaping.
    let sql = build_update(
        &json!({
            "table": "users",
            "changes": {"name": "O'Brien"}
        }),
        &config(),
    )
    .unwrap();
    assert_eq!(sql, "UPDATE users SET \"name\" = 'O''Brien'");
}
