//! Black-box SELECT compilation tests.

use sdql::{build_select, build_select_with, Config, Error, ParamMode};
use serde_json::json;

fn pg_config() -> Config {
    Config::from_value(json!({
        "dialect": "postgresql",
        "tables": {
            "users": {
                "allowedFields": [
                    {"name": "id", "type": "uuid", "nullable": false},
                    {"name": "name", "type": "string", "nullable": false},
                    {"name": "age", "type": "number", "nullable": true},
                    {"name": "active", "type": "boolean", "nullable": false},
                    {"name": "meta", "type": "object", "nullable": true}
                ]
            },
            "posts": {
                "allowedFields": [
                    {"name": "id", "type": "uuid", "nullable": false},
                    {"name": "user_id", "type": "uuid", "nullable": false},
                    {"name": "title", "type": "string", "nullable": false},
                    {"name": "published", "type": "boolean", "nullable": false}
                ]
            }
        },
        "relationships": [
            {"fromTable": "users", "fromField": "id",
             "toTable": "posts", "toField": "user_id", "type": "one-to-many"}
        ],
        "variables": {"auth.uid": "550e8400-e29b-41d4-a716-446655440000"}
    }))
    .unwrap()
}

fn sqlite_config(profile: &str) -> Config {
    Config::from_value(json!({
        "dialect": profile,
        "tables": {
            "users": {
                "allowedFields": [
                    {"name": "id", "type": "uuid", "nullable": false},
                    {"name": "name", "type": "string", "nullable": false},
                    {"name": "meta", "type": "object", "nullable": true}
                ]
            }
        }
    }))
    .unwrap()
}

#[test]
fn select_with_uuid_literal_cast() {
    let statement = build_select(
        &json!({
            "rootTable": "users",
            "selection": {"id": true, "name": true},
            "condition": {"users.id": {"$eq": {"$uuid": "550e8400-e29b-41d4-a716-446655440000"}}}
        }),
        &pg_config(),
    )
    .unwrap();
    assert_eq!(
        statement.sql,
        "SELECT users.id AS \"id\", users.name AS \"name\" FROM users \
         WHERE users.id = '550e8400-e29b-41d4-a716-446655440000'::UUID"
    );
    assert!(statement.params.is_empty());
}

#[test]
fn variable_coercion_casts_uuid_column_to_text() {
    let statement = build_select(
        &json!({
            "rootTable": "users",
            "selection": {"id": true},
            "condition": {"users.id": {"$eq": {"$var": "auth.uid"}}}
        }),
        &pg_config(),
    )
    .unwrap();
    assert_eq!(
        statement.sql,
        "SELECT users.id AS \"id\" FROM users \
         WHERE (users.id)::TEXT = '550e8400-e29b-41d4-a716-446655440000'"
    );
}

#[test]
fn nested_cond_expression() {
    let statement = build_select(
        &json!({
            "rootTable": "users",
            "selection": {
                "bracket": {"$cond": {
                    "if": {"$and": [
                        {"users.active": true},
                        {"users.age": {"$gte": 18}}
                    ]},
                    "then": {"$cond": {
                        "if": {"users.age": {"$gte": 65}},
                        "then": "senior",
                        "else": "adult"
                    }},
                    "else": "inactive"
                }}
            }
        }),
        &pg_config(),
    )
    .unwrap();
    assert_eq!(
        statement.sql,
        "SELECT (CASE WHEN (users.active = TRUE AND users.age >= 18) \
         THEN (CASE WHEN users.age >= 65 THEN 'senior' ELSE 'adult' END) \
         ELSE 'inactive' END) AS \"bracket\" FROM users"
    );
}

#[test]
fn join_deduplicates_across_selection_and_condition() {
    let statement = build_select(
        &json!({
            "rootTable": "users",
            "selection": {
                "name": true,
                "posts": {"title": true, "published": true}
            },
            "condition": {"posts.published": {"$eq": true}}
        }),
        &pg_config(),
    )
    .unwrap();
    let join = "LEFT JOIN posts ON users.id = posts.user_id";
    assert_eq!(statement.sql.matches(join).count(), 1);
    assert!(statement.sql.contains("posts.title AS \"posts.title\""));
}

#[test]
fn compilation_is_deterministic() {
    let query = json!({
        "rootTable": "users",
        "selection": {"name": true, "posts": {"title": true}},
        "condition": {"$and": [
            {"users.age": {"$gte": 18, "$lt": 65}},
            {"posts.published": true}
        ]},
        "limit": 50
    });
    let config = pg_config();
    let first = build_select(&query, &config).unwrap();
    for _ in 0..5 {
        assert_eq!(build_select(&query, &config).unwrap(), first);
    }
}

#[test]
fn operator_emission_order_ignores_input_order() {
    let config = pg_config();
    let a = build_select(
        &json!({
            "rootTable": "users",
            "selection": {"id": true},
            "condition": {"users.age": {"$lt": 65, "$gte": 18}}
        }),
        &config,
    )
    .unwrap();
    let b = build_select(
        &json!({
            "rootTable": "users",
            "selection": {"id": true},
            "condition": {"users.age": {"$gte": 18, "$lt": 65}}
        }),
        &config,
    )
    .unwrap();
    assert_eq!(a.sql, b.sql);
    assert!(a.sql.contains("(users.age >= 18 AND users.age < 65)"));
}

#[test]
fn pagination_by_dialect() {
    let query = json!({
        "rootTable": "users",
        "selection": {"id": true},
        "offset": 20
    });

    let pg = build_select(&query, &pg_config()).unwrap();
    assert!(pg.sql.ends_with("FROM users OFFSET 20"));

    let lite = build_select(&query, &sqlite_config("sqlite-minimal")).unwrap();
    assert!(lite.sql.ends_with("FROM users LIMIT -1 OFFSET 20"));

    let both = json!({
        "rootTable": "users",
        "selection": {"id": true},
        "limit": 10,
        "offset": 20
    });
    let pg = build_select(&both, &pg_config()).unwrap();
    assert!(pg.sql.ends_with("LIMIT 10 OFFSET 20"));
}

#[test]
fn json_access_by_dialect() {
    let query = json!({
        "rootTable": "users",
        "selection": {"theme": {"$field": "users.meta->settings->theme"}}
    });

    let pg = build_select(&query, &pg_config()).unwrap();
    assert_eq!(
        pg.sql,
        "SELECT users.meta->'settings'->>'theme' AS \"theme\" FROM users"
    );

    let minimal = build_select(&query, &sqlite_config("sqlite-minimal")).unwrap();
    assert_eq!(
        minimal.sql,
        "SELECT JSON_EXTRACT(users.meta, '$.settings.theme') AS \"theme\" FROM users"
    );

    let extensions = build_select(&query, &sqlite_config("sqlite-extensions")).unwrap();
    assert_eq!(
        extensions.sql,
        "SELECT users.meta->'settings'->>'theme' AS \"theme\" FROM users"
    );
}

#[test]
fn sqlite_casts_use_cast_syntax() {
    let statement = build_select(
        &json!({
            "rootTable": "users",
            "selection": {"id": true},
            "condition": {"users.id": {"$eq": {"$uuid": "550e8400-e29b-41d4-a716-446655440000"}}}
        }),
        &sqlite_config("sqlite-minimal"),
    )
    .unwrap();
    assert_eq!(
        statement.sql,
        "SELECT users.id AS \"id\" FROM users \
         WHERE users.id = CAST('550e8400-e29b-41d4-a716-446655440000' AS TEXT)"
    );
}

#[test]
fn string_literals_escape_quotes() {
    let statement = build_select(
        &json!({
            "rootTable": "users",
            "selection": {"id": true},
            "condition": {"users.name": {"$eq": "O'Brien"}}
        }),
        &pg_config(),
    )
    .unwrap();
    assert!(statement.sql.contains("'O''Brien'"));
}

#[test]
fn placeholder_mode_matches_param_count() {
    let statement = build_select_with(
        &json!({
            "rootTable": "users",
            "selection": {"id": true},
            "condition": {"$and": [
                {"users.name": {"$in": ["Ada", "Grace"]}},
                {"users.age": {"$gte": 18}}
            ]}
        }),
        &pg_config(),
        ParamMode::Placeholders,
    )
    .unwrap();
    let placeholder_count = statement
        .sql
        .as_bytes()
        .windows(2)
        .filter(|w| w[0] == b'$' && w[1].is_ascii_digit())
        .count();
    assert_eq!(placeholder_count, statement.params.len());
    assert_eq!(statement.params.len(), 3);
}

#[test]
fn disallowed_field_is_rejected() {
    let err = build_select(
        &json!({
            "rootTable": "users",
            "selection": {"password": true}
        }),
        &pg_config(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::DisallowedField { .. }));
}

#[test]
fn unrelated_table_is_rejected() {
    let err = build_select(
        &json!({
            "rootTable": "users",
            "selection": {"id": true},
            "condition": {"comments.body": {"$eq": "x"}}
        }),
        &pg_config(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::UnknownTable(_)));
}
