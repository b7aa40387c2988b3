//! Aggregation builder tests.

use sdql::{build_aggregation, Config, Error};
use serde_json::json;

fn config() -> Config {
    Config::from_value(json!({
        "dialect": "postgresql",
        "tables": {
            "users": {
                "allowedFields": [
                    {"name": "id", "type": "uuid", "nullable": false},
                    {"name": "role", "type": "string", "nullable": false},
                    {"name": "age", "type": "number", "nullable": true}
                ]
            },
            "orders": {
                "allowedFields": [
                    {"name": "id", "type": "uuid", "nullable": false},
                    {"name": "user_id", "type": "uuid", "nullable": false},
                    {"name": "total", "type": "number", "nullable": false},
                    {"name": "placed_at", "type": "datetime", "nullable": false}
                ]
            }
        },
        "relationships": [
            {"fromTable": "users", "fromField": "id",
             "toTable": "orders", "toField": "user_id", "type": "one-to-many"}
        ]
    }))
    .unwrap()
}

#[test]
fn group_by_with_count_star() {
    let statement = build_aggregation(
        &json!({
            "table": "users",
            "groupBy": ["users.role"],
            "aggregatedFields": {"n": {"operator": "COUNT", "field": "*"}}
        }),
        &config(),
    )
    .unwrap();
    assert_eq!(
        statement.sql,
        "SELECT users.role AS \"users.role\", COUNT(*) AS \"n\" FROM users GROUP BY users.role"
    );
}

#[test]
fn cross_table_aggregate_adds_join() {
    let statement = build_aggregation(
        &json!({
            "table": "users",
            "groupBy": ["users.role"],
            "aggregatedFields": {
                "revenue": {"operator": "SUM", "field": "orders.total"},
                "biggest": {"operator": "MAX", "field": "orders.total"}
            }
        }),
        &config(),
    )
    .unwrap();
    assert_eq!(
        statement.sql,
        "SELECT users.role AS \"users.role\", SUM(orders.total) AS \"revenue\", \
         MAX(orders.total) AS \"biggest\" FROM users \
         LEFT JOIN orders ON users.id = orders.user_id GROUP BY users.role"
    );
}

#[test]
fn aggregate_over_expression() {
    let statement = build_aggregation(
        &json!({
            "table": "orders",
            "aggregatedFields": {
                "avg_year": {
                    "operator": "AVG",
                    "field": {"$func": {"EXTRACT": ["YEAR", {"$field": "orders.placed_at"}]}}
                }
            }
        }),
        &config(),
    )
    .unwrap();
    assert_eq!(
        statement.sql,
        "SELECT AVG(EXTRACT(YEAR FROM orders.placed_at)) AS \"avg_year\" FROM orders"
    );
}

#[test]
fn condition_emits_before_group_by() {
    let statement = build_aggregation(
        &json!({
            "table": "orders",
            "groupBy": ["orders.user_id"],
            "aggregatedFields": {"n": {"operator": "COUNT", "field": "*"}},
            "condition": {"orders.total": {"$gt": 100}}
        }),
        &config(),
    )
    .unwrap();
    assert_eq!(
        statement.sql,
        "SELECT orders.user_id AS \"orders.user_id\", COUNT(*) AS \"n\" FROM orders \
         WHERE orders.total > 100 GROUP BY orders.user_id"
    );
}

#[test]
fn star_requires_count() {
    let err = build_aggregation(
        &json!({
            "table": "orders",
            "aggregatedFields": {"oops": {"operator": "SUM", "field": "*"}}
        }),
        &config(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("cannot be applied"));
}

#[test]
fn empty_aggregation_is_rejected() {
    let err = build_aggregation(
        &json!({"table": "orders", "aggregatedFields": {}}),
        &config(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::EmptySelection));
}
