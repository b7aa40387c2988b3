//! Data-table virtualization: one physical JSON-storage table serving
//! multiple logical tables through a discriminator column.

use sdql::{build_aggregation, build_delete, build_insert, build_select, Config, Error};
use serde_json::json;

fn config() -> Config {
    Config::from_value(json!({
        "dialect": "postgresql",
        "tables": {
            "tasks": {
                "allowedFields": [
                    {"name": "title", "type": "string", "nullable": false},
                    {"name": "priority", "type": "number", "nullable": true},
                    {"name": "done", "type": "boolean", "nullable": false}
                ]
            },
            "notes": {
                "allowedFields": [
                    {"name": "body", "type": "string", "nullable": false},
                    {"name": "archived", "type": "boolean", "nullable": false}
                ],
                "constraints": {"notes.archived": {"$eq": false}}
            }
        },
        "dataTable": {"table": "app_data", "tableField": "table_name", "dataField": "data"}
    }))
    .unwrap()
}

#[test]
fn select_virtualizes_columns_and_discriminates() {
    let statement = build_select(
        &json!({
            "rootTable": "tasks",
            "selection": {"title": true, "priority": true}
        }),
        &config(),
    )
    .unwrap();
    assert_eq!(
        statement.sql,
        "SELECT app_data.data->>'title' AS \"title\", \
         (app_data.data->>'priority')::DOUBLE PRECISION AS \"priority\" \
         FROM app_data WHERE app_data.table_name = 'tasks'"
    );
}

#[test]
fn condition_lowers_through_json_storage() {
    let statement = build_select(
        &json!({
            "rootTable": "tasks",
            "selection": {"title": true},
            "condition": {"tasks.done": {"$eq": true}}
        }),
        &config(),
    )
    .unwrap();
    assert_eq!(
        statement.sql,
        "SELECT app_data.data->>'title' AS \"title\" FROM app_data \
         WHERE app_data.table_name = 'tasks' \
         AND (app_data.data->>'done')::BOOLEAN = TRUE"
    );
}

#[test]
fn table_constraints_are_implied() {
    let statement = build_select(
        &json!({
            "rootTable": "notes",
            "selection": {"body": true}
        }),
        &config(),
    )
    .unwrap();
    assert_eq!(
        statement.sql,
        "SELECT app_data.data->>'body' AS \"body\" FROM app_data \
         WHERE app_data.table_name = 'notes' \
         AND (app_data.data->>'archived')::BOOLEAN = FALSE"
    );
}

#[test]
fn aggregation_over_logical_table() {
    let statement = build_aggregation(
        &json!({
            "table": "tasks",
            "groupBy": ["tasks.done"],
            "aggregatedFields": {"n": {"operator": "COUNT", "field": "*"}}
        }),
        &config(),
    )
    .unwrap();
    assert_eq!(
        statement.sql,
        "SELECT (app_data.data->>'done')::BOOLEAN AS \"tasks.done\", COUNT(*) AS \"n\" \
         FROM app_data WHERE app_data.table_name = 'tasks' \
         GROUP BY (app_data.data->>'done')::BOOLEAN"
    );
}

#[test]
fn exists_against_sibling_logical_table() {
    let statement = build_select(
        &json!({
            "rootTable": "tasks",
            "selection": {"title": true},
            "condition": {"$exists": {
                "table": "notes",
                "condition": {"notes.body": {"$ne": null}}
            }}
        }),
        &config(),
    )
    .unwrap();
    assert_eq!(
        statement.sql,
        "SELECT app_data.data->>'title' AS \"title\" FROM app_data \
         WHERE app_data.table_name = 'tasks' \
         AND EXISTS (SELECT 1 FROM app_data WHERE app_data.table_name = 'notes' \
         AND (app_data.data->>'archived')::BOOLEAN = FALSE \
         AND app_data.data->>'body' IS NOT NULL)"
    );
}

#[test]
fn mutations_are_not_supported() {
    let config = config();
    assert!(matches!(
        build_insert(
            &json!({"table": "tasks", "newRow": {"title": "x", "done": false}}),
            &config
        ),
        Err(Error::DataTableUnsupported("INSERT"))
    ));
    assert!(matches!(
        build_delete(&json!({"table": "tasks"}), &config),
        Err(Error::DataTableUnsupported("DELETE"))
    ));
}
