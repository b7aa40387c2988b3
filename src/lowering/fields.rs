//! Field-path resolution.
//!
//! A path is `col`, `table.col`, or a JSON traversal (`table.col.a.b` or
//! `table.col->a->b`). A head that names a relationship partner of the
//! current table triggers LEFT JOIN synthesis through
//! [`ParserState::ensure_join`]. Dotted names beyond two components denote
//! JSON traversal, not further table hops.
//!
//! Under a data-table configuration every logical column lowers to a JSON
//! access on the physical storage column, cast back to its declared type.

use super::{ParserState, Typed};
use crate::config::SemanticType;
use crate::dialect::SqlDialect;
use crate::error::{Error, Result};

/// Resolve a field path in the context of `current` (an effective table
/// name), synthesizing joins as needed.
pub fn resolve_field(path: &str, current: &str, state: &mut ParserState) -> Result<Typed> {
    if path == "NEW_ROW" || path.starts_with("NEW_ROW.") {
        return Err(Error::InvalidNewRowReference);
    }

    let (head, arrow_segments) = split_arrows(path);
    let dot_parts: Vec<&str> = head.split('.').collect();

    let (table, column, dot_segments) = locate(&dot_parts, current, state)?;

    let config_table = state.config_table_of(&table).to_string();
    let field = state.config.field(&config_table, &column)?;
    let field_type = field.field_type;

    let mut json_segments: Vec<&str> = dot_segments;
    json_segments.extend(arrow_segments);

    if !json_segments.is_empty() && field_type != SemanticType::Object {
        return Err(Error::NotAJsonField {
            table: config_table,
            field: column,
        });
    }

    let typed = if let Some(data_table) = &state.config.data_table {
        // Logical column lives inside the physical JSON storage column.
        let base = format!("{}.{}", data_table.table, data_table.data_field);
        let mut segments = vec![column.as_str()];
        segments.extend(json_segments.iter().copied());
        let accessed = state.dialect.json_access(&base, &segments, true);
        if !json_segments.is_empty() {
            Typed::json_leaf(accessed, SemanticType::String)
        } else if field_type == SemanticType::String {
            Typed::new(accessed, SemanticType::String)
        } else {
            Typed::new(state.dialect.cast_expr(&accessed, field_type), field_type)
        }
    } else if json_segments.is_empty() {
        Typed::new(format!("{}.{}", table, column), field_type)
    } else {
        let base = format!("{}.{}", table, column);
        let accessed = state.dialect.json_access(&base, &json_segments, true);
        Typed::json_leaf(accessed, SemanticType::String)
    };

    state.record(&typed.sql, typed.ty)?;
    Ok(typed)
}

/// Split `a.b->c->d` into the dotted head and the arrow segments.
fn split_arrows(path: &str) -> (&str, Vec<&str>) {
    let mut parts = path.split("->");
    let head = parts.next().unwrap_or(path);
    (head, parts.collect())
}

/// Decide which table a dotted head refers to, in resolution order:
/// the current table itself, an enclosing query's table, a relationship
/// partner (join synthesis), then a JSON field of the current table.
fn locate<'p>(
    dot_parts: &[&'p str],
    current: &str,
    state: &mut ParserState,
) -> Result<(String, String, Vec<&'p str>)> {
    if dot_parts.len() == 1 {
        return Ok((current.to_string(), dot_parts[0].to_string(), Vec::new()));
    }

    let head = dot_parts[0];
    let rest: Vec<&str> = dot_parts[2..].to_vec();

    if head == current || head == state.root_table {
        return Ok((head.to_string(), dot_parts[1].to_string(), rest));
    }

    if state.outer_table(head).is_some() {
        return Ok((head.to_string(), dot_parts[1].to_string(), rest));
    }

    let current_config = state.config_table_of(current).to_string();
    if state.config.relationship(&current_config, head).is_some() {
        let effective = state.ensure_join(current, head)?;
        return Ok((effective, dot_parts[1].to_string(), rest));
    }

    // Not a table in scope: a two-plus component name over a JSON field.
    if state
        .config
        .table(&current_config)?
        .field(head)
        .is_some()
    {
        return Ok((
            current.to_string(),
            head.to_string(),
            dot_parts[1..].to_vec(),
        ));
    }

    if state.config.tables.contains_key(head) {
        Err(Error::NoRelationship {
            from: current_config,
            to: head.to_string(),
        })
    } else {
        Err(Error::UnknownTable(head.to_string()))
    }
}
