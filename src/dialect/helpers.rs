//! Shared helper functions for dialect implementations.

/// Quote an alias with double quotes (ANSI style). Used by all dialects:
/// aliases are always double-quoted regardless of identifier style.
pub fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote a string literal with single quotes, `''` for escaping.
pub fn quote_string_single(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// `LIMIT n OFFSET m` in whichever combination is present.
pub fn limit_offset_standard(limit: Option<u64>, offset: Option<u64>) -> Option<String> {
    match (limit, offset) {
        (Some(l), Some(o)) => Some(format!("LIMIT {} OFFSET {}", l, o)),
        (Some(l), None) => Some(format!("LIMIT {}", l)),
        (None, Some(o)) => Some(format!("OFFSET {}", o)),
        (None, None) => None,
    }
}

/// Chain of `->'seg'` accessors; the final segment uses `->>'seg'` when the
/// leaf is read as text.
pub fn json_operator_chain(base: &str, segments: &[&str], as_text: bool) -> String {
    let mut sql = base.to_string();
    for (i, segment) in segments.iter().enumerate() {
        let last = i + 1 == segments.len();
        if last && as_text {
            sql.push_str("->>");
        } else {
            sql.push_str("->");
        }
        sql.push('\'');
        sql.push_str(segment);
        sql.push('\'');
    }
    sql
}
