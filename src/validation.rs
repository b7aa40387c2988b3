//! Validators for literals and names.
//!
//! Literal gates (UUID, date, timestamp) run during recognition so malformed
//! values fail before any SQL is assembled. Dates are checked for calendar
//! correctness, including the Gregorian leap-year rule.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

static UUID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .unwrap()
});

static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").unwrap());

static TIMESTAMP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})-(\d{2})-(\d{2})T(\d{2}):(\d{2}):(\d{2})(\.\d{1,6})?$").unwrap()
});

/// Identifier, optional dotted prefix segments, optional trailing `->`
/// JSON-path segments.
static FIELD_PATH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*(->[A-Za-z_][A-Za-z0-9_]*)*$")
        .unwrap()
});

static IDENTIFIER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

static FUNCTION_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z_][A-Z0-9_]*$").unwrap());

// =============================================================================
// UUID
// =============================================================================

pub fn is_valid_uuid(raw: &str) -> bool {
    UUID_PATTERN.is_match(raw)
}

pub fn ensure_uuid(raw: &str) -> Result<()> {
    if is_valid_uuid(raw) {
        Ok(())
    } else {
        Err(Error::InvalidLiteral {
            kind: "UUID",
            value: raw.to_string(),
        })
    }
}

// =============================================================================
// Dates and timestamps
// =============================================================================

fn is_leap_year(year: u32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

fn days_in_month(year: u32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 0,
    }
}

fn check_calendar_date(year: u32, month: u32, day: u32) -> bool {
    (1..=12).contains(&month) && day >= 1 && day <= days_in_month(year, month)
}

pub fn is_valid_date(raw: &str) -> bool {
    let Some(caps) = DATE_PATTERN.captures(raw) else {
        return false;
    };
    let year: u32 = caps[1].parse().unwrap_or(0);
    let month: u32 = caps[2].parse().unwrap_or(0);
    let day: u32 = caps[3].parse().unwrap_or(0);
    check_calendar_date(year, month, day)
}

pub fn ensure_date(raw: &str) -> Result<()> {
    if is_valid_date(raw) {
        Ok(())
    } else {
        Err(Error::InvalidLiteral {
            kind: "date",
            value: raw.to_string(),
        })
    }
}

pub fn is_valid_timestamp(raw: &str) -> bool {
    let Some(caps) = TIMESTAMP_PATTERN.captures(raw) else {
        return false;
    };
    let year: u32 = caps[1].parse().unwrap_or(0);
    let month: u32 = caps[2].parse().unwrap_or(0);
    let day: u32 = caps[3].parse().unwrap_or(0);
    let hour: u32 = caps[4].parse().unwrap_or(99);
    let minute: u32 = caps[5].parse().unwrap_or(99);
    let second: u32 = caps[6].parse().unwrap_or(99);
    check_calendar_date(year, month, day) && hour <= 23 && minute <= 59 && second <= 59
}

pub fn ensure_timestamp(raw: &str) -> Result<()> {
    if is_valid_timestamp(raw) {
        Ok(())
    } else {
        Err(Error::InvalidLiteral {
            kind: "timestamp",
            value: raw.to_string(),
        })
    }
}

// =============================================================================
// Names
// =============================================================================

pub fn is_valid_identifier(raw: &str) -> bool {
    IDENTIFIER_PATTERN.is_match(raw)
}

pub fn is_valid_field_path(raw: &str) -> bool {
    FIELD_PATH_PATTERN.is_match(raw)
}

/// Shape check only; catalog membership is checked during lowering.
pub fn is_valid_function_name(raw: &str) -> bool {
    FUNCTION_NAME_PATTERN.is_match(raw)
}
