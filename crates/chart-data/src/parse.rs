// File: crates/chart-data/src/parse.rs
// Summary: Converts raw input values into parsed values according to the declared dimension type.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::ordinal::OrdinalRegistry;
use crate::types::{DimensionType, ParsedValue, RawValue};

/// Parse one raw cell for a dimension of `dim_type`.
///
/// Missing or unparseable input becomes NaN; nothing here fails.
#[inline]
pub fn parse_data_value(
    raw: &RawValue,
    dim_type: DimensionType,
    ordinal_meta: Option<&OrdinalRegistry>,
) -> ParsedValue {
    match dim_type {
        DimensionType::Ordinal => match ordinal_meta {
            Some(meta) => ParsedValue::Number(meta.parse_and_collect(raw)),
            None => raw_unchanged(raw),
        },
        DimensionType::Time => ParsedValue::Number(match raw {
            RawValue::Number(n) => n.as_f64().unwrap_or(f64::NAN),
            RawValue::String(s) => parse_date(s),
            _ => f64::NAN,
        }),
        _ => ParsedValue::Number(coerce_number(raw)),
    }
}

fn raw_unchanged(raw: &RawValue) -> ParsedValue {
    match raw {
        RawValue::Number(n) => ParsedValue::Number(n.as_f64().unwrap_or(f64::NAN)),
        RawValue::String(s) => ParsedValue::from(s.as_str()),
        RawValue::Bool(b) => ParsedValue::from(if *b { "true" } else { "false" }),
        _ => ParsedValue::NAN,
    }
}

/// Numeric coercion with script-like rules: `null` and `""` are NaN, booleans are 0/1,
/// strings must be a complete numeric literal.
pub fn coerce_number(raw: &RawValue) -> f64 {
    match raw {
        RawValue::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        RawValue::String(s) if s.is_empty() => f64::NAN,
        RawValue::String(s) => str_to_number(s),
        RawValue::Bool(b) => f64::from(u8::from(*b)),
        _ => f64::NAN,
    }
}

pub fn str_to_number(s: &str) -> f64 {
    let t = s.trim();
    if t.is_empty() {
        return 0.0;
    }
    match t {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    let (radix, digits) = match t.get(..2) {
        Some("0x") | Some("0X") => (16, &t[2..]),
        Some("0o") | Some("0O") => (8, &t[2..]),
        Some("0b") | Some("0B") => (2, &t[2..]),
        _ => (10, t),
    };
    if radix != 10 {
        return u64::from_str_radix(digits, radix).map(|v| v as f64).unwrap_or(f64::NAN);
    }
    // Rust also accepts "inf"/"nan" spellings that are not numeric literals here.
    if t.bytes().any(|b| b.is_ascii_alphabetic() && b != b'e' && b != b'E') {
        return f64::NAN;
    }
    t.parse::<f64>().unwrap_or(f64::NAN)
}

/// Parse a date string into epoch milliseconds.
///
/// Accepts `yyyy`, `yyyy-MM`, `yyyy-MM-dd`, optionally followed by `T` or a space and
/// `HH[:mm[:ss[.SSS]]]` with an optional `Z` / `+HH:mm` suffix. `/` may replace `-`.
/// Times without an offset are read as UTC.
pub fn parse_date(s: &str) -> f64 {
    parse_date_millis(s.trim()).map_or(f64::NAN, |ms| ms as f64)
}

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%dT%H:%M%:z",
];

const LOCAL_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

fn parse_date_millis(s: &str) -> Option<i64> {
    let bytes = s.as_bytes();
    if bytes.len() < 4 || !bytes[..4].iter().all(u8::is_ascii_digit) || bytes.get(4).is_some_and(u8::is_ascii_digit) {
        return None;
    }
    let mut s = s.replace('/', "-").replacen(' ', "T", 1).replace(',', ".");

    if let Some(t) = s.find('T') {
        // chrono wants minutes; a bare hour reads as `HH:00`.
        let hour_end = t + 1 + s[t + 1..].bytes().take_while(u8::is_ascii_digit).count();
        if !s[hour_end..].starts_with(':') {
            s.insert_str(hour_end, ":00");
        }
        if let Some(local) = s.strip_suffix(|c: char| c == 'Z' || c == 'z') {
            return parse_local(local).map(|dt| dt.and_utc().timestamp_millis());
        }
        if let Some(dt) = OFFSET_FORMATS.iter().find_map(|f| DateTime::parse_from_str(&s, f).ok()) {
            return Some(dt.timestamp_millis());
        }
    }
    parse_local(&s).map(|dt| dt.and_utc().timestamp_millis())
}

fn parse_local(s: &str) -> Option<NaiveDateTime> {
    if let Some(dt) = LOCAL_FORMATS.iter().find_map(|f| NaiveDateTime::parse_from_str(s, f).ok()) {
        return Some(dt);
    }
    // `yyyy-MM-dd`, then `yyyy-MM` and `yyyy` padded to the first day.
    ["", "-1", "-1-1"]
        .iter()
        .find_map(|pad| NaiveDate::parse_from_str(&format!("{s}{pad}"), "%Y-%m-%d").ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Format a number the way category keys are spelled: integers without a fraction.
pub fn number_to_key(n: f64) -> String {
    if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{n:.0}")
    } else {
        format!("{n}")
    }
}
