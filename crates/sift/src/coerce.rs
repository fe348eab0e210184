//! Conversion of loosely typed operands into a field's kind.
//!
//! Operands often arrive as user-entered text. Numbers and booleans have a
//! defined fallback when the text is unusable; dates and everything else
//! fail with [`SiftError::Coercion`].

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, SiftError};
use crate::schema::{FieldKind, NumberKind};
use crate::tagged::TaggedValue;

// Years before this are read as Solar Hijri dates.
const GREGORIAN_FROM_YEAR: i32 = 1700;

static DATE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(\d{1,4})[-/.](\d{1,2})[-/.](\d{1,2})(?:[T ]+(\d{1,2}):(\d{1,2})(?::(\d{1,2})(?:\.(\d{1,9}))?)?)?$",
    )
    .expect("date pattern is valid")
});

/// Coerces `value` into `kind`.
///
/// Values already of the right kind, and nulls, are returned unchanged.
pub fn coerce(value: TaggedValue, kind: &FieldKind, nullable: bool) -> Result<TaggedValue> {
    if value.is_null() || kind_matches(&value, kind) {
        return Ok(value);
    }

    match kind {
        FieldKind::String => match value {
            TaggedValue::List(_) => Err(coercion_error(&value, kind)),
            other => Ok(TaggedValue::String(normalize_digits(&other.to_plain_text()))),
        },
        FieldKind::Number(number_kind) => Ok(TaggedValue::Number(coerce_number(
            &value.to_plain_text(),
            *number_kind,
        ))),
        FieldKind::Bool => Ok(coerce_bool(&value.to_plain_text(), nullable)),
        FieldKind::Date => {
            let text = normalize_digits(&value.to_plain_text());
            parse_date(&text)
                .map(TaggedValue::Date)
                .ok_or_else(|| coercion_error(&value, kind))
        }
        FieldKind::Collection(element) => match value {
            TaggedValue::List(items) => items
                .into_iter()
                .map(|item| coerce(item, element, true))
                .collect::<Result<Vec<_>>>()
                .map(TaggedValue::List),
            other => Err(coercion_error(&other, kind)),
        },
        FieldKind::Entity(_) => Err(coercion_error(&value, kind)),
    }
}

/// Decodes a membership operand into elements of the field's kind.
///
/// Returns `None` when the operand is not a collection.
pub fn coerce_members(value: TaggedValue, element: &FieldKind) -> Option<Result<Vec<TaggedValue>>> {
    match value {
        TaggedValue::List(items) => Some(
            items
                .into_iter()
                .map(|item| coerce(item, element, true))
                .collect(),
        ),
        _ => None,
    }
}

fn kind_matches(value: &TaggedValue, kind: &FieldKind) -> bool {
    match (value, kind) {
        (TaggedValue::String(_), FieldKind::String)
        | (TaggedValue::Number(_), FieldKind::Number(_))
        | (TaggedValue::Bool(_), FieldKind::Bool)
        | (TaggedValue::Date(_), FieldKind::Date) => true,
        (TaggedValue::List(items), FieldKind::Collection(element)) => {
            items.iter().all(|item| item.is_null() || kind_matches(item, element))
        }
        _ => false,
    }
}

fn coercion_error(value: &TaggedValue, kind: &FieldKind) -> SiftError {
    SiftError::Coercion {
        value: value.to_text(),
        kind: kind.name(),
    }
}

/// Maps Persian and Arabic-Indic digits to ASCII and drops thousands separators.
pub fn normalize_digits(text: &str) -> String {
    text.chars()
        .filter(|c| *c != ',')
        .map(|c| match c {
            '\u{06F0}'..='\u{06F9}' => char::from(b'0' + (c as u32 - 0x06F0) as u8),
            '\u{0660}'..='\u{0669}' => char::from(b'0' + (c as u32 - 0x0660) as u8),
            other => other,
        })
        .collect()
}

/// Parses numeric text into `kind`, falling back to the kind's minimum.
///
/// Everything other than digits, the decimal point, and a leading minus
/// sign is stripped before parsing.
pub fn coerce_number(text: &str, kind: NumberKind) -> crate::value::Number {
    let normalized = normalize_digits(text);
    let trimmed = normalized.trim();
    let negative = trimmed.starts_with('-');
    let digits: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let candidate = if negative {
        format!("-{digits}")
    } else {
        digits
    };

    match kind.parse(&candidate) {
        Some(number) => number,
        None => {
            tracing::debug!(input = text, ?kind, "numeric coercion failed, using minimum value");
            kind.min_value()
        }
    }
}

/// Parses boolean text; empty text into a nullable target yields `Null`.
pub fn coerce_bool(text: &str, nullable: bool) -> TaggedValue {
    let trimmed = text.trim();
    if trimmed.is_empty() && nullable {
        return TaggedValue::Null;
    }
    if trimmed.eq_ignore_ascii_case("true") {
        TaggedValue::Bool(true)
    } else if trimmed.eq_ignore_ascii_case("false") {
        TaggedValue::Bool(false)
    } else {
        tracing::debug!(input = text, "boolean coercion failed, using false");
        TaggedValue::Bool(false)
    }
}

/// Parses a Gregorian or Solar Hijri date, with an optional time of day.
///
/// Accepts RFC 3339 and `year-month-day` with `-`, `/` or `.` separators.
/// A year before 1700 is taken as Solar Hijri and converted.
pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.naive_utc());
    }

    let caps = DATE_PATTERN.captures(text)?;
    let number = |i: usize| -> Option<u32> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };

    let year = i32::try_from(number(1)?).ok()?;
    let month = number(2)?;
    let day = number(3)?;
    let date = if year >= GREGORIAN_FROM_YEAR {
        NaiveDate::from_ymd_opt(year, month, day)?
    } else {
        jalali_to_gregorian(year, month, day)?
    };

    let nanos = match caps.get(7) {
        // Right-pad the fraction to nanoseconds.
        Some(m) => format!("{:0<9}", m.as_str()).parse().ok()?,
        None => 0,
    };
    let time = NaiveTime::from_hms_nano_opt(number(4)?, number(5)?, number(6)?, nanos)?;
    Some(date.and_time(time))
}

/// Converts a Solar Hijri (Jalali) calendar date to a Gregorian date.
fn jalali_to_gregorian(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let month_len = match month {
        1..=6 => 31,
        7..=11 => 30,
        12 => 30,
        _ => return None,
    };
    if year < 1 || day == 0 || day > month_len {
        return None;
    }

    let (jm, jd) = (i64::from(month), i64::from(day));
    let jy = i64::from(year) + 1595;
    let mut days = -355_668 + 365 * jy + (jy / 33) * 8 + ((jy % 33) + 3) / 4 + jd;
    days += if jm < 7 {
        (jm - 1) * 31
    } else {
        (jm - 7) * 30 + 186
    };

    let mut gy = 400 * (days / 146_097);
    days %= 146_097;
    if days > 36_524 {
        days -= 1;
        gy += 100 * (days / 36_524);
        days %= 36_524;
        if days >= 365 {
            days += 1;
        }
    }
    gy += 4 * (days / 1_461);
    days %= 1_461;
    if days > 365 {
        gy += (days - 1) / 365;
        days = (days - 1) % 365;
    }

    let gy = i32::try_from(gy).ok()?;
    NaiveDate::from_ymd_opt(gy, 1, 1)?.checked_add_days(chrono::Days::new(u64::try_from(days).ok()?))
}
