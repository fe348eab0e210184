//! Owned, typed operand values with a canonical text form.
//!
//! A [`TaggedValue`] is what a condition node compares against. It keeps the
//! typed value only; the serialized text is always derived from it, so the
//! two can never drift apart.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, SiftError};
use crate::value::{Number, Value};

// RFC 3339 in UTC, so the text is never mistaken for a Solar Hijri date.
const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Typed operand of a condition node.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TaggedValue {
    /// No value.
    #[default]
    Null,
    /// Text value.
    String(String),
    /// Numeric value.
    Number(Number),
    /// Boolean value.
    Bool(bool),
    /// Date and time value.
    Date(NaiveDateTime),
    /// Collection value, used by membership operators.
    List(Vec<TaggedValue>),
}

impl TaggedValue {
    /// Returns `true` if this is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, TaggedValue::Null)
    }

    /// Short name of the variant, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            TaggedValue::Null => "null",
            TaggedValue::String(_) => "string",
            TaggedValue::Number(_) => "number",
            TaggedValue::Bool(_) => "bool",
            TaggedValue::Date(_) => "date",
            TaggedValue::List(_) => "collection",
        }
    }

    /// Plain text of a scalar, as a user would have typed it.
    ///
    /// Strings are returned verbatim, other scalars in their canonical form.
    /// Collections render as their serialized text.
    pub fn to_plain_text(&self) -> String {
        match self {
            TaggedValue::Null => String::new(),
            TaggedValue::String(s) => s.clone(),
            TaggedValue::Number(n) => n.to_string(),
            TaggedValue::Bool(b) => b.to_string(),
            TaggedValue::Date(d) => d.format(DATE_FORMAT).to_string(),
            TaggedValue::List(_) => self.to_text(),
        }
    }

    /// Canonical serialized text (JSON).
    ///
    /// Non-finite numbers have no JSON form and render as quoted text;
    /// [`TaggedValue::try_to_text`] rejects them instead.
    pub fn to_text(&self) -> String {
        match self.to_json(false) {
            Ok(json) => json.to_string(),
            Err(_) => String::new(),
        }
    }

    /// Canonical serialized text, failing for NaN and infinite numbers.
    pub fn try_to_text(&self) -> Result<String> {
        self.to_json(true).map(|json| json.to_string())
    }

    /// Decodes serialized text. Empty text decodes to `Null`.
    pub fn from_text(text: &str) -> Result<TaggedValue> {
        if text.trim().is_empty() {
            return Ok(TaggedValue::Null);
        }
        let json: serde_json::Value = serde_json::from_str(text)?;
        TaggedValue::from_json(json)
    }

    fn to_json(&self, strict: bool) -> Result<serde_json::Value> {
        Ok(match self {
            TaggedValue::Null => serde_json::Value::Null,
            TaggedValue::String(s) => serde_json::Value::String(s.clone()),
            TaggedValue::Number(Number::I64(n)) => serde_json::Value::from(*n),
            TaggedValue::Number(Number::U64(n)) => serde_json::Value::from(*n),
            TaggedValue::Number(Number::F64(n)) => match serde_json::Number::from_f64(*n) {
                Some(number) => serde_json::Value::Number(number),
                None if strict => {
                    return Err(SiftError::SerializedValue(format!("{n} has no JSON form")))
                }
                None => serde_json::Value::String(n.to_string()),
            },
            TaggedValue::Bool(b) => serde_json::Value::Bool(*b),
            TaggedValue::Date(d) => serde_json::Value::String(d.format(DATE_FORMAT).to_string()),
            TaggedValue::List(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(|item| item.to_json(strict))
                    .collect::<Result<_>>()?,
            ),
        })
    }

    fn from_json(json: serde_json::Value) -> Result<TaggedValue> {
        Ok(match json {
            serde_json::Value::Null => TaggedValue::Null,
            serde_json::Value::Bool(b) => TaggedValue::Bool(b),
            serde_json::Value::String(s) => TaggedValue::String(s),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    TaggedValue::Number(Number::I64(i))
                } else if let Some(u) = n.as_u64() {
                    TaggedValue::Number(Number::U64(u))
                } else {
                    let f = n
                        .as_f64()
                        .ok_or_else(|| SiftError::SerializedValue(n.to_string()))?;
                    TaggedValue::Number(Number::F64(f))
                }
            }
            serde_json::Value::Array(items) => TaggedValue::List(
                items
                    .into_iter()
                    .map(TaggedValue::from_json)
                    .collect::<Result<_>>()?,
            ),
            serde_json::Value::Object(_) => {
                return Err(SiftError::SerializedValue(
                    "objects are not supported as operands".to_string(),
                ))
            }
        })
    }

    /// Value-level equality against a live field value.
    ///
    /// Numbers compare across variants and lists compare element-wise;
    /// mismatched kinds never match.
    pub fn matches_value(&self, value: &Value<'_>) -> bool {
        match (self, value) {
            (TaggedValue::String(a), Value::String(b)) => a == b,
            (TaggedValue::Number(a), Value::Number(b)) => {
                b.compare(*a) == Some(std::cmp::Ordering::Equal)
            }
            (TaggedValue::Bool(a), Value::Bool(b)) => a == b,
            (TaggedValue::Date(a), Value::Date(b)) => a == b,
            (TaggedValue::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.matches_value(y))
            }
            (TaggedValue::Null, Value::Null) => true,
            _ => false,
        }
    }
}

impl fmt::Display for TaggedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

/// Serializes as its canonical text, so trees carry `serializedValue` strings.
impl Serialize for TaggedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let text = self.try_to_text().map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&text)
    }
}

impl<'de> Deserialize<'de> for TaggedValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = Option::<String>::deserialize(deserializer)?;
        match text {
            Some(text) => TaggedValue::from_text(&text).map_err(serde::de::Error::custom),
            None => Ok(TaggedValue::Null),
        }
    }
}

impl From<&str> for TaggedValue {
    fn from(s: &str) -> Self {
        TaggedValue::String(s.to_string())
    }
}

impl From<String> for TaggedValue {
    fn from(s: String) -> Self {
        TaggedValue::String(s)
    }
}

impl From<bool> for TaggedValue {
    fn from(b: bool) -> Self {
        TaggedValue::Bool(b)
    }
}

impl From<Number> for TaggedValue {
    fn from(n: Number) -> Self {
        TaggedValue::Number(n)
    }
}

impl From<NaiveDateTime> for TaggedValue {
    fn from(d: NaiveDateTime) -> Self {
        TaggedValue::Date(d)
    }
}

impl From<NaiveDate> for TaggedValue {
    fn from(d: NaiveDate) -> Self {
        TaggedValue::Date(d.and_time(NaiveTime::MIN))
    }
}

impl<T: Into<TaggedValue>> From<Option<T>> for TaggedValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(TaggedValue::Null)
    }
}

impl<T: Into<TaggedValue>> From<Vec<T>> for TaggedValue {
    fn from(v: Vec<T>) -> Self {
        TaggedValue::List(v.into_iter().map(Into::into).collect())
    }
}

macro_rules! tagged_from_number {
    ($($t:ty),*) => {
        $(
            impl From<$t> for TaggedValue {
                fn from(n: $t) -> Self {
                    TaggedValue::Number(Number::from(n))
                }
            }
        )*
    };
}

tagged_from_number!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_text() {
        assert_eq!(TaggedValue::Null.to_text(), "null");
        assert_eq!(TaggedValue::from("abc").to_text(), "\"abc\"");
        assert_eq!(TaggedValue::from(12i32).to_text(), "12");
        assert_eq!(TaggedValue::from(1.5f64).to_text(), "1.5");
        assert_eq!(TaggedValue::from(true).to_text(), "true");
        assert_eq!(TaggedValue::from(vec![1u8, 2]).to_text(), "[1,2]");
    }

    #[test]
    fn date_text_is_iso() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(TaggedValue::from(d).to_text(), "\"2024-03-05T00:00:00Z\"");
    }

    #[test]
    fn early_gregorian_dates_keep_their_calendar() {
        let d = NaiveDate::from_ymd_opt(1600, 1, 1).unwrap();
        let text = TaggedValue::from(d).to_plain_text();
        assert_eq!(text, "1600-01-01T00:00:00Z");
        assert_eq!(
            crate::coerce::parse_date(&text),
            Some(d.and_time(NaiveTime::MIN))
        );
    }

    #[test]
    fn non_finite_numbers_do_not_serialize() {
        let nan = TaggedValue::from(f64::NAN);
        assert!(matches!(nan.try_to_text(), Err(SiftError::SerializedValue(_))));
        assert!(serde_json::to_string(&nan).is_err());
        assert!(serde_json::to_string(&TaggedValue::from(vec![1.0, f64::INFINITY])).is_err());
        assert_eq!(nan.to_text(), "\"NaN\"");
    }

    #[test]
    fn decode_text() {
        assert_eq!(TaggedValue::from_text("").unwrap(), TaggedValue::Null);
        assert_eq!(TaggedValue::from_text("null").unwrap(), TaggedValue::Null);
        assert_eq!(
            TaggedValue::from_text("-4").unwrap(),
            TaggedValue::Number(Number::I64(-4))
        );
        assert_eq!(
            TaggedValue::from_text("18446744073709551615").unwrap(),
            TaggedValue::Number(Number::U64(u64::MAX))
        );
        assert_eq!(
            TaggedValue::from_text("[\"a\", true]").unwrap(),
            TaggedValue::List(vec![TaggedValue::from("a"), TaggedValue::Bool(true)])
        );
        assert!(TaggedValue::from_text("{\"a\": 1}").is_err());
        assert!(TaggedValue::from_text("not json").is_err());
    }

    #[test]
    fn plain_text_keeps_strings_verbatim() {
        assert_eq!(TaggedValue::from(" 12 ").to_plain_text(), " 12 ");
        assert_eq!(TaggedValue::from(7u8).to_plain_text(), "7");
        assert_eq!(TaggedValue::Null.to_plain_text(), "");
    }

    #[test]
    fn serde_uses_text_form() {
        let json = serde_json::to_string(&TaggedValue::from("x")).unwrap();
        assert_eq!(json, "\"\\\"x\\\"\"");
        let back: TaggedValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TaggedValue::from("x"));
        let null: TaggedValue = serde_json::from_str("null").unwrap();
        assert!(null.is_null());
    }

    #[test]
    fn matches_live_values() {
        assert!(TaggedValue::from(3i64).matches_value(&Value::Number(Number::U64(3))));
        assert!(!TaggedValue::from("3").matches_value(&Value::Number(Number::U64(3))));
        assert!(TaggedValue::from(false).matches_value(&Value::Bool(false)));
    }
}
