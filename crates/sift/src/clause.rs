//! Compiled leaf conditions.
//!
//! A [`Clause`] is one condition node after compilation: a resolved selector,
//! an operator, and an operand already coerced to the field's kind. It is
//! the only place where operator semantics live.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::coerce::{coerce, coerce_members};
use crate::error::{Result, SiftError};
use crate::op::Op;
use crate::resolver::ResolvedPath;
use crate::schema::{Entity, FieldKind};
use crate::tagged::TaggedValue;
use crate::value::Value;

/// Where a text operator looks for its needle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextMode {
    Contains,
    Prefix,
    Suffix,
}

#[derive(Debug, Clone)]
enum Test {
    /// Null check; the operand is ignored.
    Null { negate: bool },
    Equal { negate: bool },
    Member { values: Vec<TaggedValue>, negate: bool },
    /// Substring test. Numeric fields are formatted and trimmed first.
    Text {
        mode: TextMode,
        needle: String,
        numeric: bool,
        negate: bool,
    },
    Order,
}

/// A single compiled condition.
///
/// # Example
///
/// ```
/// use sift::{Clause, FieldResolver, Member, Number, Op, Schema, TaggedValue, Value};
/// use std::sync::OnceLock;
///
/// fn schema() -> &'static Schema {
///     static SCHEMA: OnceLock<Schema> = OnceLock::new();
///     SCHEMA.get_or_init(|| Schema::new("Person", vec![Member::field::<u32>("Age")]))
/// }
///
/// let path = FieldResolver::new(schema()).resolve("Age").unwrap();
/// let clause = Clause::compile(path, Op::Like, &TaggedValue::from("12")).unwrap();
/// assert!(clause.matches(&Value::Number(Number::U64(123))));
/// assert!(!clause.matches(&Value::Number(Number::U64(45))));
/// ```
#[derive(Debug, Clone)]
pub struct Clause {
    path: Arc<ResolvedPath>,
    op: Op,
    operand: TaggedValue,
    test: Test,
}

impl Clause {
    /// Compiles `op` applied to `raw` against the field at `path`.
    ///
    /// The operand is coerced to the field kind, or to a collection of it
    /// for the membership operators. `IsNull` and `IsNotNull` ignore it.
    pub fn compile(path: Arc<ResolvedPath>, op: Op, raw: &TaggedValue) -> Result<Clause> {
        let kind = path.kind().clone();
        let unsupported = || SiftError::UnsupportedOperator {
            op,
            kind: kind.name(),
            selector: path.selector().to_string(),
        };

        let (operand, test) = match op {
            Op::IsNull | Op::IsNotNull => (
                TaggedValue::Null,
                Test::Null {
                    negate: op.is_negated(),
                },
            ),

            Op::Equal | Op::NotEqual => {
                let operand = coerce(raw.clone(), &kind, path.nullable())?;
                let negate = op.is_negated();
                if operand.is_null() {
                    (operand, Test::Null { negate })
                } else if matches!(kind, FieldKind::Entity(_)) {
                    return Err(unsupported());
                } else {
                    (operand, Test::Equal { negate })
                }
            }

            Op::Contains | Op::NotContains => {
                if !kind.is_scalar() {
                    return Err(unsupported());
                }
                let values = coerce_members(raw.clone(), &kind).ok_or_else(|| {
                    SiftError::ExpectedCollection {
                        op,
                        selector: path.selector().to_string(),
                        value: raw.to_text(),
                    }
                })??;
                (
                    TaggedValue::List(values.clone()),
                    Test::Member {
                        values,
                        negate: op.is_negated(),
                    },
                )
            }

            Op::Like
            | Op::NotLike
            | Op::StartsWith
            | Op::NotStartsWith
            | Op::EndsWith
            | Op::NotEndsWith => {
                if !matches!(kind, FieldKind::String | FieldKind::Number(_)) {
                    return Err(unsupported());
                }
                let operand = non_null(coerce(raw.clone(), &kind, false)?, &kind)?;
                let mode = match op.positive() {
                    Op::StartsWith => TextMode::Prefix,
                    Op::EndsWith => TextMode::Suffix,
                    _ => TextMode::Contains,
                };
                let test = Test::Text {
                    mode,
                    needle: operand.to_plain_text(),
                    numeric: kind.is_numeric(),
                    negate: op.is_negated(),
                };
                (operand, test)
            }

            Op::GreaterThan | Op::GreaterThanOrEqual | Op::LessThan | Op::LessThanOrEqual => {
                if !matches!(kind, FieldKind::String | FieldKind::Number(_) | FieldKind::Date) {
                    return Err(unsupported());
                }
                let operand = non_null(coerce(raw.clone(), &kind, false)?, &kind)?;
                (operand, Test::Order)
            }

            Op::None => return Err(unsupported()),
        };

        Ok(Clause {
            path,
            op,
            operand,
            test,
        })
    }

    /// The resolved selector.
    pub fn path(&self) -> &ResolvedPath {
        &self.path
    }

    /// The comparison operator.
    pub fn op(&self) -> Op {
        self.op
    }

    /// The coerced operand. `Null` for the null tests.
    pub fn operand(&self) -> &TaggedValue {
        &self.operand
    }

    /// Evaluates this clause against the entity's field value.
    pub fn matches_entity(&self, entity: &dyn Entity) -> bool {
        self.matches(&self.path.get(entity))
    }

    /// Evaluates this clause against a field value.
    ///
    /// Only the null tests accept a null field value.
    pub fn matches(&self, value: &Value<'_>) -> bool {
        match &self.test {
            Test::Null { negate } => value.is_null() != *negate,
            _ if value.is_null() => false,
            Test::Equal { negate } => self.operand.matches_value(value) != *negate,
            Test::Member { values, negate } => {
                values.iter().any(|v| v.matches_value(value)) != *negate
            }
            Test::Text {
                mode,
                needle,
                numeric,
                negate,
            } => match text_of(value, *numeric) {
                Some(text) => {
                    let found = match mode {
                        TextMode::Contains => text.trim().contains(needle.as_str()),
                        TextMode::Prefix => text.trim_start().starts_with(needle.as_str()),
                        TextMode::Suffix => text.trim_end().ends_with(needle.as_str()),
                    };
                    found != *negate
                }
                None => false,
            },
            Test::Order => match order_against(value, &self.operand) {
                Some(ordering) => self.op.eval_ordering(ordering),
                None => false,
            },
        }
    }
}

fn non_null(operand: TaggedValue, kind: &FieldKind) -> Result<TaggedValue> {
    if operand.is_null() {
        return Err(SiftError::Coercion {
            value: operand.to_text(),
            kind: kind.name(),
        });
    }
    Ok(operand)
}

fn text_of(value: &Value<'_>, numeric: bool) -> Option<String> {
    match value {
        Value::String(s) if !numeric => Some((*s).to_string()),
        Value::Number(n) if numeric => Some(n.to_string()),
        _ => None,
    }
}

fn order_against(value: &Value<'_>, operand: &TaggedValue) -> Option<Ordering> {
    match (value, operand) {
        (Value::String(a), TaggedValue::String(b)) => Some((*a).cmp(b.as_str())),
        (Value::Number(a), TaggedValue::Number(b)) => a.compare(*b),
        (Value::Date(a), TaggedValue::Date(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Renders an operand as a SQL literal.
pub(crate) fn sql_literal(value: &TaggedValue) -> String {
    match value {
        TaggedValue::Null => "NULL".to_string(),
        TaggedValue::String(_) | TaggedValue::Date(_) => {
            format!("'{}'", value.to_plain_text().replace('\'', "''"))
        }
        TaggedValue::Number(_) | TaggedValue::Bool(_) => value.to_plain_text(),
        TaggedValue::List(items) => {
            let items: Vec<String> = items.iter().map(sql_literal).collect();
            format!("({})", items.join(", "))
        }
    }
}

/// Escapes LIKE wildcards (and the escape character) with a backslash.
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let selector = self.path.selector();
        match &self.test {
            Test::Null { negate: false } => write!(f, "{selector} IS NULL"),
            Test::Null { negate: true } => write!(f, "{selector} IS NOT NULL"),
            Test::Text {
                mode,
                needle,
                numeric,
                ..
            } => {
                let escaped = escape_like(needle);
                let pattern = match mode {
                    TextMode::Contains => format!("%{escaped}%"),
                    TextMode::Prefix => format!("{escaped}%"),
                    TextMode::Suffix => format!("%{escaped}"),
                };
                let pattern = sql_literal(&TaggedValue::String(pattern));
                let op = self.op.sql();
                match (numeric, mode) {
                    (false, _) => write!(f, "{selector} {op} {pattern}")?,
                    (true, TextMode::Contains) => write!(f, "TRIM(STR({selector})) {op} {pattern}")?,
                    (true, TextMode::Prefix) => write!(f, "LTRIM(STR({selector})) {op} {pattern}")?,
                    (true, TextMode::Suffix) => write!(f, "RTRIM(STR({selector})) {op} {pattern}")?,
                }
                if escaped.len() != needle.len() {
                    write!(f, " ESCAPE '\\'")?;
                }
                Ok(())
            }
            _ => write!(
                f,
                "{selector} {} {}",
                self.op.sql(),
                sql_literal(&self.operand)
            ),
        }
    }
}
