//! Comparison and logical operators for condition nodes.
//!
//! [`Op`] is the per-node comparison, [`LogicalOp`] the combinator that joins
//! a node to the expression built so far. Both carry stable ordinals so that
//! serialized trees stay readable by peers that store them as integers.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::SiftError;

/// Comparison operator of a condition node.
///
/// Operators are grouped by what they do:
/// - **Equality**: `Equal`, `NotEqual` - every field kind
/// - **Membership**: `Contains`, `NotContains` - field value is one of a set
/// - **Text**: `Like`, `StartsWith`, `EndsWith` and negations - string and numeric fields
/// - **Ordering**: `GreaterThan`, `GreaterThanOrEqual`, `LessThan`, `LessThanOrEqual`
/// - **Null tests**: `IsNull`, `IsNotNull` - the stored value is ignored
/// - **Sentinel**: `None` - constant true/false node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Equal = 1,
    NotEqual = 2,
    Contains = 3,
    NotContains = 4,
    Like = 5,
    NotLike = 6,
    StartsWith = 7,
    NotStartsWith = 8,
    EndsWith = 9,
    NotEndsWith = 10,
    GreaterThan = 11,
    GreaterThanOrEqual = 12,
    LessThan = 13,
    LessThanOrEqual = 14,
    IsNull = 15,
    IsNotNull = 16,
    None = 17,
}

const ALL_OPS: [Op; 17] = [
    Op::Equal,
    Op::NotEqual,
    Op::Contains,
    Op::NotContains,
    Op::Like,
    Op::NotLike,
    Op::StartsWith,
    Op::NotStartsWith,
    Op::EndsWith,
    Op::NotEndsWith,
    Op::GreaterThan,
    Op::GreaterThanOrEqual,
    Op::LessThan,
    Op::LessThanOrEqual,
    Op::IsNull,
    Op::IsNotNull,
    Op::None,
];

impl Op {
    /// Returns every operator in ordinal order.
    pub fn all() -> &'static [Op] {
        &ALL_OPS
    }

    /// Wire ordinal of this operator.
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// Looks up an operator by its wire ordinal.
    pub fn from_ordinal(ordinal: u64) -> Option<Op> {
        ALL_OPS.iter().copied().find(|op| u64::from(op.ordinal()) == ordinal)
    }

    /// Returns `true` for `Contains` and `NotContains`.
    pub fn is_membership(self) -> bool {
        matches!(self, Op::Contains | Op::NotContains)
    }

    /// Returns `true` for the substring, prefix and suffix operators.
    pub fn is_text(self) -> bool {
        matches!(
            self,
            Op::Like
                | Op::NotLike
                | Op::StartsWith
                | Op::NotStartsWith
                | Op::EndsWith
                | Op::NotEndsWith
        )
    }

    /// Returns `true` for the four ordering comparisons.
    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            Op::GreaterThan | Op::GreaterThanOrEqual | Op::LessThan | Op::LessThanOrEqual
        )
    }

    /// Returns `true` for `IsNull` and `IsNotNull`.
    pub fn is_null_test(self) -> bool {
        matches!(self, Op::IsNull | Op::IsNotNull)
    }

    /// Returns `true` if this operator negates its positive form.
    pub fn is_negated(self) -> bool {
        matches!(
            self,
            Op::NotEqual
                | Op::NotContains
                | Op::NotLike
                | Op::NotStartsWith
                | Op::NotEndsWith
                | Op::IsNotNull
        )
    }

    /// Maps a negated operator to its positive form.
    ///
    /// - `NotEqual` -> `Equal`
    /// - `NotLike` -> `Like`
    /// - `IsNotNull` -> `IsNull`
    /// - Others unchanged
    pub fn positive(self) -> Op {
        match self {
            Op::NotEqual => Op::Equal,
            Op::NotContains => Op::Contains,
            Op::NotLike => Op::Like,
            Op::NotStartsWith => Op::StartsWith,
            Op::NotEndsWith => Op::EndsWith,
            Op::IsNotNull => Op::IsNull,
            other => other,
        }
    }

    /// Evaluates an ordering comparison given the field-vs-operand ordering.
    pub fn eval_ordering(self, ordering: Ordering) -> bool {
        match self {
            Op::Equal => ordering == Ordering::Equal,
            Op::NotEqual => ordering != Ordering::Equal,
            Op::GreaterThan => ordering == Ordering::Greater,
            Op::GreaterThanOrEqual => ordering != Ordering::Less,
            Op::LessThan => ordering == Ordering::Less,
            Op::LessThanOrEqual => ordering != Ordering::Greater,
            _ => false,
        }
    }

    /// Returns the wire name of this operator.
    pub fn as_str(self) -> &'static str {
        match self {
            Op::Equal => "Equal",
            Op::NotEqual => "NotEqual",
            Op::Contains => "Contains",
            Op::NotContains => "NotContains",
            Op::Like => "Like",
            Op::NotLike => "NotLike",
            Op::StartsWith => "StartsWith",
            Op::NotStartsWith => "NotStartsWith",
            Op::EndsWith => "EndsWith",
            Op::NotEndsWith => "NotEndsWith",
            Op::GreaterThan => "GreaterThan",
            Op::GreaterThanOrEqual => "GreaterThanOrEqual",
            Op::LessThan => "LessThan",
            Op::LessThanOrEqual => "LessThanOrEqual",
            Op::IsNull => "IsNull",
            Op::IsNotNull => "IsNotNull",
            Op::None => "None",
        }
    }

    /// SQL-like rendering used by the expression form.
    pub(crate) fn sql(self) -> &'static str {
        match self {
            Op::Equal => "=",
            Op::NotEqual => "<>",
            Op::Contains => "IN",
            Op::NotContains => "NOT IN",
            Op::Like | Op::StartsWith | Op::EndsWith => "LIKE",
            Op::NotLike | Op::NotStartsWith | Op::NotEndsWith => "NOT LIKE",
            Op::GreaterThan => ">",
            Op::GreaterThanOrEqual => ">=",
            Op::LessThan => "<",
            Op::LessThanOrEqual => "<=",
            Op::IsNull => "IS NULL",
            Op::IsNotNull => "IS NOT NULL",
            Op::None => "",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Op {
    type Err = SiftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        // Older trees spell the membership operators without the trailing "s".
        let name = match name {
            "Contain" => "Contains",
            "NotContain" => "NotContains",
            other => other,
        };
        ALL_OPS
            .iter()
            .copied()
            .find(|op| op.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| SiftError::UnknownOperator(s.to_string()))
    }
}

/// Combinator joining a node to the expression accumulated before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LogicalOp {
    #[default]
    And = 1,
    Or = 2,
    None = 3,
}

impl LogicalOp {
    /// Wire ordinal of this combinator.
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// Looks up a combinator by its wire ordinal.
    pub fn from_ordinal(ordinal: u64) -> Option<LogicalOp> {
        match ordinal {
            1 => Some(LogicalOp::And),
            2 => Some(LogicalOp::Or),
            3 => Some(LogicalOp::None),
            _ => None,
        }
    }

    /// Returns the wire name of this combinator.
    pub fn as_str(self) -> &'static str {
        match self {
            LogicalOp::And => "And",
            LogicalOp::Or => "Or",
            LogicalOp::None => "None",
        }
    }
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogicalOp {
    type Err = SiftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "and" => Ok(LogicalOp::And),
            "or" => Ok(LogicalOp::Or),
            "none" => Ok(LogicalOp::None),
            _ => Err(SiftError::UnknownOperator(s.to_string())),
        }
    }
}

/// Wire representation shared by the enums in this crate: a name or an ordinal.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum NameOrOrdinal {
    Ordinal(u64),
    Name(String),
}

impl Serialize for Op {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Op {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match NameOrOrdinal::deserialize(deserializer)? {
            NameOrOrdinal::Ordinal(n) => Op::from_ordinal(n)
                .ok_or_else(|| serde::de::Error::custom(format!("unknown operator ordinal {n}"))),
            NameOrOrdinal::Name(name) => name.parse().map_err(serde::de::Error::custom),
        }
    }
}

impl Serialize for LogicalOp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LogicalOp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match NameOrOrdinal::deserialize(deserializer)? {
            NameOrOrdinal::Ordinal(n) => LogicalOp::from_ordinal(n).ok_or_else(|| {
                serde::de::Error::custom(format!("unknown logical operator ordinal {n}"))
            }),
            NameOrOrdinal::Name(name) => name.parse().map_err(serde::de::Error::custom),
        }
    }
}
