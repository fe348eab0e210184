//! Entity member schemas.
//!
//! An [`Entity`] describes its members once through a static [`Schema`] and
//! answers member lookups at evaluation time. Selector paths are validated
//! against the schema, never against live values.
//!
//! The schema is usually generated with `#[derive(Entity)]`, but can also be
//! written by hand, which is the only way to expose zero-argument methods.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::value::{Number, Value};

/// Trait for types that criteria and sort specs can be compiled against.
///
/// # Manual Implementation
///
/// ```
/// use sift::{Entity, Member, Number, Schema, Value};
/// use std::sync::OnceLock;
///
/// struct Order {
///     lines: Vec<u32>,
///     note: Option<String>,
/// }
///
/// impl Order {
///     fn line_total(&self) -> u32 {
///         self.lines.iter().sum()
///     }
/// }
///
/// impl Entity for Order {
///     fn schema() -> &'static Schema {
///         static SCHEMA: OnceLock<Schema> = OnceLock::new();
///         SCHEMA.get_or_init(|| {
///             Schema::new("Order", vec![
///                 Member::field::<Vec<u32>>("Lines"),
///                 Member::field::<Option<String>>("Note"),
///                 Member::method::<u32>("LineTotal"),
///             ])
///         })
///     }
///
///     fn member_value(&self, member: &str) -> Value<'_> {
///         match member {
///             "Lines" => sift::FieldType::to_value(&self.lines),
///             "Note" => sift::FieldType::to_value(&self.note),
///             "LineTotal" => Value::Number(Number::from(self.line_total())),
///             _ => Value::Null,
///         }
///     }
/// }
/// ```
pub trait Entity {
    /// Returns the member schema of this type.
    fn schema() -> &'static Schema
    where
        Self: Sized;

    /// Returns the value of a member, or [`Value::Null`] if it is unknown.
    ///
    /// Methods are looked up by their bare name, without the `()` suffix.
    fn member_value(&self, member: &str) -> Value<'_>;
}

/// Schema accessor stored in [`FieldKind::Entity`].
pub type SchemaFn = fn() -> &'static Schema;

/// Static description of an entity type's members.
#[derive(Debug)]
pub struct Schema {
    name: &'static str,
    members: Vec<Member>,
}

impl Schema {
    /// Creates a schema for the named type.
    pub fn new(name: &'static str, members: Vec<Member>) -> Self {
        Schema { name, members }
    }

    /// Logical type name, carried by criteria built for this type.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// All members in declaration order.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Looks up a member by name.
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// How a member is reached from its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Stored field, selected by bare name.
    Field,
    /// Zero-argument method, selected as `Name()`.
    Method,
}

/// A single member of a [`Schema`].
#[derive(Debug, Clone)]
pub struct Member {
    pub name: &'static str,
    pub kind: FieldKind,
    pub nullable: bool,
    pub access: Access,
}

impl Member {
    /// Describes a field whose Rust type is `F`.
    pub fn field<F: FieldType + ?Sized>(name: &'static str) -> Self {
        Member {
            name,
            kind: F::field_kind(),
            nullable: F::nullable(),
            access: Access::Field,
        }
    }

    /// Describes a zero-argument method returning `F`.
    pub fn method<F: FieldType + ?Sized>(name: &'static str) -> Self {
        Member {
            access: Access::Method,
            ..Member::field::<F>(name)
        }
    }
}

/// Numeric storage type of a field; decides coercion range and fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumberKind {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl NumberKind {
    /// Smallest representable value; the fallback for unparsable input.
    pub fn min_value(self) -> Number {
        match self {
            NumberKind::I8 => Number::from(i8::MIN),
            NumberKind::I16 => Number::from(i16::MIN),
            NumberKind::I32 => Number::from(i32::MIN),
            NumberKind::I64 => Number::from(i64::MIN),
            NumberKind::U8 | NumberKind::U16 | NumberKind::U32 | NumberKind::U64 => Number::U64(0),
            NumberKind::F32 => Number::from(f32::MIN),
            NumberKind::F64 => Number::from(f64::MIN),
        }
    }

    /// Parses canonical numeric text into this kind, rejecting out-of-range values.
    pub fn parse(self, text: &str) -> Option<Number> {
        match self {
            NumberKind::I8 => text.parse::<i8>().ok().map(Number::from),
            NumberKind::I16 => text.parse::<i16>().ok().map(Number::from),
            NumberKind::I32 => text.parse::<i32>().ok().map(Number::from),
            NumberKind::I64 => text.parse::<i64>().ok().map(Number::from),
            NumberKind::U8 => text.parse::<u8>().ok().map(Number::from),
            NumberKind::U16 => text.parse::<u16>().ok().map(Number::from),
            NumberKind::U32 => text.parse::<u32>().ok().map(Number::from),
            NumberKind::U64 => text.parse::<u64>().ok().map(Number::from),
            NumberKind::F32 => text
                .parse::<f32>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Number::from),
            NumberKind::F64 => text
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Number::from),
        }
    }

    /// Returns `true` for the floating point kinds.
    pub fn is_float(self) -> bool {
        matches!(self, NumberKind::F32 | NumberKind::F64)
    }
}

/// Semantic category of a member, as seen by the compiler.
#[derive(Clone)]
pub enum FieldKind {
    String,
    Number(NumberKind),
    Bool,
    Date,
    /// Collection of the inner kind.
    Collection(Box<FieldKind>),
    /// Nested entity; the function returns its schema.
    Entity(SchemaFn),
}

impl FieldKind {
    /// Short name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Number(_) => "numeric",
            FieldKind::Bool => "boolean",
            FieldKind::Date => "date",
            FieldKind::Collection(_) => "collection",
            FieldKind::Entity(_) => "entity",
        }
    }

    /// Returns `true` for string, numeric, boolean and date kinds.
    pub fn is_scalar(&self) -> bool {
        !matches!(self, FieldKind::Collection(_) | FieldKind::Entity(_))
    }

    /// Returns `true` for numeric kinds.
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldKind::Number(_))
    }

    /// Element kind of a collection.
    pub fn element(&self) -> Option<&FieldKind> {
        match self {
            FieldKind::Collection(inner) => Some(inner),
            _ => None,
        }
    }
}

impl fmt::Debug for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::String => f.write_str("String"),
            FieldKind::Number(kind) => f.debug_tuple("Number").field(kind).finish(),
            FieldKind::Bool => f.write_str("Bool"),
            FieldKind::Date => f.write_str("Date"),
            FieldKind::Collection(inner) => f.debug_tuple("Collection").field(inner).finish(),
            FieldKind::Entity(schema) => f.debug_tuple("Entity").field(&schema().name()).finish(),
        }
    }
}

impl PartialEq for FieldKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldKind::String, FieldKind::String)
            | (FieldKind::Bool, FieldKind::Bool)
            | (FieldKind::Date, FieldKind::Date) => true,
            (FieldKind::Number(a), FieldKind::Number(b)) => a == b,
            (FieldKind::Collection(a), FieldKind::Collection(b)) => a == b,
            (FieldKind::Entity(a), FieldKind::Entity(b)) => std::ptr::eq(a(), b()),
            _ => false,
        }
    }
}

/// Maps a Rust member type to its [`FieldKind`] and runtime [`Value`].
///
/// Implemented for strings, primitive numbers, `bool`, chrono dates,
/// `Option<T>` and `Vec<T>`. `#[derive(Entity)]` implements it for the
/// deriving struct so entities can be nested.
pub trait FieldType {
    /// Semantic kind of this type.
    fn field_kind() -> FieldKind;

    /// Whether a value of this type can be null.
    fn nullable() -> bool {
        false
    }

    /// Runtime value borrowed from `self`.
    fn to_value(&self) -> Value<'_>;
}

impl FieldType for String {
    fn field_kind() -> FieldKind {
        FieldKind::String
    }

    fn to_value(&self) -> Value<'_> {
        Value::String(self)
    }
}

impl FieldType for str {
    fn field_kind() -> FieldKind {
        FieldKind::String
    }

    fn to_value(&self) -> Value<'_> {
        Value::String(self)
    }
}

macro_rules! number_field {
    ($($t:ty => $kind:ident),* $(,)?) => {
        $(
            impl FieldType for $t {
                fn field_kind() -> FieldKind {
                    FieldKind::Number(NumberKind::$kind)
                }

                fn to_value(&self) -> Value<'_> {
                    Value::Number(Number::from(*self))
                }
            }
        )*
    };
}

number_field!(
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    isize => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    usize => U64,
    f32 => F32,
    f64 => F64,
);

impl FieldType for bool {
    fn field_kind() -> FieldKind {
        FieldKind::Bool
    }

    fn to_value(&self) -> Value<'_> {
        Value::Bool(*self)
    }
}

impl FieldType for NaiveDateTime {
    fn field_kind() -> FieldKind {
        FieldKind::Date
    }

    fn to_value(&self) -> Value<'_> {
        Value::Date(*self)
    }
}

impl FieldType for NaiveDate {
    fn field_kind() -> FieldKind {
        FieldKind::Date
    }

    fn to_value(&self) -> Value<'_> {
        Value::Date(self.and_time(NaiveTime::MIN))
    }
}

impl<T: FieldType> FieldType for Option<T> {
    fn field_kind() -> FieldKind {
        T::field_kind()
    }

    fn nullable() -> bool {
        true
    }

    fn to_value(&self) -> Value<'_> {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Null,
        }
    }
}

impl<T: FieldType> FieldType for Vec<T> {
    fn field_kind() -> FieldKind {
        FieldKind::Collection(Box::new(T::field_kind()))
    }

    fn to_value(&self) -> Value<'_> {
        Value::List(self.iter().map(FieldType::to_value).collect())
    }
}

impl<T: FieldType + ?Sized> FieldType for Box<T> {
    fn field_kind() -> FieldKind {
        T::field_kind()
    }

    fn nullable() -> bool {
        T::nullable()
    }

    fn to_value(&self) -> Value<'_> {
        (**self).to_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_kinds_of_primitives() {
        assert_eq!(String::field_kind(), FieldKind::String);
        assert_eq!(u8::field_kind(), FieldKind::Number(NumberKind::U8));
        assert_eq!(bool::field_kind(), FieldKind::Bool);
        assert_eq!(NaiveDate::field_kind(), FieldKind::Date);
        assert_eq!(
            Vec::<i32>::field_kind(),
            FieldKind::Collection(Box::new(FieldKind::Number(NumberKind::I32)))
        );
    }

    #[test]
    fn option_is_nullable() {
        assert!(!String::nullable());
        assert!(Option::<String>::nullable());
        assert_eq!(Option::<String>::field_kind(), FieldKind::String);
        assert_eq!(None::<String>.to_value(), Value::Null);
        assert_eq!(Some("x".to_string()).to_value(), Value::String("x"));
    }

    #[test]
    fn vec_to_value() {
        let v = vec![1u8, 2];
        assert_eq!(
            v.to_value(),
            Value::List(vec![
                Value::Number(Number::U64(1)),
                Value::Number(Number::U64(2))
            ])
        );
    }

    #[test]
    fn min_values() {
        assert_eq!(NumberKind::I32.min_value(), Number::I64(i32::MIN as i64));
        assert_eq!(NumberKind::U16.min_value(), Number::U64(0));
        assert_eq!(NumberKind::F64.min_value(), Number::F64(f64::MIN));
    }

    #[test]
    fn number_kind_parse_respects_range() {
        assert_eq!(NumberKind::U8.parse("255"), Some(Number::U64(255)));
        assert_eq!(NumberKind::U8.parse("256"), None);
        assert_eq!(NumberKind::I8.parse("-128"), Some(Number::I64(-128)));
        assert_eq!(NumberKind::I32.parse("1.5"), None);
        assert_eq!(NumberKind::F64.parse("1.5"), Some(Number::F64(1.5)));
    }

    #[test]
    fn member_constructors() {
        let field = Member::field::<Option<u32>>("Age");
        assert_eq!(field.access, Access::Field);
        assert!(field.nullable);

        let method = Member::method::<bool>("IsActive");
        assert_eq!(method.access, Access::Method);
        assert_eq!(method.kind, FieldKind::Bool);
    }

    #[test]
    fn schema_lookup() {
        let schema = Schema::new("Thing", vec![Member::field::<String>("Name")]);
        assert_eq!(schema.name(), "Thing");
        assert!(schema.member("Name").is_some());
        assert!(schema.member("name").is_none());
    }
}
