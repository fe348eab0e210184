//! Sort specifications and compiled comparators.
//!
//! A [`SortSpec<T>`] is an ordered list of [`SortItem`]s: the first is the
//! primary key, every later item only breaks ties left by the ones before
//! it. Compiling resolves each selector against `T` and yields a
//! [`Comparator<T>`], usable for in-memory sorting or rendered as an
//! `ORDER BY` list.

use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, SiftError};
use crate::op::NameOrOrdinal;
use crate::resolver::{FieldResolver, ResolvedPath};
use crate::schema::Entity;
use crate::value::Value;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortDirection {
    /// Smallest first; nulls lead.
    #[default]
    Ascending = 1,
    /// Largest first; nulls trail.
    Descending = 2,
}

impl SortDirection {
    /// Wire ordinal of this direction.
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// Applies this direction to an ascending ordering.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }

    /// Returns the wire name of this direction.
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Ascending => "Ascending",
            SortDirection::Descending => "Descending",
        }
    }

    fn sql(self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = SiftError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ascending" | "asc" => Ok(SortDirection::Ascending),
            "descending" | "desc" => Ok(SortDirection::Descending),
            _ => Err(SiftError::UnknownOperator(s.to_string())),
        }
    }
}

impl Serialize for SortDirection {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SortDirection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match NameOrOrdinal::deserialize(deserializer)? {
            NameOrOrdinal::Ordinal(1) => Ok(SortDirection::Ascending),
            NameOrOrdinal::Ordinal(2) => Ok(SortDirection::Descending),
            NameOrOrdinal::Ordinal(n) => Err(serde::de::Error::custom(format!(
                "unknown sort direction ordinal {n}"
            ))),
            NameOrOrdinal::Name(name) => name.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// One sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortItem {
    pub selector_path: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortItem {
    /// Creates a sort key.
    pub fn new(selector: impl Into<String>, direction: SortDirection) -> Self {
        SortItem {
            selector_path: selector.into(),
            direction,
        }
    }
}

/// Ordered sort keys for entities of type `T`.
///
/// Serializes as a plain list of `{selectorPath, direction}`.
///
/// # Example
///
/// ```
/// use sift::{Entity, SortSpec};
///
/// #[derive(Entity)]
/// #[sift(rename_all = "PascalCase")]
/// struct Person {
///     name: String,
///     age: u32,
/// }
///
/// let mut people = vec![
///     Person { name: "B".into(), age: 30 },
///     Person { name: "A".into(), age: 30 },
///     Person { name: "C".into(), age: 20 },
/// ];
/// let comparator = SortSpec::<Person>::order_by("Age").then_by("Name").compile()?;
/// comparator.sort(&mut people);
/// let names: Vec<_> = people.iter().map(|p| p.name.as_str()).collect();
/// assert_eq!(names, ["C", "A", "B"]);
/// assert_eq!(comparator.to_string(), "Age ASC, Name ASC");
/// # Ok::<(), sift::SiftError>(())
/// ```
#[derive(Serialize, Deserialize)]
#[serde(transparent, bound = "")]
pub struct SortSpec<T> {
    items: Vec<SortItem>,
    #[serde(skip)]
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for SortSpec<T> {
    fn clone(&self) -> Self {
        SortSpec {
            items: self.items.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T> fmt::Debug for SortSpec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SortSpec").field(&self.items).finish()
    }
}

impl<T> Default for SortSpec<T> {
    fn default() -> Self {
        SortSpec::new()
    }
}

impl<T> SortSpec<T> {
    /// Creates an empty sort specification.
    pub fn new() -> Self {
        SortSpec {
            items: Vec::new(),
            _entity: PhantomData,
        }
    }

    /// Starts a specification with an ascending primary key.
    pub fn order_by(selector: impl Into<String>) -> Self {
        SortSpec::new().then_by(selector)
    }

    /// Starts a specification with a descending primary key.
    pub fn order_by_desc(selector: impl Into<String>) -> Self {
        SortSpec::new().then_by_desc(selector)
    }

    /// Adds an ascending tie-breaker.
    pub fn then_by(self, selector: impl Into<String>) -> Self {
        self.push(SortItem::new(selector, SortDirection::Ascending))
    }

    /// Adds a descending tie-breaker.
    pub fn then_by_desc(self, selector: impl Into<String>) -> Self {
        self.push(SortItem::new(selector, SortDirection::Descending))
    }

    /// Adds a sort key.
    pub fn push(mut self, item: SortItem) -> Self {
        self.items.push(item);
        self
    }

    /// The sort keys, primary first.
    pub fn items(&self) -> &[SortItem] {
        &self.items
    }

    /// Returns `true` if there are no sort keys.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Copies the keys for a structurally identical type `U`.
    pub fn cast<U>(&self) -> SortSpec<U> {
        SortSpec {
            items: self.items.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> SortSpec<T> {
    /// Resolves every key against `T`.
    pub fn compile(&self) -> Result<Comparator<T>> {
        Comparator::new(&self.items, FieldResolver::of::<T>())
    }

    /// Casts to `U` and compiles.
    pub fn compile_as<U: Entity>(&self) -> Result<Comparator<U>> {
        self.cast::<U>().compile()
    }
}

/// One resolved sort key.
#[derive(Debug, Clone)]
pub struct SortKey {
    path: Arc<ResolvedPath>,
    direction: SortDirection,
}

impl SortKey {
    /// The resolved selector.
    pub fn path(&self) -> &ResolvedPath {
        &self.path
    }

    /// The sort direction.
    pub fn direction(&self) -> SortDirection {
        self.direction
    }
}

/// Compiled multi-key comparator over `T`.
pub struct Comparator<T> {
    keys: Vec<SortKey>,
    _entity: PhantomData<fn(&T)>,
}

impl<T> Clone for Comparator<T> {
    fn clone(&self) -> Self {
        Comparator {
            keys: self.keys.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Comparator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Comparator").field(&self.keys).finish()
    }
}

/// Renders as an `ORDER BY` list, e.g. `Age ASC, Name DESC`.
impl<T> fmt::Display for Comparator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.keys.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} {}", key.path.selector(), key.direction.sql())?;
        }
        Ok(())
    }
}

impl<T: Entity> Comparator<T> {
    fn new(items: &[SortItem], resolver: FieldResolver) -> Result<Self> {
        if items.is_empty() {
            return Err(SiftError::EmptySort {
                entity: resolver.schema().name().to_string(),
            });
        }

        let keys = items
            .iter()
            .map(|item| {
                let path = resolver.resolve(&item.selector_path)?;
                if !path.kind().is_scalar() {
                    return Err(SiftError::UnsupportedSortKey {
                        kind: path.kind().name(),
                        selector: path.selector().to_string(),
                    });
                }
                Ok(SortKey {
                    path,
                    direction: item.direction,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(entity = resolver.schema().name(), keys = keys.len(), "compiled sort spec");
        Ok(Comparator {
            keys,
            _entity: PhantomData,
        })
    }

    /// Compares two entities key by key.
    pub fn compare(&self, a: &T, b: &T) -> Ordering {
        for key in &self.keys {
            let left = key.path.get(a);
            let right = key.path.get(b);
            if let Some(ordering) = compare_values(&left, &right) {
                let ordering = key.direction.apply(ordering);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
        Ordering::Equal
    }

    /// Sorts `items` in place. The sort is stable.
    pub fn sort(&self, items: &mut [T]) {
        items.sort_by(|a, b| self.compare(a, b));
    }

    /// Returns references to `items` in sorted order.
    pub fn sorted<'a>(&self, items: &'a [T]) -> Vec<&'a T> {
        let mut refs: Vec<&T> = items.iter().collect();
        refs.sort_by(|a, b| self.compare(a, b));
        refs
    }

    /// The resolved keys, primary first.
    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }
}

/// Compares two values of the same kind, nulls first.
///
/// NaN sorts after every other number, so the order stays total.
/// Returns `None` if the kinds differ.
pub fn compare_values(a: &Value<'_>, b: &Value<'_>) -> Option<Ordering> {
    match (a, b) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Number(a), Value::Number(b)) => match (a.is_nan(), b.is_nan()) {
            (true, true) => Some(Ordering::Equal),
            (true, false) => Some(Ordering::Greater),
            (false, true) => Some(Ordering::Less),
            (false, false) => a.compare(*b),
        },
        (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),

        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Null, _) => Some(Ordering::Less),
        (_, Value::Null) => Some(Ordering::Greater),

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Member, Schema};
    use crate::value::Number;
    use std::sync::OnceLock;

    #[derive(Debug)]
    struct Person {
        name: String,
        age: u32,
        nick: Option<String>,
        tags: Vec<String>,
    }

    impl Entity for Person {
        fn schema() -> &'static Schema {
            static SCHEMA: OnceLock<Schema> = OnceLock::new();
            SCHEMA.get_or_init(|| {
                Schema::new(
                    "Person",
                    vec![
                        Member::field::<String>("Name"),
                        Member::field::<u32>("Age"),
                        Member::field::<Option<String>>("Nick"),
                        Member::field::<Vec<String>>("Tags"),
                    ],
                )
            })
        }

        fn member_value(&self, member: &str) -> Value<'_> {
            match member {
                "Name" => Value::String(&self.name),
                "Age" => Value::Number(Number::from(self.age)),
                "Nick" => self.nick.as_deref().map_or(Value::Null, Value::String),
                "Tags" => Value::List(self.tags.iter().map(|t| Value::String(t)).collect()),
                _ => Value::Null,
            }
        }
    }

    fn person(name: &str, age: u32, nick: Option<&str>) -> Person {
        Person {
            name: name.to_string(),
            age,
            nick: nick.map(str::to_string),
            tags: Vec::new(),
        }
    }

    fn names(people: &[Person]) -> Vec<&str> {
        people.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn direction_apply() {
        assert_eq!(SortDirection::Ascending.apply(Ordering::Less), Ordering::Less);
        assert_eq!(SortDirection::Descending.apply(Ordering::Less), Ordering::Greater);
        assert_eq!(SortDirection::Descending.apply(Ordering::Equal), Ordering::Equal);
    }

    #[test]
    fn direction_serde() {
        assert_eq!(
            serde_json::to_string(&SortDirection::Descending).unwrap(),
            "\"Descending\""
        );
        assert_eq!(
            serde_json::from_str::<SortDirection>("2").unwrap(),
            SortDirection::Descending
        );
        assert_eq!(
            serde_json::from_str::<SortDirection>("\"asc\"").unwrap(),
            SortDirection::Ascending
        );
        assert!(serde_json::from_str::<SortDirection>("3").is_err());
    }

    #[test]
    fn primary_key_then_tie_breaker() {
        let mut people = vec![
            person("B", 30, None),
            person("A", 30, None),
            person("C", 20, None),
        ];
        let comparator = SortSpec::<Person>::order_by("Age")
            .then_by("Name")
            .compile()
            .unwrap();
        comparator.sort(&mut people);
        assert_eq!(names(&people), ["C", "A", "B"]);
    }

    #[test]
    fn descending_keys() {
        let people = vec![
            person("B", 30, None),
            person("A", 30, None),
            person("C", 20, None),
        ];
        let comparator = SortSpec::<Person>::order_by_desc("Age")
            .then_by_desc("Name")
            .compile()
            .unwrap();
        let sorted: Vec<&str> = comparator
            .sorted(&people)
            .into_iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(sorted, ["B", "A", "C"]);
        assert_eq!(comparator.to_string(), "Age DESC, Name DESC");
    }

    #[test]
    fn sort_is_stable() {
        let mut people = vec![
            person("first", 1, None),
            person("second", 1, None),
            person("third", 0, None),
        ];
        SortSpec::<Person>::order_by("Age")
            .compile()
            .unwrap()
            .sort(&mut people);
        assert_eq!(names(&people), ["third", "first", "second"]);
    }

    #[test]
    fn nulls_sort_first_ascending() {
        let mut people = vec![
            person("a", 0, Some("zed")),
            person("b", 0, None),
            person("c", 0, Some("amy")),
        ];
        let spec = SortSpec::<Person>::order_by("Nick");
        spec.compile().unwrap().sort(&mut people);
        assert_eq!(names(&people), ["b", "c", "a"]);
    }

    #[test]
    fn compile_errors() {
        assert!(matches!(
            SortSpec::<Person>::new().compile(),
            Err(SiftError::EmptySort { .. })
        ));
        assert!(matches!(
            SortSpec::<Person>::order_by("Missing").compile(),
            Err(SiftError::UnknownMember { .. })
        ));
        assert!(matches!(
            SortSpec::<Person>::order_by("Tags").compile(),
            Err(SiftError::UnsupportedSortKey { kind: "collection", .. })
        ));
        assert!(SortSpec::<Person>::order_by("Tags.Count()").compile().is_ok());
    }

    #[test]
    fn wire_form_is_a_list() {
        let spec = SortSpec::<Person>::order_by("Age").then_by_desc("Name");
        let json = serde_json::to_string(&spec).unwrap();
        assert_eq!(
            json,
            r#"[{"selectorPath":"Age","direction":"Ascending"},{"selectorPath":"Name","direction":"Descending"}]"#
        );
        let back: SortSpec<Person> =
            serde_json::from_str(r#"[{"selectorPath":"Age","direction":2}]"#).unwrap();
        assert_eq!(back.items(), &[SortItem::new("Age", SortDirection::Descending)]);
    }

    #[test]
    fn compare_values_across_kinds() {
        assert_eq!(
            compare_values(&Value::String("a"), &Value::String("b")),
            Some(Ordering::Less)
        );
        assert_eq!(
            compare_values(&Value::Null, &Value::Number(Number::I64(1))),
            Some(Ordering::Less)
        );
        assert_eq!(
            compare_values(&Value::String("a"), &Value::Number(Number::I64(1))),
            None
        );
    }

    #[test]
    fn nan_sorts_after_numbers() {
        let nan = Value::Number(Number::F64(f64::NAN));
        assert_eq!(
            compare_values(&nan, &Value::Number(Number::F64(1.0))),
            Some(Ordering::Greater)
        );
        assert_eq!(
            compare_values(&Value::Number(Number::I64(i64::MAX)), &nan),
            Some(Ordering::Less)
        );
        assert_eq!(compare_values(&nan, &nan), Some(Ordering::Equal));
        assert_eq!(compare_values(&Value::Null, &nan), Some(Ordering::Less));
    }
}
