//! Selector path resolution against entity schemas.
//!
//! A selector is a dotted chain of member names, such as `Customer.Name` or
//! `Orders.Count()`. [`FieldResolver`] checks every segment against the
//! schema reached so far and produces a [`ResolvedPath`]: the accessor chain
//! plus the kind of the terminal member.
//!
//! Resolution only depends on the schema and the selector text, so results
//! are memoized process-wide.

use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, SiftError};
use crate::schema::{Access, Entity, FieldKind, NumberKind, Schema};
use crate::value::{Number, Value};

static SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)(\(\))?$").expect("segment pattern is valid")
});

// Keyed by schema address and selector text.
static PATHS: Lazy<DashMap<(usize, String), Arc<ResolvedPath>>> = Lazy::new(DashMap::new);

/// One hop of a resolved selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Field or method of the current entity.
    Member(&'static str),
    /// Number of elements of the current collection.
    Count,
    /// Whether the current collection has any element.
    Any,
}

/// A selector validated against a schema.
#[derive(Debug, Clone)]
pub struct ResolvedPath {
    selector: String,
    steps: Vec<Step>,
    kind: FieldKind,
    nullable: bool,
}

impl ResolvedPath {
    /// The selector text this path was resolved from.
    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Accessor chain, root first.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Kind of the terminal member.
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Whether any member along the path can be null.
    pub fn nullable(&self) -> bool {
        self.nullable
    }

    /// Reads the terminal value from `entity`.
    ///
    /// A null anywhere along the path yields [`Value::Null`].
    pub fn get<'a>(&self, entity: &'a dyn Entity) -> Value<'a> {
        let mut current = Value::Entity(entity);
        for step in &self.steps {
            current = match (step, current) {
                (Step::Member(name), Value::Entity(owner)) => owner.member_value(name),
                (Step::Count, Value::List(items)) => Value::Number(Number::U64(items.len() as u64)),
                (Step::Any, Value::List(items)) => Value::Bool(!items.is_empty()),
                _ => return Value::Null,
            };
        }
        current
    }
}

/// Resolves selectors against one root schema.
#[derive(Debug, Clone, Copy)]
pub struct FieldResolver {
    schema: &'static Schema,
    cache: bool,
}

impl FieldResolver {
    /// Creates a resolver rooted at `schema`, using the shared cache.
    pub fn new(schema: &'static Schema) -> Self {
        FieldResolver {
            schema,
            cache: true,
        }
    }

    /// Creates a resolver rooted at the schema of `T`.
    pub fn of<T: Entity>() -> Self {
        FieldResolver::new(T::schema())
    }

    /// Enables or disables the shared path cache.
    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    /// The root schema.
    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    /// Resolves `selector`, failing on the first segment that does not exist.
    ///
    /// Whitespace around the selector and its segments is ignored, so
    /// `" Address . City "` resolves to the same path as `"Address.City"`.
    pub fn resolve(&self, selector: &str) -> Result<Arc<ResolvedPath>> {
        let selector = normalize(selector);
        if !self.cache {
            return resolve_uncached(self.schema, &selector).map(Arc::new);
        }

        let key = (self.schema as *const Schema as usize, selector);
        if let Some(path) = PATHS.get(&key) {
            return Ok(Arc::clone(path.value()));
        }

        tracing::trace!(entity = self.schema.name(), selector = %key.1, "resolving selector");
        let path = Arc::new(resolve_uncached(self.schema, &key.1)?);
        Ok(Arc::clone(PATHS.entry(key).or_insert(path).value()))
    }
}

fn normalize(selector: &str) -> String {
    selector
        .trim()
        .split('.')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(".")
}

fn resolve_uncached(root: &'static Schema, selector: &str) -> Result<ResolvedPath> {
    let trimmed = selector.trim();
    if trimmed.is_empty() {
        return Err(SiftError::EmptySelector);
    }

    let unknown = |member: &str, type_name: &str| SiftError::UnknownMember {
        selector: trimmed.to_string(),
        member: member.to_string(),
        type_name: type_name.to_string(),
    };

    let mut schema = root;
    let mut steps = Vec::new();
    let mut kind: Option<FieldKind> = None;
    let mut nullable = false;

    for segment in trimmed.split('.') {
        let segment = segment.trim();
        let caps = SEGMENT
            .captures(segment)
            .ok_or_else(|| SiftError::MalformedSelector {
                selector: trimmed.to_string(),
            })?;
        let name = caps.get(1).map_or("", |m| m.as_str());
        let call = caps.get(2).is_some();

        match kind.take() {
            None => {}
            Some(FieldKind::Entity(next)) => schema = next(),
            Some(FieldKind::Collection(_)) => {
                // Collections only expose their built-in methods.
                let (step, next_kind) = match (name, call) {
                    ("Count", true) => (Step::Count, FieldKind::Number(NumberKind::U64)),
                    ("Any", true) => (Step::Any, FieldKind::Bool),
                    _ => return Err(unknown(segment, "collection")),
                };
                steps.push(step);
                kind = Some(next_kind);
                continue;
            }
            Some(scalar) => return Err(unknown(segment, scalar.name())),
        }

        let member = schema
            .member(name)
            .filter(|m| (m.access == Access::Method) == call)
            .ok_or_else(|| unknown(segment, schema.name()))?;
        steps.push(Step::Member(member.name));
        nullable |= member.nullable;
        kind = Some(member.kind.clone());
    }

    let kind = kind.ok_or_else(|| SiftError::MalformedSelector {
        selector: trimmed.to_string(),
    })?;

    Ok(ResolvedPath {
        selector: trimmed.to_string(),
        steps,
        kind,
        nullable,
    })
}
