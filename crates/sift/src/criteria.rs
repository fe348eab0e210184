//! Serializable condition trees and the fluent [`Criteria`] builder.
//!
//! A [`Criteria<T>`] owns a root [`ConditionNode`]. Every `and`/`or` call
//! appends a child to that root (a new leaf, or the root of another
//! criteria) and overwrites the root's combinator with the operator just
//! used. Nothing is evaluated until the criteria is compiled.
//!
//! # Example
//!
//! ```
//! use sift::{Criteria, Entity, Op};
//!
//! #[derive(Entity)]
//! struct Person {
//!     name: String,
//!     age: u32,
//! }
//!
//! let criteria = Criteria::<Person>::always()
//!     .and_gte("age", 18)?
//!     .and("name", Op::StartsWith, "A")?;
//!
//! let people = vec![
//!     Person { name: "Ada".into(), age: 36 },
//!     Person { name: "Alan".into(), age: 12 },
//!     Person { name: "Grace".into(), age: 45 },
//! ];
//! let predicate = criteria.compile()?;
//! let adults: Vec<_> = predicate.filter(&people);
//! assert_eq!(adults.len(), 1);
//! assert_eq!(adults[0].name, "Ada");
//! # Ok::<(), sift::SiftError>(())
//! ```

use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::coerce::coerce;
use crate::compile::{Compiler, Predicate};
use crate::error::{Result, SiftError};
use crate::op::{LogicalOp, Op};
use crate::resolver::FieldResolver;
use crate::schema::Entity;
use crate::tagged::TaggedValue;
use crate::value::Number;

/// One node of a condition tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionNode {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Dotted member path; empty for sentinel nodes.
    #[serde(default)]
    pub selector_path: String,
    pub operator: Op,
    #[serde(rename = "serializedValue", default)]
    pub value: TaggedValue,
    /// Combinator joining this node to the expression built before it.
    #[serde(default)]
    pub next_logical_operator: LogicalOp,
    #[serde(default)]
    pub children: Vec<ConditionNode>,
}

impl ConditionNode {
    /// Creates a constant node that accepts or rejects every entity.
    pub fn sentinel(accept: bool) -> Self {
        ConditionNode {
            id: Uuid::new_v4(),
            selector_path: String::new(),
            operator: Op::None,
            value: TaggedValue::Bool(accept),
            next_logical_operator: if accept {
                LogicalOp::And
            } else {
                LogicalOp::Or
            },
            children: Vec::new(),
        }
    }

    /// Creates a leaf comparing the member at `selector` with `value`.
    pub fn leaf(
        selector: impl Into<String>,
        operator: Op,
        value: TaggedValue,
        next_logical_operator: LogicalOp,
    ) -> Self {
        ConditionNode {
            id: Uuid::new_v4(),
            selector_path: selector.into(),
            operator,
            value,
            next_logical_operator,
            children: Vec::new(),
        }
    }

    /// Returns `true` for constant true/false nodes.
    pub fn is_sentinel(&self) -> bool {
        self.operator == Op::None
    }

    /// The constant a sentinel node stands for.
    ///
    /// Accepts a boolean or the ordinals `1` (true) and `0` (false).
    pub fn sentinel_value(&self) -> Result<bool> {
        match &self.value {
            TaggedValue::Bool(b) => Ok(*b),
            TaggedValue::Number(n) if n.compare(Number::I64(1)).is_some_and(|o| o.is_eq()) => {
                Ok(true)
            }
            TaggedValue::Number(n) if n.compare(Number::I64(0)).is_some_and(|o| o.is_eq()) => {
                Ok(false)
            }
            other => Err(SiftError::InvalidSentinel(other.to_text())),
        }
    }

    /// Number of nodes in this subtree, including itself.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(ConditionNode::node_count).sum::<usize>()
    }
}

/// Filter criteria over entities of type `T`.
///
/// Serializes as `{id, entityTypeName, tree}`.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound = "")]
pub struct Criteria<T> {
    id: Uuid,
    entity_type_name: String,
    tree: ConditionNode,
    #[serde(skip)]
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for Criteria<T> {
    fn clone(&self) -> Self {
        Criteria {
            id: self.id,
            entity_type_name: self.entity_type_name.clone(),
            tree: self.tree.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Criteria<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Criteria")
            .field("id", &self.id)
            .field("entity_type_name", &self.entity_type_name)
            .field("tree", &self.tree)
            .finish()
    }
}

impl<T> Criteria<T> {
    /// Identifier of this criteria, kept across casts.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Logical name of the entity type the tree targets.
    pub fn entity_type_name(&self) -> &str {
        &self.entity_type_name
    }

    /// Root of the condition tree.
    pub fn tree(&self) -> &ConditionNode {
        &self.tree
    }

    /// Consumes the criteria, returning its tree.
    pub fn into_tree(self) -> ConditionNode {
        self.tree
    }

    /// Serializes to the JSON wire form.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Reads criteria from the JSON wire form.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl<T: Entity> Criteria<T> {
    /// Criteria accepting every entity.
    pub fn always() -> Self {
        Criteria::from_tree(ConditionNode::sentinel(true))
    }

    /// Criteria rejecting every entity.
    pub fn never() -> Self {
        Criteria::from_tree(ConditionNode::sentinel(false))
    }

    /// Wraps an existing tree, for example one received from a peer.
    pub fn from_tree(tree: ConditionNode) -> Self {
        Criteria {
            id: Uuid::new_v4(),
            entity_type_name: T::schema().name().to_string(),
            tree,
            _entity: PhantomData,
        }
    }

    // ========================================================================
    // Generic builders
    // ========================================================================

    /// Appends a leaf joined with AND.
    ///
    /// The value is coerced to the member's kind unless `op` is a
    /// membership operator. Fails if the selector does not resolve on `T`
    /// or the value can not be converted.
    pub fn and(self, selector: &str, op: Op, value: impl Into<TaggedValue>) -> Result<Self> {
        self.push_leaf(selector, op, value.into(), LogicalOp::And)
    }

    /// Appends a leaf joined with OR.
    pub fn or(self, selector: &str, op: Op, value: impl Into<TaggedValue>) -> Result<Self> {
        self.push_leaf(selector, op, value.into(), LogicalOp::Or)
    }

    /// Appends the tree of `other` joined with AND.
    pub fn and_criteria(self, other: Criteria<T>) -> Result<Self> {
        self.push_tree(other, LogicalOp::And)
    }

    /// Appends the tree of `other` joined with OR.
    pub fn or_criteria(self, other: Criteria<T>) -> Result<Self> {
        self.push_tree(other, LogicalOp::Or)
    }

    fn push_leaf(
        mut self,
        selector: &str,
        op: Op,
        value: TaggedValue,
        combinator: LogicalOp,
    ) -> Result<Self> {
        let selector = selector.trim();
        if selector.is_empty() {
            return Err(SiftError::EmptySelector);
        }

        let path = FieldResolver::of::<T>().resolve(selector)?;
        let value = if op.is_membership() || op.is_null_test() {
            value
        } else {
            coerce(value, path.kind(), path.nullable())?
        };

        self.tree
            .children
            .push(ConditionNode::leaf(selector, op, value, combinator));
        self.tree.next_logical_operator = combinator;
        Ok(self)
    }

    fn push_tree(mut self, other: Criteria<T>, combinator: LogicalOp) -> Result<Self> {
        if other.entity_type_name != self.entity_type_name {
            return Err(SiftError::EntityMismatch {
                expected: self.entity_type_name,
                actual: other.entity_type_name,
            });
        }
        self.tree.next_logical_operator = combinator;
        self.tree.children.push(other.tree);
        Ok(self)
    }

    // ========================================================================
    // AND shorthand methods
    // ========================================================================

    /// Appends an AND equality leaf.
    pub fn and_eq(self, selector: &str, value: impl Into<TaggedValue>) -> Result<Self> {
        self.and(selector, Op::Equal, value)
    }

    /// Appends an AND not-equal leaf.
    pub fn and_ne(self, selector: &str, value: impl Into<TaggedValue>) -> Result<Self> {
        self.and(selector, Op::NotEqual, value)
    }

    /// Appends an AND substring leaf.
    pub fn and_like(self, selector: &str, value: impl Into<TaggedValue>) -> Result<Self> {
        self.and(selector, Op::Like, value)
    }

    /// Appends an AND membership leaf.
    pub fn and_in<V: Into<TaggedValue>>(
        self,
        selector: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Result<Self> {
        let set: Vec<V> = values.into_iter().collect();
        self.and(selector, Op::Contains, set)
    }

    /// Appends an AND greater-than leaf.
    pub fn and_gt(self, selector: &str, value: impl Into<TaggedValue>) -> Result<Self> {
        self.and(selector, Op::GreaterThan, value)
    }

    /// Appends an AND greater-than-or-equal leaf.
    pub fn and_gte(self, selector: &str, value: impl Into<TaggedValue>) -> Result<Self> {
        self.and(selector, Op::GreaterThanOrEqual, value)
    }

    /// Appends an AND less-than leaf.
    pub fn and_lt(self, selector: &str, value: impl Into<TaggedValue>) -> Result<Self> {
        self.and(selector, Op::LessThan, value)
    }

    /// Appends an AND less-than-or-equal leaf.
    pub fn and_lte(self, selector: &str, value: impl Into<TaggedValue>) -> Result<Self> {
        self.and(selector, Op::LessThanOrEqual, value)
    }

    /// Appends an AND null test.
    pub fn and_null(self, selector: &str) -> Result<Self> {
        self.and(selector, Op::IsNull, TaggedValue::Null)
    }

    /// Appends an AND not-null test.
    pub fn and_not_null(self, selector: &str) -> Result<Self> {
        self.and(selector, Op::IsNotNull, TaggedValue::Null)
    }

    // ========================================================================
    // OR shorthand methods
    // ========================================================================

    /// Appends an OR equality leaf.
    pub fn or_eq(self, selector: &str, value: impl Into<TaggedValue>) -> Result<Self> {
        self.or(selector, Op::Equal, value)
    }

    /// Appends an OR not-equal leaf.
    pub fn or_ne(self, selector: &str, value: impl Into<TaggedValue>) -> Result<Self> {
        self.or(selector, Op::NotEqual, value)
    }

    /// Appends an OR substring leaf.
    pub fn or_like(self, selector: &str, value: impl Into<TaggedValue>) -> Result<Self> {
        self.or(selector, Op::Like, value)
    }

    /// Appends an OR membership leaf.
    pub fn or_in<V: Into<TaggedValue>>(
        self,
        selector: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Result<Self> {
        let set: Vec<V> = values.into_iter().collect();
        self.or(selector, Op::Contains, set)
    }

    /// Appends an OR greater-than leaf.
    pub fn or_gt(self, selector: &str, value: impl Into<TaggedValue>) -> Result<Self> {
        self.or(selector, Op::GreaterThan, value)
    }

    /// Appends an OR greater-than-or-equal leaf.
    pub fn or_gte(self, selector: &str, value: impl Into<TaggedValue>) -> Result<Self> {
        self.or(selector, Op::GreaterThanOrEqual, value)
    }

    /// Appends an OR less-than leaf.
    pub fn or_lt(self, selector: &str, value: impl Into<TaggedValue>) -> Result<Self> {
        self.or(selector, Op::LessThan, value)
    }

    /// Appends an OR less-than-or-equal leaf.
    pub fn or_lte(self, selector: &str, value: impl Into<TaggedValue>) -> Result<Self> {
        self.or(selector, Op::LessThanOrEqual, value)
    }

    /// Appends an OR null test.
    pub fn or_null(self, selector: &str) -> Result<Self> {
        self.or(selector, Op::IsNull, TaggedValue::Null)
    }

    /// Appends an OR not-null test.
    pub fn or_not_null(self, selector: &str) -> Result<Self> {
        self.or(selector, Op::IsNotNull, TaggedValue::Null)
    }

    // ========================================================================
    // Retyping and compilation
    // ========================================================================

    /// Copies the tree for a structurally identical type `U`.
    ///
    /// Node ids and values are kept as they are; selectors are only checked
    /// against `U` when the copy is compiled.
    pub fn cast<U: Entity>(&self) -> Criteria<U> {
        Criteria {
            id: self.id,
            entity_type_name: U::schema().name().to_string(),
            tree: self.tree.clone(),
            _entity: PhantomData,
        }
    }

    /// Compiles with default options.
    pub fn compile(&self) -> Result<Predicate<T>> {
        Compiler::default().compile(self)
    }

    /// Compiles with the given compiler.
    pub fn compile_with(&self, compiler: &Compiler) -> Result<Predicate<T>> {
        compiler.compile(self)
    }

    /// Casts to `U` and compiles.
    pub fn compile_as<U: Entity>(&self) -> Result<Predicate<U>> {
        self.cast::<U>().compile()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Member, Schema};
    use crate::value::Value;
    use std::sync::OnceLock;

    struct Item {
        name: String,
        qty: u32,
    }

    impl Entity for Item {
        fn schema() -> &'static Schema {
            static SCHEMA: OnceLock<Schema> = OnceLock::new();
            SCHEMA.get_or_init(|| {
                Schema::new(
                    "Item",
                    vec![Member::field::<String>("Name"), Member::field::<u32>("Qty")],
                )
            })
        }

        fn member_value(&self, member: &str) -> Value<'_> {
            match member {
                "Name" => Value::String(&self.name),
                "Qty" => Value::Number(Number::from(self.qty)),
                _ => Value::Null,
            }
        }
    }

    struct Other;

    impl Entity for Other {
        fn schema() -> &'static Schema {
            static SCHEMA: OnceLock<Schema> = OnceLock::new();
            SCHEMA.get_or_init(|| Schema::new("Other", vec![Member::field::<String>("Name")]))
        }

        fn member_value(&self, _member: &str) -> Value<'_> {
            Value::Null
        }
    }

    #[test]
    fn sentinels() {
        let always = Criteria::<Item>::always();
        assert!(always.tree().is_sentinel());
        assert_eq!(always.tree().next_logical_operator, LogicalOp::And);
        assert!(always.tree().sentinel_value().unwrap());
        assert_eq!(always.entity_type_name(), "Item");

        let never = Criteria::<Item>::never();
        assert_eq!(never.tree().next_logical_operator, LogicalOp::Or);
        assert!(!never.tree().sentinel_value().unwrap());
    }

    #[test]
    fn sentinel_accepts_ordinals() {
        let mut node = ConditionNode::sentinel(true);
        node.value = TaggedValue::from(0);
        assert!(!node.sentinel_value().unwrap());
        node.value = TaggedValue::from(1u8);
        assert!(node.sentinel_value().unwrap());
        node.value = TaggedValue::from("yes");
        assert!(matches!(
            node.sentinel_value(),
            Err(SiftError::InvalidSentinel(_))
        ));
    }

    #[test]
    fn leaves_overwrite_root_combinator() {
        let criteria = Criteria::<Item>::always()
            .and_eq("Name", "a")
            .unwrap()
            .or_gt("Qty", 2)
            .unwrap();
        let tree = criteria.tree();
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[0].next_logical_operator, LogicalOp::And);
        assert_eq!(tree.children[1].next_logical_operator, LogicalOp::Or);
        assert_eq!(tree.next_logical_operator, LogicalOp::Or);
    }

    #[test]
    fn values_are_coerced_on_append() {
        let criteria = Criteria::<Item>::always().and_eq("Qty", "1,200").unwrap();
        assert_eq!(
            criteria.tree().children[0].value,
            TaggedValue::Number(Number::U64(1200))
        );

        // Membership operands are stored as given.
        let criteria = Criteria::<Item>::always()
            .and_in("Qty", ["1", "2"])
            .unwrap();
        assert_eq!(
            criteria.tree().children[0].value,
            TaggedValue::from(vec!["1", "2"])
        );
    }

    #[test]
    fn bad_selectors_fail_on_append() {
        assert!(matches!(
            Criteria::<Item>::always().and_eq(" ", 1),
            Err(SiftError::EmptySelector)
        ));
        assert!(matches!(
            Criteria::<Item>::always().and_eq("Missing", 1),
            Err(SiftError::UnknownMember { .. })
        ));
    }

    #[test]
    fn splicing_criteria() {
        let inner = Criteria::<Item>::always().and_eq("Name", "a").unwrap();
        let inner_id = inner.tree().id;
        let outer = Criteria::<Item>::always()
            .and_gt("Qty", 1)
            .unwrap()
            .or_criteria(inner)
            .unwrap();
        assert_eq!(outer.tree().next_logical_operator, LogicalOp::Or);
        assert_eq!(outer.tree().children[1].id, inner_id);
        assert_eq!(outer.tree().node_count(), 4);
    }

    #[test]
    fn splicing_mismatched_criteria_fails() {
        let mut json = serde_json::to_value(Criteria::<Item>::always()).unwrap();
        json["entityTypeName"] = "Other".into();
        let foreign: Criteria<Item> = serde_json::from_value(json).unwrap();
        let err = Criteria::<Item>::always().and_criteria(foreign).unwrap_err();
        assert!(matches!(err, SiftError::EntityMismatch { .. }));
    }

    #[test]
    fn cast_keeps_tree_and_retargets_name() {
        let criteria = Criteria::<Item>::always().and_eq("Name", "a").unwrap();
        let cast = criteria.cast::<Other>();
        assert_eq!(cast.entity_type_name(), "Other");
        assert_eq!(cast.id(), criteria.id());
        assert_eq!(cast.tree(), criteria.tree());
    }

    #[test]
    fn wire_form() {
        let criteria = Criteria::<Item>::always().and_eq("Qty", 3).unwrap();
        let json: serde_json::Value = serde_json::to_value(&criteria).unwrap();
        assert_eq!(json["entityTypeName"], "Item");
        assert_eq!(json["tree"]["operator"], "None");
        assert_eq!(json["tree"]["serializedValue"], "true");
        assert_eq!(json["tree"]["nextLogicalOperator"], "And");
        let child = &json["tree"]["children"][0];
        assert_eq!(child["selectorPath"], "Qty");
        assert_eq!(child["operator"], "Equal");
        assert_eq!(child["serializedValue"], "3");

        let back = Criteria::<Item>::from_json(&criteria.to_json().unwrap()).unwrap();
        assert_eq!(back.tree(), criteria.tree());
    }

    #[test]
    fn wire_form_accepts_ordinals_and_missing_fields() {
        let json = r#"{
            "id": "6f1c2a9e-7d3b-4c1a-9a55-0f0e3c2b1a00",
            "entityTypeName": "Item",
            "tree": {
                "operator": 17,
                "serializedValue": "1",
                "nextLogicalOperator": 1,
                "children": [
                    {"selectorPath": "Qty", "operator": 11, "serializedValue": "5", "nextLogicalOperator": 2}
                ]
            }
        }"#;
        let criteria = Criteria::<Item>::from_json(json).unwrap();
        assert!(criteria.tree().sentinel_value().unwrap());
        let child = &criteria.tree().children[0];
        assert_eq!(child.operator, Op::GreaterThan);
        assert_eq!(child.next_logical_operator, LogicalOp::Or);
        assert!(child.children.is_empty());
    }
}
