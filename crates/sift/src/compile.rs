//! Compilation of condition trees into executable predicates.
//!
//! The compiler walks a tree once, resolving every selector against the
//! target schema and coercing every operand, and produces a [`Filter`]: a
//! small op tree evaluated by [`Filter::matches`]. All configuration errors
//! surface here; evaluating a compiled filter never fails.
//!
//! # Combining children
//!
//! A node's expression is its own condition (a clause, or a constant for
//! sentinels) folded left to right with each child's expression:
//!
//! ```text
//! expr = own OP(child_1) expr(child_1) OP(child_2) expr(child_2) ...
//! ```
//!
//! Which combinator `OP(child)` is depends on the [`MergeStrategy`]. A child
//! whose combinator is `None` is still compiled but left out of the result.
//! A node reached twice in the same walk (the same subtree spliced in twice)
//! only contributes the first time.

use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;

use uuid::Uuid;

use crate::clause::Clause;
use crate::config::{CompileOptions, MergeStrategy};
use crate::criteria::{ConditionNode, Criteria};
use crate::error::Result;
use crate::op::LogicalOp;
use crate::resolver::FieldResolver;
use crate::schema::{Entity, Schema};

/// Compiled filter expression.
#[derive(Debug, Clone)]
pub enum Filter {
    /// Constant result.
    Const(bool),
    /// Leaf condition.
    Clause(Clause),
    /// All operands must match; evaluated left to right.
    And(Vec<Filter>),
    /// At least one operand must match; evaluated left to right.
    Or(Vec<Filter>),
}

impl Filter {
    /// Evaluates the filter against one entity, short-circuiting.
    pub fn matches(&self, entity: &dyn Entity) -> bool {
        match self {
            Filter::Const(b) => *b,
            Filter::Clause(clause) => clause.matches_entity(entity),
            Filter::And(parts) => parts.iter().all(|p| p.matches(entity)),
            Filter::Or(parts) => parts.iter().any(|p| p.matches(entity)),
        }
    }

    /// Joins `self AND other`, flattening nested conjunctions on the left.
    pub fn and(self, other: Filter) -> Filter {
        match self {
            Filter::And(mut parts) => {
                parts.push(other);
                Filter::And(parts)
            }
            first => Filter::And(vec![first, other]),
        }
    }

    /// Joins `self OR other`, flattening nested disjunctions on the left.
    pub fn or(self, other: Filter) -> Filter {
        match self {
            Filter::Or(mut parts) => {
                parts.push(other);
                Filter::Or(parts)
            }
            first => Filter::Or(vec![first, other]),
        }
    }

    /// All leaf clauses, in evaluation order.
    pub fn clauses(&self) -> Vec<&Clause> {
        let mut out = Vec::new();
        self.collect_clauses(&mut out);
        out
    }

    fn collect_clauses<'a>(&'a self, out: &mut Vec<&'a Clause>) {
        match self {
            Filter::Const(_) => {}
            Filter::Clause(clause) => out.push(clause),
            Filter::And(parts) | Filter::Or(parts) => {
                for part in parts {
                    part.collect_clauses(out);
                }
            }
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::And(_) | Filter::Or(_) => write!(f, "({self})"),
            _ => write!(f, "{self}"),
        }
    }
}

/// Renders as a SQL-like condition, e.g. `TRUE AND (Age > 30 OR Name LIKE 'A%')`.
impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (parts, sep) = match self {
            Filter::Const(true) => return f.write_str("TRUE"),
            Filter::Const(false) => return f.write_str("FALSE"),
            Filter::Clause(clause) => return write!(f, "{clause}"),
            Filter::And(parts) => (parts, " AND "),
            Filter::Or(parts) => (parts, " OR "),
        };
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                f.write_str(sep)?;
            }
            part.fmt_operand(f)?;
        }
        Ok(())
    }
}

/// A compiled, executable predicate over `T`.
pub struct Predicate<T> {
    filter: Filter,
    _entity: PhantomData<fn(&T)>,
}

impl<T> Clone for Predicate<T> {
    fn clone(&self) -> Self {
        Predicate {
            filter: self.filter.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Predicate").field(&self.filter).finish()
    }
}

impl<T> fmt::Display for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.filter)
    }
}

impl<T: Entity> Predicate<T> {
    /// Returns `true` if `entity` satisfies the predicate.
    pub fn matches(&self, entity: &T) -> bool {
        self.filter.matches(entity)
    }

    /// Returns references to the matching items, in input order.
    pub fn filter<'a>(&self, items: &'a [T]) -> Vec<&'a T> {
        items.iter().filter(|item| self.matches(item)).collect()
    }

    /// Counts the matching items.
    pub fn count(&self, items: &[T]) -> usize {
        items.iter().filter(|item| self.matches(item)).count()
    }

    /// Returns `true` if any item matches.
    pub fn any(&self, items: &[T]) -> bool {
        items.iter().any(|item| self.matches(item))
    }

    /// Returns the first matching item.
    pub fn find<'a>(&self, items: &'a [T]) -> Option<&'a T> {
        items.iter().find(|item| self.matches(item))
    }

    /// The compiled expression, for translation into another query language.
    pub fn expr(&self) -> &Filter {
        &self.filter
    }

    /// Turns the predicate into a plain closure.
    pub fn into_fn(self) -> impl Fn(&T) -> bool {
        move |entity: &T| self.matches(entity)
    }
}

/// Compiles condition trees against entity schemas.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    /// Creates a compiler with the given options.
    pub fn new(options: CompileOptions) -> Self {
        Compiler { options }
    }

    /// The options in effect.
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compiles `criteria` against `T`.
    pub fn compile<T: Entity>(&self, criteria: &Criteria<T>) -> Result<Predicate<T>> {
        let filter = self.compile_tree(T::schema(), criteria.tree())?;
        Ok(Predicate {
            filter,
            _entity: PhantomData,
        })
    }

    /// Compiles a bare tree against `schema`.
    pub fn compile_tree(&self, schema: &'static Schema, root: &ConditionNode) -> Result<Filter> {
        let mut walk = Walk {
            resolver: FieldResolver::new(schema).with_cache(self.options.cache_paths),
            root_operator: root.next_logical_operator,
            strategy: self.options.merge_strategy,
            visited: HashSet::from([root.id]),
        };
        let filter = walk.node(root)?;
        tracing::debug!(
            entity = schema.name(),
            nodes = walk.visited.len(),
            filter = %filter,
            "compiled condition tree"
        );
        Ok(filter)
    }
}

// Per-call traversal state.
struct Walk {
    resolver: FieldResolver,
    root_operator: LogicalOp,
    strategy: MergeStrategy,
    visited: HashSet<Uuid>,
}

impl Walk {
    fn node(&mut self, node: &ConditionNode) -> Result<Filter> {
        let mut acc = self.own(node)?;

        for child in &node.children {
            if !self.visited.insert(child.id) {
                continue;
            }

            let combinator = match self.strategy {
                MergeStrategy::RootForSubtrees if !child.children.is_empty() => {
                    self.root_operator
                }
                _ => child.next_logical_operator,
            };

            let compiled = self.node(child)?;
            acc = match combinator {
                LogicalOp::And => acc.and(compiled),
                LogicalOp::Or => acc.or(compiled),
                LogicalOp::None => acc,
            };
        }

        Ok(acc)
    }

    fn own(&self, node: &ConditionNode) -> Result<Filter> {
        if node.is_sentinel() {
            return Ok(Filter::Const(node.sentinel_value()?));
        }
        let path = self.resolver.resolve(&node.selector_path)?;
        Ok(Filter::Clause(Clause::compile(
            path,
            node.operator,
            &node.value,
        )?))
    }
}
