//! Sift - serializable filter criteria and sort specifications for Rust structs.
//!
//! Sift lets a client describe *which* entities it wants and *in what
//! order* as plain data, ship that description across a process boundary,
//! and compile it on the other side into an executable predicate and
//! comparator. It supports:
//!
//! - Condition trees with nested AND/OR composition and constant roots
//! - Selector paths through nested entities, methods and collections
//! - Operand coercion from user-entered text, including Persian digits and
//!   Solar Hijri dates
//! - Multi-key sorting with stable in-memory sorts
//! - Retargeting criteria at structurally identical types
//! - A SQL-like rendering of compiled predicates for query translators
//!
//! # Quick Start
//!
//! ```rust
//! use sift::{Criteria, Entity, Op, QueryRequest, SortSpec};
//!
//! #[derive(Entity)]
//! #[sift(rename_all = "PascalCase")]
//! struct Task {
//!     name: String,
//!     priority: i32,
//!     archived: bool,
//! }
//!
//! let tasks = vec![
//!     Task { name: "Write docs".into(), priority: 3, archived: false },
//!     Task { name: "Fix bug".into(), priority: 5, archived: false },
//!     Task { name: "Old task".into(), priority: 1, archived: true },
//! ];
//!
//! // Operands may be raw text; they are coerced to the member's kind.
//! let criteria = Criteria::<Task>::always()
//!     .and("Priority", Op::GreaterThanOrEqual, "3")?
//!     .and_ne("Archived", true)?;
//!
//! // The wire form is plain JSON.
//! let json = criteria.to_json()?;
//! let received = Criteria::<Task>::from_json(&json)?;
//!
//! let request = QueryRequest::new(received).sorted_by(SortSpec::order_by_desc("Priority"));
//! let results = request.select(&tasks)?;
//! assert_eq!(results.len(), 2);
//! assert_eq!(results[0].name, "Fix bug");
//!
//! let predicate = criteria.compile()?;
//! assert_eq!(predicate.to_string(), "TRUE AND Priority >= 3 AND Archived <> true");
//! # Ok::<(), sift::SiftError>(())
//! ```
//!
//! # Combination Semantics
//!
//! Each `and`/`or` call appends a child to the root node and overwrites the
//! root's combinator. Compilation folds the children left to right:
//!
//! ```text
//! always().and(a).or(b).and(c)   =>   ((TRUE AND a) OR b) AND c
//! ```
//!
//! A spliced sub-criteria is joined with the root's combinator by default;
//! see [`MergeStrategy`] for the alternative.
//!
//! # Field Kinds and Operators
//!
//! | Kind | Operators |
//! |------|-----------|
//! | String | every comparison; ordering is lexicographic |
//! | Number | every comparison; text operators match the trimmed decimal form |
//! | Date | equality, membership, ordering, null tests |
//! | Bool | equality, membership, null tests |
//! | Collection | equality, null tests, and `Count()` / `Any()` selectors |
//! | Entity | null tests, and nested member selectors |
//!
//! Every operator except the null tests rejects an entity whose member is
//! null.

// Lets the derive macro's `::sift` paths resolve inside this crate.
extern crate self as sift;

mod clause;
mod coerce;
mod compile;
mod config;
mod criteria;
mod error;
mod fulltext;
mod op;
mod ordering;
mod request;
mod resolver;
mod schema;
mod tagged;
mod value;

// Re-export public API
pub use clause::Clause;
pub use coerce::{coerce, normalize_digits, parse_date};
pub use compile::{Compiler, Filter, Predicate};
pub use config::{CompileOptions, MergeStrategy};
pub use criteria::{ConditionNode, Criteria};
pub use error::{Result, SiftError};
pub use fulltext::{full_text, is_full_text, strip_full_text, FULL_TEXT_MARKER};
pub use op::{LogicalOp, Op};
pub use ordering::{compare_values, Comparator, SortDirection, SortItem, SortKey, SortSpec};
pub use request::{Pagination, QueryRequest};
pub use resolver::{FieldResolver, ResolvedPath, Step};
pub use schema::{Access, Entity, FieldKind, FieldType, Member, NumberKind, Schema, SchemaFn};
pub use tagged::TaggedValue;
pub use value::{Number, Value};

#[cfg(feature = "derive")]
pub use sift_macros::Entity;
