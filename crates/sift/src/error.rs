//! Error types for the sift crate.
//!
//! Every error here is a configuration error: it is raised while building
//! or compiling criteria and sort specs, never while evaluating them.

use thiserror::Error;

use crate::op::Op;

/// Errors that can occur when building or compiling criteria and sort specs.
#[derive(Debug, Error)]
pub enum SiftError {
    /// Selector string is empty or only whitespace.
    #[error("selector can not be empty")]
    EmptySelector,

    /// Selector has an empty or syntactically invalid segment.
    #[error("selector \"{selector}\" format is not valid")]
    MalformedSelector { selector: String },

    /// A selector segment does not name a field or zero-argument method.
    #[error("selector \"{selector}\": member '{member}' does not exist on type \"{type_name}\"")]
    UnknownMember {
        selector: String,
        member: String,
        type_name: String,
    },

    /// Operator has no meaning for the resolved field kind.
    #[error("operator '{op}' is not supported for {kind} field \"{selector}\"")]
    UnsupportedOperator {
        op: Op,
        kind: &'static str,
        selector: String,
    },

    /// Raw value could not be converted to the field kind.
    #[error("can not convert {value} to {kind}")]
    Coercion { value: String, kind: &'static str },

    /// Membership operators need a collection operand.
    #[error("operator '{op}' on \"{selector}\" requires a collection value, got {value}")]
    ExpectedCollection {
        op: Op,
        selector: String,
        value: String,
    },

    /// Sentinel node carries a value that is neither true nor false.
    #[error("sentinel node has invalid value {0}")]
    InvalidSentinel(String),

    /// Two criteria built for different entity types were combined.
    #[error("criteria must be built for \"{expected}\", got \"{actual}\"")]
    EntityMismatch { expected: String, actual: String },

    /// Sort specification has no items.
    #[error("sort specification for \"{entity}\" has no items")]
    EmptySort { entity: String },

    /// Field kind has no ordering.
    #[error("{kind} field \"{selector}\" can not be used as a sort key")]
    UnsupportedSortKey { kind: &'static str, selector: String },

    /// A paged query was requested without a sort specification.
    #[error("sort order required for paged results of \"{entity}\"")]
    SortRequired { entity: String },

    /// A paged query was requested without pagination data.
    #[error("pagination data required for paged results of \"{entity}\"")]
    PaginationRequired { entity: String },

    /// Page number or page size is zero.
    #[error("invalid page {page_number} with {items_per_page} items per page")]
    InvalidPage {
        page_number: usize,
        items_per_page: usize,
    },

    /// Operator name or ordinal is unknown.
    #[error("unknown operator '{0}'")]
    UnknownOperator(String),

    /// Serialized value text is not valid JSON or holds an object, or a
    /// number has no JSON form.
    #[error("invalid serialized value: {0}")]
    SerializedValue(String),

    /// JSON encoding or decoding failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML decoding failed.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type for sift operations.
pub type Result<T> = std::result::Result<T, SiftError>;
