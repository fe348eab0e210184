//! Proc macros for Sift.
//!
//! # Available Macros
//!
//! - [`Entity`] - Generate a member schema and accessor from a struct
//!
//! # Examples
//!
//! For working examples, see `sift/tests/entity_derive.rs`.

mod entity;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Derives the `Entity` trait for structs with named fields.
///
/// Every field becomes a member of the generated schema. The member kind
/// comes from the field's Rust type through `sift::FieldType`, so strings,
/// primitive numbers, `bool`, chrono dates, `Option<T>`, `Vec<T>` and other
/// derived entities all work without annotations.
///
/// # Struct Attributes
///
/// | Attribute | Description |
/// |-----------|-------------|
/// | `rename = "..."` | Logical type name carried by criteria (default: struct name) |
/// | `rename_all = "..."` | Member casing: `PascalCase`, `camelCase` or `snake_case` |
///
/// # Field Attributes
///
/// | Attribute | Description |
/// |-----------|-------------|
/// | `skip` | Exclude this field from the schema |
/// | `rename = "..."` | Use a custom member name in selectors |
///
/// # Generated Code
///
/// The macro generates:
///
/// 1. Member name constants (e.g., `Task::NAME`, `Task::PRIORITY`)
/// 2. An implementation of `Entity` with a lazily built static schema
/// 3. An implementation of `FieldType`, so the struct can be nested in
///    other entities and reached with dotted selectors
///
/// Methods can not be derived; implement `Entity` by hand to expose them.
///
/// # Example
///
/// ```ignore
/// use sift::{Criteria, Entity};
///
/// #[derive(Entity)]
/// #[sift(rename_all = "PascalCase")]
/// struct Address {
///     city: String,
/// }
///
/// #[derive(Entity)]
/// #[sift(rename_all = "PascalCase")]
/// struct Customer {
///     name: String,
///     address: Option<Address>,
///     orders: Vec<u32>,
///     #[sift(skip)]
///     password_hash: String,
/// }
///
/// let criteria = Criteria::<Customer>::always()
///     .and_eq("Address.City", "Tehran")?
///     .and_gt("Orders.Count()", 2)?;
/// assert_eq!(Customer::NAME, "Name");
/// ```
#[proc_macro_derive(Entity, attributes(sift))]
pub fn entity_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    entity::entity_derive_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
