//! Implementation of the `#[derive(Entity)]` macro.
//!
//! Builds a static member schema and accessor from struct annotations.

mod attrs;
mod derive;

pub use derive::entity_derive_impl;
