//! Schema layer for Veneer
//!
//! This crate defines the Definition tree that types a collection's fields:
//! - Definition: a field's type tag, casting rule, and array/map markers
//! - Schema: named top-level fields plus path resolution
//! - SchemaCursor: incremental resolution state used by the path navigator
//!
//! A path resolves to exactly one Definition or to "untracked" (out of
//! schema scope, e.g. beneath a free-form Mixed field, where no further
//! validation is applied).

#![warn(clippy::all)]

pub mod definition;
pub mod schema;

pub use definition::{CastRule, Definition, FieldKind, ScalarType};
pub use schema::{Schema, SchemaBuilder, SchemaCursor};
