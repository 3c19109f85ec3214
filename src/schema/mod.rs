//! # Schema Module
//!
//! Structural descriptions of request/response types and their translation
//! into JSON-schema fragments for the API document.
//!
//! Types opt in through the [`Describe`] trait, usually via
//! `#[derive(Describe)]`:
//!
//! ```rust
//! use convroute::schema::{Describe, SchemaGenerator};
//! use convroute::Describe;
//!
//! #[derive(Describe)]
//! struct CreateUser {
//!     name: String,
//!     age: u32,
//!     nickname: Option<String>,
//! }
//!
//! let node = SchemaGenerator::new().generate(&CreateUser::describe());
//! let json = node.to_json_schema();
//! assert_eq!(json["properties"]["name"]["type"], "string");
//! assert_eq!(json["properties"]["age"]["type"], "integer");
//! assert_eq!(json["required"], serde_json::json!(["name", "age"]));
//! ```
//!
//! Field types are resolved lazily, so self-referential types are fine: the
//! generator emits a `$ref` to `#/components/schemas/<Name>` when it meets a
//! type that is already being expanded.

mod core;
mod generator;
#[cfg(test)]
mod tests;

pub use core::{Describe, FieldDescriptor, ObjectDescriptor, PrimitiveType, TypeDescriptor};
pub use generator::{SchemaGenerator, SchemaKind, SchemaNode, COMPONENTS_PREFIX};
