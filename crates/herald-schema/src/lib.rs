//! Herald Schema
//!
//! Validation, introspection and synthetic data for the schemas attached to
//! workflows, steps and providers.
//!
//! Two schema dialects are supported and modeled as a closed [`Schema`] enum:
//!
//! - **Code-first**: a Rust type deriving `JsonSchema` + serde, built with
//!   [`Schema::of`]. Violations are collected against the generated JSON
//!   Schema, then the data is parsed through serde.
//! - **Structural**: a plain JSON Schema document whose root is an object
//!   schema (or an `anyOf`/`allOf`/`oneOf` combinator). Each distinct schema is
//!   compiled once and cached by identity.
//!
//! [`SchemaValidator`] dispatches to the first [`Validator`] that can handle a
//! schema. Both dialects project to canonical JSON Schema via
//! [`SchemaValidator::to_json_schema`], which is also what the
//! [`mock`] generator consumes.

mod code_first;
mod compile;
mod error;
mod format;
mod merge;
pub mod mock;
mod schema;
mod structural;
mod validator;

pub use code_first::CodeFirstValidator;
pub use error::SchemaError;
pub use merge::deep_merge;
pub use schema::{CodeFirstSchema, Schema};
pub use structural::StructuralValidator;
pub use validator::{SchemaValidator, ValidationIssue, ValidationResult, Validator};
