//! Herald Template
//!
//! Interpolates upstream data into a step's controls before they reach the
//! step's resolver, using minijinja templates.
//!
//! Every string leaf of the controls document is a template rendered against
//! `{ payload, subscriber, steps }`, where `steps` maps each prior step id to
//! its outputs:
//!
//! ```json
//! { "to": "{{ payload.email }}", "subject": "Hi {{ subscriber.firstName }}" }
//! ```
//!
//! Rendered leaves are always strings. Numbers, booleans and nulls in the
//! controls pass through unchanged.

mod compiler;
mod error;

pub use compiler::{TemplateCompiler, TemplateContext};
pub use error::TemplateError;
