//! Schema error types.

use thiserror::Error;

/// Errors raised while preparing a schema, as opposed to data failing one.
#[derive(Debug, Error)]
pub enum SchemaError {
  /// No registered validator recognizes the schema.
  #[error("invalid schema: no validator can handle {schema}")]
  Unsupported { schema: String },

  /// The schema document is malformed.
  #[error("invalid schema: {reason}")]
  Malformed { reason: String },

  /// A keyword could not be compiled (e.g. a bad regex in `pattern`).
  #[error("failed to compile keyword '{keyword}': {message}")]
  Compile { keyword: String, message: String },

  /// A `$ref` does not point inside the schema document.
  #[error("unresolved schema reference: {reference}")]
  UnresolvedReference { reference: String },
}

impl SchemaError {
  pub(crate) fn malformed(reason: impl Into<String>) -> Self {
    SchemaError::Malformed {
      reason: reason.into(),
    }
  }
}
