use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::code_first::CodeFirstValidator;
use crate::error::SchemaError;
use crate::mock;
use crate::schema::Schema;
use crate::structural::StructuralValidator;

/// A single violation, located by JSON Pointer (`""` is the root).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
  pub path: String,
  pub message: String,
}

impl ValidationIssue {
  pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      path: path.into(),
      message: message.into(),
    }
  }
}

/// Outcome of validating data against a schema.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult {
  /// The data conforms. Carries the parsed value: defaults applied and
  /// undeclared properties removed.
  Valid(Value),
  /// The data does not conform. Never empty.
  Invalid(Vec<ValidationIssue>),
}

impl ValidationResult {
  pub fn is_valid(&self) -> bool {
    matches!(self, ValidationResult::Valid(_))
  }
}

/// One schema dialect.
pub trait Validator: Send + Sync {
  /// Whether this validator recognizes the schema.
  fn can_handle(&self, schema: &Schema) -> bool;

  /// Validate `data`, returning the parsed value or every issue found.
  fn validate(&self, data: &Value, schema: &Schema) -> Result<ValidationResult, SchemaError>;

  /// Project the schema to canonical JSON Schema.
  fn to_json_schema(&self, schema: &Schema) -> Result<Value, SchemaError>;

  /// Do any up-front work (compilation) so later validation cannot fail on
  /// the schema itself.
  fn prepare(&self, _schema: &Schema) -> Result<(), SchemaError> {
    Ok(())
  }
}

/// Dispatches each schema to the first validator that can handle it.
pub struct SchemaValidator {
  validators: Vec<Box<dyn Validator>>,
}

impl SchemaValidator {
  pub fn new() -> Self {
    Self {
      validators: vec![
        Box::new(CodeFirstValidator),
        Box::new(StructuralValidator::new()),
      ],
    }
  }

  fn select(&self, schema: &Schema) -> Result<&dyn Validator, SchemaError> {
    self
      .validators
      .iter()
      .find(|v| v.can_handle(schema))
      .map(|v| v.as_ref())
      .ok_or_else(|| SchemaError::Unsupported {
        schema: describe(schema),
      })
  }

  pub fn validate(&self, data: &Value, schema: &Schema) -> Result<ValidationResult, SchemaError> {
    self.select(schema)?.validate(data, schema)
  }

  pub fn to_json_schema(&self, schema: &Schema) -> Result<Value, SchemaError> {
    self.select(schema)?.to_json_schema(schema)
  }

  /// Check that the schema belongs to a supported dialect and compiles.
  pub fn prepare(&self, schema: &Schema) -> Result<(), SchemaError> {
    self.select(schema)?.prepare(schema)
  }

  /// Synthesize a value that satisfies the schema.
  pub fn mock(&self, schema: &Schema) -> Result<Value, SchemaError> {
    Ok(mock::generate(&self.to_json_schema(schema)?))
  }
}

impl Default for SchemaValidator {
  fn default() -> Self {
    Self::new()
  }
}

fn describe(schema: &Schema) -> String {
  match schema {
    Schema::Json(value) => value.to_string(),
    Schema::CodeFirst(schema) => schema.type_name().to_string(),
  }
}
