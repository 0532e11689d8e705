use serde_json::Value;

use crate::error::SchemaError;
use crate::schema::Schema;
use crate::structural;
use crate::validator::{ValidationIssue, ValidationResult, Validator};

/// Validator for schemas derived from Rust types.
///
/// Violations are first collected against the generated JSON Schema so the
/// caller sees every issue with its path. Data that passes is then parsed
/// through serde, which applies the type's defaults and drops unknown fields.
pub struct CodeFirstValidator;

impl Validator for CodeFirstValidator {
  fn can_handle(&self, schema: &Schema) -> bool {
    matches!(schema, Schema::CodeFirst(_))
  }

  fn validate(&self, data: &Value, schema: &Schema) -> Result<ValidationResult, SchemaError> {
    let Schema::CodeFirst(schema) = schema else {
      return Err(SchemaError::malformed("expected a code-first schema"));
    };

    let compiled = schema.compiled()?;
    if let ValidationResult::Invalid(issues) = structural::run(&compiled, data, false) {
      return Ok(ValidationResult::Invalid(issues));
    }

    Ok(match schema.parse(data.clone()) {
      Ok(value) => ValidationResult::Valid(value),
      Err(e) => ValidationResult::Invalid(vec![ValidationIssue::new("", e.to_string())]),
    })
  }

  fn to_json_schema(&self, schema: &Schema) -> Result<Value, SchemaError> {
    match schema {
      Schema::CodeFirst(schema) => Ok(schema.json_schema().clone()),
      Schema::Json(_) => Err(SchemaError::malformed("expected a code-first schema")),
    }
  }

  fn prepare(&self, schema: &Schema) -> Result<(), SchemaError> {
    match schema {
      Schema::CodeFirst(schema) => schema.compiled().map(|_| ()),
      Schema::Json(_) => Err(SchemaError::malformed("expected a code-first schema")),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use schemars::JsonSchema;
  use serde::{Deserialize, Serialize};
  use serde_json::json;

  #[derive(Debug, Serialize, Deserialize, JsonSchema)]
  struct Reminder {
    subject: String,
    #[serde(default = "default_hours")]
    hours: u32,
  }

  fn default_hours() -> u32 {
    24
  }

  #[test]
  fn test_parses_and_applies_defaults() {
    let result = CodeFirstValidator
      .validate(&json!({ "subject": "Hi", "extra": true }), &Schema::of::<Reminder>())
      .unwrap();

    assert_eq!(
      result,
      ValidationResult::Valid(json!({ "subject": "Hi", "hours": 24 }))
    );
  }

  #[test]
  fn test_reports_missing_field_with_path() {
    let result = CodeFirstValidator
      .validate(&json!({ "hours": "soon" }), &Schema::of::<Reminder>())
      .unwrap();

    let ValidationResult::Invalid(mut issues) = result else {
      panic!("expected invalid");
    };
    issues.sort_by(|a, b| a.path.cmp(&b.path));

    assert_eq!(issues[0], ValidationIssue::new("", "must have required property 'subject'"));
    assert_eq!(issues[1].path, "/hours");
  }

  #[test]
  fn test_rejects_json_schemas() {
    let schema = Schema::json(json!({ "type": "object" }));
    assert!(!CodeFirstValidator.can_handle(&schema));
    assert!(CodeFirstValidator.validate(&json!({}), &schema).is_err());
  }
}
