//! Built-in output and result schemas per step kind.
//!
//! The output schema validates what a step's resolve returns. The result
//! schema describes what the step hands back to the workflow body, which is
//! also the shape callers persist in the event state.

use herald_config::{ActionType, ChannelType, StepKind};
use herald_schema::Schema;
use serde_json::{Value, json};

const DURATION_UNITS: [&str; 6] = ["seconds", "minutes", "hours", "days", "weeks", "months"];

/// Output schema for a step kind. `None` for custom steps, whose outputs are
/// declared by the author.
pub(crate) fn output_schema(kind: StepKind) -> Option<Schema> {
  let schema = match kind {
    StepKind::Channel(ChannelType::Email) => object(
      json!({ "subject": { "type": "string" }, "body": { "type": "string" } }),
      &["subject", "body"],
    ),
    StepKind::Channel(ChannelType::Sms) | StepKind::Channel(ChannelType::Chat) => {
      object(json!({ "body": { "type": "string" } }), &["body"])
    }
    StepKind::Channel(ChannelType::Push) => object(
      json!({ "subject": { "type": "string" }, "body": { "type": "string" } }),
      &["subject", "body"],
    ),
    StepKind::Channel(ChannelType::InApp) => object(
      json!({
        "subject": { "type": "string" },
        "body": { "type": "string" },
        "avatar": { "type": "string", "format": "uri" },
        "redirect": {
          "type": "object",
          "properties": {
            "url": { "type": "string" },
            "target": { "enum": ["_self", "_blank", "_parent", "_top"] }
          },
          "required": ["url"]
        },
        "data": { "type": "object", "additionalProperties": true }
      }),
      &["body"],
    ),
    StepKind::Action(ActionType::Delay) => object(
      json!({
        "type": { "enum": ["regular"], "default": "regular" },
        "amount": { "type": "number", "minimum": 0 },
        "unit": { "enum": DURATION_UNITS }
      }),
      &["type", "amount", "unit"],
    ),
    StepKind::Action(ActionType::Digest) => object(
      json!({
        "type": { "enum": ["regular"], "default": "regular" },
        "amount": { "type": "number", "minimum": 0 },
        "unit": { "enum": DURATION_UNITS },
        "digestKey": { "type": "string" },
        "lookBackWindow": {
          "type": "object",
          "properties": {
            "amount": { "type": "number" },
            "unit": { "enum": DURATION_UNITS }
          },
          "required": ["amount", "unit"]
        }
      }),
      &["type", "amount", "unit"],
    ),
    StepKind::Action(ActionType::Custom) => return None,
  };
  Some(Schema::json(schema))
}

/// Result schema for a step kind. `None` for custom steps, whose result is
/// their output.
pub(crate) fn result_schema(kind: StepKind) -> Option<Schema> {
  let schema = match kind {
    StepKind::Channel(ChannelType::InApp) => object(
      json!({
        "seen": { "type": "boolean" },
        "read": { "type": "boolean" },
        "lastSeenDate": { "type": ["string", "null"], "format": "date-time" },
        "lastReadDate": { "type": ["string", "null"], "format": "date-time" }
      }),
      &["seen", "read", "lastSeenDate", "lastReadDate"],
    ),
    StepKind::Action(ActionType::Digest) => object(
      json!({
        "events": {
          "type": "array",
          "items": {
            "type": "object",
            "properties": {
              "id": { "type": "string" },
              "time": { "type": "string" },
              "payload": { "type": "object", "additionalProperties": true }
            },
            "required": ["id", "time", "payload"]
          }
        }
      }),
      &["events"],
    ),
    StepKind::Channel(_) | StepKind::Action(ActionType::Delay) => object(json!({}), &[]),
    StepKind::Action(ActionType::Custom) => return None,
  };
  Some(Schema::json(schema))
}

fn object(properties: Value, required: &[&str]) -> Value {
  json!({
    "type": "object",
    "properties": properties,
    "required": required,
    "additionalProperties": false
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use herald_schema::{SchemaValidator, ValidationResult};

  #[test]
  fn test_delay_output_defaults_type() {
    let validator = SchemaValidator::new();
    let schema = output_schema(StepKind::Action(ActionType::Delay)).unwrap();

    let result = validator
      .validate(&json!({ "amount": 2, "unit": "hours" }), &schema)
      .unwrap();

    assert_eq!(
      result,
      ValidationResult::Valid(json!({ "type": "regular", "amount": 2, "unit": "hours" }))
    );
  }

  #[test]
  fn test_email_result_is_empty() {
    let validator = SchemaValidator::new();
    let schema = result_schema(StepKind::Channel(ChannelType::Email)).unwrap();

    assert_eq!(validator.mock(&schema).unwrap(), json!({}));
  }

  #[test]
  fn test_custom_has_no_builtin_schema() {
    assert!(output_schema(StepKind::Action(ActionType::Custom)).is_none());
    assert!(result_schema(StepKind::Action(ActionType::Custom)).is_none());
  }

  #[test]
  fn test_in_app_result_mock_is_valid() {
    let validator = SchemaValidator::new();
    let schema = result_schema(StepKind::Channel(ChannelType::InApp)).unwrap();
    let mocked = validator.mock(&schema).unwrap();

    assert!(validator.validate(&mocked, &schema).unwrap().is_valid());
  }
}
