use herald_config::Subscriber;
use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::TemplateError;

/// Data a control template can reference.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TemplateContext {
  pub payload: Value,
  pub subscriber: Subscriber,
  /// Outputs of earlier steps keyed by step id.
  pub steps: Map<String, Value>,
}

/// Renders the templates inside a controls document.
pub struct TemplateCompiler {
  env: Environment<'static>,
}

impl TemplateCompiler {
  /// Undefined references render as empty strings.
  pub fn new() -> Self {
    Self {
      env: Environment::new(),
    }
  }

  /// Undefined references are errors.
  pub fn strict() -> Self {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    Self { env }
  }

  /// Render every string leaf of `controls` against `context`. Leaves stay
  /// strings; other values pass through untouched.
  pub fn compile(&self, controls: &Value, context: &TemplateContext) -> Result<Value, TemplateError> {
    let context = minijinja::Value::from_serialize(context);
    self.compile_value(controls, &context)
  }

  fn compile_value(&self, value: &Value, context: &minijinja::Value) -> Result<Value, TemplateError> {
    match value {
      Value::String(template) => self.render(template, context).map(Value::String),
      Value::Array(items) => items
        .iter()
        .map(|item| self.compile_value(item, context))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array),
      Value::Object(map) => map
        .iter()
        .map(|(key, item)| Ok((key.clone(), self.compile_value(item, context)?)))
        .collect::<Result<Map<_, _>, TemplateError>>()
        .map(Value::Object),
      other => Ok(other.clone()),
    }
  }

  fn render(&self, template: &str, context: &minijinja::Value) -> Result<String, TemplateError> {
    if !template.contains("{{") && !template.contains("{%") {
      return Ok(template.to_string());
    }

    self
      .env
      .render_str(template, context)
      .map_err(|source| TemplateError::Render {
        template: template.to_string(),
        source,
      })
  }
}

impl Default for TemplateCompiler {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn context(payload: Value) -> TemplateContext {
    TemplateContext {
      payload,
      ..Default::default()
    }
  }

  #[test]
  fn test_compile_payload_reference() {
    let compiled = TemplateCompiler::new()
      .compile(
        &json!({ "to": "{{payload.email}}" }),
        &context(json!({ "email": "a@b.com" })),
      )
      .unwrap();

    assert_eq!(compiled, json!({ "to": "a@b.com" }));
  }

  #[test]
  fn test_rendered_values_stay_strings() {
    let compiled = TemplateCompiler::new()
      .compile(
        &json!({ "amount": "{{ payload.hours }}", "urgent": "{{ payload.urgent }}", "limit": 10 }),
        &context(json!({ "hours": 3, "urgent": true })),
      )
      .unwrap();

    assert_eq!(compiled, json!({ "amount": "3", "urgent": "true", "limit": 10 }));
  }

  #[test]
  fn test_mixed_text_and_filters() {
    let mut ctx = context(json!({ "name": "ada lovelace" }));
    ctx.subscriber.first_name = Some("Ada".to_string());
    ctx.steps.insert("welcome".to_string(), json!({ "subject": "Hi" }));

    let compiled = TemplateCompiler::new()
      .compile(
        &json!({
          "body": "Hello {{ payload.name | title }}!",
          "greeting": "{{ subscriber.firstName }} / {{ steps.welcome.subject }}",
          "nested": [{ "n": 1, "s": "static" }]
        }),
        &ctx,
      )
      .unwrap();

    assert_eq!(
      compiled,
      json!({
        "body": "Hello Ada Lovelace!",
        "greeting": "Ada / Hi",
        "nested": [{ "n": 1, "s": "static" }]
      })
    );
  }

  #[test]
  fn test_lenient_undefined_renders_empty() {
    let compiled = TemplateCompiler::new()
      .compile(
        &json!({ "a": "{{ payload.missing }}", "b": "x{{ payload.missing }}y" }),
        &context(json!({})),
      )
      .unwrap();

    assert_eq!(compiled, json!({ "a": "", "b": "xy" }));
  }

  #[test]
  fn test_strict_undefined_errors() {
    let result = TemplateCompiler::strict().compile(
      &json!({ "a": "{{ payload.missing }}" }),
      &context(json!({})),
    );

    assert!(matches!(result, Err(TemplateError::Render { .. })));
  }

  #[test]
  fn test_syntax_error() {
    let result = TemplateCompiler::new().compile(&json!({ "a": "{{ payload. }}" }), &context(json!({})));
    assert!(matches!(result, Err(TemplateError::Render { .. })));
  }
}
