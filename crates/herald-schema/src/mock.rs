//! Synthetic data from JSON Schema.
//!
//! Generation is deterministic: the same schema always yields the same value.
//! `default` wins, then `const`, then the first `enum` entry. Otherwise every
//! declared object property is filled in, strings honor well-known formats and
//! numbers sit on their lower bound.

use serde_json::{Map, Value, json};

use crate::compile::resolve_pointer;
use crate::merge::deep_merge;

/// Nesting (including `$ref` hops) beyond this yields `null`.
const MAX_DEPTH: usize = 16;

/// Generate a value that satisfies `schema`.
pub fn generate(schema: &Value) -> Value {
  Generator { root: schema }.value(schema, 0)
}

struct Generator<'a> {
  root: &'a Value,
}

impl Generator<'_> {
  fn value(&self, schema: &Value, depth: usize) -> Value {
    let Some(object) = schema.as_object() else {
      return Value::Null;
    };
    if depth > MAX_DEPTH {
      return Value::Null;
    }

    if let Some(default) = object.get("default") {
      return default.clone();
    }
    if let Some(constant) = object.get("const") {
      return constant.clone();
    }
    if let Some(first) = object.get("enum").and_then(Value::as_array).and_then(|v| v.first()) {
      return first.clone();
    }
    if let Some(reference) = object.get("$ref").and_then(Value::as_str) {
      return resolve_pointer(self.root, reference)
        .map(|target| self.value(target, depth + 1))
        .unwrap_or(Value::Null);
    }
    for keyword in ["anyOf", "oneOf"] {
      if let Some(first) = object.get(keyword).and_then(Value::as_array).and_then(|v| v.first()) {
        return self.value(first, depth + 1);
      }
    }

    let base = self.typed(object, depth);
    match object.get("allOf").and_then(Value::as_array) {
      Some(branches) => branches.iter().fold(base, |merged, branch| {
        let part = self.value(branch, depth + 1);
        if merged.is_null() { part } else { deep_merge(&merged, &part) }
      }),
      None => base,
    }
  }

  fn typed(&self, object: &Map<String, Value>, depth: usize) -> Value {
    match primary_type(object) {
      Some("object") => {
        let properties = object
          .get("properties")
          .and_then(Value::as_object)
          .map(|properties| {
            properties
              .iter()
              .map(|(name, schema)| (name.clone(), self.value(schema, depth + 1)))
              .collect()
          })
          .unwrap_or_default();
        Value::Object(properties)
      }
      Some("array") => match object.get("items") {
        Some(items) => {
          let count = object.get("minItems").and_then(Value::as_u64).unwrap_or(1).max(1);
          let item = self.value(items, depth + 1);
          Value::Array((0..count).map(|_| item.clone()).collect())
        }
        None => Value::Array(Vec::new()),
      },
      Some("string") => string(object),
      Some("integer") => json!(number(object).ceil() as i64),
      Some("number") => json!(number(object)),
      Some("boolean") => Value::Bool(true),
      _ => Value::Null,
    }
  }
}

/// The type to generate: the first non-null entry of `type`, or a guess from
/// the keywords present.
fn primary_type(object: &Map<String, Value>) -> Option<&str> {
  match object.get("type") {
    Some(Value::String(name)) => Some(name.as_str()),
    Some(Value::Array(names)) => names
      .iter()
      .filter_map(Value::as_str)
      .find(|name| *name != "null")
      .or(Some("null")),
    _ if object.contains_key("properties") => Some("object"),
    _ if object.contains_key("items") => Some("array"),
    _ => None,
  }
}

fn string(object: &Map<String, Value>) -> Value {
  let base = match object.get("format").and_then(Value::as_str) {
    Some("email") => "user@example.com",
    Some("uri") | Some("url") => "https://example.com",
    Some("date-time") => "2024-01-01T00:00:00Z",
    Some("date") => "2024-01-01",
    Some("uuid") => "00000000-0000-4000-8000-000000000000",
    _ => "string",
  };

  let mut value = base.to_string();
  if let Some(min) = object.get("minLength").and_then(Value::as_u64) {
    while (value.chars().count() as u64) < min {
      value.push('x');
    }
  }
  if let Some(max) = object.get("maxLength").and_then(Value::as_u64) {
    value = value.chars().take(max as usize).collect();
  }
  Value::String(value)
}

fn number(object: &Map<String, Value>) -> f64 {
  let bound = |key: &str| object.get(key).and_then(Value::as_f64);

  if let Some(min) = bound("minimum") {
    return min;
  }
  if let Some(min) = bound("exclusiveMinimum") {
    return min + 1.0;
  }
  match bound("maximum").or_else(|| bound("exclusiveMaximum").map(|max| max - 1.0)) {
    Some(max) if max < 0.0 => max,
    _ => 0.0,
  }
}
