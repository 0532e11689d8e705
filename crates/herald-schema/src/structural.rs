//! Validation of plain JSON Schema documents.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::{Map, Number, Value};

use crate::compile::{Additional, CompiledSchema, JsonType, Node, Rules};
use crate::error::SchemaError;
use crate::format;
use crate::schema::Schema;
use crate::validator::{ValidationIssue, ValidationResult, Validator};

/// `$ref` chains deeper than this stop being followed.
const MAX_DEPTH: usize = 128;

/// Validator for JSON Schema documents with an object root.
///
/// Each distinct schema is compiled once. The cache is keyed by the identity
/// of the `Arc` holding the schema, and keeps that `Arc` alive so the key
/// cannot be reused by another allocation.
pub struct StructuralValidator {
  cache: RwLock<HashMap<usize, CachedSchema>>,
}

struct CachedSchema {
  _schema: Arc<Value>,
  compiled: Arc<CompiledSchema>,
}

impl StructuralValidator {
  pub fn new() -> Self {
    Self {
      cache: RwLock::new(HashMap::new()),
    }
  }

  /// Number of schemas compiled so far.
  pub fn cached_len(&self) -> usize {
    self.cache.read().unwrap_or_else(|e| e.into_inner()).len()
  }

  fn get_or_compile(&self, schema: &Arc<Value>) -> Result<Arc<CompiledSchema>, SchemaError> {
    let key = Arc::as_ptr(schema) as usize;

    // Fast path
    {
      let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
      if let Some(cached) = cache.get(&key) {
        return Ok(Arc::clone(&cached.compiled));
      }
    }

    let compiled = Arc::new(CompiledSchema::compile(schema)?);

    let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
    let entry = cache.entry(key).or_insert_with(|| CachedSchema {
      _schema: Arc::clone(schema),
      compiled,
    });
    Ok(Arc::clone(&entry.compiled))
  }
}

impl Default for StructuralValidator {
  fn default() -> Self {
    Self::new()
  }
}

impl Validator for StructuralValidator {
  fn can_handle(&self, schema: &Schema) -> bool {
    match schema {
      Schema::Json(value) => is_structural_root(value),
      Schema::CodeFirst(_) => false,
    }
  }

  fn validate(&self, data: &Value, schema: &Schema) -> Result<ValidationResult, SchemaError> {
    let Schema::Json(json) = schema else {
      return Err(SchemaError::malformed("expected a JSON Schema document"));
    };
    let compiled = self.get_or_compile(json)?;
    Ok(run(&compiled, data, true))
  }

  fn to_json_schema(&self, schema: &Schema) -> Result<Value, SchemaError> {
    match schema {
      Schema::Json(json) => Ok(json.as_ref().clone()),
      Schema::CodeFirst(_) => Err(SchemaError::malformed("expected a JSON Schema document")),
    }
  }

  fn prepare(&self, schema: &Schema) -> Result<(), SchemaError> {
    match schema {
      Schema::Json(json) => self.get_or_compile(json).map(|_| ()),
      Schema::CodeFirst(_) => Err(SchemaError::malformed("expected a JSON Schema document")),
    }
  }
}

fn is_structural_root(schema: &Value) -> bool {
  let Some(object) = schema.as_object() else {
    return false;
  };
  let object_typed = match object.get("type") {
    Some(Value::String(name)) => name == "object",
    Some(Value::Array(names)) => names.iter().any(|n| n == "object"),
    _ => false,
  };
  object_typed || ["anyOf", "allOf", "oneOf"].iter().any(|k| object.contains_key(*k))
}

/// Validate a copy of `data`. With `strip` off, undeclared properties are
/// kept even where the schema would remove them.
pub(crate) fn run(compiled: &CompiledSchema, data: &Value, strip: bool) -> ValidationResult {
  let mut value = data.clone();
  let mut walker = Walker::new(compiled);
  walker.check(compiled.root(), &mut value, "", strip, 0);

  if walker.issues.is_empty() {
    ValidationResult::Valid(value)
  } else {
    ValidationResult::Invalid(walker.issues)
  }
}

struct Walker<'a> {
  compiled: &'a CompiledSchema,
  issues: Vec<ValidationIssue>,
}

impl<'a> Walker<'a> {
  fn new(compiled: &'a CompiledSchema) -> Self {
    Self {
      compiled,
      issues: Vec::new(),
    }
  }

  fn push(&mut self, path: &str, message: impl Into<String>) {
    self.issues.push(ValidationIssue::new(path, message));
  }

  fn check(&mut self, node: &Node, value: &mut Value, path: &str, strip: bool, depth: usize) {
    if depth > MAX_DEPTH {
      self.push(path, "schema nesting is too deep");
      return;
    }
    match node {
      Node::Always => {}
      Node::Never => self.push(path, "boolean schema is false"),
      Node::Rules(rules) => self.check_rules(rules, value, path, strip, depth),
    }
  }

  fn check_rules(&mut self, rules: &Rules, value: &mut Value, path: &str, strip: bool, depth: usize) {
    if let Some(reference) = &rules.reference {
      match self.compiled.reference(reference) {
        Some(target) => self.check(target, value, path, strip, depth + 1),
        None => self.push(path, format!("can't resolve reference {reference}")),
      }
    }

    if !rules.types.is_empty() && !rules.types.iter().any(|t| t.matches(value)) {
      let expected: Vec<&str> = rules.types.iter().map(JsonType::as_str).collect();
      self.push(path, format!("must be {}", expected.join(",")));
      return;
    }

    if let Some(allowed) = &rules.enum_values
      && !allowed.iter().any(|candidate| json_equal(candidate, value))
    {
      self.push(path, "must be equal to one of the allowed values");
    }
    if let Some(expected) = &rules.const_value
      && !json_equal(expected, value)
    {
      self.push(path, "must be equal to constant");
    }

    match value {
      Value::Object(map) => self.check_object(rules, map, path, strip, depth),
      Value::Array(items) => self.check_array(rules, items, path, strip, depth),
      Value::String(s) => self.check_string(rules, s, path),
      Value::Number(n) => self.check_number(rules, n, path),
      _ => {}
    }

    for branch in &rules.all_of {
      self.check(branch, value, path, false, depth + 1);
    }

    if !rules.any_of.is_empty() {
      let accepted = rules
        .any_of
        .iter()
        .find_map(|branch| self.trial(branch, value, path, strip, depth));
      match accepted {
        Some(accepted) => *value = accepted,
        None => self.push(path, "must match a schema in anyOf"),
      }
    }

    if !rules.one_of.is_empty() {
      let mut passing: Vec<Value> = rules
        .one_of
        .iter()
        .filter_map(|branch| self.trial(branch, value, path, strip, depth))
        .collect();
      match passing.pop() {
        Some(accepted) if passing.is_empty() => *value = accepted,
        _ => self.push(path, "must match exactly one schema in oneOf"),
      }
    }
  }

  /// Validate a branch against a copy of the value, returning the copy when
  /// it passes.
  fn trial(&self, node: &Node, value: &Value, path: &str, strip: bool, depth: usize) -> Option<Value> {
    let mut candidate = value.clone();
    let mut walker = Walker::new(self.compiled);
    walker.check(node, &mut candidate, path, strip, depth + 1);
    walker.issues.is_empty().then_some(candidate)
  }

  fn check_object(
    &mut self,
    rules: &Rules,
    map: &mut Map<String, Value>,
    path: &str,
    strip: bool,
    depth: usize,
  ) {
    for (name, property) in &rules.properties {
      if !map.contains_key(name)
        && let Some(default) = property.default_value()
      {
        map.insert(name.clone(), default.clone());
      }
    }

    for name in &rules.required {
      if !map.contains_key(name) {
        self.push(path, format!("must have required property '{name}'"));
      }
    }

    for (name, property) in &rules.properties {
      if let Some(child) = map.get_mut(name) {
        self.check(property, child, &child_path(path, name), strip, depth + 1);
      }
    }

    match &rules.additional {
      Additional::Allow => {}
      Additional::Strip => {
        if strip {
          map.retain(|key, _| rules.declares(key));
        }
      }
      Additional::Schema(node) => {
        for (key, child) in map.iter_mut() {
          if !rules.declares(key) {
            self.check(node, child, &child_path(path, key), strip, depth + 1);
          }
        }
      }
    }
  }

  fn check_array(&mut self, rules: &Rules, items: &mut [Value], path: &str, strip: bool, depth: usize) {
    let len = items.len() as u64;
    if let Some(min) = rules.min_items
      && len < min
    {
      self.push(path, format!("must NOT have fewer than {min} items"));
    }
    if let Some(max) = rules.max_items
      && len > max
    {
      self.push(path, format!("must NOT have more than {max} items"));
    }
    if let Some(node) = &rules.items {
      for (index, item) in items.iter_mut().enumerate() {
        self.check(node, item, &format!("{path}/{index}"), strip, depth + 1);
      }
    }
  }

  fn check_string(&mut self, rules: &Rules, s: &str, path: &str) {
    let len = s.chars().count() as u64;
    if let Some(min) = rules.min_length
      && len < min
    {
      self.push(path, format!("must NOT have fewer than {min} characters"));
    }
    if let Some(max) = rules.max_length
      && len > max
    {
      self.push(path, format!("must NOT have more than {max} characters"));
    }
    if let Some(pattern) = &rules.pattern
      && !pattern.is_match(s)
    {
      self.push(path, format!("must match pattern \"{}\"", pattern.as_str()));
    }
    if let Some(name) = &rules.format
      && !format::matches(name, s)
    {
      self.push(path, format!("must match format \"{name}\""));
    }
  }

  fn check_number(&mut self, rules: &Rules, n: &Number, path: &str) {
    let Some(x) = n.as_f64() else {
      return;
    };
    if let Some(min) = rules.minimum
      && x < min
    {
      self.push(path, format!("must be >= {}", display_number(min)));
    }
    if let Some(max) = rules.maximum
      && x > max
    {
      self.push(path, format!("must be <= {}", display_number(max)));
    }
    if let Some(min) = rules.exclusive_minimum
      && x <= min
    {
      self.push(path, format!("must be > {}", display_number(min)));
    }
    if let Some(max) = rules.exclusive_maximum
      && x >= max
    {
      self.push(path, format!("must be < {}", display_number(max)));
    }
    if let Some(step) = rules.multiple_of
      && step != 0.0
    {
      let quotient = x / step;
      if (quotient - quotient.round()).abs() > 1e-9 {
        self.push(path, format!("must be multiple of {}", display_number(step)));
      }
    }
  }
}

fn child_path(parent: &str, key: &str) -> String {
  format!("{parent}/{}", key.replace('~', "~0").replace('/', "~1"))
}

/// Render `3.0` as `3`, keep `2.5` as is.
fn display_number(n: f64) -> String {
  if n.fract() == 0.0 && n.abs() < 1e15 {
    format!("{}", n as i64)
  } else {
    n.to_string()
  }
}

/// JSON equality that treats `1` and `1.0` as the same number.
fn json_equal(a: &Value, b: &Value) -> bool {
  match (a, b) {
    (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
    (Value::Array(x), Value::Array(y)) => {
      x.len() == y.len() && x.iter().zip(y).all(|(l, r)| json_equal(l, r))
    }
    (Value::Object(x), Value::Object(y)) => {
      x.len() == y.len()
        && x
          .iter()
          .all(|(key, l)| y.get(key).is_some_and(|r| json_equal(l, r)))
    }
    _ => a == b,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn validate(schema: Value, data: Value) -> ValidationResult {
    StructuralValidator::new()
      .validate(&data, &Schema::json(schema))
      .unwrap()
  }

  fn issues(result: ValidationResult) -> Vec<ValidationIssue> {
    match result {
      ValidationResult::Invalid(mut issues) => {
        issues.sort_by(|a, b| a.path.cmp(&b.path));
        issues
      }
      ValidationResult::Valid(value) => panic!("expected issues, got {value}"),
    }
  }

  #[test]
  fn test_missing_required_property() {
    let result = validate(
      json!({
        "type": "object",
        "properties": { "foo": { "type": "string" }, "baz": { "type": "string" } },
        "required": ["foo", "baz"],
        "additionalProperties": false
      }),
      json!({ "foo": "bar" }),
    );

    assert_eq!(
      issues(result),
      vec![ValidationIssue::new("", "must have required property 'baz'")]
    );
  }

  #[test]
  fn test_nested_paths_are_pointers() {
    let result = validate(
      json!({
        "type": "object",
        "properties": {
          "user": {
            "type": "object",
            "properties": { "age": { "type": "integer", "minimum": 18 } }
          },
          "tags": { "type": "array", "items": { "type": "string" } }
        }
      }),
      json!({ "user": { "age": 7 }, "tags": ["a", 2] }),
    );

    assert_eq!(
      issues(result),
      vec![
        ValidationIssue::new("/tags/1", "must be string"),
        ValidationIssue::new("/user/age", "must be >= 18"),
      ]
    );
  }

  #[test]
  fn test_defaults_applied_and_extras_stripped() {
    let result = validate(
      json!({
        "type": "object",
        "properties": {
          "name": { "type": "string" },
          "greeting": { "type": "string", "default": "Hello" }
        },
        "required": ["name", "greeting"]
      }),
      json!({ "name": "Ada", "unexpected": true }),
    );

    assert_eq!(
      result,
      ValidationResult::Valid(json!({ "name": "Ada", "greeting": "Hello" }))
    );
  }

  #[test]
  fn test_additional_properties_true_keeps_extras() {
    let result = validate(
      json!({
        "type": "object",
        "properties": { "name": { "type": "string" } },
        "additionalProperties": true
      }),
      json!({ "name": "Ada", "extra": 1 }),
    );

    assert_eq!(result, ValidationResult::Valid(json!({ "name": "Ada", "extra": 1 })));
  }

  #[test]
  fn test_type_mismatch_stops_node() {
    let result = validate(
      json!({
        "type": "object",
        "properties": { "code": { "type": "string", "minLength": 4 } }
      }),
      json!({ "code": 5 }),
    );

    assert_eq!(issues(result), vec![ValidationIssue::new("/code", "must be string")]);
  }

  #[test]
  fn test_multi_type_message() {
    let result = validate(
      json!({ "type": "object", "properties": { "a": { "type": ["string", "null"] } } }),
      json!({ "a": 1 }),
    );

    assert_eq!(issues(result), vec![ValidationIssue::new("/a", "must be string,null")]);
  }

  #[test]
  fn test_string_keywords() {
    let result = validate(
      json!({
        "type": "object",
        "properties": {
          "code": { "type": "string", "minLength": 3, "pattern": "^[A-Z]+$" },
          "email": { "type": "string", "format": "email" },
          "kind": { "enum": ["a", "b"] },
          "version": { "const": 2 }
        }
      }),
      json!({ "code": "ab", "email": "nope", "kind": "c", "version": 2.0 }),
    );

    assert_eq!(
      issues(result),
      vec![
        ValidationIssue::new("/code", "must NOT have fewer than 3 characters"),
        ValidationIssue::new("/code", "must match pattern \"^[A-Z]+$\""),
        ValidationIssue::new("/email", "must match format \"email\""),
        ValidationIssue::new("/kind", "must be equal to one of the allowed values"),
      ]
    );
  }

  #[test]
  fn test_any_of_adopts_passing_branch() {
    let result = validate(
      json!({
        "anyOf": [
          { "type": "object", "properties": { "sms": { "type": "string" } }, "required": ["sms"] },
          { "type": "object", "properties": { "email": { "type": "string" } }, "required": ["email"] }
        ]
      }),
      json!({ "email": "a@b.co", "noise": 1 }),
    );

    assert_eq!(result, ValidationResult::Valid(json!({ "email": "a@b.co" })));
  }

  #[test]
  fn test_one_of_requires_exactly_one() {
    let schema = json!({
      "type": "object",
      "oneOf": [
        { "type": "object", "required": ["a"] },
        { "type": "object", "required": ["b"] }
      ]
    });

    assert!(validate(schema.clone(), json!({ "a": 1 })).is_valid());
    assert_eq!(
      issues(validate(schema, json!({ "a": 1, "b": 2 }))),
      vec![ValidationIssue::new("", "must match exactly one schema in oneOf")]
    );
  }

  #[test]
  fn test_all_of_does_not_strip() {
    let result = validate(
      json!({
        "allOf": [
          { "type": "object", "properties": { "a": { "type": "string" } }, "required": ["a"] },
          { "type": "object", "properties": { "b": { "type": "string" } }, "required": ["b"] }
        ]
      }),
      json!({ "a": "x", "b": "y" }),
    );

    assert_eq!(result, ValidationResult::Valid(json!({ "a": "x", "b": "y" })));
  }

  #[test]
  fn test_ref_resolution() {
    let result = validate(
      json!({
        "type": "object",
        "properties": { "address": { "$ref": "#/$defs/Address" } },
        "$defs": {
          "Address": {
            "type": "object",
            "properties": { "zip": { "type": "string", "maxLength": 5 } },
            "required": ["zip"]
          }
        }
      }),
      json!({ "address": { "zip": "1234567" } }),
    );

    assert_eq!(
      issues(result),
      vec![ValidationIssue::new("/address/zip", "must NOT have more than 5 characters")]
    );
  }

  #[test]
  fn test_number_keywords() {
    let result = validate(
      json!({
        "type": "object",
        "properties": {
          "a": { "type": "number", "exclusiveMaximum": 10 },
          "b": { "type": "number", "multipleOf": 0.5 },
          "c": { "type": "integer" }
        }
      }),
      json!({ "a": 10, "b": 1.25, "c": 1.5 }),
    );

    assert_eq!(
      issues(result),
      vec![
        ValidationIssue::new("/a", "must be < 10"),
        ValidationIssue::new("/b", "must be multiple of 0.5"),
        ValidationIssue::new("/c", "must be integer"),
      ]
    );
  }

  #[test]
  fn test_pointer_escaping() {
    let result = validate(
      json!({ "type": "object", "properties": { "a/b": { "type": "string" } } }),
      json!({ "a/b": 1 }),
    );

    assert_eq!(issues(result), vec![ValidationIssue::new("/a~1b", "must be string")]);
  }

  #[test]
  fn test_can_handle_object_roots_only() {
    let validator = StructuralValidator::new();
    assert!(validator.can_handle(&Schema::json(json!({ "type": "object" }))));
    assert!(validator.can_handle(&Schema::json(json!({ "type": ["object", "null"] }))));
    assert!(validator.can_handle(&Schema::json(json!({ "anyOf": [{ "type": "object" }] }))));
    assert!(!validator.can_handle(&Schema::json(json!({ "type": "string" }))));
    assert!(!validator.can_handle(&Schema::json(json!(true))));
  }

  #[test]
  fn test_compiles_each_schema_once() {
    let validator = StructuralValidator::new();
    let schema = Schema::json(json!({ "type": "object" }));

    validator.validate(&json!({}), &schema).unwrap();
    validator.validate(&json!({ "a": 1 }), &schema.clone()).unwrap();
    assert_eq!(validator.cached_len(), 1);

    validator
      .validate(&json!({}), &Schema::json(json!({ "type": "object" })))
      .unwrap();
    assert_eq!(validator.cached_len(), 2);
  }
}
