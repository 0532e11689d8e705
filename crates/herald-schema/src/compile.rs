//! Compilation of JSON Schema documents into a keyword tree.
//!
//! Every keyword is parsed once up front (regexes included) so validation
//! is a plain walk. Local `$ref`s are compiled into a side table keyed by the
//! reference string.

use std::collections::HashMap;

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::SchemaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JsonType {
  Null,
  Boolean,
  Object,
  Array,
  Number,
  Integer,
  String,
}

impl JsonType {
  fn parse(name: &str) -> Option<Self> {
    match name {
      "null" => Some(JsonType::Null),
      "boolean" => Some(JsonType::Boolean),
      "object" => Some(JsonType::Object),
      "array" => Some(JsonType::Array),
      "number" => Some(JsonType::Number),
      "integer" => Some(JsonType::Integer),
      "string" => Some(JsonType::String),
      _ => None,
    }
  }

  pub(crate) fn as_str(&self) -> &'static str {
    match self {
      JsonType::Null => "null",
      JsonType::Boolean => "boolean",
      JsonType::Object => "object",
      JsonType::Array => "array",
      JsonType::Number => "number",
      JsonType::Integer => "integer",
      JsonType::String => "string",
    }
  }

  pub(crate) fn matches(&self, value: &Value) -> bool {
    match self {
      JsonType::Null => value.is_null(),
      JsonType::Boolean => value.is_boolean(),
      JsonType::Object => value.is_object(),
      JsonType::Array => value.is_array(),
      JsonType::Number => value.is_number(),
      JsonType::Integer => is_integer(value),
      JsonType::String => value.is_string(),
    }
  }
}

fn is_integer(value: &Value) -> bool {
  match value {
    Value::Number(n) => n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0),
    _ => false,
  }
}

/// A compiled schema node.
#[derive(Debug)]
pub(crate) enum Node {
  /// The `true` schema.
  Always,
  /// The `false` schema.
  Never,
  Rules(Box<Rules>),
}

impl Node {
  pub(crate) fn default_value(&self) -> Option<&Value> {
    match self {
      Node::Rules(rules) => rules.default.as_ref(),
      _ => None,
    }
  }
}

/// What happens to properties an object schema does not declare.
#[derive(Debug, Default)]
pub(crate) enum Additional {
  #[default]
  Allow,
  /// Undeclared properties are removed from the validated value.
  Strip,
  Schema(Node),
}

#[derive(Debug, Default)]
pub(crate) struct Rules {
  /// Empty means any type.
  pub types: Vec<JsonType>,
  pub reference: Option<String>,
  pub default: Option<Value>,

  pub properties: Vec<(String, Node)>,
  pub required: Vec<String>,
  pub additional: Additional,

  pub items: Option<Node>,
  pub min_items: Option<u64>,
  pub max_items: Option<u64>,

  pub enum_values: Option<Vec<Value>>,
  pub const_value: Option<Value>,

  pub minimum: Option<f64>,
  pub maximum: Option<f64>,
  pub exclusive_minimum: Option<f64>,
  pub exclusive_maximum: Option<f64>,
  pub multiple_of: Option<f64>,

  pub min_length: Option<u64>,
  pub max_length: Option<u64>,
  pub pattern: Option<Regex>,
  pub format: Option<String>,

  pub any_of: Vec<Node>,
  pub one_of: Vec<Node>,
  pub all_of: Vec<Node>,
}

impl Rules {
  pub(crate) fn declares(&self, property: &str) -> bool {
    self.properties.iter().any(|(name, _)| name == property)
  }
}

/// A schema document compiled into a [`Node`] tree plus its reference table.
#[derive(Debug)]
pub(crate) struct CompiledSchema {
  root: Node,
  refs: HashMap<String, Node>,
}

impl CompiledSchema {
  pub(crate) fn compile(schema: &Value) -> Result<Self, SchemaError> {
    let mut pending = Vec::new();
    let root = compile_node(schema, &mut pending)?;

    let mut refs = HashMap::new();
    while let Some(reference) = pending.pop() {
      if refs.contains_key(&reference) {
        continue;
      }
      let target = resolve_pointer(schema, &reference)?;
      let node = compile_node(target, &mut pending)?;
      refs.insert(reference, node);
    }

    Ok(Self { root, refs })
  }

  pub(crate) fn root(&self) -> &Node {
    &self.root
  }

  pub(crate) fn reference(&self, reference: &str) -> Option<&Node> {
    self.refs.get(reference)
  }
}

/// Resolve a local `#/...` reference against the schema root.
pub(crate) fn resolve_pointer<'a>(root: &'a Value, reference: &str) -> Result<&'a Value, SchemaError> {
  let unresolved = || SchemaError::UnresolvedReference {
    reference: reference.to_string(),
  };
  let pointer = reference.strip_prefix('#').ok_or_else(unresolved)?;
  if pointer.is_empty() {
    return Ok(root);
  }
  root.pointer(pointer).ok_or_else(unresolved)
}

fn compile_node(schema: &Value, pending: &mut Vec<String>) -> Result<Node, SchemaError> {
  let object = match schema {
    Value::Bool(true) => return Ok(Node::Always),
    Value::Bool(false) => return Ok(Node::Never),
    Value::Object(object) => object,
    other => {
      return Err(SchemaError::malformed(format!(
        "expected an object or boolean schema, got {other}"
      )));
    }
  };

  let mut rules = Rules::default();

  if let Some(types) = object.get("type") {
    rules.types = compile_types(types)?;
  }

  if let Some(reference) = object.get("$ref") {
    let reference = reference
      .as_str()
      .ok_or_else(|| SchemaError::malformed("'$ref' must be a string"))?;
    pending.push(reference.to_string());
    rules.reference = Some(reference.to_string());
  }

  rules.default = object.get("default").cloned();

  let declares_properties = match object.get("properties") {
    Some(Value::Object(properties)) => {
      for (name, property) in properties {
        rules
          .properties
          .push((name.clone(), compile_node(property, pending)?));
      }
      true
    }
    Some(_) => return Err(SchemaError::malformed("'properties' must be an object")),
    None => false,
  };

  if let Some(required) = object.get("required") {
    rules.required = string_list(required, "required")?;
  }

  rules.additional = match object.get("additionalProperties") {
    None if declares_properties => Additional::Strip,
    None | Some(Value::Bool(true)) => Additional::Allow,
    Some(Value::Bool(false)) => Additional::Strip,
    Some(schema) => Additional::Schema(compile_node(schema, pending)?),
  };

  match object.get("items") {
    Some(Value::Array(_)) => {
      return Err(SchemaError::malformed("tuple 'items' are not supported"));
    }
    Some(items) => rules.items = Some(compile_node(items, pending)?),
    None => {}
  }
  rules.min_items = unsigned(object, "minItems")?;
  rules.max_items = unsigned(object, "maxItems")?;

  match object.get("enum") {
    Some(Value::Array(values)) => rules.enum_values = Some(values.clone()),
    Some(_) => return Err(SchemaError::malformed("'enum' must be an array")),
    None => {}
  }
  rules.const_value = object.get("const").cloned();

  rules.minimum = number(object, "minimum")?;
  rules.maximum = number(object, "maximum")?;
  rules.multiple_of = number(object, "multipleOf")?;
  // Draft 4 spells exclusivity as a boolean modifier on minimum/maximum.
  match object.get("exclusiveMinimum") {
    Some(Value::Bool(true)) => rules.exclusive_minimum = rules.minimum.take(),
    Some(Value::Bool(false)) | None => {}
    Some(_) => rules.exclusive_minimum = number(object, "exclusiveMinimum")?,
  }
  match object.get("exclusiveMaximum") {
    Some(Value::Bool(true)) => rules.exclusive_maximum = rules.maximum.take(),
    Some(Value::Bool(false)) | None => {}
    Some(_) => rules.exclusive_maximum = number(object, "exclusiveMaximum")?,
  }

  rules.min_length = unsigned(object, "minLength")?;
  rules.max_length = unsigned(object, "maxLength")?;
  if let Some(pattern) = object.get("pattern") {
    let pattern = pattern
      .as_str()
      .ok_or_else(|| SchemaError::malformed("'pattern' must be a string"))?;
    let regex = Regex::new(pattern).map_err(|e| SchemaError::Compile {
      keyword: "pattern".to_string(),
      message: e.to_string(),
    })?;
    rules.pattern = Some(regex);
  }
  rules.format = object.get("format").and_then(Value::as_str).map(str::to_string);

  rules.any_of = combinator(object, "anyOf", pending)?;
  rules.one_of = combinator(object, "oneOf", pending)?;
  rules.all_of = combinator(object, "allOf", pending)?;

  Ok(Node::Rules(Box::new(rules)))
}

fn compile_types(types: &Value) -> Result<Vec<JsonType>, SchemaError> {
  let parse = |name: &str| {
    JsonType::parse(name).ok_or_else(|| SchemaError::malformed(format!("unknown type '{name}'")))
  };
  match types {
    Value::String(name) => Ok(vec![parse(name)?]),
    Value::Array(names) => names
      .iter()
      .map(|name| {
        name
          .as_str()
          .ok_or_else(|| SchemaError::malformed("'type' entries must be strings"))
          .and_then(parse)
      })
      .collect(),
    _ => Err(SchemaError::malformed("'type' must be a string or an array")),
  }
}

fn string_list(value: &Value, keyword: &str) -> Result<Vec<String>, SchemaError> {
  let invalid = || SchemaError::malformed(format!("'{keyword}' must be an array of strings"));
  value
    .as_array()
    .ok_or_else(invalid)?
    .iter()
    .map(|entry| entry.as_str().map(str::to_string).ok_or_else(invalid))
    .collect()
}

fn unsigned(object: &Map<String, Value>, keyword: &str) -> Result<Option<u64>, SchemaError> {
  match object.get(keyword) {
    None => Ok(None),
    Some(value) => value
      .as_u64()
      .map(Some)
      .ok_or_else(|| SchemaError::malformed(format!("'{keyword}' must be a non-negative integer"))),
  }
}

fn number(object: &Map<String, Value>, keyword: &str) -> Result<Option<f64>, SchemaError> {
  match object.get(keyword) {
    None => Ok(None),
    Some(value) => value
      .as_f64()
      .map(Some)
      .ok_or_else(|| SchemaError::malformed(format!("'{keyword}' must be a number"))),
  }
}

fn combinator(
  object: &Map<String, Value>,
  keyword: &str,
  pending: &mut Vec<String>,
) -> Result<Vec<Node>, SchemaError> {
  match object.get(keyword) {
    None => Ok(Vec::new()),
    Some(Value::Array(branches)) if !branches.is_empty() => branches
      .iter()
      .map(|branch| compile_node(branch, pending))
      .collect(),
    Some(_) => Err(SchemaError::malformed(format!(
      "'{keyword}' must be a non-empty array"
    ))),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_compile_rejects_bad_pattern() {
    let err = CompiledSchema::compile(&json!({
      "type": "object",
      "properties": { "code": { "type": "string", "pattern": "([a-z" } }
    }))
    .unwrap_err();

    assert!(matches!(err, SchemaError::Compile { ref keyword, .. } if keyword == "pattern"));
  }

  #[test]
  fn test_compile_resolves_local_refs() {
    let compiled = CompiledSchema::compile(&json!({
      "type": "object",
      "properties": { "address": { "$ref": "#/$defs/Address" } },
      "$defs": { "Address": { "type": "object", "properties": { "city": { "type": "string" } } } }
    }))
    .unwrap();

    assert!(compiled.reference("#/$defs/Address").is_some());
  }

  #[test]
  fn test_compile_fails_on_dangling_ref() {
    let err = CompiledSchema::compile(&json!({ "$ref": "#/$defs/Missing" })).unwrap_err();
    assert!(matches!(err, SchemaError::UnresolvedReference { .. }));
  }

  #[test]
  fn test_properties_without_additional_strip() {
    let Node::Rules(rules) = CompiledSchema::compile(&json!({
      "type": "object",
      "properties": { "a": { "type": "string" } }
    }))
    .unwrap()
    .root
    else {
      panic!("expected rules");
    };

    assert!(matches!(rules.additional, Additional::Strip));
  }

  #[test]
  fn test_draft4_exclusive_minimum() {
    let Node::Rules(rules) = CompiledSchema::compile(&json!({
      "type": "number", "minimum": 3, "exclusiveMinimum": true
    }))
    .unwrap()
    .root
    else {
      panic!("expected rules");
    };

    assert_eq!(rules.minimum, None);
    assert_eq!(rules.exclusive_minimum, Some(3.0));
  }
}
