//! The closed set of schema dialects.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::compile::CompiledSchema;
use crate::error::SchemaError;

type ParseFn = dyn Fn(Value) -> Result<Value, serde_json::Error> + Send + Sync;

/// A schema attached to a workflow, step or provider.
#[derive(Clone)]
pub enum Schema {
  /// A plain JSON Schema document.
  Json(Arc<Value>),
  /// A Rust type with a derived schema and serde parsing.
  CodeFirst(CodeFirstSchema),
}

impl Schema {
  /// Wrap a JSON Schema document.
  pub fn json(schema: Value) -> Self {
    Schema::Json(Arc::new(schema))
  }

  /// Derive a schema from a Rust type.
  ///
  /// Validation parses the data into `T` and serializes it back, so the
  /// validated value carries serde defaults and renames.
  pub fn of<T>() -> Self
  where
    T: JsonSchema + DeserializeOwned + Serialize + 'static,
  {
    let generated = schemars::schema_for!(T);
    Schema::CodeFirst(CodeFirstSchema {
      type_name: std::any::type_name::<T>(),
      json_schema: Arc::new(generated.as_value().clone()),
      compiled: Arc::new(OnceCell::new()),
      parse: Arc::new(|data: Value| {
        let parsed: T = serde_json::from_value(data)?;
        serde_json::to_value(parsed)
      }),
    })
  }

  /// An object schema accepting any properties.
  pub fn any_object() -> Self {
    Schema::json(json!({ "type": "object", "additionalProperties": true }))
  }

  /// An object schema that accepts nothing but `{}`.
  pub fn empty_object() -> Self {
    Schema::json(json!({
      "type": "object",
      "properties": {},
      "required": [],
      "additionalProperties": false
    }))
  }
}

impl From<Value> for Schema {
  fn from(schema: Value) -> Self {
    Schema::json(schema)
  }
}

impl fmt::Debug for Schema {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Schema::Json(schema) => f.debug_tuple("Json").field(schema).finish(),
      Schema::CodeFirst(schema) => f.debug_tuple("CodeFirst").field(schema).finish(),
    }
  }
}

/// A schema derived from a Rust type via `schemars`.
#[derive(Clone)]
pub struct CodeFirstSchema {
  type_name: &'static str,
  json_schema: Arc<Value>,
  compiled: Arc<OnceCell<Arc<CompiledSchema>>>,
  parse: Arc<ParseFn>,
}

impl CodeFirstSchema {
  pub fn type_name(&self) -> &'static str {
    self.type_name
  }

  /// The generated JSON Schema.
  pub fn json_schema(&self) -> &Value {
    &self.json_schema
  }

  pub(crate) fn compiled(&self) -> Result<Arc<CompiledSchema>, SchemaError> {
    self
      .compiled
      .get_or_try_init(|| CompiledSchema::compile(&self.json_schema).map(Arc::new))
      .cloned()
  }

  pub(crate) fn parse(&self, data: Value) -> Result<Value, serde_json::Error> {
    (self.parse)(data)
  }
}

impl fmt::Debug for CodeFirstSchema {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CodeFirstSchema")
      .field("type_name", &self.type_name)
      .finish_non_exhaustive()
  }
}
