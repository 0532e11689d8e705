use serde_json::Value;

/// Recursively merge `overlay` onto `base`.
///
/// Objects merge key by key. Arrays and scalars in `overlay` replace the
/// value in `base` wholesale.
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
  match (base, overlay) {
    (Value::Object(base), Value::Object(overlay)) => {
      let mut merged = base.clone();
      for (key, value) in overlay {
        let next = match merged.get(key) {
          Some(existing) => deep_merge(existing, value),
          None => value.clone(),
        };
        merged.insert(key.clone(), next);
      }
      Value::Object(merged)
    }
    (_, overlay) => overlay.clone(),
  }
}
