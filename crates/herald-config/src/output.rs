use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Result of one successful invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteOutput {
  pub outputs: Value,
  /// Provider outputs keyed by provider type.
  pub providers: Map<String, Value>,
  pub options: ExecuteOptions,
  pub metadata: ExecuteMetadata,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteOptions {
  pub skip: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteMetadata {
  pub status: ExecutionStatus,
  pub error: bool,
  /// Wall-clock duration of the invocation in milliseconds.
  pub duration: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
  Success,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeOutput {
  pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheck {
  pub status: HealthStatus,
  pub framework_version: String,
  pub discovered: DiscoveredCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
  Ok,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredCount {
  pub workflows: usize,
  pub steps: usize,
}

/// Error document a transport sends back alongside the error's status code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
  pub code: String,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub data: Option<Value>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_execute_output_shape() {
    let output = ExecuteOutput {
      outputs: json!({ "subject": "Welcome" }),
      providers: Map::new(),
      options: ExecuteOptions { skip: false },
      metadata: ExecuteMetadata {
        status: ExecutionStatus::Success,
        error: false,
        duration: 12,
      },
    };

    assert_eq!(
      serde_json::to_value(&output).unwrap(),
      json!({
        "outputs": { "subject": "Welcome" },
        "providers": {},
        "options": { "skip": false },
        "metadata": { "status": "success", "error": false, "duration": 12 }
      })
    );
  }

  #[test]
  fn test_error_response_omits_empty_data() {
    let response = ErrorResponse {
      code: "WorkflowNotFoundError".to_string(),
      message: "workflow 'x' not found".to_string(),
      data: None,
    };

    let value = serde_json::to_value(&response).unwrap();
    assert!(value.get("data").is_none());
  }
}
