//! Runtime error types.

use herald_config::ErrorResponse;
use herald_schema::{SchemaError, ValidationIssue};
use herald_template::TemplateError;
use serde_json::Value;

/// A boxed error from host code.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Coarse classification of an error, mapped to an HTTP status by transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStatus {
  NotFound,
  BadRequest,
  Unauthorized,
  Conflict,
  Forbidden,
  Server,
}

impl ErrorStatus {
  pub fn http_status(&self) -> u16 {
    match self {
      ErrorStatus::NotFound => 404,
      ErrorStatus::BadRequest => 400,
      ErrorStatus::Unauthorized => 401,
      ErrorStatus::Conflict => 409,
      ErrorStatus::Forbidden => 403,
      ErrorStatus::Server => 500,
    }
  }
}

/// Errors surfaced by the runtime.
#[derive(Debug, thiserror::Error)]
pub enum FrameworkError {
  #[error("workflow '{workflow_id}' not found")]
  WorkflowNotFound { workflow_id: String },

  #[error("step '{step_id}' not found in workflow '{workflow_id}'")]
  StepNotFound { workflow_id: String, step_id: String },

  /// A provider declared at discovery was not supplied at the step's call site.
  #[error("provider '{provider_type}' not found for step '{step_id}' in workflow '{workflow_id}'")]
  ProviderNotFound {
    workflow_id: String,
    step_id: String,
    provider_type: String,
  },

  #[error("invalid payload for workflow '{workflow_id}'")]
  EventPayloadInvalid {
    workflow_id: String,
    issues: Vec<ValidationIssue>,
  },

  #[error("invalid controls for workflow '{workflow_id}'")]
  EventControlsInvalid {
    workflow_id: String,
    issues: Vec<ValidationIssue>,
  },

  #[error("invalid output for step '{step_id}' in workflow '{workflow_id}'")]
  StepOutputInvalid {
    workflow_id: String,
    step_id: String,
    issues: Vec<ValidationIssue>,
  },

  /// A result supplied in the event state does not match the step's result schema.
  #[error("invalid result for step '{step_id}' in workflow '{workflow_id}'")]
  StepResultInvalid {
    workflow_id: String,
    step_id: String,
    issues: Vec<ValidationIssue>,
  },

  #[error("invalid controls for step '{step_id}' in workflow '{workflow_id}'")]
  StepControlsInvalid {
    workflow_id: String,
    step_id: String,
    issues: Vec<ValidationIssue>,
  },

  #[error(
    "invalid output for provider '{provider_type}' of step '{step_id}' in workflow '{workflow_id}'"
  )]
  ProviderOutputInvalid {
    workflow_id: String,
    step_id: String,
    provider_type: String,
    issues: Vec<ValidationIssue>,
  },

  #[error("failed to compile controls for step '{step_id}' in workflow '{workflow_id}': {source}")]
  StepControlCompilationFailed {
    workflow_id: String,
    step_id: String,
    #[source]
    source: TemplateError,
  },

  #[error("step '{step_id}' in workflow '{workflow_id}' failed: {source}")]
  StepExecutionFailed {
    workflow_id: String,
    step_id: String,
    #[source]
    source: BoxError,
  },

  #[error(
    "provider '{provider_type}' of step '{step_id}' in workflow '{workflow_id}' failed: {source}"
  )]
  ProviderExecutionFailed {
    workflow_id: String,
    step_id: String,
    provider_type: String,
    #[source]
    source: BoxError,
  },

  /// The event state has no entry for a step that precedes the target.
  #[error("state for step '{step_id}' in workflow '{workflow_id}' is missing")]
  ExecutionStateCorrupt { workflow_id: String, step_id: String },

  /// The workflow body returned without ever reaching the target step.
  #[error("workflow '{workflow_id}' finished without reaching step '{step_id}'")]
  ExecutionResultMissing { workflow_id: String, step_id: String },

  /// The workflow body failed outside of any step.
  #[error("workflow '{workflow_id}' failed: {source}")]
  WorkflowExecutionFailed {
    workflow_id: String,
    #[source]
    source: BoxError,
  },

  #[error("step '{step_id}' already exists in workflow '{workflow_id}'")]
  StepAlreadyExists { workflow_id: String, step_id: String },

  #[error("invalid schema for {context}: {source}")]
  InvalidSchema {
    context: String,
    #[source]
    source: SchemaError,
  },

  /// Returned to the workflow body for steps invoked after the invocation concluded.
  #[error("execution of workflow '{workflow_id}' already concluded before step '{step_id}'")]
  Cancelled { workflow_id: String, step_id: String },
}

impl FrameworkError {
  pub fn status(&self) -> ErrorStatus {
    match self {
      FrameworkError::WorkflowNotFound { .. }
      | FrameworkError::StepNotFound { .. }
      | FrameworkError::ProviderNotFound { .. } => ErrorStatus::NotFound,
      FrameworkError::EventPayloadInvalid { .. }
      | FrameworkError::EventControlsInvalid { .. }
      | FrameworkError::StepOutputInvalid { .. }
      | FrameworkError::StepResultInvalid { .. }
      | FrameworkError::StepControlsInvalid { .. }
      | FrameworkError::ProviderOutputInvalid { .. }
      | FrameworkError::StepControlCompilationFailed { .. } => ErrorStatus::BadRequest,
      FrameworkError::StepAlreadyExists { .. } => ErrorStatus::Conflict,
      FrameworkError::StepExecutionFailed { .. }
      | FrameworkError::ProviderExecutionFailed { .. }
      | FrameworkError::ExecutionStateCorrupt { .. }
      | FrameworkError::ExecutionResultMissing { .. }
      | FrameworkError::WorkflowExecutionFailed { .. }
      | FrameworkError::InvalidSchema { .. }
      | FrameworkError::Cancelled { .. } => ErrorStatus::Server,
    }
  }

  /// Machine-readable error code.
  pub fn code(&self) -> &'static str {
    match self {
      FrameworkError::WorkflowNotFound { .. } => "WorkflowNotFoundError",
      FrameworkError::StepNotFound { .. } => "StepNotFoundError",
      FrameworkError::ProviderNotFound { .. } => "ProviderNotFoundError",
      FrameworkError::EventPayloadInvalid { .. } => "ExecutionEventPayloadInvalidError",
      FrameworkError::EventControlsInvalid { .. } => "ExecutionEventControlsInvalidError",
      FrameworkError::StepOutputInvalid { .. } => "ExecutionStateOutputInvalidError",
      FrameworkError::StepResultInvalid { .. } => "ExecutionStateResultInvalidError",
      FrameworkError::StepControlsInvalid { .. } => "ExecutionStateControlsInvalidError",
      FrameworkError::ProviderOutputInvalid { .. } => "ExecutionProviderOutputInvalidError",
      FrameworkError::StepControlCompilationFailed { .. } => "StepControlCompilationFailedError",
      FrameworkError::StepExecutionFailed { .. } => "StepExecutionFailedError",
      FrameworkError::ProviderExecutionFailed { .. } => "ProviderExecutionFailedError",
      FrameworkError::ExecutionStateCorrupt { .. } => "ExecutionStateCorruptError",
      FrameworkError::ExecutionResultMissing { .. } => "ExecutionStateResultMissingError",
      FrameworkError::WorkflowExecutionFailed { .. } => "WorkflowExecutionFailedError",
      FrameworkError::StepAlreadyExists { .. } => "StepAlreadyExistsError",
      FrameworkError::InvalidSchema { .. } => "InvalidSchemaError",
      FrameworkError::Cancelled { .. } => "ExecutionCancelledError",
    }
  }

  /// The schema violations behind a validation failure.
  pub fn issues(&self) -> Option<&[ValidationIssue]> {
    match self {
      FrameworkError::EventPayloadInvalid { issues, .. }
      | FrameworkError::EventControlsInvalid { issues, .. }
      | FrameworkError::StepOutputInvalid { issues, .. }
      | FrameworkError::StepResultInvalid { issues, .. }
      | FrameworkError::StepControlsInvalid { issues, .. }
      | FrameworkError::ProviderOutputInvalid { issues, .. } => Some(issues),
      _ => None,
    }
  }

  /// Structured error data for the wire.
  pub fn data(&self) -> Option<Value> {
    self
      .issues()
      .and_then(|issues| serde_json::to_value(issues).ok())
  }

  pub fn to_response(&self) -> ErrorResponse {
    ErrorResponse {
      code: self.code().to_string(),
      message: self.to_string(),
      data: self.data(),
    }
  }

  /// Recover a framework error carried through host code, or wrap a foreign one.
  pub(crate) fn from_host(err: anyhow::Error, wrap: impl FnOnce(BoxError) -> Self) -> Self {
    match err.downcast::<FrameworkError>() {
      Ok(framework) => framework,
      Err(other) => wrap(other.into()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_validation_error_response() {
    let err = FrameworkError::StepControlsInvalid {
      workflow_id: "onboarding".to_string(),
      step_id: "welcome".to_string(),
      issues: vec![ValidationIssue::new("", "must have required property 'baz'")],
    };

    assert_eq!(err.status(), ErrorStatus::BadRequest);
    assert_eq!(err.status().http_status(), 400);

    let response = err.to_response();
    assert_eq!(response.code, "ExecutionStateControlsInvalidError");
    assert_eq!(
      response.data,
      Some(json!([{ "path": "", "message": "must have required property 'baz'" }]))
    );
  }

  #[test]
  fn test_from_host_keeps_framework_errors() {
    let inner = FrameworkError::ExecutionStateCorrupt {
      workflow_id: "w".to_string(),
      step_id: "s".to_string(),
    };
    let recovered = FrameworkError::from_host(anyhow::Error::new(inner), |source| {
      FrameworkError::WorkflowExecutionFailed {
        workflow_id: "w".to_string(),
        source,
      }
    });

    assert!(matches!(recovered, FrameworkError::ExecutionStateCorrupt { .. }));
  }

  #[test]
  fn test_from_host_wraps_foreign_errors() {
    let wrapped = FrameworkError::from_host(anyhow::anyhow!("smtp down"), |source| {
      FrameworkError::StepExecutionFailed {
        workflow_id: "w".to_string(),
        step_id: "s".to_string(),
        source,
      }
    });

    assert_eq!(wrapped.code(), "StepExecutionFailedError");
    assert_eq!(wrapped.status(), ErrorStatus::Server);
    assert!(wrapped.to_string().contains("smtp down"));
    assert!(wrapped.data().is_none());
  }

  #[test]
  fn test_conflict_and_not_found() {
    let conflict = FrameworkError::StepAlreadyExists {
      workflow_id: "w".to_string(),
      step_id: "s".to_string(),
    };
    let missing = FrameworkError::WorkflowNotFound {
      workflow_id: "w".to_string(),
    };

    assert_eq!(conflict.status().http_status(), 409);
    assert_eq!(missing.status().http_status(), 404);
  }
}
