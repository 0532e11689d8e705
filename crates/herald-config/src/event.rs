use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What the caller wants done with the target step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
  /// Run the target step for real: resolve, providers, validation.
  Execute,
  /// Dry run: non-target steps and all providers are fabricated from schemas.
  Preview,
}

/// One invocation of a workflow, targeting a single step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
  pub action: Action,
  pub workflow_id: String,
  /// The target step. It is the only step fully computed by this invocation.
  pub step_id: String,
  /// Trigger payload. Required for `execute`; a partial is enough for `preview`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub payload: Option<Value>,
  /// Controls for the target step.
  #[serde(default = "empty_object")]
  pub controls: Value,
  #[serde(default)]
  pub subscriber: Subscriber,
  /// Outputs of steps that ran in earlier invocations.
  #[serde(default)]
  pub state: Vec<StepState>,
}

impl Event {
  /// Look up the recorded outputs for a step.
  pub fn state_for(&self, step_id: &str) -> Option<&StepState> {
    self.state.iter().find(|s| s.step_id == step_id)
  }
}

/// A prior step's already-computed outputs, persisted by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepState {
  pub step_id: String,
  #[serde(default = "empty_object")]
  pub outputs: Value,
}

/// The recipient the workflow is running for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub subscriber_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub first_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub last_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub phone: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub avatar: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub locale: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub data: Option<Value>,
}

fn empty_object() -> Value {
  Value::Object(serde_json::Map::new())
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_event_minimal_fields() {
    let event: Event = serde_json::from_value(json!({
      "action": "execute",
      "workflowId": "onboarding",
      "stepId": "welcome"
    }))
    .unwrap();

    assert_eq!(event.action, Action::Execute);
    assert_eq!(event.payload, None);
    assert_eq!(event.controls, json!({}));
    assert!(event.state.is_empty());
    assert_eq!(event.subscriber, Subscriber::default());
  }

  #[test]
  fn test_state_lookup() {
    let event: Event = serde_json::from_value(json!({
      "action": "preview",
      "workflowId": "onboarding",
      "stepId": "reminder",
      "subscriber": { "subscriberId": "sub-1", "firstName": "Ada" },
      "state": [
        { "stepId": "welcome", "outputs": { "subject": "hi" } }
      ]
    }))
    .unwrap();

    assert_eq!(event.subscriber.first_name.as_deref(), Some("Ada"));
    assert_eq!(
      event.state_for("welcome").map(|s| &s.outputs),
      Some(&json!({ "subject": "hi" }))
    );
    assert!(event.state_for("reminder").is_none());
  }
}
