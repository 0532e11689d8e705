use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::preferences::WorkflowPreferences;
use crate::step_kind::StepKind;

/// Snapshot of every discovered workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoverOutput {
  pub workflows: Vec<DiscoverWorkflowOutput>,
}

/// A JSON Schema in canonical structural form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaOutput {
  pub schema: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverWorkflowOutput {
  pub workflow_id: String,
  pub code: String,
  pub payload: SchemaOutput,
  pub controls: SchemaOutput,
  pub preferences: WorkflowPreferences,
  pub tags: Vec<String>,
  /// Steps in the order the workflow body invokes them.
  pub steps: Vec<DiscoverStepOutput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverStepOutput {
  pub step_id: String,
  #[serde(rename = "type")]
  pub kind: StepKind,
  pub code: String,
  pub controls: SchemaOutput,
  pub outputs: SchemaOutput,
  pub results: SchemaOutput,
  pub options: DiscoverStepOptions,
  pub providers: Vec<DiscoverProviderOutput>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoverStepOptions {
  /// Whether the step declares a skip predicate.
  pub skip: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverProviderOutput {
  #[serde(rename = "type")]
  pub provider_type: String,
  pub code: String,
  pub outputs: SchemaOutput,
}
