//! Discovered, immutable workflow definitions.

use herald_config::{
  DiscoverProviderOutput, DiscoverStepOptions, DiscoverStepOutput, DiscoverWorkflowOutput,
  SchemaOutput, StepKind, WorkflowPreferences,
};
use herald_schema::{Schema, SchemaValidator};

use crate::error::FrameworkError;
use crate::workflow::WorkflowBody;

/// A workflow after discovery: its body plus every step it invokes, in order.
pub struct WorkflowDefinition {
  pub workflow_id: String,
  pub(crate) body: WorkflowBody,
  pub steps: Vec<StepDefinition>,
  pub payload_schema: Schema,
  pub controls_schema: Schema,
  pub preferences: WorkflowPreferences,
  pub tags: Vec<String>,
  pub code: String,
  /// Introspection form, with every schema projected to JSON Schema.
  pub(crate) summary: DiscoverWorkflowOutput,
}

impl WorkflowDefinition {
  pub fn step(&self, step_id: &str) -> Option<&StepDefinition> {
    self.steps.iter().find(|s| s.step_id == step_id)
  }

  pub fn summary(&self) -> &DiscoverWorkflowOutput {
    &self.summary
  }
}

impl std::fmt::Debug for WorkflowDefinition {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("WorkflowDefinition")
      .field("workflow_id", &self.workflow_id)
      .field("steps", &self.steps)
      .field("tags", &self.tags)
      .finish_non_exhaustive()
  }
}

#[derive(Debug, Clone)]
pub struct StepDefinition {
  pub step_id: String,
  pub kind: StepKind,
  pub controls_schema: Schema,
  pub output_schema: Schema,
  pub result_schema: Schema,
  /// Whether the call site declares a skip predicate.
  pub skippable: bool,
  pub providers: Vec<ProviderDefinition>,
  pub code: String,
}

#[derive(Debug, Clone)]
pub struct ProviderDefinition {
  pub provider_type: String,
  pub output_schema: Schema,
  pub code: String,
}

pub(crate) fn project(
  validator: &SchemaValidator,
  context: impl FnOnce() -> String,
  schema: &Schema,
) -> Result<SchemaOutput, FrameworkError> {
  validator
    .to_json_schema(schema)
    .map(|schema| SchemaOutput { schema })
    .map_err(|source| FrameworkError::InvalidSchema {
      context: context(),
      source,
    })
}

impl StepDefinition {
  pub(crate) fn summarize(
    &self,
    workflow_id: &str,
    validator: &SchemaValidator,
  ) -> Result<DiscoverStepOutput, FrameworkError> {
    let context = |what: &str| format!("{what} of step '{}' in workflow '{workflow_id}'", self.step_id);

    let providers = self
      .providers
      .iter()
      .map(|provider| {
        Ok(DiscoverProviderOutput {
          provider_type: provider.provider_type.clone(),
          code: provider.code.clone(),
          outputs: project(
            validator,
            || context(&format!("outputs of provider '{}'", provider.provider_type)),
            &provider.output_schema,
          )?,
        })
      })
      .collect::<Result<Vec<_>, FrameworkError>>()?;

    Ok(DiscoverStepOutput {
      step_id: self.step_id.clone(),
      kind: self.kind,
      code: self.code.clone(),
      controls: project(validator, || context("controls"), &self.controls_schema)?,
      outputs: project(validator, || context("outputs"), &self.output_schema)?,
      results: project(validator, || context("results"), &self.result_schema)?,
      options: DiscoverStepOptions {
        skip: self.skippable,
      },
      providers,
    })
  }
}
