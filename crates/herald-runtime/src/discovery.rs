//! Discovery: run a workflow body once to record its steps.
//!
//! The body runs against a recording driver. Each step call is turned into a
//! [`StepDefinition`], its schemas checked, and a mock result handed back so
//! the body can carry on to its next step. Nothing host-supplied (resolve,
//! providers, skip predicates) is invoked.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use herald_config::DiscoverWorkflowOutput;
use herald_schema::{Schema, SchemaValidator};
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::definition::{ProviderDefinition, StepDefinition, WorkflowDefinition, project};
use crate::error::FrameworkError;
use crate::schemas;
use crate::step::{Step, StepCall, StepDriver};
use crate::workflow::{Workflow, WorkflowContext};

struct DiscoveryDriver {
  workflow_id: String,
  validator: Arc<SchemaValidator>,
  steps: Mutex<Vec<StepDefinition>>,
  failure: Mutex<Option<FrameworkError>>,
}

impl DiscoveryDriver {
  fn record(&self, call: StepCall) -> Result<Value, FrameworkError> {
    let definition = self.define(&call)?;

    let mut steps = self.steps.lock().unwrap_or_else(|e| e.into_inner());
    if steps.iter().any(|s| s.step_id == definition.step_id) {
      return Err(FrameworkError::StepAlreadyExists {
        workflow_id: self.workflow_id.clone(),
        step_id: definition.step_id,
      });
    }

    let mock = self
      .validator
      .mock(&definition.result_schema)
      .map_err(|source| FrameworkError::InvalidSchema {
        context: format!("results of step '{}' in workflow '{}'", definition.step_id, self.workflow_id),
        source,
      })?;

    debug!(
      workflow_id = %self.workflow_id,
      step_id = %definition.step_id,
      kind = %definition.kind,
      "step_discovered"
    );
    steps.push(definition);
    Ok(mock)
  }

  fn define(&self, call: &StepCall) -> Result<StepDefinition, FrameworkError> {
    let output_schema = match (schemas::output_schema(call.kind), &call.options.output_schema) {
      (Some(builtin), _) => builtin,
      (None, Some(declared)) => declared.clone(),
      (None, None) => Schema::any_object(),
    };
    let result_schema = schemas::result_schema(call.kind).unwrap_or_else(|| output_schema.clone());
    let controls_schema = call
      .options
      .controls_schema
      .clone()
      .unwrap_or_else(Schema::any_object);

    let providers = call
      .options
      .providers
      .iter()
      .map(|p| ProviderDefinition {
        provider_type: p.provider_type.clone(),
        output_schema: p.output_schema.clone(),
        code: p.code.clone(),
      })
      .collect::<Vec<_>>();

    let definition = StepDefinition {
      step_id: call.step_id.clone(),
      kind: call.kind,
      controls_schema,
      output_schema,
      result_schema,
      skippable: call.options.skip.is_some(),
      providers,
      code: call
        .options
        .code
        .clone()
        .unwrap_or_else(|| call.resolve_type.to_string()),
    };

    self.prepare(&definition, "controls", &definition.controls_schema)?;
    self.prepare(&definition, "outputs", &definition.output_schema)?;
    self.prepare(&definition, "results", &definition.result_schema)?;
    for provider in &definition.providers {
      let what = format!("outputs of provider '{}'", provider.provider_type);
      self.prepare(&definition, &what, &provider.output_schema)?;
    }

    Ok(definition)
  }

  fn prepare(&self, step: &StepDefinition, what: &str, schema: &Schema) -> Result<(), FrameworkError> {
    self
      .validator
      .prepare(schema)
      .map_err(|source| FrameworkError::InvalidSchema {
        context: format!("{what} of step '{}' in workflow '{}'", step.step_id, self.workflow_id),
        source,
      })
  }
}

#[async_trait]
impl StepDriver for DiscoveryDriver {
  async fn invoke(&self, call: StepCall) -> Result<Value, FrameworkError> {
    self.record(call).map_err(|e| {
      let code = e.code();
      let message = e.to_string();
      let mut failure = self.failure.lock().unwrap_or_else(|e| e.into_inner());
      failure.get_or_insert(e);
      FrameworkError::WorkflowExecutionFailed {
        workflow_id: self.workflow_id.clone(),
        source: format!("{code}: {message}").into(),
      }
    })
  }
}

/// Discover a workflow's steps and schemas.
#[instrument(name = "discover_workflow", skip(workflow, validator), fields(workflow_id = %workflow.id))]
pub(crate) async fn discover_workflow(
  workflow: &Workflow,
  validator: Arc<SchemaValidator>,
) -> Result<WorkflowDefinition, FrameworkError> {
  let workflow_id = workflow.id.clone();
  let invalid_schema = |what: &str, source| FrameworkError::InvalidSchema {
    context: format!("{what} of workflow '{workflow_id}'"),
    source,
  };

  validator
    .prepare(&workflow.payload_schema)
    .map_err(|source| invalid_schema("payload", source))?;
  validator
    .prepare(&workflow.controls_schema)
    .map_err(|source| invalid_schema("controls", source))?;
  let payload = validator
    .mock(&workflow.payload_schema)
    .map_err(|source| invalid_schema("payload", source))?;
  let controls = validator
    .mock(&workflow.controls_schema)
    .map_err(|source| invalid_schema("controls", source))?;

  let driver = Arc::new(DiscoveryDriver {
    workflow_id: workflow_id.clone(),
    validator: Arc::clone(&validator),
    steps: Mutex::new(Vec::new()),
    failure: Mutex::new(None),
  });

  let context = WorkflowContext {
    payload,
    subscriber: Default::default(),
    controls,
    step: Step::new(driver.clone()),
  };
  let outcome = (workflow.body)(context).await;

  if let Some(failure) = driver.failure.lock().unwrap_or_else(|e| e.into_inner()).take() {
    return Err(failure);
  }
  outcome.map_err(|e| {
    FrameworkError::from_host(e, |source| FrameworkError::WorkflowExecutionFailed {
      workflow_id: workflow_id.clone(),
      source,
    })
  })?;

  let steps = std::mem::take(&mut *driver.steps.lock().unwrap_or_else(|e| e.into_inner()));

  let summary = DiscoverWorkflowOutput {
    workflow_id: workflow_id.clone(),
    code: workflow.code.clone(),
    payload: project(&validator, || format!("payload of workflow '{workflow_id}'"), &workflow.payload_schema)?,
    controls: project(&validator, || format!("controls of workflow '{workflow_id}'"), &workflow.controls_schema)?,
    preferences: workflow.preferences.clone(),
    tags: workflow.tags.clone(),
    steps: steps
      .iter()
      .map(|step| step.summarize(&workflow_id, &validator))
      .collect::<Result<Vec<_>, _>>()?,
  };

  info!(workflow_id = %workflow_id, steps = steps.len(), "workflow_discovered");

  Ok(WorkflowDefinition {
    workflow_id,
    body: Arc::clone(&workflow.body),
    steps,
    payload_schema: workflow.payload_schema.clone(),
    controls_schema: workflow.controls_schema.clone(),
    preferences: workflow.preferences.clone(),
    tags: workflow.tags.clone(),
    code: workflow.code.clone(),
    summary,
  })
}
