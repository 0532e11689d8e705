//! Execution engine.
//!
//! One invocation runs the workflow body against an [`ExecutionDriver`] that
//! intercepts every step call:
//!
//! 1. Once the invocation has concluded, every further call returns
//!    [`FrameworkError::Cancelled`] without doing anything.
//! 2. The target step is executed (or previewed) and its result concludes the
//!    invocation. A skip predicate that fires on `execute` concludes it with an
//!    empty, skipped result.
//! 3. Steps before the target are hydrated from the event state on
//!    `execute`, or mocked and overlaid with any state on `preview`.
//!
//! Concluding fires a [`CancellationToken`] that the body future is raced
//! against, so the body is dropped at its next suspension point. An error
//! while handling any step also concludes the invocation with that error.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use herald_config::{Action, Event, ExecuteMetadata, ExecuteOptions, ExecuteOutput, ExecutionStatus};
use herald_schema::{Schema, SchemaValidator, ValidationIssue, ValidationResult, deep_merge};
use herald_template::{TemplateCompiler, TemplateContext};
use serde_json::{Map, Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::definition::{StepDefinition, WorkflowDefinition};
use crate::error::FrameworkError;
use crate::provider::ProviderResolver;
use crate::step::{Step, StepCall, StepDriver};
use crate::workflow::WorkflowContext;

/// Validate `data`, mapping violations through `invalid`.
pub(crate) fn validate(
  validator: &SchemaValidator,
  data: &Value,
  schema: &Schema,
  invalid: impl FnOnce(Vec<ValidationIssue>) -> FrameworkError,
) -> Result<Value, FrameworkError> {
  match validator.validate(data, schema) {
    Ok(ValidationResult::Valid(value)) => Ok(value),
    Ok(ValidationResult::Invalid(issues)) => Err(invalid(issues)),
    Err(source) => Err(FrameworkError::InvalidSchema {
      context: "validation".to_string(),
      source,
    }),
  }
}

/// The concluded result of the target step.
#[derive(Debug, Clone)]
struct StepResult {
  outputs: Value,
  providers: Map<String, Value>,
  skip: bool,
}

impl StepResult {
  fn skipped() -> Self {
    Self {
      outputs: json!({}),
      providers: Map::new(),
      skip: true,
    }
  }

  fn into_output(self, duration: u64) -> ExecuteOutput {
    ExecuteOutput {
      outputs: self.outputs,
      providers: self.providers,
      options: ExecuteOptions { skip: self.skip },
      metadata: ExecuteMetadata {
        status: ExecutionStatus::Success,
        error: false,
        duration,
      },
    }
  }
}

enum StepOutcome {
  /// A step before the target; the value goes back to the body.
  Continue(Value),
  /// The target step; the result concludes the invocation.
  Concluded(StepResult),
}

pub(crate) struct Executor {
  validator: Arc<SchemaValidator>,
  templates: Arc<TemplateCompiler>,
  concurrent_providers: bool,
}

impl Executor {
  pub fn new(validator: Arc<SchemaValidator>, templates: TemplateCompiler, concurrent_providers: bool) -> Self {
    Self {
      validator,
      templates: Arc::new(templates),
      concurrent_providers,
    }
  }

  #[instrument(
    name = "execute_workflow",
    skip(self, definition, event),
    fields(
      workflow_id = %event.workflow_id,
      step_id = %event.step_id,
      action = ?event.action,
    )
  )]
  pub async fn execute(
    &self,
    definition: Arc<WorkflowDefinition>,
    event: Event,
  ) -> Result<ExecuteOutput, FrameworkError> {
    let execution_id = uuid::Uuid::new_v4().to_string();
    let started = Instant::now();

    info!(execution_id = %execution_id, "workflow_execution_started");

    let outcome = self.run(definition, event, &execution_id).await;
    let duration = started.elapsed().as_millis() as u64;

    match outcome {
      Ok(result) => {
        info!(
          execution_id = %execution_id,
          duration_ms = duration,
          skipped = result.skip,
          "workflow_execution_completed"
        );
        Ok(result.into_output(duration))
      }
      Err(e) => {
        error!(
          execution_id = %execution_id,
          duration_ms = duration,
          code = e.code(),
          error = %e,
          "workflow_execution_failed"
        );
        Err(e)
      }
    }
  }

  async fn run(
    &self,
    definition: Arc<WorkflowDefinition>,
    event: Event,
    execution_id: &str,
  ) -> Result<StepResult, FrameworkError> {
    let workflow_id = definition.workflow_id.clone();

    if definition.step(&event.step_id).is_none() {
      return Err(FrameworkError::StepNotFound {
        workflow_id,
        step_id: event.step_id,
      });
    }

    let payload = self.payload(&definition, &event)?;
    let controls = validate(&self.validator, &event.controls, &definition.controls_schema, |issues| {
      FrameworkError::EventControlsInvalid {
        workflow_id: workflow_id.clone(),
        issues,
      }
    })?;

    let template_context = TemplateContext {
      payload: payload.clone(),
      subscriber: event.subscriber.clone(),
      steps: event
        .state
        .iter()
        .map(|state| (state.step_id.clone(), state.outputs.clone()))
        .collect(),
    };
    let subscriber = event.subscriber.clone();
    let target = event.step_id.clone();

    let driver = Arc::new(ExecutionDriver {
      execution_id: execution_id.to_string(),
      definition: Arc::clone(&definition),
      event,
      template_context,
      validator: Arc::clone(&self.validator),
      templates: Arc::clone(&self.templates),
      concurrent_providers: self.concurrent_providers,
      conclusion: Mutex::new(None),
      cancel: CancellationToken::new(),
    });

    let context = WorkflowContext {
      payload,
      subscriber,
      controls,
      step: Step::new(driver.clone()),
    };
    let cancel = driver.cancel.clone();
    let body = (definition.body)(context);

    let finished = tokio::select! {
      biased;
      _ = cancel.cancelled() => None,
      finished = body => Some(finished),
    };

    if let Some(concluded) = driver.take_conclusion() {
      if let Some(Err(e)) = finished {
        debug!(execution_id = %execution_id, error = %e, "continuation_error_discarded");
      }
      return concluded;
    }

    match finished {
      Some(Err(e)) => Err(FrameworkError::from_host(e, |source| {
        FrameworkError::WorkflowExecutionFailed {
          workflow_id: workflow_id.clone(),
          source,
        }
      })),
      _ => Err(FrameworkError::ExecutionResultMissing {
        workflow_id,
        step_id: target,
      }),
    }
  }

  /// The validated payload. On preview, the caller's partial payload is laid
  /// over a mock so it only has to carry the fields it cares about.
  fn payload(&self, definition: &WorkflowDefinition, event: &Event) -> Result<Value, FrameworkError> {
    let invalid = |issues: Vec<ValidationIssue>| FrameworkError::EventPayloadInvalid {
      workflow_id: definition.workflow_id.clone(),
      issues,
    };

    let candidate = match (event.action, &event.payload) {
      (Action::Execute, Some(payload)) => payload.clone(),
      (Action::Execute, None) => {
        return Err(invalid(vec![ValidationIssue::new(
          "",
          "must have required property 'payload'",
        )]));
      }
      (Action::Preview, partial) => {
        let mock = self
          .validator
          .mock(&definition.payload_schema)
          .map_err(|source| FrameworkError::InvalidSchema {
            context: format!("payload of workflow '{}'", definition.workflow_id),
            source,
          })?;
        match partial {
          Some(partial) => deep_merge(&mock, partial),
          None => mock,
        }
      }
    };

    validate(&self.validator, &candidate, &definition.payload_schema, invalid)
  }
}

/// Step driver for one invocation.
struct ExecutionDriver {
  execution_id: String,
  definition: Arc<WorkflowDefinition>,
  event: Event,
  template_context: TemplateContext,
  validator: Arc<SchemaValidator>,
  templates: Arc<TemplateCompiler>,
  concurrent_providers: bool,
  conclusion: Mutex<Option<Result<StepResult, FrameworkError>>>,
  cancel: CancellationToken,
}

impl ExecutionDriver {
  fn workflow_id(&self) -> &str {
    &self.definition.workflow_id
  }

  /// Record the invocation's outcome. The first conclusion wins.
  fn conclude(&self, outcome: Result<StepResult, FrameworkError>) {
    let mut conclusion = self.conclusion.lock().unwrap_or_else(|e| e.into_inner());
    if conclusion.is_none() {
      *conclusion = Some(outcome);
    }
    self.cancel.cancel();
  }

  fn take_conclusion(&self) -> Option<Result<StepResult, FrameworkError>> {
    self
      .conclusion
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .take()
  }

  fn cancelled(&self, step_id: &str) -> FrameworkError {
    FrameworkError::Cancelled {
      workflow_id: self.workflow_id().to_string(),
      step_id: step_id.to_string(),
    }
  }

  fn providers(&self) -> ProviderResolver<'_> {
    ProviderResolver {
      workflow_id: self.workflow_id(),
      validator: &self.validator,
      concurrent: self.concurrent_providers,
    }
  }

  async fn run_step(&self, call: &StepCall) -> Result<StepOutcome, FrameworkError> {
    let step = self
      .definition
      .step(&call.step_id)
      .ok_or_else(|| FrameworkError::StepNotFound {
        workflow_id: self.workflow_id().to_string(),
        step_id: call.step_id.clone(),
      })?;
    let is_target = step.step_id == self.event.step_id;

    match (self.event.action, is_target) {
      (Action::Execute, true) => self.execute_target(step, call).await.map(StepOutcome::Concluded),
      (Action::Execute, false) => self.hydrate(step).map(StepOutcome::Continue),
      (Action::Preview, true) => self.preview_target(step, call).await.map(StepOutcome::Concluded),
      (Action::Preview, false) => self.preview_prior(step).map(StepOutcome::Continue),
    }
  }

  async fn execute_target(&self, step: &StepDefinition, call: &StepCall) -> Result<StepResult, FrameworkError> {
    let controls = self.controls(step, &self.event.controls)?;

    if let Some(skip) = &call.options.skip
      && skip(&controls)
    {
      info!(execution_id = %self.execution_id, step_id = %step.step_id, "step_skipped");
      return Ok(StepResult::skipped());
    }

    let outputs = self.resolve(step, call, &controls).await?;
    let providers = self
      .providers()
      .execute(step, call, &controls, &outputs)
      .await?;

    Ok(StepResult {
      outputs,
      providers,
      skip: false,
    })
  }

  async fn preview_target(&self, step: &StepDefinition, call: &StepCall) -> Result<StepResult, FrameworkError> {
    let controls = self.controls(step, &self.event.controls)?;
    let outputs = self.resolve(step, call, &controls).await?;
    let providers = self.providers().preview(step)?;

    Ok(StepResult {
      outputs,
      providers,
      skip: false,
    })
  }

  /// Recover a prior step's result from the event state.
  fn hydrate(&self, step: &StepDefinition) -> Result<Value, FrameworkError> {
    if let Some(state) = self.event.state_for(&step.step_id) {
      let outputs = validate(&self.validator, &state.outputs, &step.result_schema, |issues| {
        FrameworkError::StepResultInvalid {
          workflow_id: self.workflow_id().to_string(),
          step_id: step.step_id.clone(),
          issues,
        }
      })?;
      debug!(execution_id = %self.execution_id, step_id = %step.step_id, "step_hydrated");
      return Ok(outputs);
    }

    Err(FrameworkError::ExecutionStateCorrupt {
      workflow_id: self.workflow_id().to_string(),
      step_id: step.step_id.clone(),
    })
  }

  fn preview_prior(&self, step: &StepDefinition) -> Result<Value, FrameworkError> {
    let mock = self
      .validator
      .mock(&step.result_schema)
      .map_err(|source| FrameworkError::InvalidSchema {
        context: format!("results of step '{}' in workflow '{}'", step.step_id, self.workflow_id()),
        source,
      })?;

    Ok(match self.event.state_for(&step.step_id) {
      Some(state) => deep_merge(&mock, &state.outputs),
      None => mock,
    })
  }

  /// Validate then compile a step's controls.
  fn controls(&self, step: &StepDefinition, raw: &Value) -> Result<Value, FrameworkError> {
    let validated = validate(&self.validator, raw, &step.controls_schema, |issues| {
      FrameworkError::StepControlsInvalid {
        workflow_id: self.workflow_id().to_string(),
        step_id: step.step_id.clone(),
        issues,
      }
    })?;

    self
      .templates
      .compile(&validated, &self.template_context)
      .map_err(|source| FrameworkError::StepControlCompilationFailed {
        workflow_id: self.workflow_id().to_string(),
        step_id: step.step_id.clone(),
        source,
      })
  }

  async fn resolve(&self, step: &StepDefinition, call: &StepCall, controls: &Value) -> Result<Value, FrameworkError> {
    let raw = (call.resolve)(controls.clone()).await.map_err(|e| {
      FrameworkError::from_host(e, |source| FrameworkError::StepExecutionFailed {
        workflow_id: self.workflow_id().to_string(),
        step_id: step.step_id.clone(),
        source,
      })
    })?;

    validate(&self.validator, &raw, &step.output_schema, |issues| {
      FrameworkError::StepOutputInvalid {
        workflow_id: self.workflow_id().to_string(),
        step_id: step.step_id.clone(),
        issues,
      }
    })
  }
}

#[async_trait]
impl StepDriver for ExecutionDriver {
  async fn invoke(&self, call: StepCall) -> Result<Value, FrameworkError> {
    if self.cancel.is_cancelled() {
      debug!(execution_id = %self.execution_id, step_id = %call.step_id, "step_suppressed");
      return Err(self.cancelled(&call.step_id));
    }

    match self.run_step(&call).await {
      Ok(StepOutcome::Continue(value)) => Ok(value),
      Ok(StepOutcome::Concluded(result)) => {
        info!(
          execution_id = %self.execution_id,
          step_id = %call.step_id,
          skipped = result.skip,
          "step_concluded"
        );
        let outputs = result.outputs.clone();
        self.conclude(Ok(result));
        Ok(outputs)
      }
      Err(e) => {
        warn!(
          execution_id = %self.execution_id,
          step_id = %call.step_id,
          code = e.code(),
          error = %e,
          "step_failed"
        );
        self.conclude(Err(e));
        Err(self.cancelled(&call.step_id))
      }
    }
  }
}
