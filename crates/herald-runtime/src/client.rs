use std::sync::Arc;

use herald_config::{
  CodeOutput, DiscoverOutput, DiscoveredCount, Event, ExecuteOutput, HealthCheck, HealthStatus,
};
use herald_schema::SchemaValidator;
use herald_template::TemplateCompiler;
use tracing::{info, instrument};

use crate::error::FrameworkError;
use crate::execution::Executor;
use crate::registry::Registry;
use crate::workflow::Workflow;

/// Runtime knobs for a [`Client`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
  /// Resolve a step's providers concurrently instead of in declaration order.
  pub concurrent_providers: bool,
  /// Fail control compilation on undefined template variables instead of
  /// rendering them empty.
  pub strict_templates: bool,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      concurrent_providers: true,
      strict_templates: false,
    }
  }
}

/// Entry point for a Herald host: register workflows, then discover,
/// execute and inspect them.
pub struct Client {
  registry: Registry,
  executor: Executor,
}

impl Client {
  pub fn new() -> Self {
    Self::with_config(ClientConfig::default())
  }

  pub fn with_config(config: ClientConfig) -> Self {
    let validator = Arc::new(SchemaValidator::new());
    let templates = if config.strict_templates {
      TemplateCompiler::strict()
    } else {
      TemplateCompiler::new()
    };

    Self {
      registry: Registry::new(Arc::clone(&validator)),
      executor: Executor::new(validator, templates, config.concurrent_providers),
    }
  }

  /// Discover and register workflows, in order. Ids already registered keep
  /// their existing definition. Stops at the first failure.
  #[instrument(name = "add_workflows", skip(self, workflows))]
  pub async fn add_workflows<I>(&self, workflows: I) -> Result<(), FrameworkError>
  where
    I: IntoIterator<Item = Workflow>,
  {
    for workflow in workflows {
      self.registry.register(&workflow).await?;
    }
    Ok(())
  }

  /// Every registered workflow, in registration order.
  pub fn discover(&self) -> DiscoverOutput {
    DiscoverOutput {
      workflows: self
        .registry
        .definitions()
        .iter()
        .map(|definition| definition.summary().clone())
        .collect(),
    }
  }

  /// Run one invocation of a workflow up to and including its target step.
  pub async fn execute_workflow(&self, event: Event) -> Result<ExecuteOutput, FrameworkError> {
    let definition =
      self
        .registry
        .get(&event.workflow_id)
        .ok_or_else(|| FrameworkError::WorkflowNotFound {
          workflow_id: event.workflow_id.clone(),
        })?;

    self.executor.execute(definition, event).await
  }

  /// The source descriptor of a workflow, or of one of its steps.
  pub fn get_code(&self, workflow_id: &str, step_id: Option<&str>) -> Result<CodeOutput, FrameworkError> {
    let definition = self
      .registry
      .get(workflow_id)
      .ok_or_else(|| FrameworkError::WorkflowNotFound {
        workflow_id: workflow_id.to_string(),
      })?;

    let code = match step_id {
      None => definition.code.clone(),
      Some(step_id) => definition
        .step(step_id)
        .map(|step| step.code.clone())
        .ok_or_else(|| FrameworkError::StepNotFound {
          workflow_id: workflow_id.to_string(),
          step_id: step_id.to_string(),
        })?,
    };

    Ok(CodeOutput { code })
  }

  pub fn health_check(&self) -> HealthCheck {
    let definitions = self.registry.definitions();
    let discovered = DiscoveredCount {
      workflows: definitions.len(),
      steps: definitions.iter().map(|d| d.steps.len()).sum(),
    };

    info!(
      workflows = discovered.workflows,
      steps = discovered.steps,
      "health_check"
    );

    HealthCheck {
      status: HealthStatus::Ok,
      framework_version: env!("CARGO_PKG_VERSION").to_string(),
      discovered,
    }
  }
}

impl Default for Client {
  fn default() -> Self {
    Self::new()
  }
}
