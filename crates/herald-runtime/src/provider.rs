//! Provider resolution for the target step.

use futures::future::try_join_all;
use herald_schema::SchemaValidator;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::definition::{ProviderDefinition, StepDefinition};
use crate::error::FrameworkError;
use crate::execution::validate;
use crate::step::{ProviderInput, StepCall};

/// Key of the unvalidated escape hatch a provider may attach to its output.
pub const PASSTHROUGH_KEY: &str = "_passthrough";

pub(crate) struct ProviderResolver<'a> {
  pub workflow_id: &'a str,
  pub validator: &'a SchemaValidator,
  pub concurrent: bool,
}

impl ProviderResolver<'_> {
  /// Run every declared provider's call-site resolve.
  pub async fn execute(
    &self,
    step: &StepDefinition,
    call: &StepCall,
    controls: &Value,
    outputs: &Value,
  ) -> Result<Map<String, Value>, FrameworkError> {
    let resolved = if self.concurrent {
      try_join_all(
        step
          .providers
          .iter()
          .map(|provider| self.execute_one(step, provider, call, controls, outputs)),
      )
      .await?
    } else {
      let mut resolved = Vec::with_capacity(step.providers.len());
      for provider in &step.providers {
        resolved.push(self.execute_one(step, provider, call, controls, outputs).await?);
      }
      resolved
    };

    Ok(resolved.into_iter().collect())
  }

  async fn execute_one(
    &self,
    step: &StepDefinition,
    provider: &ProviderDefinition,
    call: &StepCall,
    controls: &Value,
    outputs: &Value,
  ) -> Result<(String, Value), FrameworkError> {
    let provider_type = provider.provider_type.clone();
    let callback = call
      .provider(&provider_type)
      .ok_or_else(|| FrameworkError::ProviderNotFound {
        workflow_id: self.workflow_id.to_string(),
        step_id: step.step_id.clone(),
        provider_type: provider_type.clone(),
      })?;

    let input = ProviderInput {
      controls: controls.clone(),
      outputs: outputs.clone(),
    };
    let raw = (callback.resolve)(input).await.map_err(|e| {
      FrameworkError::from_host(e, |source| FrameworkError::ProviderExecutionFailed {
        workflow_id: self.workflow_id.to_string(),
        step_id: step.step_id.clone(),
        provider_type: provider_type.clone(),
        source,
      })
    })?;

    let (data, passthrough) = split_passthrough(raw);
    let mut validated = validate(self.validator, &data, &provider.output_schema, |issues| {
      FrameworkError::ProviderOutputInvalid {
        workflow_id: self.workflow_id.to_string(),
        step_id: step.step_id.clone(),
        provider_type: provider_type.clone(),
        issues,
      }
    })?;

    if let (Some(passthrough), Value::Object(map)) = (passthrough, &mut validated) {
      map.insert(PASSTHROUGH_KEY.to_string(), passthrough);
    }

    info!(step_id = %step.step_id, provider_type = %provider_type, "provider_resolved");
    Ok((provider_type, validated))
  }

  /// Fabricate every declared provider's output from its schema.
  pub fn preview(&self, step: &StepDefinition) -> Result<Map<String, Value>, FrameworkError> {
    step
      .providers
      .iter()
      .map(|provider| {
        let mock = self
          .validator
          .mock(&provider.output_schema)
          .map_err(|source| FrameworkError::InvalidSchema {
            context: format!(
              "outputs of provider '{}' of step '{}' in workflow '{}'",
              provider.provider_type, step.step_id, self.workflow_id
            ),
            source,
          })?;
        debug!(step_id = %step.step_id, provider_type = %provider.provider_type, "provider_mocked");
        Ok((provider.provider_type.clone(), mock))
      })
      .collect()
  }
}

fn split_passthrough(raw: Value) -> (Value, Option<Value>) {
  match raw {
    Value::Object(mut map) => {
      let passthrough = map.remove(PASSTHROUGH_KEY);
      (Value::Object(map), passthrough)
    }
    other => (other, None),
  }
}
