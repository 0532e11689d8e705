//! The step handle a workflow body invokes steps through.
//!
//! Each step method takes the step id, a `resolve` callback producing the
//! step's outputs from its compiled controls, and [`StepOptions`]. What a call
//! actually does depends on the driver behind the handle: discovery records
//! the step, execution runs, hydrates, previews or suppresses it.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use herald_config::{ActionType, ChannelType, StepKind};
use herald_schema::Schema;
use serde_json::Value;

use crate::error::FrameworkError;

pub(crate) type ResolveFn = Arc<dyn Fn(Value) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync>;
pub(crate) type SkipFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;
pub(crate) type ProviderResolveFn =
  Arc<dyn Fn(ProviderInput) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync>;

/// What a provider's resolve callback receives.
#[derive(Debug, Clone)]
pub struct ProviderInput {
  /// The step's compiled controls.
  pub controls: Value,
  /// The step's validated outputs.
  pub outputs: Value,
}

/// A vendor integration attached to a channel step.
///
/// The resolve callback may return a `_passthrough` object; it is exempt
/// from output validation and handed to the caller as is.
#[derive(Clone)]
pub struct Provider {
  pub(crate) provider_type: String,
  pub(crate) output_schema: Schema,
  pub(crate) resolve: ProviderResolveFn,
  pub(crate) code: String,
}

impl Provider {
  pub fn new<F, Fut>(provider_type: impl Into<String>, resolve: F) -> Self
  where
    F: Fn(ProviderInput) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
  {
    Self {
      provider_type: provider_type.into(),
      output_schema: Schema::any_object(),
      code: std::any::type_name::<F>().to_string(),
      resolve: Arc::new(move |input| resolve(input).boxed()),
    }
  }

  pub fn output_schema(mut self, schema: impl Into<Schema>) -> Self {
    self.output_schema = schema.into();
    self
  }

  pub fn code(mut self, code: impl Into<String>) -> Self {
    self.code = code.into();
    self
  }
}

/// Per-call step configuration.
#[derive(Clone, Default)]
pub struct StepOptions {
  pub(crate) controls_schema: Option<Schema>,
  pub(crate) output_schema: Option<Schema>,
  pub(crate) skip: Option<SkipFn>,
  pub(crate) providers: Vec<Provider>,
  pub(crate) code: Option<String>,
}

impl StepOptions {
  pub fn new() -> Self {
    Self::default()
  }

  /// Schema for the step's controls. Defaults to any object.
  pub fn controls_schema(mut self, schema: impl Into<Schema>) -> Self {
    self.controls_schema = Some(schema.into());
    self
  }

  /// Schema for a custom step's outputs. Channel, delay and digest steps use
  /// their built-in schemas and ignore this.
  pub fn output_schema(mut self, schema: impl Into<Schema>) -> Self {
    self.output_schema = Some(schema.into());
    self
  }

  /// Predicate over the compiled controls; `true` skips the step.
  pub fn skip<F>(mut self, predicate: F) -> Self
  where
    F: Fn(&Value) -> bool + Send + Sync + 'static,
  {
    self.skip = Some(Arc::new(predicate));
    self
  }

  pub fn provider(mut self, provider: Provider) -> Self {
    self.providers.push(provider);
    self
  }

  /// Source text reported by `get_code`.
  pub fn code(mut self, code: impl Into<String>) -> Self {
    self.code = Some(code.into());
    self
  }
}

/// One step invocation as seen by a driver.
pub(crate) struct StepCall {
  pub step_id: String,
  pub kind: StepKind,
  pub resolve: ResolveFn,
  pub resolve_type: &'static str,
  pub options: StepOptions,
}

impl StepCall {
  pub(crate) fn provider(&self, provider_type: &str) -> Option<&Provider> {
    self
      .options
      .providers
      .iter()
      .find(|p| p.provider_type == provider_type)
  }
}

/// Interprets step invocations for one phase (discovery or execution).
#[async_trait]
pub(crate) trait StepDriver: Send + Sync {
  async fn invoke(&self, call: StepCall) -> Result<Value, FrameworkError>;
}

/// Handle for invoking steps from a workflow body.
#[derive(Clone)]
pub struct Step {
  driver: Arc<dyn StepDriver>,
}

macro_rules! channel_steps {
  ($($(#[$meta:meta])* $name:ident => $channel:expr),* $(,)?) => {
    $(
      $(#[$meta])*
      pub async fn $name<F, Fut>(
        &self,
        step_id: &str,
        resolve: F,
        options: StepOptions,
      ) -> Result<Value, FrameworkError>
      where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
      {
        self.channel($channel, step_id, resolve, options).await
      }
    )*
  };
}

impl Step {
  pub(crate) fn new(driver: Arc<dyn StepDriver>) -> Self {
    Self { driver }
  }

  channel_steps! {
    /// Send an email. Outputs `{ subject, body }`.
    email => ChannelType::Email,
    /// Send an SMS. Outputs `{ body }`.
    sms => ChannelType::Sms,
    /// Send a push notification. Outputs `{ subject, body }`.
    push => ChannelType::Push,
    /// Post to a chat integration. Outputs `{ body }`.
    chat => ChannelType::Chat,
    /// Deliver to the in-app inbox. Outputs `{ body, subject?, avatar?, redirect?, data? }`.
    in_app => ChannelType::InApp,
  }

  /// Pause the workflow. Outputs `{ type, amount, unit }`; the result is empty.
  pub async fn delay<F, Fut>(&self, step_id: &str, resolve: F, options: StepOptions) -> Result<Value, FrameworkError>
  where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
  {
    self.action(ActionType::Delay, step_id, resolve, options).await
  }

  /// Batch events over a window. The result carries the collected `events`.
  pub async fn digest<F, Fut>(&self, step_id: &str, resolve: F, options: StepOptions) -> Result<Value, FrameworkError>
  where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
  {
    self.action(ActionType::Digest, step_id, resolve, options).await
  }

  /// Arbitrary host logic. Outputs and result follow `StepOptions::output_schema`.
  pub async fn custom<F, Fut>(&self, step_id: &str, resolve: F, options: StepOptions) -> Result<Value, FrameworkError>
  where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
  {
    self.action(ActionType::Custom, step_id, resolve, options).await
  }

  pub async fn channel<F, Fut>(
    &self,
    channel: ChannelType,
    step_id: &str,
    resolve: F,
    options: StepOptions,
  ) -> Result<Value, FrameworkError>
  where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
  {
    self.call(StepKind::Channel(channel), step_id, resolve, options).await
  }

  pub async fn action<F, Fut>(
    &self,
    action: ActionType,
    step_id: &str,
    resolve: F,
    options: StepOptions,
  ) -> Result<Value, FrameworkError>
  where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
  {
    self.call(StepKind::Action(action), step_id, resolve, options).await
  }

  async fn call<F, Fut>(
    &self,
    kind: StepKind,
    step_id: &str,
    resolve: F,
    options: StepOptions,
  ) -> Result<Value, FrameworkError>
  where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
  {
    let call = StepCall {
      step_id: step_id.to_string(),
      kind,
      resolve_type: std::any::type_name::<F>(),
      resolve: Arc::new(move |controls| resolve(controls).boxed()),
      options,
    };
    self.driver.invoke(call).await
  }
}
