//! Sample workflows bundled with the CLI.

use herald_config::ChannelType;
use herald_runtime::{Provider, Schema, StepOptions, Workflow};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingPayload {
  pub name: String,
  pub email: String,
  /// Hours to wait before the reminder.
  #[serde(default = "default_wait_hours")]
  pub wait_hours: u32,
}

fn default_wait_hours() -> u32 {
  24
}

pub fn all() -> Vec<Workflow> {
  vec![user_onboarding()]
}

/// Look up the profile, send a welcome email, wait, then nudge by SMS unless
/// the reminder is switched off.
pub fn user_onboarding() -> Workflow {
  Workflow::builder("user-onboarding")
    .payload_schema(Schema::of::<OnboardingPayload>())
    .tags(["onboarding", "lifecycle"])
    .code("src/workflows.rs#user_onboarding")
    .body(|ctx| async move {
      let email = ctx.payload["email"].as_str().unwrap_or_default().to_string();
      let wait_hours = ctx.payload["waitHours"].clone();

      let profile = ctx
        .step
        .custom(
          "fetch-profile",
          move |_| {
            let email = email.clone();
            async move {
              debug!(email = %email, "profile_lookup");
              let plan = if email.ends_with("@example.com") { "team" } else { "free" };
              Ok(json!({ "plan": plan, "locale": "en" }))
            }
          },
          StepOptions::new().output_schema(json!({
            "type": "object",
            "properties": {
              "plan": { "type": "string", "enum": ["free", "team"] },
              "locale": { "type": "string" }
            },
            "required": ["plan", "locale"]
          })),
        )
        .await?;

      let plan = profile["plan"].as_str().unwrap_or("free").to_string();
      ctx
        .step
        .email(
          "welcome-email",
          move |controls| {
            let plan = plan.clone();
            async move {
              Ok(json!({
                "subject": controls["subject"],
                "body": format!("{} Your {plan} plan is ready.", controls["greeting"].as_str().unwrap_or_default()),
              }))
            }
          },
          StepOptions::new()
            .controls_schema(json!({
              "type": "object",
              "properties": {
                "subject": { "type": "string", "default": "Welcome aboard, {{ payload.name }}" },
                "greeting": { "type": "string", "default": "Hi {{ subscriber.firstName | default('there') }}," }
              }
            }))
            .provider(
              Provider::new("sendgrid", |input| async move {
                let subject = input.outputs["subject"].as_str().unwrap_or_default().to_string();
                Ok(json!({
                  "ipPool": "transactional",
                  "categories": ["onboarding"],
                  "_passthrough": { "headers": { "X-Subject-Length": subject.len() } }
                }))
              })
              .output_schema(json!({
                "type": "object",
                "properties": {
                  "ipPool": { "type": "string" },
                  "categories": { "type": "array", "items": { "type": "string" } }
                },
                "required": ["ipPool"]
              })),
            ),
        )
        .await?;

      ctx
        .step
        .delay(
          "wait",
          move |_| {
            let amount = wait_hours.clone();
            async move { Ok(json!({ "amount": amount, "unit": "hours" })) }
          },
          StepOptions::new(),
        )
        .await?;

      ctx
        .step
        .channel(
          ChannelType::Sms,
          "reminder-sms",
          |_| async { Ok(json!({ "body": "Still there? Finish setting up your account." })) },
          StepOptions::new()
            .controls_schema(json!({
              "type": "object",
              "properties": { "skipReminder": { "type": "boolean", "default": false } }
            }))
            .skip(|controls: &Value| controls["skipReminder"] == true),
        )
        .await?;

      Ok(())
    })
}
