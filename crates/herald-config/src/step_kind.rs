use serde::{Deserialize, Serialize};

/// Messaging channels a channel step can deliver through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
  Email,
  Sms,
  Push,
  Chat,
  InApp,
}

impl ChannelType {
  pub const ALL: [ChannelType; 5] = [
    ChannelType::Email,
    ChannelType::Sms,
    ChannelType::Push,
    ChannelType::Chat,
    ChannelType::InApp,
  ];
}

/// Non-delivery steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
  Delay,
  Digest,
  Custom,
}

/// The kind of a step, serialized as a flat tag (`"email"`, `"delay"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepKind {
  Channel(ChannelType),
  Action(ActionType),
}

impl StepKind {
  pub fn is_channel(&self) -> bool {
    matches!(self, StepKind::Channel(_))
  }
}

impl std::fmt::Display for StepKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let tag = match self {
      StepKind::Channel(ChannelType::Email) => "email",
      StepKind::Channel(ChannelType::Sms) => "sms",
      StepKind::Channel(ChannelType::Push) => "push",
      StepKind::Channel(ChannelType::Chat) => "chat",
      StepKind::Channel(ChannelType::InApp) => "in_app",
      StepKind::Action(ActionType::Delay) => "delay",
      StepKind::Action(ActionType::Digest) => "digest",
      StepKind::Action(ActionType::Custom) => "custom",
    };
    f.write_str(tag)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_step_kind_serializes_flat() {
    assert_eq!(
      serde_json::to_string(&StepKind::Channel(ChannelType::InApp)).unwrap(),
      "\"in_app\""
    );
    assert_eq!(
      serde_json::to_string(&StepKind::Action(ActionType::Delay)).unwrap(),
      "\"delay\""
    );
  }

  #[test]
  fn test_step_kind_deserializes_both_families() {
    let channel: StepKind = serde_json::from_str("\"sms\"").unwrap();
    let action: StepKind = serde_json::from_str("\"digest\"").unwrap();

    assert_eq!(channel, StepKind::Channel(ChannelType::Sms));
    assert_eq!(action, StepKind::Action(ActionType::Digest));
    assert_eq!(action.to_string(), "digest");
  }
}
