use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::step_kind::ChannelType;

/// Default delivery preferences a workflow declares for its subscribers.
///
/// Merging these with subscriber-level documents is the host's job; the
/// runtime only carries them through discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowPreferences {
  pub all: ChannelPreference,
  pub channels: BTreeMap<ChannelType, ChannelPreference>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelPreference {
  pub enabled: bool,
  #[serde(default)]
  pub read_only: bool,
}

impl Default for ChannelPreference {
  fn default() -> Self {
    Self {
      enabled: true,
      read_only: false,
    }
  }
}

impl Default for WorkflowPreferences {
  fn default() -> Self {
    Self {
      all: ChannelPreference::default(),
      channels: ChannelType::ALL
        .into_iter()
        .map(|channel| (channel, ChannelPreference::default()))
        .collect(),
    }
  }
}

impl WorkflowPreferences {
  /// Disable a channel by default.
  pub fn disable(mut self, channel: ChannelType) -> Self {
    self.channels.entry(channel).or_default().enabled = false;
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_default_enables_every_channel() {
    let prefs = WorkflowPreferences::default().disable(ChannelType::Sms);
    let value = serde_json::to_value(&prefs).unwrap();

    assert_eq!(value["all"], json!({ "enabled": true, "readOnly": false }));
    assert_eq!(value["channels"]["email"]["enabled"], true);
    assert_eq!(value["channels"]["sms"]["enabled"], false);
    assert_eq!(value["channels"]["in_app"]["enabled"], true);
  }
}
