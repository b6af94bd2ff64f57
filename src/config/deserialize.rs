// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Handles ssh targets in short or detailed form and compiled regular expressions.

use regex::Regex;
use serde::Deserialize;

use super::SshTargetConfig;

pub fn deserialize_ssh_target<'de, D>(deserializer: D) -> Result<Option<SshTargetConfig>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let entry: Option<SshTargetEntry> = Option::deserialize(deserializer)?;
    entry
        .map(SshTargetEntry::into_target_config)
        .transpose()
        .map_err(serde::de::Error::custom)
}

pub fn deserialize_regex<'de, D>(deserializer: D) -> Result<Regex, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let pattern = String::deserialize(deserializer)?;
    Regex::new(&pattern).map_err(serde::de::Error::custom)
}

/// A regex whose first capture group yields the value being extracted.
pub fn deserialize_capture_regex<'de, D>(deserializer: D) -> Result<Regex, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let regex = deserialize_regex(deserializer)?;
    // captures_len counts the implicit whole-match group.
    if regex.captures_len() < 2 {
        return Err(serde::de::Error::custom(format!(
            "pattern '{}' needs a capture group",
            regex.as_str()
        )));
    }
    Ok(regex)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SshTargetEntry {
    Simple(String),
    Detailed(SshTargetConfig),
}

impl SshTargetEntry {
    fn into_target_config(self) -> Result<SshTargetConfig, String> {
        match self {
            SshTargetEntry::Simple(s) => SshTargetConfig::parse(&s),
            SshTargetEntry::Detailed(c) => Ok(c),
        }
    }
}
