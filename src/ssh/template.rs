// ABOUTME: Shell command templates with ${name} placeholders.
// ABOUTME: Only known variables are substituted; unknown tokens are left verbatim.

use serde::{Deserialize, Deserializer};
use std::fmt;

/// Placeholder for the environment name in initial commands.
pub const VAR_ENV_NAME: &str = "envName";

/// Placeholder for the new VM's hostname in followup commands.
pub const VAR_HOSTNAME: &str = "hostname";

/// A command with `${name}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate(String);

impl CommandTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Replace each `${name}` for the given `(name, value)` pairs.
    pub fn render(&self, vars: &[(&str, &str)]) -> String {
        vars.iter().fold(self.0.clone(), |command, (name, value)| {
            command.replace(&format!("${{{name}}}"), value)
        })
    }
}

impl fmt::Display for CommandTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for CommandTemplate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s.trim().is_empty() {
            return Err(serde::de::Error::custom("command cannot be blank"));
        }
        Ok(Self(s))
    }
}
