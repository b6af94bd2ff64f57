// ABOUTME: Configuration for creating application VMs through commands run over SSH.
// ABOUTME: Command templates plus the patterns that recognize start, success and failure.

use regex::Regex;
use serde::Deserialize;

use super::deserialize::{deserialize_capture_regex, deserialize_regex};
use crate::ssh::CommandTemplate;
use crate::wait::WaitConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct SshVmCreateConfig {
    /// Kicks off VM creation; may reference `${envName}`.
    pub initial_command: CommandTemplate,

    /// Polls creation progress; may reference `${hostname}`.
    pub followup_command: CommandTemplate,

    #[serde(deserialize_with = "deserialize_capture_regex")]
    pub initial_regexp_hostname: Regex,

    #[serde(deserialize_with = "deserialize_capture_regex")]
    pub initial_regexp_ipaddress: Regex,

    #[serde(deserialize_with = "deserialize_regex")]
    pub followup_regexp_done: Regex,

    #[serde(deserialize_with = "deserialize_regex")]
    pub followup_regexp_error: Regex,

    #[serde(default)]
    pub wait: WaitConfig,
}
