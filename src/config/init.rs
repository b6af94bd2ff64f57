// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Creates a commented bluegreen.yml template.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::CONFIG_FILENAME;

const TEMPLATE: &str = r#"# Environment state and per-environment locks.
store:
  path: .bluegreen/environments.json
  lock_dir: .bluegreen/locks

# Host that knows how to create application VMs.
# Short form "user@host:port" is also accepted.
ssh_target:
  host: vmhost.example.com
  port: 22
  user: deploy
  # SSH host key verification (default: false)
  # Set to true to enable Trust-On-First-Use, or pre-populate ~/.ssh/known_hosts
  # trust_first_connection: true
  # key_path: ~/.ssh/id_ed25519
  # command_timeout: 5m

ssh_vm_create:
  initial_command: "vmtool create --env ${envName}"
  followup_command: "vmtool status ${hostname}"
  # First capture group of the first matching line is used.
  initial_regexp_hostname: "creating (\\S+) at"
  initial_regexp_ipaddress: "at (\\d+\\.\\d+\\.\\d+\\.\\d+)"
  followup_regexp_done: "^READY"
  followup_regexp_error: "ERROR"
  wait:
    max_num_waits: 120
    report_interval: 4
    delay: 30s

# Registered on every new VM.
application:
  scheme: http
  port: 8080
  url_path: /

rds:
  # region: us-west-2
  security_group_ids: []
  snapshot_wait:
    delay: 30s
  instance_wait:
    delay: 30s
"#;

/// Write the template into `dir`. Returns the path written.
pub fn init_config(dir: &Path, force: bool) -> Result<PathBuf> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    std::fs::write(&config_path, TEMPLATE)?;
    Ok(config_path)
}
