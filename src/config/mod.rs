// ABOUTME: Configuration types and parsing for bluegreen.yml.
// ABOUTME: Handles YAML parsing, config discovery, and per-job section requirements.

mod deserialize;
mod init;
mod ssh_target;
mod vm_create;

pub use init::init_config;
pub use ssh_target::SshTargetConfig;
pub use vm_create::SshVmCreateConfig;

use crate::error::{Error, Result};
use crate::model::Application;
use crate::wait::WaitConfig;
use deserialize::deserialize_ssh_target;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = "bluegreen.yml";
pub const CONFIG_FILENAME_ALT: &str = "bluegreen.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".bluegreen/config.yml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default, deserialize_with = "deserialize_ssh_target")]
    pub ssh_target: Option<SshTargetConfig>,

    #[serde(default)]
    pub ssh_vm_create: Option<SshVmCreateConfig>,

    #[serde(default)]
    pub application: Option<ApplicationConfig>,

    #[serde(default)]
    pub rds: Option<RdsConfig>,
}

/// Where environment state and locks live.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    #[serde(default = "default_lock_dir")]
    pub lock_dir: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".bluegreen/environments.json")
}

fn default_lock_dir() -> PathBuf {
    PathBuf::from(".bluegreen/locks")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            lock_dir: default_lock_dir(),
        }
    }
}

/// The application registered on each new VM.
#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationConfig {
    #[serde(default = "default_scheme")]
    pub scheme: String,
    pub port: u16,
    #[serde(default = "default_url_path")]
    pub url_path: String,
}

fn default_scheme() -> String {
    "http".to_string()
}

fn default_url_path() -> String {
    "/".to_string()
}

impl ApplicationConfig {
    pub fn application(&self) -> Result<Application> {
        Application::new(&self.scheme, self.port, &self.url_path)
            .map_err(|e| Error::InvalidConfig(format!("application: {e}")))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RdsConfig {
    /// AWS region; the default provider chain decides when absent.
    #[serde(default)]
    pub region: Option<String>,

    /// VPC security groups applied to restored instances.
    #[serde(default)]
    pub security_group_ids: Vec<String>,

    #[serde(default)]
    pub snapshot_wait: WaitConfig,

    #[serde(default)]
    pub instance_wait: WaitConfig,
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        tracing::debug!("Loading configuration from {}", path.display());
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    fn validate(&self) -> Result<()> {
        if let Some(application) = &self.application {
            application.application()?;
        }
        Ok(())
    }

    pub fn ssh_target(&self) -> Result<&SshTargetConfig> {
        self.ssh_target
            .as_ref()
            .ok_or(Error::MissingSection("ssh_target"))
    }

    pub fn ssh_vm_create(&self) -> Result<&SshVmCreateConfig> {
        self.ssh_vm_create
            .as_ref()
            .ok_or(Error::MissingSection("ssh_vm_create"))
    }

    pub fn application(&self) -> Result<Application> {
        self.application
            .as_ref()
            .ok_or(Error::MissingSection("application"))?
            .application()
    }

    pub fn rds(&self) -> Result<&RdsConfig> {
        self.rds.as_ref().ok_or(Error::MissingSection("rds"))
    }
}
