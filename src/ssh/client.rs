// ABOUTME: SSH session management using russh.
// ABOUTME: Handles connection, authentication, and command execution on the vm-create host.

use super::error::{Error, Result};
use russh::client::{self, Config, Handle};
use russh::keys::agent::client::AgentClient;
use russh::keys::known_hosts::{
    check_known_hosts, check_known_hosts_path, learn_known_hosts, learn_known_hosts_path,
};
use russh::keys::{PrivateKeyWithHashAlg, load_secret_key, ssh_key};
use russh::ChannelMsg;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UnixStream;

/// Where and as whom to open an SSH session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    /// Private key file. If None, the SSH agent is tried, then ~/.ssh defaults.
    pub key_path: Option<PathBuf>,
    /// Accept and remember an unknown host key.
    pub trust_on_first_use: bool,
    /// known_hosts file. If None, ~/.ssh/known_hosts.
    pub known_hosts_path: Option<PathBuf>,
    /// Upper bound on a single command's runtime.
    pub command_timeout: Duration,
}

impl SessionConfig {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            user: user.into(),
            key_path: None,
            trust_on_first_use: false,
            known_hosts_path: None,
            command_timeout: Duration::from_secs(300),
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn key_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_path = Some(path.into());
        self
    }

    pub fn trust_on_first_use(mut self, tofu: bool) -> Self {
        self.trust_on_first_use = tofu;
        self
    }

    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// `user@host`, as used in log lines and checker descriptions.
    pub fn target(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }
}

/// Output from a remote command execution.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub exit_code: u32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Stdout followed by stderr, for pattern matching over everything the command said.
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => {
                let separator = if self.stdout.ends_with('\n') { "" } else { "\n" };
                format!("{}{}{}", self.stdout, separator, self.stderr)
            }
        }
    }
}

/// Host key verification for russh.
pub(crate) struct SshHandler {
    host: String,
    port: u16,
    trust_on_first_use: bool,
    known_hosts_path: Option<PathBuf>,
}

impl SshHandler {
    fn for_config(config: &SessionConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            trust_on_first_use: config.trust_on_first_use,
            known_hosts_path: config.known_hosts_path.clone(),
        }
    }

    fn remember(&self, key: &ssh_key::PublicKey) {
        let learned = match &self.known_hosts_path {
            Some(path) => learn_known_hosts_path(&self.host, self.port, key, path),
            None => learn_known_hosts(&self.host, self.port, key),
        };
        if let Err(e) = learned {
            tracing::warn!("Failed to save host key to known_hosts: {}", e);
        }
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        let known = match &self.known_hosts_path {
            Some(path) => check_known_hosts_path(&self.host, self.port, server_public_key, path),
            None => check_known_hosts(&self.host, self.port, server_public_key),
        };

        match known {
            Ok(true) => Ok(true),
            // A changed key is never accepted, even with trust-on-first-use.
            Err(russh::keys::Error::KeyChanged { .. }) => Ok(false),
            Ok(false) if self.trust_on_first_use => {
                tracing::warn!(
                    "Trust-On-First-Use: accepting unknown host key for {}:{}",
                    self.host,
                    self.port
                );
                self.remember(server_public_key);
                Ok(true)
            }
            Ok(false) => Ok(false),
            Err(_) => Ok(self.trust_on_first_use),
        }
    }
}

/// How the session proves the user's identity.
enum Credentials {
    Agent(AgentClient<UnixStream>),
    Key(Arc<ssh_key::PrivateKey>),
}

/// Default private keys tried when neither a key file nor an agent is available.
const DEFAULT_KEY_NAMES: [&str; 3] = ["id_ed25519", "id_rsa", "id_ecdsa"];

impl Credentials {
    /// Explicit key file first, then the agent, then the usual files under ~/.ssh.
    async fn discover(config: &SessionConfig) -> Result<Self> {
        if let Some(path) = &config.key_path {
            return load_secret_key(path, None)
                .map(|key| Credentials::Key(Arc::new(key)))
                .map_err(|e| Error::KeyLoadFailed {
                    path: path.clone(),
                    reason: e.to_string(),
                });
        }

        match AgentClient::connect_env().await {
            Ok(agent) => return Ok(Credentials::Agent(agent)),
            Err(e) => tracing::debug!("No SSH agent for {}: {}", config.target(), e),
        }

        let ssh_dir = std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".ssh"))
            .ok_or_else(|| Error::AgentUnavailable("no agent and HOME is not set".to_string()))?;
        DEFAULT_KEY_NAMES
            .iter()
            .find_map(|name| load_secret_key(ssh_dir.join(name), None).ok())
            .map(|key| Credentials::Key(Arc::new(key)))
            .ok_or_else(|| {
                Error::AgentUnavailable(format!("no agent and no key in {}", ssh_dir.display()))
            })
    }

    async fn present(self, handle: &mut Handle<SshHandler>, user: &str) -> Result<bool> {
        match self {
            Credentials::Key(key) => {
                let hash_alg = handle.best_supported_rsa_hash().await?.flatten();
                let auth = handle
                    .authenticate_publickey(user, PrivateKeyWithHashAlg::new(key, hash_alg))
                    .await?;
                Ok(auth.success())
            }
            Credentials::Agent(mut agent) => {
                let identities = agent
                    .request_identities()
                    .await
                    .map_err(|e| Error::AgentUnavailable(e.to_string()))?;
                if identities.is_empty() {
                    return Err(Error::AgentUnavailable("agent holds no keys".to_string()));
                }
                for identity in identities {
                    let accepted = handle
                        .authenticate_publickey_with(user, identity, None, &mut agent)
                        .await
                        .is_ok_and(|auth| auth.success());
                    if accepted {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }
}

/// Bytes gathered from one exec channel.
#[derive(Default)]
struct ChannelOutput {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    exit_code: Option<u32>,
    eof: bool,
}

impl ChannelOutput {
    /// True once the exit status and end-of-file have both arrived.
    fn absorb(&mut self, msg: ChannelMsg) -> bool {
        match msg {
            ChannelMsg::Data { data } => self.stdout.extend_from_slice(&data),
            // Extended stream 1 carries stderr.
            ChannelMsg::ExtendedData { data, ext: 1 } => self.stderr.extend_from_slice(&data),
            ChannelMsg::ExitStatus { exit_status } => self.exit_code = Some(exit_status),
            ChannelMsg::Eof => self.eof = true,
            ChannelMsg::Close => return true,
            _ => {}
        }
        self.eof && self.exit_code.is_some()
    }

    fn finish(self) -> Result<CommandOutput> {
        Ok(CommandOutput {
            exit_code: self.exit_code.ok_or(Error::ChannelClosed)?,
            stdout: String::from_utf8_lossy(&self.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&self.stderr).into_owned(),
        })
    }
}

/// Interval between keepalive requests on an otherwise idle session.
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(10);

/// Unanswered keepalives before the host is considered gone.
const KEEPALIVE_MAX: usize = 6;

/// One session stays open across every poll of a wait, so idleness between
/// probes must never end it. A dead peer is caught by unanswered keepalives.
fn transport_config() -> Config {
    Config {
        inactivity_timeout: None,
        keepalive_interval: Some(KEEPALIVE_INTERVAL),
        keepalive_max: KEEPALIVE_MAX,
        ..Default::default()
    }
}

/// An authenticated SSH session to the VM-creation host.
pub struct Session {
    config: SessionConfig,
    handle: Handle<SshHandler>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("target", &self.config.target())
            .field("port", &self.config.port)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub async fn connect(config: SessionConfig) -> Result<Self> {
        let credentials = Credentials::discover(&config).await?;
        let russh_config = Arc::new(transport_config());

        let mut handle = client::connect(
            russh_config,
            (config.host.as_str(), config.port),
            SshHandler::for_config(&config),
        )
        .await
        .map_err(|e| Error::Connection(format!("{}:{}: {}", config.host, config.port, e)))?;

        if !credentials.present(&mut handle, &config.user).await? {
            return Err(Error::AuthenticationFailed);
        }

        tracing::debug!("SSH session established to {}", config.target());
        Ok(Self { config, handle })
    }

    /// Run `command`, giving up after the configured command timeout.
    pub async fn exec(&self, command: &str) -> Result<CommandOutput> {
        let limit = self.config.command_timeout;
        match tokio::time::timeout(limit, self.exec_unbounded(command)).await {
            Ok(result) => result,
            Err(_) => Err(Error::CommandTimeout(limit)),
        }
    }

    async fn exec_unbounded(&self, command: &str) -> Result<CommandOutput> {
        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| Error::CommandFailed(format!("open channel: {e}")))?;
        channel
            .exec(true, command)
            .await
            .map_err(|e| Error::CommandFailed(format!("exec: {e}")))?;

        let mut output = ChannelOutput::default();
        while let Some(msg) = channel.wait().await {
            if output.absorb(msg) {
                break;
            }
        }
        output.finish()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}
