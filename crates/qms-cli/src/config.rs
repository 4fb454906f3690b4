//! Connection and policy settings for the `qms` binary.
//!
//! Read from a TOML file (`--config`, or `qms.toml` in the working directory
//! when present), then overridden by `RPC_USER`, `RPC_PASSWORD`, `RPC_HOST`,
//! `RPC_PORT`, and `QMS_STREAM`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use qms_sdk::{RpcConfig, TransitionPolicy};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "qms.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("ledger {0} is not configured (set it in [ledger] or via {1})")]
    Missing(&'static str, &'static str),

    #[error("invalid value for {name}: '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QmsConfig {
    pub ledger: LedgerSection,
    pub policy: PolicySection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: String,
    pub password: String,
    pub stream: String,
    pub timeout_secs: u64,
    pub page_size: usize,
}

impl Default for LedgerSection {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            user: String::new(),
            password: String::new(),
            stream: RpcConfig::DEFAULT_STREAM.to_string(),
            timeout_secs: RpcConfig::DEFAULT_TIMEOUT.as_secs(),
            page_size: RpcConfig::DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySection {
    pub release_is_final: bool,
}

impl QmsConfig {
    /// Load `path`, or the default file if it exists, or built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let config = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let ledger = &mut self.ledger;
        if let Some(user) = lookup("RPC_USER") {
            ledger.user = user;
        }
        if let Some(password) = lookup("RPC_PASSWORD") {
            ledger.password = password;
        }
        if let Some(host) = lookup("RPC_HOST") {
            ledger.host = Some(host);
        }
        if let Some(port) = lookup("RPC_PORT") {
            let parsed = port.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "RPC_PORT",
                value: port.clone(),
            })?;
            ledger.port = Some(parsed);
        }
        if let Some(stream) = lookup("QMS_STREAM") {
            ledger.stream = stream;
        }
        Ok(())
    }

    pub fn rpc_config(&self) -> Result<RpcConfig, ConfigError> {
        let ledger = &self.ledger;
        let host = ledger
            .host
            .as_deref()
            .filter(|h| !h.trim().is_empty())
            .ok_or(ConfigError::Missing("host", "RPC_HOST"))?;
        let port = ledger.port.ok_or(ConfigError::Missing("port", "RPC_PORT"))?;
        if ledger.stream.trim().is_empty() {
            return Err(ConfigError::Invalid {
                name: "stream",
                value: ledger.stream.clone(),
            });
        }

        let mut config = RpcConfig::new(host, port).with_credentials(&ledger.user, &ledger.password);
        config.stream = ledger.stream.clone();
        config.timeout = Duration::from_secs(ledger.timeout_secs.max(1));
        config.page_size = ledger.page_size.max(1);
        Ok(config)
    }

    pub fn transition_policy(&self) -> TransitionPolicy {
        if self.policy.release_is_final {
            TransitionPolicy::ReleaseIsFinal
        } else {
            TransitionPolicy::Unrestricted
        }
    }
}
