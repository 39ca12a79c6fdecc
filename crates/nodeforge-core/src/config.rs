//! nodeforge.toml configuration parser.
//!
//! Every section is optional; a missing file section falls back to the
//! defaults below, so an empty file is a valid configuration.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::duration::parse_duration;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid duration: {0:?}")]
    InvalidDuration(String),

    #[error("invalid listen address: {0:?}")]
    InvalidListen(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NodeforgeConfig {
    pub server: ServerConfig,
    pub state: StateConfig,
    pub resize: ResizeSection,
    pub backend: BackendConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP boundary binds to.
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:9511".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StateConfig {
    /// Directory holding `nodeforge.redb`.
    pub data_dir: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/var/lib/nodeforge"),
        }
    }
}

/// Resize policy knobs handed to the conductor at construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResizeSection {
    /// How long the backend may take before the operation counts as failed.
    pub backend_timeout: String,
    /// Service-wide ceiling applied on top of each nodegroup's own bounds.
    pub max_nodes_per_nodegroup: Option<u32>,
}

impl Default for ResizeSection {
    fn default() -> Self {
        Self {
            backend_timeout: "60m".to_string(),
            max_nodes_per_nodegroup: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    Simulated,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,
    /// Simulated provisioning latency per operation.
    pub delay: String,
    /// Make every resize fail (exercises the error/rollback paths).
    pub fail_resizes: bool,
    /// Make every rollback fail.
    pub fail_rollbacks: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Simulated,
            delay: "2s".to_string(),
            fail_resizes: false,
            fail_rollbacks: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info,nodeforge=debug".to_string(),
            json: false,
        }
    }
}

impl NodeforgeConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: NodeforgeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every field that is stored as a string but parsed later.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listen_addr()?;
        self.backend_timeout()?;
        self.backend_delay()?;
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .listen
            .parse()
            .map_err(|_| ConfigError::InvalidListen(self.server.listen.clone()))
    }

    pub fn backend_timeout(&self) -> Result<Duration, ConfigError> {
        parse_duration(&self.resize.backend_timeout)
    }

    pub fn backend_delay(&self) -> Result<Duration, ConfigError> {
        parse_duration(&self.backend.delay)
    }

    pub fn db_path(&self) -> PathBuf {
        self.state.data_dir.join("nodeforge.redb")
    }
}
