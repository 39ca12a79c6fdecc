//! nodeforge-core — shared configuration for the nodeforge workspace.

pub mod config;
pub mod duration;

pub use config::{
    BackendConfig, BackendKind, ConfigError, LogConfig, NodeforgeConfig, ResizeSection,
    ServerConfig, StateConfig,
};
pub use duration::parse_duration;
