use std::path::PathBuf;
use thiserror::Error;

/// A module file could not be opened by the OS loader
#[derive(Debug, Clone, Error)]
#[error("failed to load module '{}': {reason}", path.display())]
pub struct LoadError {
    pub path: PathBuf,
    pub reason: String,
    /// Raw OS error code when the platform reported one
    pub os_code: Option<i32>,
}

impl LoadError {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, reason: impl Into<String>, os_code: Option<i32>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
            os_code,
        }
    }
}

/// Reasons a plugin refuses or fails to initialize
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginError {
    #[error("plugin '{plugin}' was built for host version '{requested}', this host is '{host}'")]
    VersionMismatch {
        plugin: String,
        requested: String,
        host: String,
    },

    #[error("plugin '{plugin}' does not have a proper entry point")]
    MissingEntryPoint { plugin: String },

    #[error("plugin '{plugin}' failed to initialize: {reason}")]
    Initialization { plugin: String, reason: String },
}

impl PluginError {
    /// Display name of the plugin the error belongs to
    #[must_use]
    pub fn plugin(&self) -> &str {
        match self {
            Self::VersionMismatch { plugin, .. }
            | Self::MissingEntryPoint { plugin }
            | Self::Initialization { plugin, .. } => plugin,
        }
    }
}
