//! Error types for the provisioning core
//!
//! Only fatal conditions are represented here. Recoverable policy outcomes
//! (rejected overrides, skipped proxy config, preserved customizations) are
//! reported as [`crate::models::WriteDecision`]s and log events instead.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProvisionError>;

#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Host memory could not be measured
    #[error("failed to measure host memory from {source_path}: {reason}")]
    MemoryProbe { source_path: PathBuf, reason: String },

    /// A target directory is missing or not writable before any artifact was written
    #[error("target directory {path} is not writable: {source}")]
    Preflight {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An existing target could not be read back
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A rendered artifact failed to persist
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The routing domain cannot be placed in a proxy site address
    #[error("{domain:?} is not a valid domain")]
    InvalidDomain { domain: String },

    #[error("failed to render {artifact}: {reason}")]
    Render { artifact: &'static str, reason: String },

    /// An external collaborator (package manager, container runtime, ...) failed
    #[error("{name} failed: {message}")]
    Collaborator { name: &'static str, message: String },

    #[error("timed out after {secs}s waiting for {what}")]
    Timeout { what: String, secs: u64 },
}

impl ProvisionError {
    pub fn collaborator(name: &'static str, message: impl Into<String>) -> Self {
        Self::Collaborator {
            name,
            message: message.into(),
        }
    }

    /// Returns true for errors raised before any artifact was written
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::MemoryProbe { .. } | Self::Preflight { .. } | Self::InvalidDomain { .. }
        )
    }
}
