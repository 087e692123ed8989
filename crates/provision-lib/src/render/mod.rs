//! Artifact rendering
//!
//! Pure functions turning the plan and tuning set into file contents. Nothing
//! here touches the filesystem; the generator pairs each rendered artifact
//! with a safe-write decision.

pub mod database;
pub mod env;
pub mod limits;
pub mod proxy;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Secrets are readable by the owning user only
pub const SECRET_MODE: u32 = 0o600;

/// Derived, non-secret configuration
pub const PUBLIC_MODE: u32 = 0o644;

/// Service-level settings shared by the renderers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Port the application listens on, published on the host loopback
    pub app_port: u16,
    pub db_user: String,
    pub db_name: String,
    /// Logical service names in the container orchestrator
    pub database_service: String,
    pub application_service: String,
    /// Directory the reverse proxy writes its JSON access log into
    pub proxy_log_dir: PathBuf,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            app_port: 3000,
            db_user: "app".to_string(),
            db_name: "app".to_string(),
            database_service: "database".to_string(),
            application_service: "application".to_string(),
            proxy_log_dir: PathBuf::from("/var/log/caddy"),
        }
    }
}
