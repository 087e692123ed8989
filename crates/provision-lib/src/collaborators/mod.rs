//! External collaborators
//!
//! Everything the installer does besides sizing and rendering goes through
//! these narrow interfaces. The configuration generator never spawns a
//! process itself; the CLI wires system implementations in, tests wire fakes.

mod system;

pub use system::{
    expand_template, run_command, CommandFirewall, ComposeRuntime, GitCheckout,
    SystemPackageInstaller, SystemReverseProxy,
};

use crate::error::{ProvisionError, Result};
use crate::health::OverallHealth;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Installs prerequisite packages (version control, container runtime, proxy)
#[async_trait]
pub trait PackageInstaller: Send + Sync {
    async fn is_installed(&self, package: &str) -> bool;

    async fn install(&self, package: &str) -> Result<()>;

    /// Install `package` unless present; returns true when an install ran
    async fn ensure_installed(&self, package: &str) -> Result<bool> {
        if self.is_installed(package).await {
            debug!(package = %package, "Package already installed");
            return Ok(false);
        }
        info!(package = %package, "Installing package");
        self.install(package).await?;
        Ok(true)
    }
}

/// What a checkout did to the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutAction {
    Cloned,
    Updated,
}

/// Fetches the application source into the install directory
#[async_trait]
pub trait SourceCheckout: Send + Sync {
    async fn sync(&self, repo_url: &str, branch: Option<&str>, dest: &Path) -> Result<CheckoutAction>;
}

/// Starts the container set and reports its health
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Start (or converge) the services defined by `compose_files`
    async fn up(&self, project_dir: &Path, compose_files: &[PathBuf]) -> Result<()>;

    /// Current health of every service in the project
    async fn status(&self, project_dir: &Path, compose_files: &[PathBuf]) -> Result<OverallHealth>;
}

/// Opens ports on the host firewall
#[async_trait]
pub trait FirewallManager: Send + Sync {
    async fn allow_port(&self, port: u16) -> Result<()>;
}

/// Follow-up work after a new reverse-proxy fragment was written
#[async_trait]
pub trait ReverseProxyService: Send + Sync {
    /// Create the access-log directory, handing it to `owner` when given
    async fn prepare_log_dir(&self, dir: &Path, owner: Option<&str>) -> Result<()>;

    /// Make the proxy pick up the new configuration
    async fn reload(&self) -> Result<()>;
}

/// Poll the runtime until every service is healthy, or fail at the deadline
///
/// An unhealthy service does not end the wait early: containers with restart
/// policies routinely flap once while dependencies come up.
pub async fn wait_until_healthy(
    runtime: &dyn ContainerRuntime,
    project_dir: &Path,
    compose_files: &[PathBuf],
    timeout: Duration,
    poll_interval: Duration,
) -> Result<OverallHealth> {
    let poll = async {
        let mut ticker = tokio::time::interval(poll_interval);
        let mut attempt = 0u32;
        loop {
            ticker.tick().await;
            attempt += 1;

            match runtime.status(project_dir, compose_files).await {
                Ok(health) if health.is_healthy() => return health,
                Ok(health) => {
                    debug!(attempt, status = ?health.status, "Containers not healthy yet");
                }
                Err(e) => {
                    debug!(attempt, error = %e, "Container status unavailable");
                }
            }
        }
    };

    tokio::time::timeout(timeout, poll)
        .await
        .map_err(|_| ProvisionError::Timeout {
            what: "containers to become healthy".to_string(),
            secs: timeout.as_secs(),
        })
}
