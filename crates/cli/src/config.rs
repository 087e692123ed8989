//! Configuration management for the CLI

use anyhow::{Context, Result};
use provision_lib::probe::ProbeConfig;
use provision_lib::render::RenderSettings;
use provision_lib::{GeneratorInputs, TargetPaths};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix, e.g. `PROVISION_DOMAIN`
const ENV_PREFIX: &str = "PROVISION";

/// Provisioning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionConfig {
    /// Directory the application is checked out into and configured under
    pub install_dir: PathBuf,
    /// Application repository, required by `install`
    pub repo_url: Option<String>,
    pub repo_branch: Option<String>,
    /// Public domain; empty or unset skips the reverse proxy
    pub domain: Option<String>,
    /// Memory to plan for instead of the recommended tier, in MB
    pub memory_override: Option<String>,
    /// Skip the memory probe and plan for this total
    pub total_memory_mb: Option<u64>,
    pub app_port: u16,
    pub db_user: String,
    pub db_name: String,
    pub proxy_config_path: PathBuf,
    pub proxy_log_dir: PathBuf,
    pub proxy_log_owner: Option<String>,
    pub proxy_reload_command: String,
    /// Cap the probed total at the cgroup memory limit
    pub respect_cgroup_limit: bool,
    pub proc_path: PathBuf,
    pub cgroup_root: PathBuf,
    /// Package install template, `{package}` is substituted
    pub install_command: String,
    /// Firewall template, `{port}` is substituted
    pub firewall_command: String,
    pub open_ports: Vec<u16>,
    pub compose_command: String,
    pub health_timeout_secs: u64,
    pub health_poll_interval_secs: u64,
    pub required_packages: Vec<String>,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        let probe = ProbeConfig::default();
        let render = RenderSettings::default();
        Self {
            install_dir: PathBuf::from("/opt/app"),
            repo_url: None,
            repo_branch: None,
            domain: None,
            memory_override: None,
            total_memory_mb: None,
            app_port: render.app_port,
            db_user: render.db_user,
            db_name: render.db_name,
            proxy_config_path: PathBuf::from("/etc/caddy/Caddyfile"),
            proxy_log_dir: render.proxy_log_dir,
            proxy_log_owner: Some("caddy:caddy".to_string()),
            proxy_reload_command: "systemctl reload caddy".to_string(),
            respect_cgroup_limit: probe.respect_cgroup_limit,
            proc_path: probe.proc_path,
            cgroup_root: probe.cgroup_root,
            install_command: "apt-get install -y {package}".to_string(),
            firewall_command: "ufw allow {port}/tcp".to_string(),
            open_ports: vec![22, 80, 443],
            compose_command: "docker compose".to_string(),
            health_timeout_secs: 300,
            health_poll_interval_secs: 5,
            required_packages: vec!["git".to_string(), "docker".to_string(), "caddy".to_string()],
        }
    }
}

impl ProvisionConfig {
    /// Load defaults, then the config file, then `PROVISION_*` variables
    ///
    /// An explicit `path` must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        match path {
            Some(path) => {
                builder = builder.add_source(config::File::from(path).required(true));
            }
            None => {
                if let Some(default_path) = Self::default_path() {
                    builder = builder.add_source(config::File::from(default_path).required(false));
                }
            }
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("open_ports")
                    .with_list_parse_key("required_packages"),
            )
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    /// `~/.config/provision/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| home.join(".config").join("provision").join("config.toml"))
    }

    pub fn probe_config(&self) -> ProbeConfig {
        ProbeConfig {
            proc_path: self.proc_path.clone(),
            cgroup_root: self.cgroup_root.clone(),
            respect_cgroup_limit: self.respect_cgroup_limit,
            fixed_total_mb: self.total_memory_mb,
        }
    }

    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            app_port: self.app_port,
            db_user: self.db_user.clone(),
            db_name: self.db_name.clone(),
            proxy_log_dir: self.proxy_log_dir.clone(),
            ..RenderSettings::default()
        }
    }

    pub fn target_paths(&self) -> TargetPaths {
        TargetPaths::under(&self.install_dir, self.proxy_config_path.clone())
    }

    pub fn generator_inputs(&self) -> GeneratorInputs {
        GeneratorInputs {
            memory_override: self.memory_override.clone(),
            domain: self.domain.clone(),
            settings: self.render_settings(),
            paths: self.target_paths(),
        }
    }

    /// Compose files passed to the container runtime, base file first
    pub fn compose_files(&self) -> Vec<PathBuf> {
        vec![
            self.install_dir.join("docker-compose.yml"),
            self.target_paths().limits_file,
        ]
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs)
    }

    pub fn health_poll_interval(&self) -> Duration {
        Duration::from_secs(self.health_poll_interval_secs.max(1))
    }
}
