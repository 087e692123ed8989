//! Collaborators backed by host commands
//!
//! Command lines come from configuration as templates with `{placeholder}`
//! tokens, so nothing here needs to know which distribution it runs on.

use super::{
    CheckoutAction, ContainerRuntime, FirewallManager, PackageInstaller, ReverseProxyService,
    SourceCheckout,
};
use crate::error::{ProvisionError, Result};
use crate::health::{self, OverallHealth};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Split a template on whitespace and substitute `{name}` tokens
pub fn expand_template(template: &str, vars: &[(&str, &str)]) -> Vec<String> {
    template
        .split_whitespace()
        .map(|token| {
            vars.iter().fold(token.to_string(), |acc, (name, value)| {
                acc.replace(&format!("{{{}}}", name), value)
            })
        })
        .collect()
}

/// Run a command to completion, returning stdout or a collaborator error
pub async fn run_command(
    name: &'static str,
    argv: &[String],
    current_dir: Option<&Path>,
) -> Result<String> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| ProvisionError::collaborator(name, "empty command"))?;

    debug!(collaborator = name, command = %argv.join(" "), "Running command");

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = current_dir {
        command.current_dir(dir);
    }

    let output = command
        .output()
        .await
        .map_err(|e| ProvisionError::collaborator(name, format!("failed to run {}: {}", program, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ProvisionError::collaborator(
            name,
            format!("`{}` exited with {}: {}", argv.join(" "), output.status, stderr.trim()),
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Checks for a binary on PATH and installs missing packages with a configured command
pub struct SystemPackageInstaller {
    install_command: String,
}

impl SystemPackageInstaller {
    /// `install_command` must contain `{package}`, e.g. `apt-get install -y {package}`
    pub fn new(install_command: impl Into<String>) -> Self {
        Self {
            install_command: install_command.into(),
        }
    }
}

#[async_trait]
impl PackageInstaller for SystemPackageInstaller {
    async fn is_installed(&self, package: &str) -> bool {
        Command::new(package)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    async fn install(&self, package: &str) -> Result<()> {
        let argv = expand_template(&self.install_command, &[("package", package)]);
        run_command("package installer", &argv, None).await?;
        Ok(())
    }
}

/// Clones or fast-forwards a git repository
pub struct GitCheckout {
    git: String,
}

impl Default for GitCheckout {
    fn default() -> Self {
        Self {
            git: "git".to_string(),
        }
    }
}

#[async_trait]
impl SourceCheckout for GitCheckout {
    async fn sync(&self, repo_url: &str, branch: Option<&str>, dest: &Path) -> Result<CheckoutAction> {
        let dest_str = dest.display().to_string();

        if dest.join(".git").is_dir() {
            let argv = vec![
                self.git.clone(),
                "-C".to_string(),
                dest_str,
                "pull".to_string(),
                "--ff-only".to_string(),
            ];
            run_command("source checkout", &argv, None).await?;
            return Ok(CheckoutAction::Updated);
        }

        let mut argv = vec![self.git.clone(), "clone".to_string()];
        if let Some(branch) = branch {
            argv.push("--branch".to_string());
            argv.push(branch.to_string());
        }
        argv.push(repo_url.to_string());
        argv.push(dest_str);
        run_command("source checkout", &argv, None).await?;
        Ok(CheckoutAction::Cloned)
    }
}

/// Drives a compose-style container runtime
pub struct ComposeRuntime {
    /// Base command, e.g. `docker compose`
    base: Vec<String>,
}

impl ComposeRuntime {
    pub fn new(compose_command: &str) -> Self {
        Self {
            base: expand_template(compose_command, &[]),
        }
    }

    fn argv(&self, compose_files: &[PathBuf], tail: &[&str]) -> Vec<String> {
        let mut argv = self.base.clone();
        for file in compose_files {
            argv.push("-f".to_string());
            argv.push(file.display().to_string());
        }
        argv.extend(tail.iter().map(|s| s.to_string()));
        argv
    }
}

#[async_trait]
impl ContainerRuntime for ComposeRuntime {
    async fn up(&self, project_dir: &Path, compose_files: &[PathBuf]) -> Result<()> {
        let argv = self.argv(compose_files, &["up", "-d", "--remove-orphans"]);
        run_command("container runtime", &argv, Some(project_dir)).await?;
        Ok(())
    }

    async fn status(&self, project_dir: &Path, compose_files: &[PathBuf]) -> Result<OverallHealth> {
        let argv = self.argv(compose_files, &["ps", "--all", "--format", "json"]);
        let output = run_command("container runtime", &argv, Some(project_dir)).await?;
        Ok(OverallHealth::from_services(health::parse_ps_output(&output)?))
    }
}

/// Opens ports with a configured command such as `ufw allow {port}/tcp`
pub struct CommandFirewall {
    command: String,
}

impl CommandFirewall {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait]
impl FirewallManager for CommandFirewall {
    async fn allow_port(&self, port: u16) -> Result<()> {
        let port = port.to_string();
        let argv = expand_template(&self.command, &[("port", &port)]);
        run_command("firewall", &argv, None).await?;
        Ok(())
    }
}

/// Reverse proxy managed by the service manager
pub struct SystemReverseProxy {
    reload_command: String,
}

impl SystemReverseProxy {
    pub fn new(reload_command: impl Into<String>) -> Self {
        Self {
            reload_command: reload_command.into(),
        }
    }
}

#[async_trait]
impl ReverseProxyService for SystemReverseProxy {
    async fn prepare_log_dir(&self, dir: &Path, owner: Option<&str>) -> Result<()> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| ProvisionError::Write {
                path: dir.to_path_buf(),
                source: e,
            })?;

        if let Some(owner) = owner {
            let argv = vec![
                "chown".to_string(),
                "-R".to_string(),
                owner.to_string(),
                dir.display().to_string(),
            ];
            run_command("reverse proxy", &argv, None).await?;
        }
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        let argv = expand_template(&self.reload_command, &[]);
        run_command("reverse proxy", &argv, None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_expand_template() {
        let argv = expand_template("ufw allow {port}/tcp", &[("port", "443")]);
        assert_eq!(argv, vec!["ufw", "allow", "443/tcp"]);

        let argv = expand_template("  apt-get   install -y {package} ", &[("package", "git")]);
        assert_eq!(argv, vec!["apt-get", "install", "-y", "git"]);
    }

    #[test]
    fn test_compose_argv() {
        let runtime = ComposeRuntime::new("docker compose");
        let argv = runtime.argv(
            &[PathBuf::from("docker-compose.yml"), PathBuf::from("extra.yml")],
            &["up", "-d"],
        );
        assert_eq!(
            argv,
            vec!["docker", "compose", "-f", "docker-compose.yml", "-f", "extra.yml", "up", "-d"]
        );
    }

    #[tokio::test]
    async fn test_run_command_captures_stdout() {
        let argv = vec!["echo".to_string(), "hello".to_string()];
        let out = run_command("test", &argv, None).await.unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[tokio::test]
    async fn test_run_command_failure_is_collaborator_error() {
        let argv = vec!["false".to_string()];
        let err = run_command("test", &argv, None).await.unwrap_err();
        assert!(matches!(err, ProvisionError::Collaborator { name: "test", .. }));

        let err = run_command("test", &[], None).await.unwrap_err();
        assert!(matches!(err, ProvisionError::Collaborator { .. }));
    }

    #[tokio::test]
    async fn test_missing_binary_is_not_installed() {
        let installer = SystemPackageInstaller::new("true {package}");
        assert!(!installer.is_installed("definitely-not-a-real-binary-xyz").await);
    }

    #[tokio::test]
    async fn test_prepare_log_dir_without_owner() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("log").join("caddy");

        let proxy = SystemReverseProxy::new("true");
        proxy.prepare_log_dir(&dir, None).await.unwrap();
        proxy.reload().await.unwrap();

        assert!(dir.is_dir());
    }
}
