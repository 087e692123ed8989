//! `provision install`: the full single-host provisioning flow
//!
//! Packages, source checkout, configuration, containers, firewall, then a
//! bounded wait until every container reports healthy.

use anyhow::{Context, Result};
use provision_lib::collaborators::{
    wait_until_healthy, CheckoutAction, CommandFirewall, ComposeRuntime, ContainerRuntime,
    FirewallManager, GitCheckout, PackageInstaller, SourceCheckout, SystemPackageInstaller,
};
use provision_lib::ProvisionLogger;
use serde_json::json;

use super::{finish_proxy, generate_artifacts, print_report};
use crate::config::ProvisionConfig;
use crate::lock::InstallLock;
use crate::output::{print_health, print_info, print_json, print_success, OutputFormat};

pub async fn install(config: &ProvisionConfig, format: OutputFormat) -> Result<()> {
    let repo_url = config
        .repo_url
        .as_deref()
        .context("repo_url is required for install (config file or PROVISION_REPO_URL)")?;

    let lock = InstallLock::acquire(&config.install_dir)?;
    let logger = ProvisionLogger::for_local_host();
    logger.log_step("lock", &lock.path().display().to_string(), true);
    let table = matches!(format, OutputFormat::Table);

    let installer = SystemPackageInstaller::new(&config.install_command);
    for package in &config.required_packages {
        let installed = installer
            .ensure_installed(package)
            .await
            .with_context(|| format!("Failed to install {}", package))?;
        let detail = if installed { "installed" } else { "already present" };
        logger.log_step("package", &format!("{} {}", package, detail), true);
    }

    let action = GitCheckout::default()
        .sync(repo_url, config.repo_branch.as_deref(), &config.install_dir)
        .await
        .context("Failed to check out the application source")?;
    let detail = match action {
        CheckoutAction::Cloned => format!("cloned {}", repo_url),
        CheckoutAction::Updated => format!("updated {}", repo_url),
    };
    logger.log_step("checkout", &detail, true);
    if table {
        print_info(&format!("Source {}", detail));
    }

    let report = generate_artifacts(config, &logger)?;
    if table {
        print_report(&report);
    }
    finish_proxy(config, &report, format).await?;

    let runtime = ComposeRuntime::new(&config.compose_command);
    let compose_files = config.compose_files();
    runtime
        .up(&config.install_dir, &compose_files)
        .await
        .context("Failed to start containers")?;
    logger.log_step("containers", "started", true);

    let firewall = CommandFirewall::new(&config.firewall_command);
    for port in &config.open_ports {
        firewall
            .allow_port(*port)
            .await
            .with_context(|| format!("Failed to open port {}", port))?;
        logger.log_step("firewall", &format!("allowed {}", port), true);
    }

    if table {
        print_info(&format!(
            "Waiting up to {}s for containers to become healthy",
            config.health_timeout_secs
        ));
    }
    let health = match wait_until_healthy(
        &runtime,
        &config.install_dir,
        &compose_files,
        config.health_timeout(),
        config.health_poll_interval(),
    )
    .await
    {
        Ok(health) => health,
        Err(e) => {
            logger.log_step("health", &e.to_string(), false);
            return Err(e).context("Containers did not become healthy");
        }
    };
    logger.log_step("health", "all services healthy", true);

    match format {
        OutputFormat::Json => print_json(&json!({ "report": report, "health": health }))?,
        OutputFormat::Table => {
            print_health(&health);
            println!();
            match config.domain.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
                Some(domain) => print_success(&format!("Stack is up at https://{}", domain)),
                None => print_success(&format!(
                    "Stack is up on http://127.0.0.1:{}",
                    config.app_port
                )),
            }
        }
    }
    Ok(())
}
