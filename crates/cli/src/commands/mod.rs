//! Sub-command implementations

pub mod generate;
pub mod install;
pub mod plan;

use anyhow::{Context, Result};
use colored::Colorize;
use provision_lib::collaborators::{ReverseProxyService, SystemReverseProxy};
use provision_lib::probe::create_probe;
use provision_lib::{ConfigGenerator, GenerationReport, ProvisionLogger};

use crate::config::ProvisionConfig;
use crate::output::{
    mask_secret, print_info, print_outcomes, print_plan, print_success, print_tuning,
    print_warning, OutputFormat,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Generator wired to the configured memory probe
pub fn build_generator(config: &ProvisionConfig, logger: &ProvisionLogger) -> ConfigGenerator {
    ConfigGenerator::new(create_probe(&config.probe_config()), logger.clone())
}

/// Run the configuration pass for the configured install directory
pub fn generate_artifacts(config: &ProvisionConfig, logger: &ProvisionLogger) -> Result<GenerationReport> {
    logger.log_run_started(VERSION, &config.install_dir.display().to_string());

    build_generator(config, logger)
        .run(&config.generator_inputs())
        .context("Configuration generation failed")
}

/// Print a generator report in the table layout
pub fn print_report(report: &GenerationReport) {
    print_plan(&report.budget, &report.plan);
    print_tuning(&report.tuning);
    print_outcomes(&report.outcomes);

    if let Some(credential) = &report.credential {
        print_info(&format!("Database password: {}", mask_secret(credential)));
    }
    if report.proxy_skipped {
        print_warning("No domain configured; reverse proxy left untouched");
    }
}

/// Create the proxy log directory and reload the proxy after a fresh fragment landed
///
/// A preserved customized file gets its suggested block printed instead.
pub async fn finish_proxy(
    config: &ProvisionConfig,
    report: &GenerationReport,
    format: OutputFormat,
) -> Result<()> {
    if report.proxy_written() {
        let proxy = SystemReverseProxy::new(&config.proxy_reload_command);
        proxy
            .prepare_log_dir(&config.proxy_log_dir, config.proxy_log_owner.as_deref())
            .await
            .context("Failed to prepare the reverse-proxy log directory")?;
        proxy.reload().await.context("Failed to reload the reverse proxy")?;

        if matches!(format, OutputFormat::Table) {
            print_success("Reverse proxy reloaded");
        }
        return Ok(());
    }

    if let (Some(fragment), OutputFormat::Table) = (&report.proxy_merge_fragment, format) {
        print_warning(&format!(
            "{} looks hand-edited and was kept; merge this block manually:",
            config.proxy_config_path.display()
        ));
        println!();
        println!("{}", fragment.dimmed());
    }
    Ok(())
}
