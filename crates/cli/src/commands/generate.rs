//! `provision generate`: write the configuration artifacts only

use anyhow::Result;
use provision_lib::ProvisionLogger;

use super::{finish_proxy, generate_artifacts, print_report};
use crate::config::ProvisionConfig;
use crate::lock::InstallLock;
use crate::output::{print_json, print_success, OutputFormat};

pub async fn generate(config: &ProvisionConfig, format: OutputFormat) -> Result<()> {
    let _lock = InstallLock::acquire(&config.install_dir)?;
    let logger = ProvisionLogger::for_local_host();

    let report = generate_artifacts(config, &logger)?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => print_report(&report),
    }

    finish_proxy(config, &report, format).await?;

    if matches!(format, OutputFormat::Table) {
        print_success(&format!("Configuration generated under {}", config.install_dir.display()));
    }
    Ok(())
}
