//! `provision plan`: size the host without writing anything

use anyhow::{Context, Result};
use provision_lib::ProvisionLogger;

use super::build_generator;
use crate::config::ProvisionConfig;
use crate::output::{print_info, print_json, print_plan, print_tuning, OutputFormat};

pub fn show_plan(config: &ProvisionConfig, format: OutputFormat) -> Result<()> {
    let logger = ProvisionLogger::for_local_host();
    let sizing = build_generator(config, &logger)
        .size(config.memory_override.as_deref())
        .context("Failed to size the host")?;

    match format {
        OutputFormat::Json => print_json(&sizing)?,
        OutputFormat::Table => {
            print_plan(&sizing.budget, &sizing.plan);
            print_tuning(&sizing.tuning);
            print_info("Nothing was written; run `provision generate` to apply this plan");
        }
    }
    Ok(())
}
