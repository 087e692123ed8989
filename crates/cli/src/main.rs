//! Stack provisioner CLI
//!
//! Sizes a single host, writes resource-tuned configuration for the database
//! and application containers, and drives the rest of the install.

mod commands;
mod config;
mod lock;
mod output;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use provision_lib::ProvisionError;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::ProvisionConfig;

/// Stack provisioner CLI
#[derive(Parser)]
#[command(name = "provision")]
#[command(author, version, about = "Resource-aware provisioner for a single-host application stack", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON); defaults to ~/.config/provision/config.toml
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short, global = true, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the memory split and database tuning without writing anything
    Plan {
        #[command(flatten)]
        overrides: Overrides,
    },

    /// Write the configuration artifacts
    Generate {
        #[command(flatten)]
        overrides: Overrides,
    },

    /// Install packages, check out the source, configure and start the stack
    Install {
        #[command(flatten)]
        overrides: Overrides,

        /// Application repository URL
        #[arg(long)]
        repo_url: Option<String>,

        /// Branch to check out
        #[arg(long)]
        branch: Option<String>,
    },
}

/// Flags taking precedence over the config file and environment
#[derive(Args, Debug, Default)]
pub struct Overrides {
    /// Install directory
    #[arg(long)]
    pub install_dir: Option<PathBuf>,

    /// Public domain for the reverse proxy; empty skips it
    #[arg(long)]
    pub domain: Option<String>,

    /// Memory in MB to split 40/60 instead of the recommended tier
    #[arg(long, allow_hyphen_values = true)]
    pub memory_override: Option<String>,

    /// Plan for this total instead of probing the host
    #[arg(long)]
    pub total_memory_mb: Option<u64>,

    /// Reverse-proxy configuration file
    #[arg(long)]
    pub proxy_config: Option<PathBuf>,
}

impl Overrides {
    fn apply(self, config: &mut ProvisionConfig) {
        if let Some(install_dir) = self.install_dir {
            config.install_dir = install_dir;
        }
        if self.domain.is_some() {
            config.domain = self.domain;
        }
        if self.memory_override.is_some() {
            config.memory_override = self.memory_override;
        }
        if self.total_memory_mb.is_some() {
            config.total_memory_mb = self.total_memory_mb;
        }
        if let Some(proxy_config) = self.proxy_config {
            config.proxy_config_path = proxy_config;
        }
    }
}

fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose {
        "debug"
    } else if json {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = ProvisionConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Plan { overrides } => {
            overrides.apply(&mut config);
            commands::plan::show_plan(&config, cli.format)?;
        }
        Commands::Generate { overrides } => {
            overrides.apply(&mut config);
            commands::generate::generate(&config, cli.format).await?;
        }
        Commands::Install {
            overrides,
            repo_url,
            branch,
        } => {
            overrides.apply(&mut config);
            if repo_url.is_some() {
                config.repo_url = repo_url;
            }
            if branch.is_some() {
                config.repo_branch = branch;
            }
            commands::install::install(&config, cli.format).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));

        // Bad input (unreadable memory, unusable target directory) exits 2
        let code = match e.downcast_ref::<ProvisionError>() {
            Some(err) if err.is_input_error() => 2,
            _ => 1,
        };
        std::process::exit(code);
    }
}
