//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use provision_lib::{
    AllocationPlan, AllocationSource, ArtifactOutcome, MemoryBudget, OverallHealth, ServiceStatus,
    TuningParameterSet, WriteDecision,
};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a value as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Print a section heading
pub fn print_heading(title: &str) {
    println!("{}", title.bold());
    println!("{}", "=".repeat(60));
}

/// Format megabytes as human-readable string
pub fn format_mb(mb: u64) -> String {
    if mb >= 1024 && mb % 1024 == 0 {
        format!("{} GB", mb / 1024)
    } else if mb >= 1024 {
        format!("{:.1} GB", mb as f64 / 1024.0)
    } else {
        format!("{} MB", mb)
    }
}

/// Color allocation source
pub fn color_source(source: AllocationSource) -> String {
    let label = source.to_string();
    match source {
        AllocationSource::Recommended => label.green().to_string(),
        AllocationSource::CustomOverride => label.blue().to_string(),
        AllocationSource::Fallback => label.yellow().to_string(),
    }
}

/// Color a write decision
pub fn color_decision(decision: WriteDecision) -> String {
    let label = decision.to_string();
    match decision {
        WriteDecision::Write => label.green().to_string(),
        WriteDecision::SkipExisting => label.blue().to_string(),
        WriteDecision::SkipCustomized => label.yellow().to_string(),
    }
}

/// Color a service status
pub fn color_status(status: ServiceStatus) -> String {
    match status {
        ServiceStatus::Healthy => "healthy".green().to_string(),
        ServiceStatus::Starting => "starting".yellow().to_string(),
        ServiceStatus::Unhealthy => "unhealthy".red().to_string(),
    }
}

/// Mask all but the first four characters of a secret
pub fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    format!("{}{}", visible, "*".repeat(secret.chars().count().saturating_sub(4)))
}

#[derive(Tabled)]
struct TuningRow {
    #[tabled(rename = "Parameter")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "Artifact")]
    kind: String,
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Decision")]
    decision: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

#[derive(Tabled)]
struct ServiceRow {
    #[tabled(rename = "Service")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Health")]
    status: String,
}

/// Print the memory budget and the chosen split
pub fn print_plan(budget: &MemoryBudget, plan: &AllocationPlan) {
    print_heading("Memory Allocation");
    println!("Host memory:   {}", format_mb(budget.total_mb).cyan());
    println!("OS reserve:    {}", format_mb(budget.reserve_mb));
    println!("Database:      {}", format_mb(plan.db_mem_mb).cyan());
    println!("Application:   {}", format_mb(plan.app_mem_mb).cyan());
    println!("Source:        {}", color_source(plan.source));
    println!();
}

/// Print the database tuning parameters
pub fn print_tuning(tuning: &TuningParameterSet) {
    let rows: Vec<TuningRow> = tuning
        .iter()
        .map(|(name, value)| TuningRow {
            name: name.to_string(),
            value: value.to_string(),
        })
        .collect();

    print_heading("Database Tuning");
    println!("{}", Table::new(rows).with(Style::rounded()));
    println!();
}

/// Print per-artifact outcomes
pub fn print_outcomes(outcomes: &[ArtifactOutcome]) {
    let rows: Vec<OutcomeRow> = outcomes
        .iter()
        .map(|o| OutcomeRow {
            kind: o.kind.to_string(),
            path: o.path.display().to_string(),
            decision: color_decision(o.decision),
            reason: o.reason.clone(),
        })
        .collect();

    print_heading("Artifacts");
    println!("{}", Table::new(rows).with(Style::rounded()));
    println!();
}

/// Print container health
pub fn print_health(health: &OverallHealth) {
    let rows: Vec<ServiceRow> = health
        .services
        .iter()
        .map(|s| ServiceRow {
            name: s.name.clone(),
            state: s.state.clone(),
            status: color_status(s.status),
        })
        .collect();

    print_heading("Containers");
    println!("{}", Table::new(rows).with(Style::rounded()));
    println!("\nOverall: {}", color_status(health.status));
}
