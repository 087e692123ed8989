//! Structured event logging for provisioning runs
//!
//! Every decision the generator makes is reported as a named event with
//! structured fields, so a JSON log of a run reads as an audit trail.

use crate::models::{AllocationPlan, ArtifactOutcome, MemoryBudget, TuningParameterSet, WriteDecision};
use tracing::{info, warn};

/// Structured logger for provisioning events
#[derive(Debug, Clone)]
pub struct ProvisionLogger {
    host: String,
}

impl ProvisionLogger {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    /// Logger labelled with the local hostname, if it can be read
    pub fn for_local_host() -> Self {
        let host = std::fs::read_to_string("/etc/hostname")
            .map(|h| h.trim().to_string())
            .ok()
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| "localhost".to_string());
        Self::new(host)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Log the start of a run
    pub fn log_run_started(&self, version: &str, install_dir: &str) {
        info!(
            event = "run_started",
            host = %self.host,
            version = %version,
            install_dir = %install_dir,
            "Provisioning run started"
        );
    }

    /// Log the measured memory budget
    pub fn log_memory_probed(&self, budget: &MemoryBudget, source: &str) {
        info!(
            event = "memory_probed",
            host = %self.host,
            source = %source,
            total_mb = budget.total_mb,
            reserve_mb = budget.reserve_mb,
            available_mb = budget.available_mb,
            "Measured host memory"
        );
    }

    /// Log the chosen allocation plan
    pub fn log_plan_computed(&self, plan: &AllocationPlan) {
        info!(
            event = "plan_computed",
            host = %self.host,
            db_mem_mb = plan.db_mem_mb,
            app_mem_mb = plan.app_mem_mb,
            source = %plan.source,
            "Computed allocation plan"
        );
    }

    /// Log the synthesized database tuning
    pub fn log_tuning_synthesized(&self, db_mem_mb: u64, tuning: &TuningParameterSet) {
        info!(
            event = "tuning_synthesized",
            host = %self.host,
            db_mem_mb = db_mem_mb,
            shared_buffers = tuning.get("shared_buffers").unwrap_or_default(),
            effective_cache_size = tuning.get("effective_cache_size").unwrap_or_default(),
            parameters = tuning.len(),
            "Synthesized database tuning"
        );
    }

    /// Log a per-artifact decision with its reason
    pub fn log_artifact(&self, outcome: &ArtifactOutcome) {
        let path = outcome.path.display().to_string();
        match outcome.decision {
            WriteDecision::Write => {
                info!(
                    event = "artifact_written",
                    host = %self.host,
                    artifact = %outcome.kind,
                    path = %path,
                    reason = %outcome.reason,
                    "Wrote artifact"
                );
            }
            WriteDecision::SkipExisting => {
                info!(
                    event = "artifact_skipped",
                    host = %self.host,
                    artifact = %outcome.kind,
                    path = %path,
                    decision = "skip_existing",
                    reason = %outcome.reason,
                    "Kept existing artifact"
                );
            }
            WriteDecision::SkipCustomized => {
                warn!(
                    event = "artifact_skipped",
                    host = %self.host,
                    artifact = %outcome.kind,
                    path = %path,
                    decision = "skip_customized",
                    reason = %outcome.reason,
                    "Kept customized artifact; merge the suggested fragment manually"
                );
            }
        }
    }

    /// Log that no reverse-proxy domain was supplied
    pub fn log_proxy_skipped(&self) {
        warn!(
            event = "proxy_skipped",
            host = %self.host,
            "No domain supplied, skipping reverse-proxy configuration"
        );
    }

    /// Log the end of a run
    pub fn log_run_finished(&self, written: usize, skipped: usize) {
        info!(
            event = "run_finished",
            host = %self.host,
            written = written,
            skipped = skipped,
            "Provisioning run finished"
        );
    }

    /// Log a collaborator step (package install, checkout, firewall, ...)
    pub fn log_step(&self, step: &str, detail: &str, success: bool) {
        if success {
            info!(
                event = "step_completed",
                host = %self.host,
                step = %step,
                detail = %detail,
                "Step completed"
            );
        } else {
            warn!(
                event = "step_failed",
                host = %self.host,
                step = %step,
                detail = %detail,
                "Step failed"
            );
        }
    }
}
