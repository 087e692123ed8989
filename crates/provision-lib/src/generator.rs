//! Resource-aware configuration generator
//!
//! One batch pass: preflight, probe, plan, synthesize, then render and guard
//! each artifact in turn. Recoverable conditions become decisions in the
//! report; only bad input, measurement and write failures escalate, and bad
//! input is rejected before any artifact is written.

use crate::error::Result;
use crate::guard;
use crate::models::{
    AllocationPlan, ArtifactKind, ArtifactOutcome, GenerationReport, MemoryBudget,
    RenderedArtifact, TuningParameterSet, WriteDecision,
};
use crate::observability::ProvisionLogger;
use crate::planner;
use crate::probe::MemoryProbe;
use crate::render::{self, database, env, limits, proxy, RenderSettings};
use crate::tuning;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Where each artifact lands
#[derive(Debug, Clone)]
pub struct TargetPaths {
    pub env_file: PathBuf,
    pub tuning_file: PathBuf,
    pub limits_file: PathBuf,
    pub proxy_file: PathBuf,
}

impl TargetPaths {
    /// Standard layout below an install directory
    pub fn under(install_dir: &Path, proxy_file: impl Into<PathBuf>) -> Self {
        Self {
            env_file: install_dir.join(".env"),
            tuning_file: install_dir.join("config").join("postgresql.tuning.conf"),
            limits_file: install_dir.join("docker-compose.resources.yml"),
            proxy_file: proxy_file.into(),
        }
    }
}

/// Operator inputs for one run
#[derive(Debug, Clone)]
pub struct GeneratorInputs {
    /// Free-form memory override in MB; invalid values fall back to the recommended plan
    pub memory_override: Option<String>,
    /// Routing domain; empty or absent skips the reverse proxy
    pub domain: Option<String>,
    pub settings: RenderSettings,
    pub paths: TargetPaths,
}

/// Sizing without rendering, for previews
#[derive(Debug, Clone, serde::Serialize)]
pub struct Sizing {
    pub budget: MemoryBudget,
    pub plan: AllocationPlan,
    pub tuning: TuningParameterSet,
}

/// Runs the configuration pass against a memory probe
pub struct ConfigGenerator {
    probe: Box<dyn MemoryProbe>,
    logger: ProvisionLogger,
}

impl ConfigGenerator {
    pub fn new(probe: Box<dyn MemoryProbe>, logger: ProvisionLogger) -> Self {
        Self { probe, logger }
    }

    /// Probe, plan and synthesize without touching any file
    pub fn size(&self, memory_override: Option<&str>) -> Result<Sizing> {
        let total_mb = self.probe.total_mb()?;
        let budget = MemoryBudget::from_total(total_mb);
        self.logger.log_memory_probed(&budget, &self.probe.source());

        let plan = planner::plan(total_mb, memory_override);
        self.logger.log_plan_computed(&plan);

        let tuning = tuning::synthesize(plan.db_mem_mb);
        self.logger.log_tuning_synthesized(plan.db_mem_mb, &tuning);

        Ok(Sizing {
            budget,
            plan,
            tuning,
        })
    }

    /// Execute the full configuration pass
    pub fn run(&self, inputs: &GeneratorInputs) -> Result<GenerationReport> {
        let domain = proxy::normalize_domain(inputs.domain.as_deref());
        if let Some(domain) = &domain {
            proxy::validate_domain(domain)?;
        }
        Self::preflight(&inputs.paths, domain.is_some())?;

        let Sizing {
            budget,
            plan,
            tuning,
        } = self.size(inputs.memory_override.as_deref())?;

        let generated_at = chrono::Utc::now();
        let mut outcomes = Vec::with_capacity(4);

        let (env_outcome, credential) = self.apply_env(inputs, &generated_at.to_rfc3339())?;
        outcomes.push(env_outcome);

        outcomes.push(self.apply_derived(RenderedArtifact {
            kind: ArtifactKind::DatabaseTuning,
            path: inputs.paths.tuning_file.clone(),
            content: database::render(plan.db_mem_mb, &tuning).into_bytes(),
            mode: render::PUBLIC_MODE,
        })?);

        outcomes.push(self.apply_derived(RenderedArtifact {
            kind: ArtifactKind::ResourceLimits,
            path: inputs.paths.limits_file.clone(),
            content: limits::render(&inputs.settings, &plan)?.into_bytes(),
            mode: render::PUBLIC_MODE,
        })?);

        let proxy_skipped = domain.is_none();
        let mut proxy_merge_fragment = None;
        match domain {
            Some(domain) => {
                let (outcome, fragment) = self.apply_proxy(inputs, &domain)?;
                outcomes.push(outcome);
                proxy_merge_fragment = fragment;
            }
            None => self.logger.log_proxy_skipped(),
        }

        let written = outcomes
            .iter()
            .filter(|o| o.decision == WriteDecision::Write)
            .count();
        self.logger.log_run_finished(written, outcomes.len() - written);

        Ok(GenerationReport {
            budget,
            plan,
            tuning,
            outcomes,
            credential,
            proxy_merge_fragment,
            proxy_skipped,
            generated_at: generated_at.timestamp(),
        })
    }

    /// Fail before any artifact is written if a target directory is unusable
    fn preflight(paths: &TargetPaths, with_proxy: bool) -> Result<()> {
        let mut targets = vec![&paths.env_file, &paths.tuning_file, &paths.limits_file];
        if with_proxy {
            targets.push(&paths.proxy_file);
        }

        for target in targets {
            if let Some(dir) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
                guard::ensure_writable_dir(dir)?;
            }
        }
        Ok(())
    }

    /// Env fragment: generated once, never replaced
    fn apply_env(
        &self,
        inputs: &GeneratorInputs,
        generated_at: &str,
    ) -> Result<(ArtifactOutcome, Option<String>)> {
        let path = &inputs.paths.env_file;

        let (outcome, credential) = match guard::decide_once(path) {
            WriteDecision::Write => {
                let credential = env::generate_credential();
                guard::write_artifact(&RenderedArtifact {
                    kind: ArtifactKind::EnvFile,
                    path: path.clone(),
                    content: env::render(&inputs.settings, &credential, generated_at).into_bytes(),
                    mode: render::SECRET_MODE,
                })?;

                let outcome = ArtifactOutcome {
                    kind: ArtifactKind::EnvFile,
                    path: path.clone(),
                    decision: WriteDecision::Write,
                    reason: "generated a new database credential".to_string(),
                };
                (outcome, Some(credential))
            }
            decision => {
                let existing = guard::read_existing(path)?.unwrap_or_default();
                let credential = env::read_credential(&existing);
                let reason = if credential.is_some() {
                    "already present; reusing its credential".to_string()
                } else {
                    warn!(
                        path = %path.display(),
                        key = env::CREDENTIAL_KEY,
                        "Existing env file has no credential; leaving it untouched"
                    );
                    format!("already present but has no {}; left untouched", env::CREDENTIAL_KEY)
                };

                let outcome = ArtifactOutcome {
                    kind: ArtifactKind::EnvFile,
                    path: path.clone(),
                    decision,
                    reason,
                };
                (outcome, credential)
            }
        };

        self.logger.log_artifact(&outcome);
        Ok((outcome, credential))
    }

    /// Derived artifacts are owned by the generator and always rewritten
    fn apply_derived(&self, artifact: RenderedArtifact) -> Result<ArtifactOutcome> {
        guard::write_artifact(&artifact)?;

        let outcome = ArtifactOutcome {
            kind: artifact.kind,
            path: artifact.path,
            decision: WriteDecision::Write,
            reason: "derived from the current plan".to_string(),
        };
        self.logger.log_artifact(&outcome);
        Ok(outcome)
    }

    /// Reverse-proxy fragment: written unless the existing file looks hand-edited
    fn apply_proxy(
        &self,
        inputs: &GeneratorInputs,
        domain: &str,
    ) -> Result<(ArtifactOutcome, Option<String>)> {
        let path = &inputs.paths.proxy_file;
        let content = proxy::render(&inputs.settings, domain)?;
        let existing = guard::read_existing(path)?;

        let (decision, reason, fragment) = match guard::decide_overwrite(existing.as_deref()) {
            WriteDecision::SkipCustomized => (
                WriteDecision::SkipCustomized,
                format!(
                    "has more than {} lines and no placeholder markers; merge the suggested block manually",
                    guard::CUSTOMIZED_MIN_LINES
                ),
                Some(content),
            ),
            _ => {
                let reason = match existing {
                    Some(_) => format!("replaced placeholder config with a site block for {}", domain),
                    None => format!("created a site block for {}", domain),
                };
                guard::write_artifact(&RenderedArtifact {
                    kind: ArtifactKind::ReverseProxy,
                    path: path.clone(),
                    content: content.into_bytes(),
                    mode: render::PUBLIC_MODE,
                })?;
                (WriteDecision::Write, reason, None)
            }
        };

        let outcome = ArtifactOutcome {
            kind: ArtifactKind::ReverseProxy,
            path: path.clone(),
            decision,
            reason,
        };
        self.logger.log_artifact(&outcome);
        Ok((outcome, fragment))
    }
}

#[cfg(test)]
mod tests;
