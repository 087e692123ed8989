//! Core data models for the provisioner

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Memory reserved for the operating system before anything is allocated
pub const OS_RESERVE_MB: u64 = 512;

/// Host memory measured once per run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryBudget {
    pub total_mb: u64,
    pub reserve_mb: u64,
    pub available_mb: u64,
}

impl MemoryBudget {
    pub fn from_total(total_mb: u64) -> Self {
        Self {
            total_mb,
            reserve_mb: OS_RESERVE_MB,
            available_mb: total_mb.saturating_sub(OS_RESERVE_MB),
        }
    }
}

/// Where an allocation plan came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationSource {
    /// Tier table selected from available memory
    Recommended,
    /// Operator-supplied total split 40/60
    CustomOverride,
    /// Operator override was rejected and the recommended tier substituted
    Fallback,
}

impl fmt::Display for AllocationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AllocationSource::Recommended => "recommended",
            AllocationSource::CustomOverride => "custom override",
            AllocationSource::Fallback => "fallback",
        };
        f.write_str(s)
    }
}

/// Memory split between the database and the application container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub db_mem_mb: u64,
    pub app_mem_mb: u64,
    pub source: AllocationSource,
}

impl AllocationPlan {
    pub fn total_mb(&self) -> u64 {
        self.db_mem_mb + self.app_mem_mb
    }
}

/// A single database tuning parameter with its unit-suffixed value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TuningParameter {
    pub name: String,
    pub value: String,
}

/// Ordered database tuning parameters
///
/// Insertion order is preserved so the rendered fragment is byte-stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TuningParameterSet {
    parameters: Vec<TuningParameter>,
}

impl TuningParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a parameter, keeping its original position on replace
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.parameters.iter_mut().find(|p| p.name == name) {
            Some(existing) => existing.value = value,
            None => self.parameters.push(TuningParameter { name, value }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parameters
            .iter()
            .map(|p| (p.name.as_str(), p.value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

/// The generated files a run is responsible for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    EnvFile,
    DatabaseTuning,
    ResourceLimits,
    ReverseProxy,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::EnvFile => "env",
            ArtifactKind::DatabaseTuning => "database tuning",
            ArtifactKind::ResourceLimits => "resource limits",
            ArtifactKind::ReverseProxy => "reverse proxy",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully rendered file ready to be persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedArtifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub content: Vec<u8>,
    /// Unix permission bits applied after writing
    pub mode: u32,
}

/// What the safe-write guard decided for one target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteDecision {
    Write,
    SkipExisting,
    SkipCustomized,
}

impl fmt::Display for WriteDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WriteDecision::Write => "written",
            WriteDecision::SkipExisting => "kept existing",
            WriteDecision::SkipCustomized => "kept customized",
        };
        f.write_str(s)
    }
}

/// Result of handling one artifact, with the reason shown to the operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactOutcome {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub decision: WriteDecision,
    pub reason: String,
}

/// Everything one generator run computed and decided
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    pub budget: MemoryBudget,
    pub plan: AllocationPlan,
    pub tuning: TuningParameterSet,
    pub outcomes: Vec<ArtifactOutcome>,
    /// Database credential, freshly generated or read back from the env file
    #[serde(skip_serializing)]
    pub credential: Option<String>,
    /// Fragment the operator must merge by hand when a customized proxy file was kept
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_merge_fragment: Option<String>,
    /// Set when the proxy was skipped because no domain was supplied
    pub proxy_skipped: bool,
    pub generated_at: i64,
}

impl GenerationReport {
    pub fn outcome(&self, kind: ArtifactKind) -> Option<&ArtifactOutcome> {
        self.outcomes.iter().find(|o| o.kind == kind)
    }

    /// True when a fresh reverse-proxy fragment landed and follow-up work is due
    pub fn proxy_written(&self) -> bool {
        self.outcome(ArtifactKind::ReverseProxy)
            .map(|o| o.decision == WriteDecision::Write)
            .unwrap_or(false)
    }
}
