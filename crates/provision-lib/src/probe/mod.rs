//! Host memory measurement
//!
//! The probe answers one question: how many megabytes of memory does this
//! host have. The default source is `/proc/meminfo`; when the installer runs
//! inside a memory-limited cgroup the limit can be honored as well.

mod cgroup;
mod meminfo;


pub use cgroup::{detect_cgroup_version, read_memory_limit_bytes, CgroupLimitProbe, CgroupVersion};
pub use meminfo::ProcMeminfoProbe;

use crate::error::Result;
use std::path::PathBuf;

/// Trait for host memory measurement implementations
pub trait MemoryProbe: Send + Sync {
    /// Total memory of the host in megabytes
    fn total_mb(&self) -> Result<u64>;

    /// Short human-readable description of the source, used in logs
    fn source(&self) -> String;
}

/// Reports an operator-supplied total instead of measuring
#[derive(Debug, Clone, Copy)]
pub struct FixedMemoryProbe {
    total_mb: u64,
}

impl FixedMemoryProbe {
    pub fn new(total_mb: u64) -> Self {
        Self { total_mb }
    }
}

impl MemoryProbe for FixedMemoryProbe {
    fn total_mb(&self) -> Result<u64> {
        Ok(self.total_mb)
    }

    fn source(&self) -> String {
        "operator supplied".to_string()
    }
}

/// Probe selection knobs
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub proc_path: PathBuf,
    pub cgroup_root: PathBuf,
    pub respect_cgroup_limit: bool,
    /// Skip measurement and use this total
    pub fixed_total_mb: Option<u64>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            proc_path: PathBuf::from("/proc"),
            cgroup_root: PathBuf::from("/sys/fs/cgroup"),
            respect_cgroup_limit: false,
            fixed_total_mb: None,
        }
    }
}

/// Create the probe matching the configuration
pub fn create_probe(config: &ProbeConfig) -> Box<dyn MemoryProbe> {
    if let Some(total_mb) = config.fixed_total_mb {
        tracing::info!(total_mb, "Using operator-supplied memory total");
        return Box::new(FixedMemoryProbe::new(total_mb));
    }

    let meminfo = ProcMeminfoProbe::new(&config.proc_path);
    if config.respect_cgroup_limit {
        Box::new(CgroupLimitProbe::new(meminfo, &config.cgroup_root))
    } else {
        Box::new(meminfo)
    }
}
