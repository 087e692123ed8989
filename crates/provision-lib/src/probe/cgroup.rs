//! cgroup memory limit awareness
//!
//! Containers and systemd slices can cap memory well below what the host
//! reports. When enabled, the smaller of the two wins.

use super::MemoryProbe;
use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// v1 reports "unlimited" as a page-aligned value near i64::MAX
const V1_UNLIMITED_THRESHOLD: u64 = 1 << 60;

/// cgroup hierarchy version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CgroupVersion {
    V1,
    V2,
    Unknown,
}

/// Detect which cgroup hierarchy is mounted at `cgroup_root`
pub fn detect_cgroup_version(cgroup_root: &Path) -> CgroupVersion {
    if cgroup_root.join("cgroup.controllers").exists() {
        CgroupVersion::V2
    } else if cgroup_root.join("memory").is_dir() {
        CgroupVersion::V1
    } else {
        CgroupVersion::Unknown
    }
}

/// Read the memory limit in bytes, `None` when unlimited or unreadable
pub fn read_memory_limit_bytes(cgroup_root: &Path) -> Option<u64> {
    let (path, version) = match detect_cgroup_version(cgroup_root) {
        CgroupVersion::V2 => (cgroup_root.join("memory.max"), CgroupVersion::V2),
        CgroupVersion::V1 => (
            cgroup_root.join("memory").join("memory.limit_in_bytes"),
            CgroupVersion::V1,
        ),
        CgroupVersion::Unknown => return None,
    };

    let content = fs::read_to_string(&path).ok()?;
    let value = content.trim();
    if value == "max" {
        return None;
    }

    let bytes: u64 = value.parse().ok()?;
    if version == CgroupVersion::V1 && bytes >= V1_UNLIMITED_THRESHOLD {
        return None;
    }
    Some(bytes)
}

/// Wraps another probe and clamps its answer to the cgroup memory limit
pub struct CgroupLimitProbe<P> {
    inner: P,
    cgroup_root: PathBuf,
}

impl<P: MemoryProbe> CgroupLimitProbe<P> {
    pub fn new(inner: P, cgroup_root: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            cgroup_root: cgroup_root.into(),
        }
    }
}

impl<P: MemoryProbe> MemoryProbe for CgroupLimitProbe<P> {
    fn total_mb(&self) -> Result<u64> {
        let host_mb = self.inner.total_mb()?;

        match read_memory_limit_bytes(&self.cgroup_root) {
            Some(limit_bytes) => {
                let limit_mb = limit_bytes / (1024 * 1024);
                if limit_mb < host_mb {
                    tracing::info!(host_mb, limit_mb, "cgroup memory limit is below host memory");
                }
                Ok(host_mb.min(limit_mb))
            }
            None => Ok(host_mb),
        }
    }

    fn source(&self) -> String {
        format!(
            "{} (capped by cgroup at {})",
            self.inner.source(),
            self.cgroup_root.display()
        )
    }
}
