//! `/proc/meminfo` reader

use super::MemoryProbe;
use crate::error::{ProvisionError, Result};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

/// Reads `MemTotal` from the procfs meminfo file
pub struct ProcMeminfoProbe {
    proc_path: PathBuf,
}

impl ProcMeminfoProbe {
    pub fn new(proc_path: impl Into<PathBuf>) -> Self {
        Self {
            proc_path: proc_path.into(),
        }
    }

    fn meminfo_path(&self) -> PathBuf {
        self.proc_path.join("meminfo")
    }

    /// Parse meminfo contents into a map of field name to kilobytes
    ///
    /// Lines look like `MemTotal:       16318412 kB`; fields without a
    /// numeric value are ignored.
    pub fn parse_meminfo(content: &str) -> HashMap<String, u64> {
        let mut fields = HashMap::new();

        for line in content.lines() {
            let Some((name, rest)) = line.split_once(':') else {
                continue;
            };
            if let Some(value) = rest.split_whitespace().next() {
                if let Ok(kb) = value.parse::<u64>() {
                    fields.insert(name.trim().to_string(), kb);
                }
            }
        }

        fields
    }
}

impl MemoryProbe for ProcMeminfoProbe {
    fn total_mb(&self) -> Result<u64> {
        let path = self.meminfo_path();
        let content = fs::read_to_string(&path).map_err(|e| ProvisionError::MemoryProbe {
            source_path: path.clone(),
            reason: e.to_string(),
        })?;

        let fields = Self::parse_meminfo(&content);
        match fields.get("MemTotal") {
            Some(kb) => Ok(kb / 1024),
            None => Err(ProvisionError::MemoryProbe {
                source_path: path,
                reason: "MemTotal field missing".to_string(),
            }),
        }
    }

    fn source(&self) -> String {
        self.meminfo_path().display().to_string()
    }
}
