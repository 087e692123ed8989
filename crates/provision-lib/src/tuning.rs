//! Database tuning synthesis
//!
//! Turns the database memory allocation into engine parameters. Each band is
//! a fixed, hand-picked point (no interpolation): `shared_buffers` sits near
//! 25% of the band's memory and `effective_cache_size` near 75%.

use crate::models::TuningParameterSet;

/// Memory-derived parameter values for one band, all in MB
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TuningBand {
    /// Band applies while `db_mem_mb < upper_bound_mb`
    pub upper_bound_mb: u64,
    pub shared_buffers_mb: u64,
    pub effective_cache_size_mb: u64,
    pub maintenance_work_mem_mb: u64,
    pub work_mem_mb: u64,
    pub wal_buffers_mb: u64,
}

pub const BANDS: [TuningBand; 5] = [
    TuningBand {
        upper_bound_mb: 512,
        shared_buffers_mb: 96,
        effective_cache_size_mb: 288,
        maintenance_work_mem_mb: 24,
        work_mem_mb: 2,
        wal_buffers_mb: 3,
    },
    TuningBand {
        upper_bound_mb: 1024,
        shared_buffers_mb: 160,
        effective_cache_size_mb: 480,
        maintenance_work_mem_mb: 40,
        work_mem_mb: 4,
        wal_buffers_mb: 5,
    },
    TuningBand {
        upper_bound_mb: 2048,
        shared_buffers_mb: 256,
        effective_cache_size_mb: 768,
        maintenance_work_mem_mb: 64,
        work_mem_mb: 6,
        wal_buffers_mb: 8,
    },
    TuningBand {
        upper_bound_mb: 4096,
        shared_buffers_mb: 512,
        effective_cache_size_mb: 1536,
        maintenance_work_mem_mb: 128,
        work_mem_mb: 10,
        wal_buffers_mb: 16,
    },
    TuningBand {
        upper_bound_mb: u64::MAX,
        shared_buffers_mb: 1024,
        effective_cache_size_mb: 3072,
        maintenance_work_mem_mb: 256,
        work_mem_mb: 16,
        wal_buffers_mb: 16,
    },
];

/// Memory-derived keys, always present and always first
pub const MEMORY_PARAMETERS: [&str; 5] = [
    "shared_buffers",
    "effective_cache_size",
    "maintenance_work_mem",
    "work_mem",
    "wal_buffers",
];

/// Memory-independent planner and write-ahead-log hints (SSD cost model, checkpoint pacing)
pub const FIXED_HINTS: [(&str, &str); 6] = [
    ("random_page_cost", "1.1"),
    ("effective_io_concurrency", "200"),
    ("checkpoint_completion_target", "0.9"),
    ("default_statistics_target", "100"),
    ("min_wal_size", "1GB"),
    ("max_wal_size", "4GB"),
];

/// Band for a database allocation
pub fn band_for(db_mem_mb: u64) -> &'static TuningBand {
    BANDS
        .iter()
        .find(|b| db_mem_mb < b.upper_bound_mb)
        .unwrap_or(&BANDS[BANDS.len() - 1])
}

/// Synthesize the complete parameter set for a database allocation
pub fn synthesize(db_mem_mb: u64) -> TuningParameterSet {
    let band = band_for(db_mem_mb);
    let mut params = TuningParameterSet::new();

    params.insert("shared_buffers", mb(band.shared_buffers_mb));
    params.insert("effective_cache_size", mb(band.effective_cache_size_mb));
    params.insert("maintenance_work_mem", mb(band.maintenance_work_mem_mb));
    params.insert("work_mem", mb(band.work_mem_mb));
    params.insert("wal_buffers", mb(band.wal_buffers_mb));

    for (name, value) in FIXED_HINTS {
        params.insert(name, value);
    }

    params
}

fn mb(value: u64) -> String {
    format!("{}MB", value)
}

/// Parse a value produced by [`synthesize`] back into megabytes
pub fn parse_megabytes(value: &str) -> Option<u64> {
    if let Some(gb) = value.strip_suffix("GB") {
        return gb.parse::<u64>().ok().map(|v| v * 1024);
    }
    value.strip_suffix("MB")?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_all_keys() {
        let params = synthesize(640);
        for key in MEMORY_PARAMETERS {
            assert!(params.get(key).is_some(), "missing {}", key);
        }
        for (key, value) in FIXED_HINTS {
            assert_eq!(params.get(key), Some(value));
        }
        assert_eq!(params.len(), MEMORY_PARAMETERS.len() + FIXED_HINTS.len());
    }

    #[test]
    fn test_memory_parameters_come_first() {
        let params = synthesize(4096);
        let names: Vec<&str> = params.iter().take(5).map(|(name, _)| name).collect();
        assert_eq!(names, MEMORY_PARAMETERS);
    }

    #[test]
    fn test_band_selection() {
        assert_eq!(synthesize(384).get("shared_buffers"), Some("96MB"));
        assert_eq!(synthesize(511).get("shared_buffers"), Some("96MB"));
        assert_eq!(synthesize(512).get("shared_buffers"), Some("160MB"));
        assert_eq!(synthesize(640).get("shared_buffers"), Some("160MB"));
        assert_eq!(synthesize(1024).get("shared_buffers"), Some("256MB"));
        assert_eq!(synthesize(2048).get("effective_cache_size"), Some("1536MB"));
        assert_eq!(synthesize(4096).get("work_mem"), Some("16MB"));
        assert_eq!(synthesize(100_000).get("shared_buffers"), Some("1024MB"));
    }

    #[test]
    fn test_monotonic_across_bands() {
        let samples = [0, 300, 511, 512, 800, 1024, 1500, 2048, 3000, 4096, 9000];

        for pair in samples.windows(2) {
            let lower = synthesize(pair[0]);
            let upper = synthesize(pair[1]);
            for key in MEMORY_PARAMETERS {
                let a = parse_megabytes(lower.get(key).unwrap()).unwrap();
                let b = parse_megabytes(upper.get(key).unwrap()).unwrap();
                assert!(a <= b, "{} decreased from {} to {} MB", key, pair[0], pair[1]);
            }
        }
    }

    #[test]
    fn test_band_ratios() {
        for band in BANDS.iter().take(4) {
            // Ratios measured against the band's upper bound
            assert!(band.shared_buffers_mb * 4 <= band.upper_bound_mb);
            assert!(band.effective_cache_size_mb <= band.upper_bound_mb * 3 / 4);
            assert_eq!(band.effective_cache_size_mb, band.shared_buffers_mb * 3);
        }
    }

    #[test]
    fn test_parse_megabytes() {
        assert_eq!(parse_megabytes("512MB"), Some(512));
        assert_eq!(parse_megabytes("4GB"), Some(4096));
        assert_eq!(parse_megabytes("0.9"), None);
    }
}
