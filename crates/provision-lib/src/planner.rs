//! Memory allocation planning
//!
//! Maps the host's available memory onto a fixed tier table, or splits an
//! operator-supplied total 40/60 between the database and the application.
//! The largest tier is a ceiling, not a proportional continuation. Existing
//! installations expect identical output for identical input.

use crate::models::{AllocationPlan, AllocationSource, MemoryBudget};
use tracing::warn;

/// Smallest operator override accepted, in MB
pub const MIN_OVERRIDE_MB: u64 = 512;

/// Database share of an override, in percent
const OVERRIDE_DB_PERCENT: u64 = 40;

/// Application share of an override, in percent
const OVERRIDE_APP_PERCENT: u64 = 60;

/// A recommended tier: applies while `available_mb < upper_bound_mb`
struct Tier {
    upper_bound_mb: u64,
    db_mem_mb: u64,
    app_mem_mb: u64,
}

/// Checked in ascending order, first match wins
const TIERS: &[Tier] = &[
    Tier { upper_bound_mb: 1024, db_mem_mb: 384, app_mem_mb: 512 },
    Tier { upper_bound_mb: 2560, db_mem_mb: 640, app_mem_mb: 896 },
    Tier { upper_bound_mb: 4096, db_mem_mb: 1024, app_mem_mb: 1536 },
    Tier { upper_bound_mb: 8192, db_mem_mb: 2048, app_mem_mb: 3072 },
];

/// Allocation once available memory reaches the last tier bound
const CEILING: Tier = Tier { upper_bound_mb: u64::MAX, db_mem_mb: 4096, app_mem_mb: 4096 };

/// Interpretation of the free-form override string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideInput {
    /// Nothing supplied (or only whitespace)
    Absent,
    Valid(u64),
    /// Supplied but unusable; carries the reason for the operator
    Rejected(String),
}

impl OverrideInput {
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return OverrideInput::Absent;
        };

        match raw.parse::<u64>() {
            Ok(mb) if mb >= MIN_OVERRIDE_MB => OverrideInput::Valid(mb),
            Ok(mb) => OverrideInput::Rejected(format!(
                "{} MB is below the {} MB minimum",
                mb, MIN_OVERRIDE_MB
            )),
            Err(_) => OverrideInput::Rejected(format!("{:?} is not a whole number of MB", raw)),
        }
    }
}

/// Recommended tier for the available memory, ignoring any override
pub fn recommended(budget: &MemoryBudget) -> AllocationPlan {
    let tier = TIERS
        .iter()
        .find(|t| budget.available_mb < t.upper_bound_mb)
        .unwrap_or(&CEILING);

    AllocationPlan {
        db_mem_mb: tier.db_mem_mb,
        app_mem_mb: tier.app_mem_mb,
        source: AllocationSource::Recommended,
    }
}

/// `floor(mb * percent / 100)` without overflowing on absurd overrides
fn percent_of(mb: u64, percent: u64) -> u64 {
    mb / 100 * percent + mb % 100 * percent / 100
}

/// Split an accepted override 40/60 with floor rounding
pub fn split_override(override_mb: u64) -> AllocationPlan {
    AllocationPlan {
        db_mem_mb: percent_of(override_mb, OVERRIDE_DB_PERCENT),
        app_mem_mb: percent_of(override_mb, OVERRIDE_APP_PERCENT),
        source: AllocationSource::CustomOverride,
    }
}

/// Produce the allocation plan for a run
///
/// An invalid override never aborts the run: it is logged and the
/// recommended tier is used with [`AllocationSource::Fallback`].
pub fn plan(total_mb: u64, override_raw: Option<&str>) -> AllocationPlan {
    let budget = MemoryBudget::from_total(total_mb);
    match OverrideInput::parse(override_raw) {
        OverrideInput::Absent => recommended(&budget),
        OverrideInput::Valid(mb) => split_override(mb),
        OverrideInput::Rejected(reason) => {
            warn!(
                event = "override_rejected",
                reason = %reason,
                "Ignoring memory override, using recommended allocation"
            );
            AllocationPlan {
                source: AllocationSource::Fallback,
                ..recommended(&budget)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_gigabyte_host() {
        assert_eq!(MemoryBudget::from_total(2048).available_mb, 1536);

        let p = plan(2048, None);
        assert_eq!((p.db_mem_mb, p.app_mem_mb), (640, 896));
        assert_eq!(p.source, AllocationSource::Recommended);
    }

    #[test]
    fn test_large_host_hits_ceiling() {
        let p = plan(16384, None);
        assert_eq!((p.db_mem_mb, p.app_mem_mb), (4096, 4096));

        let huge = plan(512 * 1024, None);
        assert_eq!((huge.db_mem_mb, huge.app_mem_mb), (4096, 4096));
    }

    #[test]
    fn test_tier_boundaries() {
        // available = total - 512
        let cases = [
            (512, (384, 512)),
            (512 + 1023, (384, 512)),
            (512 + 1024, (640, 896)),
            (512 + 2559, (640, 896)),
            (512 + 2560, (1024, 1536)),
            (512 + 4095, (1024, 1536)),
            (512 + 4096, (2048, 3072)),
            (512 + 8191, (2048, 3072)),
            (512 + 8192, (4096, 4096)),
        ];

        for (total, expected) in cases {
            let p = plan(total, None);
            assert_eq!((p.db_mem_mb, p.app_mem_mb), expected, "total_mb = {}", total);
        }
    }

    #[test]
    fn test_tiny_host_still_positive() {
        let p = plan(0, None);
        assert_eq!((p.db_mem_mb, p.app_mem_mb), (384, 512));
    }

    #[test]
    fn test_all_totals_yield_positive_allocations() {
        for total in (512..40_000).step_by(97) {
            let p = plan(total, None);
            assert!(p.db_mem_mb > 0 && p.app_mem_mb > 0, "total_mb = {}", total);
        }
    }

    #[test]
    fn test_override_split() {
        let p = plan(16384, Some("2000"));
        assert_eq!((p.db_mem_mb, p.app_mem_mb), (800, 1200));
        assert_eq!(p.source, AllocationSource::CustomOverride);
    }

    #[test]
    fn test_override_split_floors_and_never_exceeds_total() {
        for o in (512..20_000).step_by(13) {
            let p = split_override(o);
            assert_eq!(p.db_mem_mb, o * 40 / 100);
            assert_eq!(p.app_mem_mb, o * 60 / 100);
            assert!(p.total_mb() <= o);
            assert!(p.db_mem_mb > 0 && p.app_mem_mb > 0);
        }

        let odd = split_override(1001);
        assert_eq!((odd.db_mem_mb, odd.app_mem_mb), (400, 600));

        let huge = split_override(u64::MAX);
        assert!(huge.db_mem_mb < huge.app_mem_mb);
    }

    #[test]
    fn test_non_numeric_override_falls_back() {
        let p = plan(2048, Some("abc"));
        assert_eq!((p.db_mem_mb, p.app_mem_mb), (640, 896));
        assert_eq!(p.source, AllocationSource::Fallback);
    }

    #[test]
    fn test_small_override_falls_back() {
        let p = plan(16384, Some("511"));
        assert_eq!((p.db_mem_mb, p.app_mem_mb), (4096, 4096));
        assert_eq!(p.source, AllocationSource::Fallback);

        let minimum = plan(16384, Some("512"));
        assert_eq!(minimum.source, AllocationSource::CustomOverride);
        assert_eq!((minimum.db_mem_mb, minimum.app_mem_mb), (204, 307));
    }

    #[test]
    fn test_override_parsing() {
        assert_eq!(OverrideInput::parse(None), OverrideInput::Absent);
        assert_eq!(OverrideInput::parse(Some("   ")), OverrideInput::Absent);
        assert_eq!(OverrideInput::parse(Some(" 4096 ")), OverrideInput::Valid(4096));
        assert!(matches!(OverrideInput::parse(Some("-1")), OverrideInput::Rejected(_)));
        assert!(matches!(OverrideInput::parse(Some("2.5")), OverrideInput::Rejected(_)));
        assert!(matches!(OverrideInput::parse(Some("100")), OverrideInput::Rejected(_)));
    }
}
