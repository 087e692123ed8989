//! Database tuning fragment

use crate::models::TuningParameterSet;

/// Render the tuning parameters as a `key = value` include file
///
/// Output depends only on its inputs so re-runs are byte-identical.
pub fn render(db_mem_mb: u64, tuning: &TuningParameterSet) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "# Database tuning for a {} MB allocation, generated by provision.\n",
        db_mem_mb
    ));
    out.push_str("# Regenerated on every run; keep manual changes in a separate include.\n");
    for (name, value) in tuning.iter() {
        out.push_str(&format!("{} = {}\n", name, value));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::synthesize;

    #[test]
    fn test_render_lists_every_parameter() {
        let tuning = synthesize(640);
        let content = render(640, &tuning);

        assert!(content.contains("shared_buffers = 160MB\n"));
        assert!(content.contains("random_page_cost = 1.1\n"));
        let settings = content.lines().filter(|l| !l.starts_with('#')).count();
        assert_eq!(settings, tuning.len());
    }

    #[test]
    fn test_render_is_deterministic() {
        let tuning = synthesize(2048);
        assert_eq!(render(2048, &tuning), render(2048, &tuning));
    }
}
