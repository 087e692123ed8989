//! End-to-end generator tests against a scratch install directory

use super::*;
use crate::error::ProvisionError;
use crate::models::AllocationSource;
use crate::probe::{FixedMemoryProbe, ProcMeminfoProbe};
use std::fs;
use tempfile::TempDir;

fn generator(total_mb: u64) -> ConfigGenerator {
    ConfigGenerator::new(
        Box::new(FixedMemoryProbe::new(total_mb)),
        ProvisionLogger::new("test-host"),
    )
}

fn inputs(temp_dir: &TempDir, domain: Option<&str>) -> GeneratorInputs {
    let install_dir = temp_dir.path().join("app");
    GeneratorInputs {
        memory_override: None,
        domain: domain.map(str::to_string),
        settings: RenderSettings {
            proxy_log_dir: temp_dir.path().join("log"),
            ..Default::default()
        },
        paths: TargetPaths::under(&install_dir, temp_dir.path().join("caddy").join("Caddyfile")),
    }
}

#[test]
fn test_fresh_run_writes_all_artifacts() {
    let temp_dir = TempDir::new().unwrap();
    let inputs = inputs(&temp_dir, Some("shop.acme.io"));

    let report = generator(2048).run(&inputs).unwrap();

    assert_eq!(report.budget.available_mb, 1536);
    assert_eq!((report.plan.db_mem_mb, report.plan.app_mem_mb), (640, 896));
    assert_eq!(report.outcomes.len(), 4);
    assert!(report
        .outcomes
        .iter()
        .all(|o| o.decision == WriteDecision::Write));
    assert!(report.proxy_written());
    assert!(!report.proxy_skipped);

    let credential = report.credential.clone().unwrap();
    let env_content = fs::read_to_string(&inputs.paths.env_file).unwrap();
    assert!(env_content.contains(&format!("POSTGRES_PASSWORD={}", credential)));

    let tuning = fs::read_to_string(&inputs.paths.tuning_file).unwrap();
    assert!(tuning.contains("shared_buffers = 160MB"));

    let limits = fs::read_to_string(&inputs.paths.limits_file).unwrap();
    assert!(limits.contains("memory: 640M"));
    assert!(limits.contains("memory: 896M"));

    let proxy = fs::read_to_string(&inputs.paths.proxy_file).unwrap();
    assert!(proxy.contains("reverse_proxy localhost:3000"));
}

#[cfg(unix)]
#[test]
fn test_env_file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let inputs = inputs(&temp_dir, None);
    generator(4096).run(&inputs).unwrap();

    let mode = fs::metadata(&inputs.paths.env_file)
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn test_rerun_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let inputs = inputs(&temp_dir, Some("shop.acme.io"));
    let generator = generator(16384);

    let first = generator.run(&inputs).unwrap();
    let env_first = fs::read(&inputs.paths.env_file).unwrap();
    let tuning_first = fs::read(&inputs.paths.tuning_file).unwrap();
    let limits_first = fs::read(&inputs.paths.limits_file).unwrap();

    let second = generator.run(&inputs).unwrap();

    assert_eq!(first.credential, second.credential);
    assert_eq!(env_first, fs::read(&inputs.paths.env_file).unwrap());
    assert_eq!(tuning_first, fs::read(&inputs.paths.tuning_file).unwrap());
    assert_eq!(limits_first, fs::read(&inputs.paths.limits_file).unwrap());

    let env_outcome = second.outcome(ArtifactKind::EnvFile).unwrap();
    assert_eq!(env_outcome.decision, WriteDecision::SkipExisting);

    // Our own site block mentions localhost, so it is rewritten rather than preserved
    let proxy_outcome = second.outcome(ArtifactKind::ReverseProxy).unwrap();
    assert_eq!(proxy_outcome.decision, WriteDecision::Write);
}

#[test]
fn test_empty_domain_leaves_proxy_untouched() {
    let temp_dir = TempDir::new().unwrap();
    let inputs = inputs(&temp_dir, Some(""));

    let report = generator(2048).run(&inputs).unwrap();

    assert!(report.proxy_skipped);
    assert!(report.outcome(ArtifactKind::ReverseProxy).is_none());
    assert!(!report.proxy_written());
    assert!(!inputs.paths.proxy_file.exists());
    assert!(!inputs.paths.proxy_file.parent().unwrap().exists());
}

#[test]
fn test_customized_proxy_file_is_preserved() {
    let temp_dir = TempDir::new().unwrap();
    let inputs = inputs(&temp_dir, Some("shop.acme.io"));

    let custom: String = (0..10)
        .map(|i| format!("shop.internal:{} reverse_proxy 10.0.0.{}:8080\n", 9000 + i, i))
        .collect();
    fs::create_dir_all(inputs.paths.proxy_file.parent().unwrap()).unwrap();
    fs::write(&inputs.paths.proxy_file, &custom).unwrap();

    let report = generator(2048).run(&inputs).unwrap();

    let outcome = report.outcome(ArtifactKind::ReverseProxy).unwrap();
    assert_eq!(outcome.decision, WriteDecision::SkipCustomized);
    assert!(!report.proxy_written());
    assert_eq!(fs::read_to_string(&inputs.paths.proxy_file).unwrap(), custom);

    let fragment = report.proxy_merge_fragment.unwrap();
    assert!(fragment.contains("shop.acme.io {"));
}

#[test]
fn test_placeholder_proxy_file_is_replaced() {
    let temp_dir = TempDir::new().unwrap();
    let inputs = inputs(&temp_dir, Some("shop.acme.io"));

    let stock = "# default site\n#\n#\n#\n:80 {\n\troot * /usr/share/caddy\n\tfile_server\n}\n";
    fs::create_dir_all(inputs.paths.proxy_file.parent().unwrap()).unwrap();
    fs::write(&inputs.paths.proxy_file, stock).unwrap();

    let report = generator(2048).run(&inputs).unwrap();

    assert!(report.proxy_written());
    let written = fs::read_to_string(&inputs.paths.proxy_file).unwrap();
    assert!(written.contains("shop.acme.io {"));
}

#[test]
fn test_existing_env_credential_is_reused() {
    let temp_dir = TempDir::new().unwrap();
    let inputs = inputs(&temp_dir, None);

    fs::create_dir_all(inputs.paths.env_file.parent().unwrap()).unwrap();
    fs::write(&inputs.paths.env_file, "POSTGRES_PASSWORD=handpicked\nAPP_PORT=9999\n").unwrap();

    let report = generator(2048).run(&inputs).unwrap();

    assert_eq!(report.credential.as_deref(), Some("handpicked"));
    assert_eq!(
        fs::read_to_string(&inputs.paths.env_file).unwrap(),
        "POSTGRES_PASSWORD=handpicked\nAPP_PORT=9999\n"
    );
}

#[test]
fn test_invalid_override_falls_back() {
    let temp_dir = TempDir::new().unwrap();
    let mut inputs = inputs(&temp_dir, None);
    inputs.memory_override = Some("abc".to_string());

    let report = generator(2048).run(&inputs).unwrap();

    assert_eq!(report.plan.source, AllocationSource::Fallback);
    assert_eq!((report.plan.db_mem_mb, report.plan.app_mem_mb), (640, 896));
}

#[test]
fn test_override_drives_limits_and_tuning() {
    let temp_dir = TempDir::new().unwrap();
    let mut inputs = inputs(&temp_dir, None);
    inputs.memory_override = Some("2000".to_string());

    let report = generator(16384).run(&inputs).unwrap();

    assert_eq!((report.plan.db_mem_mb, report.plan.app_mem_mb), (800, 1200));
    let limits = fs::read_to_string(&inputs.paths.limits_file).unwrap();
    assert!(limits.contains("memory: 800M"));
    assert!(limits.contains("memory: 1200M"));
    assert_eq!(report.tuning.get("shared_buffers"), Some("160MB"));
}

#[test]
fn test_probe_failure_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let inputs = inputs(&temp_dir, Some("shop.acme.io"));
    let generator = ConfigGenerator::new(
        Box::new(ProcMeminfoProbe::new(temp_dir.path().join("no-proc"))),
        ProvisionLogger::new("test-host"),
    );

    let err = generator.run(&inputs).unwrap_err();

    assert!(matches!(err, ProvisionError::MemoryProbe { .. }));
    assert!(!inputs.paths.env_file.exists());
    assert!(!inputs.paths.tuning_file.exists());
    assert!(!inputs.paths.limits_file.exists());
    assert!(!inputs.paths.proxy_file.exists());
}

#[test]
fn test_unwritable_target_fails_preflight() {
    let temp_dir = TempDir::new().unwrap();
    let mut inputs = inputs(&temp_dir, None);

    let blocker = temp_dir.path().join("blocker");
    fs::write(&blocker, "").unwrap();
    inputs.paths.limits_file = blocker.join("limits.yml");

    let err = generator(2048).run(&inputs).unwrap_err();

    assert!(matches!(err, ProvisionError::Preflight { .. }));
    assert!(err.is_input_error());
    assert!(!inputs.paths.env_file.exists());
}

#[test]
fn test_size_touches_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let sizing = generator(16384).size(Some("abc")).unwrap();

    assert_eq!(sizing.plan.source, AllocationSource::Fallback);
    assert_eq!(sizing.budget.total_mb, 16384);
    assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 0);
}

#[test]
fn test_invalid_domain_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let inputs = inputs(&temp_dir, Some("shop acme.io"));

    let err = generator(2048).run(&inputs).unwrap_err();

    assert!(matches!(err, ProvisionError::InvalidDomain { .. }));
    assert!(err.is_input_error());
    assert!(!inputs.paths.env_file.exists());
    assert!(!inputs.paths.tuning_file.exists());
    assert!(!inputs.paths.limits_file.exists());
    assert!(!inputs.paths.proxy_file.exists());
}
