//! Job type registry loading and classification.

use loner::classify::classify;
use loner::key::derive_key;
use loner::{Error, JobPayload, JobTypeConfig, JobTypeRegistry, UniqueJob};
use serde_json::json;

struct ReportJob;

impl UniqueJob for ReportJob {
    const JOB_TYPE: &'static str = "ReportJob";
    const LONER_TTL: i64 = 3600;
    const LOCK_AFTER_EXECUTION_PERIOD: i64 = 30;
}

#[test]
fn loads_toml_files_and_applies_defaults() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("report.toml"),
        r#"
[job]
name = "ReportJob"
unique = true
loner_ttl = 3600
loner_lock_after_execution_period = 30
"#,
    )
    .unwrap();
    std::fs::write(
        dir.path().join("email.toml"),
        r#"
[job]
name = "EmailJob"
unique = true
"#,
    )
    .unwrap();
    std::fs::write(dir.path().join("README.md"), "ignored").unwrap();

    let registry = JobTypeRegistry::load_from_dir(dir.path()).unwrap();
    assert_eq!(registry.len(), 2);

    let report = registry.resolve("ReportJob").unwrap();
    assert_eq!(report, &JobTypeConfig::of::<ReportJob>());

    let email = registry.resolve("EmailJob").unwrap();
    assert!(email.unique);
    assert_eq!(email.loner_ttl, -1);
    assert_eq!(email.loner_lock_after_execution_period, 0);
}

#[test]
fn bad_toml_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("broken.toml"), "[job]\nunique = true\n").unwrap();

    let err = JobTypeRegistry::load_from_dir(dir.path()).unwrap_err();
    assert!(matches!(err, Error::Config(_)), "got {err:?}");
}

#[test]
fn missing_dir_is_a_config_error() {
    let err =
        JobTypeRegistry::load_from_dir(std::path::Path::new("/nonexistent/loner")).unwrap_err();
    assert!(matches!(err, Error::Config(_)), "got {err:?}");
}

#[test]
fn unknown_type_resolution_fails() {
    let registry = JobTypeRegistry::empty();
    assert!(matches!(
        registry.resolve("Ghost"),
        Err(Error::UnresolvableType(name)) if name == "Ghost"
    ));
}

#[test]
fn registered_unique_type_carries_its_ttls() {
    let mut registry = JobTypeRegistry::empty();
    registry.register::<ReportJob>();
    let payload = JobPayload::new("ReportJob", vec![json!({"unique_key": "acct-42"})]);

    let desc = classify(&registry, &payload);
    assert!(desc.is_unique);
    assert_eq!(desc.unique_key.as_deref(), Some("acct-42"));
    assert_eq!(desc.ttl_on_enqueue, 3600);
    assert_eq!(desc.grace_ttl_after_completion, 30);
}

#[test]
fn uniq_flag_on_unknown_type_uses_default_ttls() {
    let registry = JobTypeRegistry::empty();
    let payload = JobPayload::new("Adhoc", vec![json!({"unique_key": "k", "uniq": 1})]);

    let desc = classify(&registry, &payload);
    assert!(desc.is_unique);
    assert_eq!(desc.ttl_on_enqueue, -1);
    assert_eq!(desc.grace_ttl_after_completion, 0);
}

#[test]
fn uniq_flag_wins_over_non_unique_registration() {
    let mut registry = JobTypeRegistry::empty();
    registry.insert(JobTypeConfig {
        loner_lock_after_execution_period: 5,
        ..JobTypeConfig::plain("PlainJob")
    });
    let payload = JobPayload::new("PlainJob", vec![json!({"unique_key": "k", "uniq": true})]);

    let desc = classify(&registry, &payload);
    assert!(desc.is_unique);
    assert_eq!(desc.grace_ttl_after_completion, 5);
}

#[test]
fn unresolvable_payload_classifies_as_not_unique() {
    let registry = JobTypeRegistry::empty();
    let payload: JobPayload = serde_json::from_value(json!({"class": "Ghost"})).unwrap();

    let desc = classify(&registry, &payload);
    assert!(!desc.is_unique);
    assert_eq!(desc.unique_key, None);
}

#[test]
fn derived_key_matches_wire_scheme() {
    let payload = JobPayload::new(
        "ReportJob",
        vec![json!({"unique_key": "acct-42", "uniq": true})],
    );
    let key = derive_key("reports", &payload).unwrap();
    assert_eq!(key.as_str(), "loners:queue:reports:job:acct-42");
}

#[test]
fn derive_key_rejects_malformed_args() {
    let no_args: JobPayload = serde_json::from_value(json!({"class": "ReportJob"})).unwrap();
    let scalar_first = JobPayload::new("ReportJob", vec![json!("acct-42")]);
    let empty = JobPayload::new("ReportJob", vec![]);
    let keyless = JobPayload::new("ReportJob", vec![json!({"uniq": true})]);

    for payload in [no_args, scalar_first, empty, keyless] {
        assert!(
            matches!(derive_key("reports", &payload), Err(Error::MalformedPayload(_))),
            "expected MalformedPayload for {payload:?}"
        );
    }
}
