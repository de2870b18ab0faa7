use loner::config::Config;
use loner::config::secrets::ExposeSecret;

// Both cases touch the same process-wide variables, so they run in one test.
#[test]
fn config_from_env_requires_redis_url() {
    unsafe {
        std::env::remove_var("REDIS_URL");
    }
    assert!(Config::from_env().is_err());

    unsafe {
        std::env::set_var("REDIS_URL", "redis://:hunter2@localhost:6379/0");
        std::env::set_var("LONER_JOB_TYPES", "/etc/loner/jobs");
    }

    let config = Config::from_env().unwrap();
    assert_eq!(config.redis_url.expose_secret(), "redis://:hunter2@localhost:6379/0");
    assert_eq!(
        config.job_types_dir.as_deref(),
        Some(std::path::Path::new("/etc/loner/jobs"))
    );
    assert!(!config.log_level.is_empty());
    assert!(!format!("{config:?}").contains("hunter2"));

    unsafe {
        std::env::remove_var("REDIS_URL");
        std::env::remove_var("LONER_JOB_TYPES");
    }
}
