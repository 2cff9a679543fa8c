use dupescan::config::{Config, ENV_PREFIX};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::tempdir;

// Tests that touch DUPESCAN_* variables must not interleave.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

#[test]
fn test_config_load_defaults() {
    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .extract()
        .unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.autosave_interval(), Some(Duration::from_secs(300)));
}

#[test]
fn test_config_load_from_toml() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(
        &config_path,
        r#"
checkpoint_path = "/var/tmp/scan.json"
autosave_secs = 0
progress = false
"#,
    )
    .unwrap();

    let config = Config::load(Some(&config_path)).unwrap();

    assert_eq!(config.checkpoint_path, Some(PathBuf::from("/var/tmp/scan.json")));
    assert_eq!(config.autosave_interval(), None);
    assert!(!config.progress);
    assert!(config.resume);
}

#[test]
fn test_env_overrides_toml() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "autosave_secs = 10\nresume = true\n").unwrap();

    std::env::set_var("DUPESCAN_AUTOSAVE_SECS", "42");
    std::env::set_var("DUPESCAN_RESUME", "false");
    let config = Config::load(Some(&config_path));
    std::env::remove_var("DUPESCAN_AUTOSAVE_SECS");
    std::env::remove_var("DUPESCAN_RESUME");

    let config = config.unwrap();
    assert_eq!(config.autosave_secs, 42);
    assert!(!config.resume);
}

#[test]
fn test_env_prefix_matches_loader() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    std::env::set_var("DUPESCAN_PROGRESS", "false");
    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Env::prefixed(ENV_PREFIX))
        .extract()
        .unwrap();
    std::env::remove_var("DUPESCAN_PROGRESS");

    assert!(!config.progress);
}

#[test]
fn test_config_invalid_toml_is_error() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "autosave_secs = \"soon\"").unwrap();

    let result: Result<Config, _> = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(&config_path))
        .extract();
    assert!(result.is_err());

    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("broken.toml");
    fs::write(&config_path, "this is = = not toml").unwrap();
    let result: Result<Config, _> = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(&config_path))
        .extract();
    assert!(result.is_err());
}
