//! Config file discovery and command-line overrides

use std::fs;
use tempfile::TempDir;

use soft_verify::{ConfigError, VerifyArgs, VerifyConfig};

use super::helpers::quiet_session;

const CONFIG: &str = r#"
[general]
raise-warnings = false
maximum-traceback-depth = 5

[debug]
phases = true
"#;

fn write_config(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("soft-verify.toml");
    fs::write(&path, CONFIG).expect("Failed to write config file");
    path
}

#[test]
fn test_explicit_config_file() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let path = write_config(&dir);

    let config = VerifyConfig::discover(Some(&path)).unwrap();
    assert!(!config.general.raise_warnings);
    assert_eq!(config.general.maximum_traceback_depth, 5);
    assert!(config.general.include_verify_local_vars);
    assert!(config.debug.phases);
    assert!(!config.debug.summary);
}

#[test]
fn test_missing_explicit_config_is_an_error() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let err = VerifyConfig::discover(Some(&dir.path().join("absent.toml"))).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn test_overrides_win_over_file() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let mut config = VerifyConfig::discover(Some(&write_config(&dir))).unwrap();

    let args = VerifyArgs {
        raise_warnings: Some("YES".to_string()),
        continue_on_setup_failure: Some("1".to_string()),
        ..VerifyArgs::default()
    };
    config.apply_overrides(&args).unwrap();

    assert!(config.general.raise_warnings);
    assert!(config.general.continue_on_setup_failure);
    assert_eq!(config.general.maximum_traceback_depth, 5);
    assert!(config
        .describe()
        .contains(&"raise-warnings: type=bool, val=true".to_string()));
}

#[test]
fn test_invalid_override_is_rejected() {
    let mut config = VerifyConfig::default();
    let args = VerifyArgs {
        include_all_local_vars: Some("maybe".to_string()),
        ..VerifyArgs::default()
    };

    let err = config.apply_overrides(&args).unwrap_err();
    assert_eq!(
        err,
        ConfigError::InvalidBool {
            option: "include-all-local-vars".to_string(),
            value: "maybe".to_string(),
        }
    );
    assert!(!config.general.include_all_local_vars);
}

#[test]
fn test_loaded_config_drives_the_session() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let config = VerifyConfig::discover(Some(&write_config(&dir))).unwrap();
    let (session, _) = quiet_session(config);

    session.on_setup_start(soft_verify::TestId::new("test_configured"), &[]);
    session.check(false, "slow").warning().run().unwrap();
    assert!(session.on_setup_end(None).is_ok());
}
