//! Integration tests for syndicate-config
//!
//! These tests verify the full config loading pipeline with real file system operations.

use std::path::PathBuf;
use syndicate_config::Config;
use tempfile::tempdir;

/// Test config loading from real global config file
#[test]
fn test_load_global_config_from_file() {
    let temp = tempdir().unwrap();
    let dir = temp.path().join(".syndicate");
    std::fs::create_dir_all(&dir).unwrap();

    let config_content = r#"
[library]
fskit = "/opt/fskit/lib/libfskit"
syndicate = "/opt/syndicate/lib/libsyndicate"
ug = "/opt/syndicate/lib/libsyndicate-ug"

[gateway]
user = "alice@example.com"
volume = "v1"
gateway = "g1"
debug_level = 1

[io]
read_chunk_size = 4096
"#;
    std::fs::write(dir.join("config.toml"), config_content).unwrap();

    let config = Config::load_from(Some(&dir.join("config.toml")), None).unwrap();

    assert_eq!(
        config.library.ug,
        PathBuf::from("/opt/syndicate/lib/libsyndicate-ug")
    );
    assert_eq!(config.gateway.user, "alice@example.com");
    assert_eq!(config.gateway.volume, "v1");
    assert_eq!(config.gateway.gateway, "g1");
    assert_eq!(config.gateway.debug_level, Some(1));
    assert!(!config.gateway.anonymous);
    assert_eq!(config.io.read_chunk_size, 4096);
    // untouched keys keep defaults
    assert_eq!(config.io.readdir_batch, 1);
}

/// Test config hierarchy: project config overrides global
#[test]
fn test_config_hierarchy_project_overrides_global() {
    let temp = tempdir().unwrap();

    let global = temp.path().join("global.toml");
    std::fs::write(
        &global,
        r#"
[gateway]
user = "alice"
volume = "global-volume"
gateway = "global-gw"
"#,
    )
    .unwrap();

    let project = temp.path().join("project.toml");
    std::fs::write(
        &project,
        r#"
[gateway]
volume = "project-volume"

[io]
readdir_batch = 32
"#,
    )
    .unwrap();

    let config = Config::load_from(Some(&global), Some(&project)).unwrap();

    assert_eq!(config.gateway.user, "alice");
    assert_eq!(config.gateway.volume, "project-volume");
    assert_eq!(config.gateway.gateway, "global-gw");
    assert_eq!(config.io.readdir_batch, 32);
    assert_eq!(config.io.read_chunk_size, 65536);
}

/// Missing files fall back to defaults
#[test]
fn test_missing_files_use_defaults() {
    let temp = tempdir().unwrap();
    let config = Config::load_from(
        Some(&temp.path().join("nope.toml")),
        Some(&temp.path().join("also-nope.toml")),
    )
    .unwrap();
    assert_eq!(config, Config::default());
}

/// Malformed TOML is reported, not swallowed
#[test]
fn test_invalid_toml_is_error() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("bad.toml");
    std::fs::write(&path, "[gateway\nuser = ").unwrap();

    let err = Config::load_from(Some(&path), None).unwrap_err();
    assert!(matches!(err, syndicate_config::ConfigError::Toml(_)));
}
