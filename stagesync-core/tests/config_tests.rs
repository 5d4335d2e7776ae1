//! Config load error messages, path rebasing, and atomic save.

use assert_fs::prelude::*;
use predicates::prelude::predicate;
use stagesync_core::{
    config::{self, DEFAULT_PLACEHOLDER},
    ConfigError, DeployConfig, FailurePolicy, TargetConfig, UploadPolicy,
};

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn load_missing_config_returns_not_found() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let path = dir.path().join("stagesync.yaml");
    let err = config::load_at(&path).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound { .. }), "got: {err}");
    assert!(err.to_string().contains("stagesync.yaml"));
}

#[test]
fn load_corrupt_yaml_returns_parse_error_with_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("stagesync.yaml");
    file.write_str("items: [unclosed\nremote_base: : :").expect("write");

    let err = config::load_at(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("stagesync.yaml"));
}

#[test]
fn load_without_remote_base_is_parse_error() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("stagesync.yaml");
    file.write_str("items: [./app]\n").expect("write");

    let err = config::load_at(file.path()).unwrap_err();
    assert!(err.to_string().contains("remote_base") || matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn load_empty_item_list_is_invalid() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("stagesync.yaml");
    file.write_str("items: []\nremote_base: /srv\n").expect("write");

    let err = config::load_at(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)), "got: {err}");
}

// ---------------------------------------------------------------------------
// 2. Load + rebase
// ---------------------------------------------------------------------------

#[test]
fn load_resolves_relative_paths_against_config_dir() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("deploy").child("stagesync.yaml");
    file.write_str(
        "items:\n  - index.php\n  - app\nremote_base: /var/www/html/msclogs/\n\
         upload:\n  skip_unchanged: true\n  mtime_grace_seconds: 3\n\
         on_error: continue\ntarget:\n  kind: local\n  root: out\n",
    )
    .expect("write");

    let cfg = config::load_at(file.path()).expect("load");
    let base = dir.path().join("deploy");
    assert_eq!(cfg.items, vec![base.join("index.php"), base.join("app")]);
    assert_eq!(cfg.build_dir, base.join("build"));
    assert_eq!(cfg.placeholder, DEFAULT_PLACEHOLDER);
    assert_eq!(cfg.on_error, FailurePolicy::Continue);
    assert_eq!(cfg.target, TargetConfig::Local { root: base.join("out") });
    match cfg.upload.policy() {
        UploadPolicy::SkipUnchanged(c) => assert_eq!(c.mtime_grace_seconds, 3.0),
        other => panic!("expected SkipUnchanged, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// 3. Save
// ---------------------------------------------------------------------------

#[test]
fn save_then_load_preserves_fields() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let path = dir.path().join("stagesync.yaml");
    let sample = DeployConfig::sample();

    config::save_at(&path, &sample).expect("save");
    dir.child("stagesync.yaml")
        .assert(predicate::str::contains("remote_base: /var/www/html/app/"));
    dir.child("stagesync.yaml.tmp").assert(predicate::path::missing());

    let loaded = config::load_at(&path).expect("load");
    assert_eq!(loaded.remote_base, sample.remote_base);
    assert_eq!(loaded.items.len(), 2);
    assert_eq!(loaded.target, sample.target);
}

#[test]
fn save_creates_parent_directories() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let path = dir.path().join("nested").join("cfg").join("stagesync.yaml");
    config::save_at(&path, &DeployConfig::sample()).expect("save");
    assert!(path.exists());
}
