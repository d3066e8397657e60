//! Configuration file loading

mod common;

use common::init;
use std::fs;
use tempfile::TempDir;
use valuescope::{Config, LogLevel, ValueSession};

#[test]
fn test_load_from_file() {
    init();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("valuescope.toml");
    let log_file = dir.path().join("session.log");
    fs::write(
        &path,
        format!(
            r#"
[general]
enable_logging = true
log_file = "{}"
log_level = "trace"

[values]
max_read_size = 4096
host_scratch_base = 0x20000

[process]
use_process_vm_readv = false
"#,
            log_file.display()
        ),
    )
    .unwrap();

    let config = Config::load_from_file(&path).unwrap();
    assert!(config.general.enable_logging);
    assert_eq!(config.general.log_file, log_file.display().to_string());
    assert_eq!(config.general.log_level, LogLevel::Trace);
    assert_eq!(config.values.max_read_size, 4096);
    assert_eq!(config.values.host_scratch_base, 0x20000);
    assert!(!config.process.use_process_vm_readv);

    let session = ValueSession::new_with_config(config);
    assert_eq!(session.execution_context().options.max_read_size, 4096);
    // The only test in this binary that enables logging, so the file is ours
    assert!(log_file.exists());
}

#[test]
fn test_empty_file_gives_defaults() {
    init();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.toml");
    fs::write(&path, "").unwrap();

    let config = Config::load_from_file(&path).unwrap();
    assert_eq!(config.values.max_read_size, 1024 * 1024);
    assert_eq!(config.general.log_level, LogLevel::Warn);
}

#[test]
fn test_explicit_path_must_exist() {
    init();
    let dir = TempDir::new().unwrap();
    let err = Config::load_with_explicit_path(dir.path().join("missing.toml")).unwrap_err();
    assert!(err.to_string().contains("does not exist"));
}

#[test]
fn test_bad_log_level_is_explained() {
    init();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[general]\nlog_level = \"loud\"\n").unwrap();

    let msg = Config::load_from_file(&path).unwrap_err().to_string();
    assert!(msg.contains("line 2"), "{msg}");
    assert!(msg.contains("Valid log levels"), "{msg}");
}
