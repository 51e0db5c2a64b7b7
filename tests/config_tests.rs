#![allow(clippy::unwrap_used, missing_docs)]

use std::io::Write as _;
use std::time::Duration;

use swift_fs::config::{CacheConfig, Config, ConfigError, UNLIMITED};

#[test]
fn defaults() {
    let config = Config::default();
    assert_eq!(config.cache.ttl(), Duration::from_secs(60));
    assert_eq!(config.cache.max_entries, UNLIMITED);
    assert_eq!(config.cache.max_access, UNLIMITED);
    assert_eq!(config.lister.concurrency, 20);
    assert!(config.validate().is_ok());
}

#[test]
fn empty_document_uses_defaults() {
    assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
}

#[test]
fn parses_kebab_case_keys() {
    let config = Config::from_toml_str(
        r#"
        [cache]
        ttl-ms = 1500
        max-entries = 10000
        max-access = 0

        [lister]
        concurrency = 8
        "#,
    )
    .unwrap();

    assert_eq!(
        config.cache,
        CacheConfig {
            ttl_ms: 1500,
            max_entries: 10_000,
            max_access: 0,
        }
    );
    assert_eq!(config.lister.concurrency, 8);
}

#[test]
fn partial_section_keeps_other_defaults() {
    let config = Config::from_toml_str("[cache]\nmax-access = 3\n").unwrap();
    assert_eq!(config.cache.max_access, 3);
    assert_eq!(config.cache.ttl_ms, 60_000);
    assert_eq!(config.lister.concurrency, 20);
}

#[test]
fn zero_concurrency_fails_validation() {
    let err = Config::from_toml_str("[lister]\nconcurrency = 0\n").unwrap_err();
    let ConfigError::ValidationErrors(errors) = err else {
        panic!("expected validation errors");
    };
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("lister.concurrency"));
}

#[test]
fn malformed_toml_is_a_deserialization_error() {
    let err = Config::from_toml_str("[cache]\nttl-ms = \"soon\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::DeserializationError(_)));
}

#[test]
fn loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[lister]\nconcurrency = 3").unwrap();

    let config = Config::load_from_file(file.path()).unwrap();
    assert_eq!(config.lister.concurrency, 3);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load_from_file(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::IoError(_)));
}
