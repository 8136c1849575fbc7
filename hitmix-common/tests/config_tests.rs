//! Unit tests for configuration resolution and graceful degradation
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate the config env var are marked with #[serial].

use hitmix_common::config::{load_config, load_toml_file, resolve_config_path};
use hitmix_common::Error;
use serde::Deserialize;
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const TEST_ENV_VAR: &str = "HITMIX_CONFIG_TEST";

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
struct SampleConfig {
    sample_rate: u32,
    balance_factor: f32,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            balance_factor: 0.8,
        }
    }
}

fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
#[serial]
fn test_cli_argument_wins_over_env() {
    env::set_var(TEST_ENV_VAR, "/from/env.toml");

    let resolved = resolve_config_path(Some(Path::new("/from/cli.toml")), TEST_ENV_VAR);
    assert_eq!(resolved, Some(PathBuf::from("/from/cli.toml")));

    env::remove_var(TEST_ENV_VAR);
}

#[test]
#[serial]
fn test_env_var_used_without_cli() {
    env::set_var(TEST_ENV_VAR, "/from/env.toml");

    let resolved = resolve_config_path(None, TEST_ENV_VAR);
    assert_eq!(resolved, Some(PathBuf::from("/from/env.toml")));

    env::remove_var(TEST_ENV_VAR);
}

#[test]
fn test_load_toml_file_partial_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "config.toml", "sample_rate = 48000\n");

    let config: SampleConfig = load_toml_file(&path).unwrap();
    assert_eq!(config.sample_rate, 48000);
    assert_eq!(config.balance_factor, 0.8);
}

#[test]
fn test_load_toml_file_malformed_is_config_error() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "bad.toml", "sample_rate = [not toml");

    let result: Result<SampleConfig, _> = load_toml_file(&path);
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_load_toml_file_missing_is_io_error() {
    let result: Result<SampleConfig, _> = load_toml_file(Path::new("/nonexistent/hitmix.toml"));
    assert!(matches!(result, Err(Error::Io(_))));
}

#[test]
#[serial]
fn test_explicit_missing_file_is_an_error() {
    env::remove_var(TEST_ENV_VAR);

    let result: Result<SampleConfig, _> =
        load_config(Some(Path::new("/nonexistent/hitmix.toml")), TEST_ENV_VAR);
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_explicit_file_via_env_is_loaded() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "env.toml", "balance_factor = 0.5\n");
    env::set_var(TEST_ENV_VAR, &path);

    let config: SampleConfig = load_config(None, TEST_ENV_VAR).unwrap();
    assert_eq!(config.balance_factor, 0.5);
    assert_eq!(config.sample_rate, 44100);

    env::remove_var(TEST_ENV_VAR);
}
