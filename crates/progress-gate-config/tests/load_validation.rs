//! Config load validation tests for progress-gate-config.
// crates/progress-gate-config/tests/load_validation.rs
// =============================================================================
// Module: Config Load Validation Tests
// Description: Validate config loading guards (path, size, encoding).
// Purpose: Ensure config input handling is strict and fail-closed.
// =============================================================================

use std::io::Write;
use std::path::Path;

use progress_gate_config::ConfigError;
use progress_gate_config::ProgressGateConfig;
use tempfile::NamedTempFile;

type TestResult = Result<(), String>;

fn assert_invalid(result: Result<ProgressGateConfig, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config load".to_string()),
    }
}

#[test]
fn load_rejects_path_too_long() -> TestResult {
    let long_path = "a".repeat(5_000);
    let path = Path::new(&long_path);
    assert_invalid(ProgressGateConfig::load(Some(path)), "config path exceeds max length")?;
    Ok(())
}

#[test]
fn load_rejects_path_component_too_long() -> TestResult {
    let long_component = "a".repeat(300);
    let path = Path::new(&long_component);
    assert_invalid(ProgressGateConfig::load(Some(path)), "config path component too long")?;
    Ok(())
}

#[test]
fn load_rejects_missing_explicit_file() -> TestResult {
    let path = Path::new("does-not-exist-progress-gate.toml");
    assert_invalid(ProgressGateConfig::load(Some(path)), "config file not found")?;
    Ok(())
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    let payload = vec![b'a'; 1_048_577];
    file.write_all(&payload).map_err(|err| err.to_string())?;
    assert_invalid(ProgressGateConfig::load(Some(file.path())), "config file exceeds size limit")?;
    Ok(())
}

#[test]
fn load_rejects_non_utf8_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(&[0xFF, 0xFE, 0xFF]).map_err(|err| err.to_string())?;
    assert_invalid(ProgressGateConfig::load(Some(file.path())), "config file is not valid UTF-8")?;
    Ok(())
}

#[test]
fn load_rejects_unknown_fields() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(b"unknown_table = true\n").map_err(|err| err.to_string())?;
    match ProgressGateConfig::load(Some(file.path())) {
        Err(ConfigError::Parse(_)) => Ok(()),
        other => Err(format!("expected parse error, got {other:?}")),
    }
}

#[test]
fn load_accepts_complete_config() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(
        b"[directory]\n\
          path = \"progress-gate.db\"\n\
          journal_mode = \"wal\"\n\
          busy_timeout_ms = 5000\n\
          \n\
          [[service_principals]]\n\
          name = \"analytics\"\n\
          principal_id = 901\n\
          school_id = 1\n",
    )
    .map_err(|err| err.to_string())?;
    let config = ProgressGateConfig::load(Some(file.path())).map_err(|err| err.to_string())?;
    if config.service_principals.len() != 1 {
        return Err(format!(
            "expected 1 service principal, got {}",
            config.service_principals.len()
        ));
    }
    Ok(())
}

#[test]
fn load_rejects_excessive_busy_timeout() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(
        b"[directory]\n\
          path = \"progress-gate.db\"\n\
          busy_timeout_ms = 600000\n",
    )
    .map_err(|err| err.to_string())?;
    assert_invalid(
        ProgressGateConfig::load(Some(file.path())),
        "directory busy timeout exceeds limit",
    )?;
    Ok(())
}
