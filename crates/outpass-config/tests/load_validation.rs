//! Config load validation tests for outpass-config.
// crates/outpass-config/tests/load_validation.rs
// ============================================================================
// Module: Config Load Validation Tests
// Description: Validate config loading guards (path, size, encoding).
// Purpose: Ensure config input handling is strict and fail-closed.
// ============================================================================

use std::io::Write;
use std::path::Path;

use outpass_config::ConfigError;
use outpass_config::OutpassConfig;
use outpass_config::StoreType;
use tempfile::NamedTempFile;

type TestResult = Result<(), String>;

fn assert_invalid(result: Result<OutpassConfig, ConfigError>, needle: &str) -> TestResult {
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

fn write_config(contents: &str) -> Result<NamedTempFile, String> {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(contents.as_bytes())
        .map_err(|err| err.to_string())?;
    Ok(file)
}

#[test]
fn load_rejects_path_too_long() -> TestResult {
    let long_path = "a".repeat(5_000);
    let path = Path::new(&long_path);
    assert_invalid(
        OutpassConfig::load(Some(path)),
        "config path exceeds max length",
    )?;
    Ok(())
}

#[test]
fn load_rejects_path_component_too_long() -> TestResult {
    let long_component = "a".repeat(300);
    let path = Path::new(&long_component);
    assert_invalid(
        OutpassConfig::load(Some(path)),
        "config path component too long",
    )?;
    Ok(())
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    let payload = vec![b'a'; 1_048_577];
    file.write_all(&payload).map_err(|err| err.to_string())?;
    assert_invalid(
        OutpassConfig::load(Some(file.path())),
        "config file exceeds size limit",
    )?;
    Ok(())
}

#[test]
fn load_rejects_non_utf8_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(&[0xFF, 0xFE, 0xFF]).map_err(|err| err.to_string())?;
    assert_invalid(
        OutpassConfig::load(Some(file.path())),
        "config file must be utf-8",
    )?;
    Ok(())
}

#[test]
fn load_rejects_unknown_sections() -> TestResult {
    let file = write_config("[telemetry]\nenabled = true\n")?;
    assert_invalid(
        OutpassConfig::load(Some(file.path())),
        "failed to parse config file",
    )?;
    Ok(())
}

#[test]
fn load_rejects_missing_explicit_file() -> TestResult {
    let result = OutpassConfig::load(Some(Path::new("no-such-outpass.toml")));
    if result.is_ok() {
        return Err("expected missing explicit file to be rejected".to_string());
    }
    Ok(())
}

#[test]
fn empty_file_loads_the_defaults() -> TestResult {
    let file = write_config("")?;
    let config = OutpassConfig::load(Some(file.path())).map_err(|err| err.to_string())?;
    if config.store.store_type != StoreType::Memory {
        return Err("default store backend should be memory".to_string());
    }
    if config.server.bind != "127.0.0.1:8080" {
        return Err("default bind should be loopback".to_string());
    }
    if config.sweep.interval_secs != 60 {
        return Err("default sweep interval should be 60s".to_string());
    }
    Ok(())
}

#[test]
fn full_file_round_trips_every_section() -> TestResult {
    let file = write_config(
        r#"
[server]
bind = "0.0.0.0:9090"
max_body_bytes = 32768
request_timeout_ms = 5000

[store]
type = "sqlite"
path = "outpass.db"
busy_timeout_ms = 2500
journal_mode = "wal"
sync_mode = "normal"

[trust]
baseline = 100
min_threshold = 10
max_score = 100
cancel_penalty = 20
late_return_penalty = 10

[cooldown]
threshold = 3
window_hours = 24

[sweep]
interval_secs = 30

[calendar]
weekly_off = ["sunday", "saturday"]
holidays = ["2025-01-26", "2025-08-15"]

[terminal]
server_url = "http://gate.example.edu:8080"
cache_path = "cache.json"
queue_path = "queue.json"
refresh_secs = 120
drain_secs = 15
request_timeout_ms = 2000

[terminal.backoff]
initial_ms = 250
max_ms = 10000
multiplier = 2

[audit]
sink = "file"
path = "audit.log"
"#,
    )?;
    let config = OutpassConfig::load(Some(file.path())).map_err(|err| err.to_string())?;
    if config.store.store_type != StoreType::Sqlite {
        return Err("store backend should be sqlite".to_string());
    }
    let sqlite = config
        .store
        .sqlite()
        .ok_or_else(|| "sqlite settings should be derivable".to_string())?;
    if sqlite.busy_timeout_ms != 2500 {
        return Err("sqlite busy timeout should carry over".to_string());
    }
    if config.terminal.backoff.initial_ms != 250 {
        return Err("backoff initial delay should carry over".to_string());
    }
    if config.calendar.holidays.len() != 2 {
        return Err("both holidays should parse".to_string());
    }
    Ok(())
}
