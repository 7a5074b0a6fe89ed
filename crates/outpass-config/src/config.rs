// crates/outpass-config/src/config.rs
// ============================================================================
// Module: Outpass Configuration Model
// Description: Typed TOML sections for server, store, trust, cooldown,
//              sweep, calendar, terminal, and audit settings.
// Purpose: Give every binary one validated source of runtime settings.
// Dependencies: outpass-core, outpass-store-sqlite, serde, thiserror, time,
//               toml, url
// ============================================================================

//! ## Overview
//! `OutpassConfig` mirrors `outpass.toml` section by section. Every section
//! has working defaults, so an empty file is a valid development config:
//! in-memory store, loopback bind, stderr audit. `load` applies path and
//! size guards before the file is parsed, and `validate` checks every
//! cross-field constraint so failures surface at startup, not mid-request.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::collections::HashSet;
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;
use time::Date;
use time::Weekday;
use time::macros::format_description;

use outpass_core::CooldownSettings;
use outpass_core::TrustSettings;
use outpass_core::WeekdayCalendar;
use outpass_store_sqlite::SqliteStoreConfig;
use outpass_store_sqlite::SqliteStoreMode;
use outpass_store_sqlite::SqliteSyncMode;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable consulted when no config path is given.
pub const OUTPASS_CONFIG_ENV: &str = "OUTPASS_CONFIG";

/// Default config file name resolved against the working directory.
const DEFAULT_CONFIG_FILE: &str = "outpass.toml";

/// Maximum accepted config file size in bytes.
pub const MAX_CONFIG_BYTES: u64 = 1_048_576;

/// Maximum accepted config path length in bytes.
const MAX_PATH_BYTES: usize = 4_096;

/// Maximum accepted length of a single path component in bytes.
const MAX_COMPONENT_BYTES: usize = 255;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading and validation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config path exceeds the byte limit.
    #[error("config path exceeds max length of {MAX_PATH_BYTES} bytes")]
    PathTooLong,
    /// A single path component exceeds the byte limit.
    #[error("config path component too long (limit {MAX_COMPONENT_BYTES} bytes)")]
    PathComponentTooLong,
    /// The config file exceeds the size limit.
    #[error("config file exceeds size limit of {MAX_CONFIG_BYTES} bytes")]
    FileTooLarge,
    /// The config file is not valid UTF-8.
    #[error("config file must be utf-8")]
    NotUtf8,
    /// The `OUTPASS_CONFIG` environment variable is not valid Unicode.
    #[error("{OUTPASS_CONFIG_ENV} must be valid unicode")]
    EnvNotUnicode,
    /// Reading the config file failed.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// Parsing the config file failed.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    /// A setting or combination of settings is invalid.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Root configuration for every Outpass binary.
///
/// # Invariants
/// - A value returned by [`OutpassConfig::load`] has passed `validate`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutpassConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Store backend selection and settings.
    #[serde(default)]
    pub store: StoreConfig,
    /// Trust score settings.
    #[serde(default)]
    pub trust: TrustSettings,
    /// Cancellation cooldown settings.
    #[serde(default)]
    pub cooldown: CooldownSettings,
    /// Expiry sweep settings.
    #[serde(default)]
    pub sweep: SweepConfig,
    /// Campus calendar settings.
    #[serde(default)]
    pub calendar: CalendarConfig,
    /// Gate terminal settings.
    #[serde(default)]
    pub terminal: TerminalConfig,
    /// Audit sink settings.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl OutpassConfig {
    /// Loads and validates a config file.
    ///
    /// Resolution order: the explicit `path` argument, then the
    /// `OUTPASS_CONFIG` environment variable, then `outpass.toml` in the
    /// working directory. A missing default file yields the built-in
    /// defaults; an explicitly named file must exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the path or file violates a guard, the
    /// TOML fails to parse, or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (resolved, explicit) = resolve_path(path)?;
        check_path(&resolved)?;
        if !explicit && !resolved.exists() {
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }
        let bytes = read_limited(&resolved)?;
        let text = std::str::from_utf8(&bytes).map_err(|_| ConfigError::NotUtf8)?;
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section and cross-field constraint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first failing setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.store.validate()?;
        self.trust
            .validate()
            .map_err(|err| ConfigError::Invalid(format!("trust: {err}")))?;
        validate_cooldown(&self.cooldown)?;
        self.sweep.validate()?;
        self.calendar.build()?;
        self.terminal.validate()?;
        self.audit.validate()?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Server Section
// ============================================================================

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address the server binds to.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum accepted request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Per-request handling timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl ServerConfig {
    /// Validates server settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] on an unparsable bind address or a
    /// zero limit.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::Invalid(
                "server.bind must parse as a socket address".to_string(),
            ));
        }
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "server.max_body_bytes must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "server.request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Default server bind address.
fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

/// Default request body size limit.
const fn default_max_body_bytes() -> usize {
    65_536
}

/// Default per-request timeout in milliseconds.
const fn default_request_timeout_ms() -> u64 {
    10_000
}

// ============================================================================
// SECTION: Store Section
// ============================================================================

/// Store backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// In-memory stores, state lost on restart.
    #[default]
    Memory,
    /// Durable `SQLite` stores.
    Sqlite,
}

/// Store backend selection and settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Selected backend.
    #[serde(default, rename = "type")]
    pub store_type: StoreType,
    /// Database file path, required for the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// `SQLite` busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::Memory,
            path: None,
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl StoreConfig {
    /// Validates store settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the sqlite backend is selected
    /// without a path.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store_type == StoreType::Sqlite && self.path.is_none() {
            return Err(ConfigError::Invalid(
                "store.path required for the sqlite store".to_string(),
            ));
        }
        Ok(())
    }

    /// Builds the sqlite store config when the sqlite backend is selected.
    #[must_use]
    pub fn sqlite(&self) -> Option<SqliteStoreConfig> {
        if self.store_type != StoreType::Sqlite {
            return None;
        }
        self.path.as_ref().map(|path| SqliteStoreConfig {
            path: path.clone(),
            busy_timeout_ms: self.busy_timeout_ms,
            journal_mode: self.journal_mode,
            sync_mode: self.sync_mode,
        })
    }
}

/// Default sqlite busy timeout in milliseconds.
const fn default_busy_timeout_ms() -> u64 {
    5_000
}

// ============================================================================
// SECTION: Cooldown Validation
// ============================================================================

/// Validates cooldown settings.
fn validate_cooldown(cooldown: &CooldownSettings) -> Result<(), ConfigError> {
    if cooldown.threshold == 0 {
        return Err(ConfigError::Invalid(
            "cooldown.threshold must be greater than zero".to_string(),
        ));
    }
    if cooldown.window_hours == 0 {
        return Err(ConfigError::Invalid(
            "cooldown.window_hours must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

// ============================================================================
// SECTION: Sweep Section
// ============================================================================

/// Expiry sweep settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweepConfig {
    /// Seconds between sweep passes.
    #[serde(default = "default_sweep_interval_secs")]
    pub interval_secs: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl SweepConfig {
    /// Validates sweep settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] on a zero interval.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "sweep.interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Default sweep interval in seconds.
const fn default_sweep_interval_secs() -> u64 {
    60
}

// ============================================================================
// SECTION: Calendar Section
// ============================================================================

/// Campus calendar settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CalendarConfig {
    /// Weekday names treated as weekly offs, lowercase.
    #[serde(default = "default_weekly_off")]
    pub weekly_off: Vec<String>,
    /// Explicit holiday dates in `yyyy-mm-dd` form.
    #[serde(default)]
    pub holidays: Vec<String>,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            weekly_off: default_weekly_off(),
            holidays: Vec::new(),
        }
    }
}

impl CalendarConfig {
    /// Builds the runtime calendar from the configured names and dates.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] on an unknown weekday name or a
    /// malformed date.
    pub fn build(&self) -> Result<WeekdayCalendar, ConfigError> {
        let mut weekly_off = HashSet::new();
        for name in &self.weekly_off {
            weekly_off.insert(parse_weekday(name)?);
        }
        let format = format_description!("[year]-[month]-[day]");
        let mut holidays = BTreeSet::new();
        for date in &self.holidays {
            let parsed = Date::parse(date, &format).map_err(|_| {
                ConfigError::Invalid(format!(
                    "calendar.holidays entry {date} must be yyyy-mm-dd"
                ))
            })?;
            holidays.insert(parsed);
        }
        Ok(WeekdayCalendar::new(weekly_off, holidays))
    }
}

/// Parses a lowercase weekday name.
fn parse_weekday(name: &str) -> Result<Weekday, ConfigError> {
    match name {
        "monday" => Ok(Weekday::Monday),
        "tuesday" => Ok(Weekday::Tuesday),
        "wednesday" => Ok(Weekday::Wednesday),
        "thursday" => Ok(Weekday::Thursday),
        "friday" => Ok(Weekday::Friday),
        "saturday" => Ok(Weekday::Saturday),
        "sunday" => Ok(Weekday::Sunday),
        other => Err(ConfigError::Invalid(format!(
            "calendar.weekly_off entry {other} is not a weekday name"
        ))),
    }
}

/// Default weekly offs.
fn default_weekly_off() -> Vec<String> {
    vec!["sunday".to_string()]
}

// ============================================================================
// SECTION: Terminal Section
// ============================================================================

/// Gate terminal settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TerminalConfig {
    /// Base URL of the Outpass server.
    #[serde(default = "default_server_url")]
    pub server_url: String,
    /// Path of the on-disk verification cache snapshot.
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,
    /// Path of the durable offline action queue.
    #[serde(default = "default_queue_path")]
    pub queue_path: PathBuf,
    /// Seconds between cache snapshot refreshes.
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,
    /// Seconds between queue drain attempts.
    #[serde(default = "default_drain_secs")]
    pub drain_secs: u64,
    /// Per-request timeout toward the server in milliseconds.
    #[serde(default = "default_terminal_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Retry backoff settings for queue drains.
    #[serde(default)]
    pub backoff: BackoffConfig,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            cache_path: default_cache_path(),
            queue_path: default_queue_path(),
            refresh_secs: default_refresh_secs(),
            drain_secs: default_drain_secs(),
            request_timeout_ms: default_terminal_timeout_ms(),
            backoff: BackoffConfig::default(),
        }
    }
}

impl TerminalConfig {
    /// Validates terminal settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] on a malformed server URL or a zero
    /// interval.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let parsed = url::Url::parse(&self.server_url).map_err(|_| {
            ConfigError::Invalid("terminal.server_url must be a valid url".to_string())
        })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ConfigError::Invalid(
                "terminal.server_url must use http or https".to_string(),
            ));
        }
        if self.refresh_secs == 0 {
            return Err(ConfigError::Invalid(
                "terminal.refresh_secs must be greater than zero".to_string(),
            ));
        }
        if self.drain_secs == 0 {
            return Err(ConfigError::Invalid(
                "terminal.drain_secs must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "terminal.request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        self.backoff.validate()?;
        Ok(())
    }
}

/// Retry backoff settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackoffConfig {
    /// First retry delay in milliseconds.
    #[serde(default = "default_backoff_initial_ms")]
    pub initial_ms: u64,
    /// Upper bound on the retry delay in milliseconds.
    #[serde(default = "default_backoff_max_ms")]
    pub max_ms: u64,
    /// Multiplier applied to the delay after each failed attempt.
    #[serde(default = "default_backoff_multiplier")]
    pub multiplier: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_ms: default_backoff_initial_ms(),
            max_ms: default_backoff_max_ms(),
            multiplier: default_backoff_multiplier(),
        }
    }
}

impl BackoffConfig {
    /// Validates backoff settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] on a zero delay, an inverted bound,
    /// or a multiplier below two.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_ms == 0 {
            return Err(ConfigError::Invalid(
                "terminal.backoff.initial_ms must be greater than zero".to_string(),
            ));
        }
        if self.max_ms < self.initial_ms {
            return Err(ConfigError::Invalid(
                "terminal.backoff.max_ms must be at least initial_ms".to_string(),
            ));
        }
        // A multiplier of one would never reach the cap and so never end.
        if self.multiplier < 2 {
            return Err(ConfigError::Invalid(
                "terminal.backoff.multiplier must be at least two".to_string(),
            ));
        }
        Ok(())
    }
}

/// Default server base URL for terminals.
fn default_server_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

/// Default cache snapshot path.
fn default_cache_path() -> PathBuf {
    PathBuf::from("outpass-cache.json")
}

/// Default offline queue path.
fn default_queue_path() -> PathBuf {
    PathBuf::from("outpass-queue.json")
}

/// Default cache refresh interval in seconds.
const fn default_refresh_secs() -> u64 {
    300
}

/// Default queue drain interval in seconds.
const fn default_drain_secs() -> u64 {
    30
}

/// Default terminal request timeout in milliseconds.
const fn default_terminal_timeout_ms() -> u64 {
    3_000
}

/// Default first retry delay in milliseconds.
const fn default_backoff_initial_ms() -> u64 {
    500
}

/// Default retry delay cap in milliseconds.
const fn default_backoff_max_ms() -> u64 {
    30_000
}

/// Default backoff multiplier.
const fn default_backoff_multiplier() -> u32 {
    2
}

// ============================================================================
// SECTION: Audit Section
// ============================================================================

/// Audit sink selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// JSON lines on standard error.
    #[default]
    Stderr,
    /// JSON lines appended to a file.
    File,
    /// Events are dropped.
    Noop,
}

/// Audit sink settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Selected sink.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Log file path, required for the file sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl AuditConfig {
    /// Validates audit settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the file sink has no usable
    /// path.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sink == AuditSinkKind::File {
            let usable = self
                .path
                .as_ref()
                .is_some_and(|path| !path.as_os_str().is_empty());
            if !usable {
                return Err(ConfigError::Invalid(
                    "audit.path required for the file sink".to_string(),
                ));
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Load Guards
// ============================================================================

/// Resolves the config path and whether it was named explicitly.
///
/// Explicit means the caller or the environment named the file, in which
/// case it must exist.
fn resolve_path(path: Option<&Path>) -> Result<(PathBuf, bool), ConfigError> {
    if let Some(explicit) = path {
        return Ok((explicit.to_path_buf(), true));
    }
    match env::var_os(OUTPASS_CONFIG_ENV) {
        Some(value) => {
            let text = value.into_string().map_err(|_| ConfigError::EnvNotUnicode)?;
            Ok((PathBuf::from(text), true))
        }
        None => Ok((PathBuf::from(DEFAULT_CONFIG_FILE), false)),
    }
}

/// Enforces path length limits before any filesystem access.
fn check_path(path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().len() > MAX_PATH_BYTES {
        return Err(ConfigError::PathTooLong);
    }
    for component in path.components() {
        if let Component::Normal(part) = component
            && part.len() > MAX_COMPONENT_BYTES
        {
            return Err(ConfigError::PathComponentTooLong);
        }
    }
    Ok(())
}

/// Reads the file after checking its size against the limit.
fn read_limited(path: &Path) -> Result<Vec<u8>, ConfigError> {
    let metadata = fs::metadata(path)?;
    if metadata.len() > MAX_CONFIG_BYTES {
        return Err(ConfigError::FileTooLarge);
    }
    let bytes = fs::read(path)?;
    if u64::try_from(bytes.len()).unwrap_or(u64::MAX) > MAX_CONFIG_BYTES {
        return Err(ConfigError::FileTooLarge);
    }
    Ok(bytes)
}
