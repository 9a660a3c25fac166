// crates/authority-gate-config/src/config.rs
// ============================================================================
// Module: Authority Gate Configuration
// Description: Configuration loading and validation for the authority gate.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: authority-gate-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section is optional and falls back to the documented defaults, but
//! any value that is present must pass validation or loading fails.
//! Security posture: config inputs are untrusted; the authority endpoint is
//! assembled only from validated parts so no setting can smuggle a query
//! string or alternate scheme into delegation calls.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use authority_gate_core::DEFAULT_MIN_TIMESTAMP;
use authority_gate_core::ValidationPolicy;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "authority-gate.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "AUTHORITY_GATE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;

/// Default authority host.
pub const DEFAULT_AUTHORITY_HOST: &str = "local.bloglovin.com";
/// Default authority port.
pub const DEFAULT_AUTHORITY_PORT: u16 = 80;
/// Default authority endpoint path.
pub const DEFAULT_AUTHORITY_PATH: &str = "/auth";
/// Default value of the `return` query marker.
pub const DEFAULT_RETURN_MARKER: &str = "API";
/// Default delegation timeout in milliseconds.
pub const DEFAULT_AUTHORITY_TIMEOUT_MS: u64 = 3_000;
/// Minimum delegation timeout in milliseconds.
pub(crate) const MIN_AUTHORITY_TIMEOUT_MS: u64 = 100;
/// Maximum delegation timeout in milliseconds.
pub(crate) const MAX_AUTHORITY_TIMEOUT_MS: u64 = 30_000;
/// Default cap on authority response bodies.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 64 * 1024;
/// Upper bound for the authority response cap.
pub(crate) const MAX_RESPONSE_BYTES_LIMIT: usize = 1024 * 1024;
/// Default user agent for delegation calls.
pub const DEFAULT_USER_AGENT: &str = concat!("authority-gate/", env!("CARGO_PKG_VERSION"));
/// Maximum user agent length.
pub(crate) const MAX_USER_AGENT_LENGTH: usize = 256;
/// Maximum authority host length.
pub(crate) const MAX_HOST_LENGTH: usize = 253;
/// Maximum authority endpoint path length.
pub(crate) const MAX_ENDPOINT_PATH_LENGTH: usize = 1024;
/// Maximum return marker length.
pub(crate) const MAX_RETURN_MARKER_LENGTH: usize = 64;
/// Default cap on buffered payload bodies.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 1024 * 1024;
/// Upper bound for the payload body cap.
pub(crate) const MAX_PAYLOAD_BYTES_LIMIT: usize = 16 * 1024 * 1024;

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Authority gate configuration root.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GateConfig {
    /// Remote authority endpoint and call limits.
    #[serde(default)]
    pub authority: AuthorityConfig,
    /// Local validation and payload delegation settings.
    #[serde(default)]
    pub gate: GatePolicyConfig,
    /// Audit sink selection.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl GateConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order: explicit path, then [`CONFIG_ENV_VAR`], then
    /// `authority-gate.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::parse(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.authority.validate()?;
        self.gate.validate()?;
        self.audit.validate()?;
        Ok(())
    }

    /// Returns the local validation policy derived from `[gate]`.
    #[must_use]
    pub const fn validation_policy(&self) -> ValidationPolicy {
        self.gate.validation_policy()
    }
}

// ============================================================================
// SECTION: Authority Config
// ============================================================================

/// Transport scheme used to reach the authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityScheme {
    /// Plain HTTP.
    #[default]
    Http,
    /// HTTP over TLS.
    Https,
}

impl AuthorityScheme {
    /// Returns the URL scheme label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

/// Remote authority endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthorityConfig {
    /// URL scheme.
    #[serde(default)]
    pub scheme: AuthorityScheme,
    /// Bare hostname or bracketed IPv6 literal.
    #[serde(default = "default_authority_host")]
    pub host: String,
    /// TCP port.
    #[serde(default = "default_authority_port")]
    pub port: u16,
    /// Endpoint path, starting with `/`.
    #[serde(default = "default_authority_path")]
    pub path: String,
    /// Value of the leading `return` query parameter.
    #[serde(default = "default_return_marker")]
    pub return_marker: String,
    /// Whole-call deadline in milliseconds.
    #[serde(default = "default_authority_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum accepted response body size in bytes.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
    /// `User-Agent` header sent on delegation calls.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            scheme: AuthorityScheme::Http,
            host: default_authority_host(),
            port: DEFAULT_AUTHORITY_PORT,
            path: default_authority_path(),
            return_marker: default_return_marker(),
            timeout_ms: DEFAULT_AUTHORITY_TIMEOUT_MS,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            user_agent: default_user_agent(),
        }
    }
}

impl AuthorityConfig {
    /// Returns the endpoint URL without a query string.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}://{}:{}{}", self.scheme.as_str(), self.host, self.port, self.path)
    }

    /// Returns the delegation deadline as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validates authority endpoint configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the endpoint settings are invalid.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_host(&self.host)?;
        if self.port == 0 {
            return Err(ConfigError::Invalid("authority.port must be non-zero".to_string()));
        }
        validate_endpoint_path(&self.path)?;
        validate_return_marker(&self.return_marker)?;
        validate_timeout_range(
            "authority.timeout_ms",
            self.timeout_ms,
            MIN_AUTHORITY_TIMEOUT_MS,
            MAX_AUTHORITY_TIMEOUT_MS,
        )?;
        validate_size_range(
            "authority.max_response_bytes",
            self.max_response_bytes,
            MAX_RESPONSE_BYTES_LIMIT,
        )?;
        validate_user_agent(&self.user_agent)?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Gate Policy Config
// ============================================================================

/// Local validation and payload delegation settings.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct GatePolicyConfig {
    /// Lowest accepted request timestamp, in UNIX seconds.
    #[serde(default = "default_min_timestamp")]
    pub min_timestamp: i64,
    /// Enables the second, payload-level authorization call.
    #[serde(default)]
    pub payload_delegation: bool,
    /// Maximum buffered request body size for payload delegation.
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
}

impl Default for GatePolicyConfig {
    fn default() -> Self {
        Self {
            min_timestamp: DEFAULT_MIN_TIMESTAMP,
            payload_delegation: false,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

impl GatePolicyConfig {
    /// Returns the local validation policy.
    #[must_use]
    pub const fn validation_policy(&self) -> ValidationPolicy {
        ValidationPolicy {
            min_timestamp: self.min_timestamp,
        }
    }

    /// Validates gate policy configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when gate settings are invalid.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.min_timestamp < 0 {
            return Err(ConfigError::Invalid(
                "gate.min_timestamp must be non-negative".to_string(),
            ));
        }
        validate_size_range(
            "gate.max_payload_bytes",
            self.max_payload_bytes,
            MAX_PAYLOAD_BYTES_LIMIT,
        )
    }
}

// ============================================================================
// SECTION: Audit Config
// ============================================================================

/// Audit sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to `audit.path`.
    File,
    /// Audit disabled.
    None,
}

/// Audit configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuditConfig {
    /// Sink selection.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Log file path, required when `sink = "file"`.
    #[serde(default)]
    pub path: Option<String>,
}

impl AuditConfig {
    /// Validates audit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when audit settings are invalid.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, self.path.as_deref()) {
            (AuditSinkKind::File, Some(path)) => validate_path_string("audit.path", path),
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit.sink=file requires audit.path".to_string()))
            }
            (AuditSinkKind::Stderr | AuditSinkKind::None, Some(_)) => Err(ConfigError::Invalid(
                "audit.path only allowed when sink=file".to_string(),
            )),
            (AuditSinkKind::Stderr | AuditSinkKind::None, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates the authority host as a bare hostname or bracketed IPv6 literal.
fn validate_host(host: &str) -> Result<(), ConfigError> {
    if host.is_empty() {
        return Err(ConfigError::Invalid("authority.host must be non-empty".to_string()));
    }
    if host.len() > MAX_HOST_LENGTH {
        return Err(ConfigError::Invalid("authority.host exceeds max length".to_string()));
    }
    let valid = match host.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
        Some(literal) => {
            !literal.is_empty()
                && literal.chars().all(|ch| ch.is_ascii_hexdigit() || ch == ':' || ch == '.')
        }
        None => host.chars().all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '.' | '_')),
    };
    if !valid {
        return Err(ConfigError::Invalid(
            "authority.host must be a bare hostname without scheme, port, or path".to_string(),
        ));
    }
    Ok(())
}

/// Validates the authority endpoint path.
fn validate_endpoint_path(path: &str) -> Result<(), ConfigError> {
    if !path.starts_with('/') {
        return Err(ConfigError::Invalid("authority.path must start with '/'".to_string()));
    }
    if path.len() > MAX_ENDPOINT_PATH_LENGTH {
        return Err(ConfigError::Invalid("authority.path exceeds max length".to_string()));
    }
    if path.chars().any(|ch| matches!(ch, '?' | '#') || ch.is_whitespace() || ch.is_control()) {
        return Err(ConfigError::Invalid(
            "authority.path must not contain query, fragment, or whitespace".to_string(),
        ));
    }
    Ok(())
}

/// Validates the return marker as a non-empty URL-safe token.
fn validate_return_marker(marker: &str) -> Result<(), ConfigError> {
    if marker.is_empty() || marker.len() > MAX_RETURN_MARKER_LENGTH {
        return Err(ConfigError::Invalid(format!(
            "authority.return_marker must be 1..={MAX_RETURN_MARKER_LENGTH} characters"
        )));
    }
    if !marker.chars().all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '~')) {
        return Err(ConfigError::Invalid("authority.return_marker must be url-safe".to_string()));
    }
    Ok(())
}

/// Validates the user agent header value.
fn validate_user_agent(value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid("authority.user_agent must be non-empty".to_string()));
    }
    if value.len() > MAX_USER_AGENT_LENGTH {
        return Err(ConfigError::Invalid("authority.user_agent exceeds max length".to_string()));
    }
    if !value.bytes().all(|byte| (0x20..0x7f).contains(&byte)) {
        return Err(ConfigError::Invalid(
            "authority.user_agent must be printable ascii".to_string(),
        ));
    }
    Ok(())
}

/// Validates a timeout value against bounds.
fn validate_timeout_range(
    field: &str,
    value_ms: u64,
    min_ms: u64,
    max_ms: u64,
) -> Result<(), ConfigError> {
    if value_ms < min_ms || value_ms > max_ms {
        return Err(ConfigError::Invalid(format!(
            "{field} must be between {min_ms} and {max_ms} milliseconds",
        )));
    }
    Ok(())
}

/// Validates a byte cap is non-zero and within its limit.
fn validate_size_range(field: &str, value: usize, max: usize) -> Result<(), ConfigError> {
    if value == 0 || value > max {
        return Err(ConfigError::Invalid(format!("{field} must be between 1 and {max} bytes")));
    }
    Ok(())
}

/// Default authority host.
fn default_authority_host() -> String {
    DEFAULT_AUTHORITY_HOST.to_string()
}

/// Default authority port.
const fn default_authority_port() -> u16 {
    DEFAULT_AUTHORITY_PORT
}

/// Default authority path.
fn default_authority_path() -> String {
    DEFAULT_AUTHORITY_PATH.to_string()
}

/// Default return marker.
fn default_return_marker() -> String {
    DEFAULT_RETURN_MARKER.to_string()
}

/// Default authority timeout in milliseconds.
const fn default_authority_timeout_ms() -> u64 {
    DEFAULT_AUTHORITY_TIMEOUT_MS
}

/// Default authority response cap.
const fn default_max_response_bytes() -> usize {
    DEFAULT_MAX_RESPONSE_BYTES
}

/// Default user agent.
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

/// Default timestamp floor.
const fn default_min_timestamp() -> i64 {
    DEFAULT_MIN_TIMESTAMP
}

/// Default payload body cap.
const fn default_max_payload_bytes() -> usize {
    DEFAULT_MAX_PAYLOAD_BYTES
}
