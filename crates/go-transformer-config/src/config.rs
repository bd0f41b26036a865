// crates/go-transformer-config/src/config.rs
// ============================================================================
// Module: Go Transformer Configuration
// Description: Configuration loading and validation for the transformer.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file when one is named explicitly or
//! through `GO_TRANSFORMER_CONFIG`; otherwise built-in defaults apply. Loaded
//! files are size-limited and validated before use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable used to name the config file.
pub const CONFIG_ENV_VAR: &str = "GO_TRANSFORMER_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 256 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Units accepted in Go duration strings, longest first.
const GO_DURATION_UNITS: [&str; 7] = ["ns", "us", "µs", "ms", "h", "m", "s"];

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Go transformer configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TransformerConfig {
    /// External tool-chain programs.
    #[serde(default)]
    pub toolchain: ToolchainConfig,
    /// Build invocation settings.
    #[serde(default)]
    pub build: BuildConfig,
    /// Test invocation settings.
    #[serde(default)]
    pub test: TestConfig,
    /// Legacy workspace settings.
    #[serde(default)]
    pub workspace: WorkspaceConfig,
}

impl TransformerConfig {
    /// Loads configuration using the default resolution rules.
    ///
    /// An explicit `path` wins, then [`CONFIG_ENV_VAR`]; with neither, the
    /// built-in defaults are returned.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(resolved) = resolve_path(path)? else {
            return Ok(Self::default());
        };
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", resolved.display())))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
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
        self.toolchain.validate()?;
        self.build.validate()?;
        self.test.validate()
    }
}

/// External tool-chain programs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ToolchainConfig {
    /// Go tool used for `build`, `list`, and `env`.
    #[serde(default = "default_go")]
    pub go: String,
    /// Test runner wrapping `go test` with a JSON report.
    #[serde(default = "default_test_runner")]
    pub test_runner: String,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            go: default_go(),
            test_runner: default_test_runner(),
        }
    }
}

impl ToolchainConfig {
    /// Validates tool-chain program names.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_token("toolchain.go", &self.go)?;
        validate_token("toolchain.test_runner", &self.test_runner)
    }
}

/// Build invocation settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BuildConfig {
    /// Symbol receiving the contract version through `-ldflags -X`.
    #[serde(default = "default_version_symbol")]
    pub version_symbol: String,
    /// Directory holding one main package per binary target.
    #[serde(default = "default_command_dir")]
    pub command_dir: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            version_symbol: default_version_symbol(),
            command_dir: default_command_dir(),
        }
    }
}

impl BuildConfig {
    /// Validates build settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_token("build.version_symbol", &self.version_symbol)?;
        validate_relative_dir("build.command_dir", &self.command_dir)
    }
}

/// Coverage modes accepted by `go test -covermode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverMode {
    /// Records whether each statement ran.
    Set,
    /// Counts how often each statement ran.
    Count,
    /// Like `count`, safe for parallel tests.
    Atomic,
}

impl CoverMode {
    /// Returns the flag value passed to `go test`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::Count => "count",
            Self::Atomic => "atomic",
        }
    }
}

/// Test invocation settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TestConfig {
    /// Go duration passed as `-timeout`.
    #[serde(default = "default_test_timeout")]
    pub timeout: String,
    /// Coverage mode passed as `-covermode`.
    #[serde(default = "default_cover_mode")]
    pub cover_mode: CoverMode,
    /// Substring selecting integration packages by import path.
    #[serde(default = "default_integration")]
    pub integration_pattern: String,
    /// Build tag added for the integration pass.
    #[serde(default = "default_integration")]
    pub integration_tag: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            timeout: default_test_timeout(),
            cover_mode: default_cover_mode(),
            integration_pattern: default_integration(),
            integration_tag: default_integration(),
        }
    }
}

impl TestConfig {
    /// Validates test settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if !is_go_duration(&self.timeout) {
            return Err(ConfigError::Invalid(format!(
                "test.timeout must be a go duration, got {:?}",
                self.timeout
            )));
        }
        if self.integration_pattern.is_empty() {
            return Err(ConfigError::Invalid("test.integration_pattern must be non-empty".to_string()));
        }
        validate_token("test.integration_tag", &self.integration_tag)?;
        if self.integration_tag.contains(',') {
            return Err(ConfigError::Invalid("test.integration_tag must not contain ','".to_string()));
        }
        Ok(())
    }
}

/// How a legacy source tree is made visible under `$GOPATH/src`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkStrategy {
    /// Bind mount where the platform supports it, falling back to a symlink.
    #[default]
    Auto,
    /// Bind mount only.
    BindMount,
    /// Symbolic link only.
    Symlink,
}

/// Legacy workspace settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct WorkspaceConfig {
    /// Linking strategy for the GOPATH compatibility path.
    #[serde(default)]
    pub link_strategy: LinkStrategy,
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
// SECTION: Defaults
// ============================================================================

/// Default Go tool.
fn default_go() -> String {
    "go".to_string()
}

/// Default test runner.
fn default_test_runner() -> String {
    "gotestsum".to_string()
}

/// Default version symbol.
fn default_version_symbol() -> String {
    "version.Version".to_string()
}

/// Default command directory.
fn default_command_dir() -> String {
    "cmd".to_string()
}

/// Default test timeout.
fn default_test_timeout() -> String {
    "5m".to_string()
}

/// Default coverage mode.
const fn default_cover_mode() -> CoverMode {
    CoverMode::Atomic
}

/// Default integration pattern and tag.
fn default_integration() -> String {
    "integration".to_string()
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from an explicit value or the environment.
fn resolve_path(path: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(path) = path {
        return Ok(Some(path.to_path_buf()));
    }
    match env::var(CONFIG_ENV_VAR) {
        Ok(env_path) if env_path.len() > MAX_TOTAL_PATH_LENGTH => {
            Err(ConfigError::Invalid("config path exceeds max length".to_string()))
        }
        Ok(env_path) if !env_path.trim().is_empty() => Ok(Some(PathBuf::from(env_path))),
        _ => Ok(None),
    }
}

/// Validates the resolved path against length limits.
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

/// Validates a non-empty value without whitespace.
fn validate_token(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if value.chars().any(char::is_whitespace) {
        return Err(ConfigError::Invalid(format!("{field} must not contain whitespace")));
    }
    Ok(())
}

/// Validates a relative directory that stays inside the source tree.
fn validate_relative_dir(field: &str, value: &str) -> Result<(), ConfigError> {
    validate_token(field, value)?;
    for component in Path::new(value).components() {
        match component {
            Component::Normal(segment) if segment.len() <= MAX_PATH_COMPONENT_LENGTH => {}
            Component::Normal(_) => {
                return Err(ConfigError::Invalid(format!("{field} path component too long")));
            }
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "{field} must be a relative path without '.' or '..'"
                )));
            }
        }
    }
    Ok(())
}

/// Returns true when `value` parses as a positive Go duration such as `90s` or `1h30m`.
fn is_go_duration(value: &str) -> bool {
    let mut rest = value;
    if rest.is_empty() {
        return false;
    }
    while !rest.is_empty() {
        let digits = rest.find(|ch: char| !(ch.is_ascii_digit() || ch == '.')).unwrap_or(rest.len());
        let number = &rest[..digits];
        if number.is_empty() || number.starts_with('.') || number.ends_with('.') {
            return false;
        }
        if number.matches('.').count() > 1 {
            return false;
        }
        rest = &rest[digits..];
        let Some(unit) = GO_DURATION_UNITS.iter().find(|unit| rest.starts_with(**unit)) else {
            return false;
        };
        rest = &rest[unit.len()..];
    }
    true
}
