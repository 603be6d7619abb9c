//! Application configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! the base layer; a user `config.toml` overrides only the keys it names.
//! Secrets never live in the file: the operator credentials come from the
//! environment (optionally seeded from a `.env` file by the binary).
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [server]
//! bind = "127.0.0.1:8501"   # Address the web UI listens on
//! max_upload_mb = 64        # Request body limit for the publish form
//!
//! [paths]
//! uploads = "uploads"       # Media upload root, also served at /uploads
//! posts = "posts"           # Markdown export directory
//! database = "folio.db"     # SQLite record store
//!
//! [media]
//! max_width = 1280          # Images larger than this are scaled down
//! max_height = 1280
//! quality = 85              # JPEG re-encode quality (1-100)
//!
//! [export]
//! naming = "identity"       # "identity" ({id}-{slug}.md) or "title" ({slug}.md)
//! ```
//!
//! ## Environment
//!
//! | Variable | Meaning |
//! |---|---|
//! | `FOLIO_USERNAME` | Operator user name (required) |
//! | `FOLIO_PASSWORD` | Operator password (required) |
//! | `FOLIO_DATABASE` | Overrides `paths.database` |
//!
//! Unknown keys are rejected to catch typos early.

use crate::export::ExportNaming;
use crate::imaging::{MediaBound, Quality};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const USERNAME_VAR: &str = "FOLIO_USERNAME";
pub const PASSWORD_VAR: &str = "FOLIO_PASSWORD";
pub const DATABASE_VAR: &str = "FOLIO_DATABASE";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("missing environment variable {0}")]
    MissingEnv(&'static str),
    #[error("environment variable {0} must not be empty")]
    EmptySecret(&'static str),
}

/// Application configuration loaded from `config.toml`.
///
/// All fields have sensible defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// Filesystem locations.
    pub paths: PathsConfig,
    /// Upload normalization.
    pub media: MediaConfig,
    /// Markdown export.
    pub export: ExportConfig,
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.bind.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::Validation(format!(
                "server.bind is not a socket address: {:?}",
                self.server.bind
            )));
        }
        if self.server.max_upload_mb == 0 {
            return Err(ConfigError::Validation(
                "server.max_upload_mb must be at least 1".into(),
            ));
        }
        if self.media.max_width == 0 || self.media.max_height == 0 {
            return Err(ConfigError::Validation(
                "media.max_width and media.max_height must be non-zero".into(),
            ));
        }
        if self.media.quality == 0 || self.media.quality > 100 {
            return Err(ConfigError::Validation(
                "media.quality must be 1-100".into(),
            ));
        }
        for (key, value) in [
            ("paths.uploads", &self.paths.uploads),
            ("paths.posts", &self.paths.posts),
            ("paths.database", &self.paths.database),
        ] {
            if value.as_os_str().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        Ok(())
    }

    /// Apply environment overrides (currently only `FOLIO_DATABASE`).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db) = lookup(DATABASE_VAR).filter(|v| !v.trim().is_empty()) {
            self.paths.database = PathBuf::from(db);
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. `"127.0.0.1:8501"`.
    pub bind: String,
    /// Maximum accepted request body, in megabytes.
    pub max_upload_mb: u64,
}

impl ServerConfig {
    pub fn body_limit_bytes(&self) -> usize {
        (self.max_upload_mb as usize).saturating_mul(1024 * 1024)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8501".to_string(),
            max_upload_mb: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub uploads: PathBuf,
    pub posts: PathBuf,
    pub database: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            uploads: PathBuf::from("uploads"),
            posts: PathBuf::from("posts"),
            database: PathBuf::from("folio.db"),
        }
    }
}

/// Upload normalization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MediaConfig {
    /// Images wider than this are scaled down (aspect preserved).
    pub max_width: u32,
    /// Images taller than this are scaled down (aspect preserved).
    pub max_height: u32,
    /// JPEG re-encode quality.
    pub quality: u32,
}

impl MediaConfig {
    pub fn bound(&self) -> MediaBound {
        MediaBound {
            max_width: self.max_width,
            max_height: self.max_height,
        }
    }

    pub fn quality(&self) -> Quality {
        Quality::new(self.quality)
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        let bound = MediaBound::default();
        Self {
            max_width: bound.max_width,
            max_height: bound.max_height,
            quality: Quality::default().value(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    pub naming: ExportNaming,
}

// =============================================================================
// Credentials
// =============================================================================

/// The single operator's credentials.
///
/// `Debug` redacts the password so the struct can sit inside logged state.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Read credentials from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read credentials through `lookup`, which maps a variable name to its
    /// value. Both variables must be present; emptiness is checked by
    /// [`AuthGate::new`](crate::session::AuthGate::new).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let username = lookup(USERNAME_VAR).ok_or(ConfigError::MissingEnv(USERNAME_VAR))?;
        let password = lookup(PASSWORD_VAR).ok_or(ConfigError::MissingEnv(PASSWORD_VAR))?;
        Ok(Self { username, password })
    }
}

/// Outcome of loading a `.env` file. A missing file means there was nothing
/// to load; any other error (unreadable file, malformed line) is returned.
pub fn optional_env_file(
    result: Result<PathBuf, dotenvy::Error>,
) -> Result<Option<PathBuf>, dotenvy::Error> {
    match result {
        Ok(path) => Ok(Some(path)),
        Err(err) if err.not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(AppConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<AppConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: AppConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(dir: &Path) -> Result<AppConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(dir)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Simple Folio Configuration
# ===========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Unknown keys will cause an error.
#
# Credentials are NOT configured here. Set them in the environment or a
# .env file next to the binary:
#   FOLIO_USERNAME=...
#   FOLIO_PASSWORD=...
# FOLIO_DATABASE, when set, overrides paths.database.

# ---------------------------------------------------------------------------
# Web server
# ---------------------------------------------------------------------------
[server]
# Address the web UI listens on.
bind = "127.0.0.1:8501"

# Largest accepted publish request (all evidence files together), in MB.
max_upload_mb = 64

# ---------------------------------------------------------------------------
# Filesystem locations (relative to the working directory)
# ---------------------------------------------------------------------------
[paths]
# Uploaded evidence files. Served read-only at /uploads.
uploads = "uploads"

# One markdown document per published record.
posts = "posts"

# SQLite record store.
database = "folio.db"

# ---------------------------------------------------------------------------
# Uploaded images
# ---------------------------------------------------------------------------
[media]
# Images larger than this bound are scaled down, keeping the aspect ratio.
# Smaller images are stored untouched. Videos are never modified.
max_width = 1280
max_height = 1280

# JPEG re-encode quality (1 = worst, 100 = best).
quality = 85

# ---------------------------------------------------------------------------
# Markdown export
# ---------------------------------------------------------------------------
[export]
# "identity": posts/{id}-{premise}.md, one file per record.
# "title":    posts/{premise}.md, records with the same premise share a file
#             and the newest one wins.
naming = "identity"
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_env_file_is_not_an_error() {
        let tmp = TempDir::new().unwrap();
        let result = dotenvy::from_path(tmp.path().join(".env")).map(|_| tmp.path().join(".env"));
        assert!(optional_env_file(result).unwrap().is_none());
    }

    #[test]
    fn malformed_env_file_is_reported() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(".env");
        fs::write(&path, "FOLIO_USERNAME operador\n").unwrap();
        let result = dotenvy::from_path(&path).map(|_| path.clone());
        assert!(optional_env_file(result).is_err());
    }

    #[test]
    fn loaded_env_file_reports_its_path() {
        let path = PathBuf::from("/srv/folio/.env");
        assert_eq!(optional_env_file(Ok(path.clone())).unwrap(), Some(path));
    }

    #[test]
    fn default_config_values() {
        let config = AppConfig::default();
        assert_eq!(config.server.bind, "127.0.0.1:8501");
        assert_eq!(config.server.max_upload_mb, 64);
        assert_eq!(config.paths.uploads, PathBuf::from("uploads"));
        assert_eq!(config.paths.posts, PathBuf::from("posts"));
        assert_eq!(config.paths.database, PathBuf::from("folio.db"));
        assert_eq!(config.media.bound(), MediaBound::default());
        assert_eq!(config.media.quality().value(), 85);
        assert_eq!(config.export.naming, ExportNaming::Identity);
    }

    #[test]
    fn validate_default_config_passes() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[media]
max_width = 800
"#;
        let config = resolve_config(stock_defaults_value(), Some(toml::from_str(toml).unwrap()))
            .unwrap();
        assert_eq!(config.media.max_width, 800);
        assert_eq!(config.media.max_height, 1280);
        assert_eq!(config.server.bind, "127.0.0.1:8501");
    }

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.server.max_upload_mb, 64);
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("config.toml"),
            r#"
[server]
bind = "0.0.0.0:9000"

[export]
naming = "title"
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.export.naming, ExportNaming::Title);
        assert_eq!(config.paths.uploads, PathBuf::from("uploads"));
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.toml"), "this is not valid toml [[[").unwrap();
        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn stock_config_toml_parses_to_defaults() {
        let value: toml::Value = toml::from_str(stock_config_toml()).unwrap();
        let config = resolve_config(stock_defaults_value(), Some(value)).unwrap();
        let defaults = AppConfig::default();
        assert_eq!(config.server.bind, defaults.server.bind);
        assert_eq!(config.media.quality, defaults.media.quality);
        assert_eq!(config.export.naming, defaults.export.naming);
    }

    // =========================================================================
    // merge_toml
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str("a = 1\nb = 2").unwrap();
        let overlay: toml::Value = toml::from_str("b = 3").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"].as_integer(), Some(1));
        assert_eq!(merged["b"].as_integer(), Some(3));
    }

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str(
            r#"
[paths]
uploads = "uploads"
posts = "posts"
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[paths]
posts = "export"
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["paths"]["uploads"].as_str(), Some("uploads"));
        assert_eq!(merged["paths"]["posts"].as_str(), Some("export"));
    }

    // =========================================================================
    // Unknown keys and validation
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let overlay: toml::Value = toml::from_str("[server]\nport = 80").unwrap();
        assert!(resolve_config(stock_defaults_value(), Some(overlay)).is_err());
    }

    #[test]
    fn unknown_section_rejected() {
        let overlay: toml::Value = toml::from_str("[colors]\nbackground = \"#fff\"").unwrap();
        assert!(resolve_config(stock_defaults_value(), Some(overlay)).is_err());
    }

    #[test]
    fn unknown_naming_rejected() {
        let overlay: toml::Value = toml::from_str("[export]\nnaming = \"random\"").unwrap();
        assert!(resolve_config(stock_defaults_value(), Some(overlay)).is_err());
    }

    #[test]
    fn validate_bad_bind_address() {
        let mut config = AppConfig::default();
        config.server.bind = "localhost".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_zero_upload_limit() {
        let mut config = AppConfig::default();
        config.server.max_upload_mb = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_zero_bound() {
        let mut config = AppConfig::default();
        config.media.max_height = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_quality_boundaries() {
        let mut config = AppConfig::default();
        config.media.quality = 100;
        assert!(config.validate().is_ok());
        config.media.quality = 101;
        assert!(config.validate().is_err());
        config.media.quality = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_empty_path() {
        let mut config = AppConfig::default();
        config.paths.posts = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn body_limit_in_bytes() {
        let server = ServerConfig {
            max_upload_mb: 2,
            ..ServerConfig::default()
        };
        assert_eq!(server.body_limit_bytes(), 2 * 1024 * 1024);
    }

    // =========================================================================
    // Environment
    // =========================================================================

    #[test]
    fn database_env_overrides_path() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[(DATABASE_VAR, "/var/lib/folio.db")]));
        assert_eq!(config.paths.database, PathBuf::from("/var/lib/folio.db"));
    }

    #[test]
    fn blank_database_env_is_ignored() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[(DATABASE_VAR, "  ")]));
        assert_eq!(config.paths.database, PathBuf::from("folio.db"));
    }

    #[test]
    fn credentials_from_lookup() {
        let creds =
            Credentials::from_lookup(env(&[(USERNAME_VAR, "ana"), (PASSWORD_VAR, "s3cret")]))
                .unwrap();
        assert_eq!(creds, Credentials::new("ana", "s3cret"));
    }

    #[test]
    fn credentials_missing_password() {
        let err = Credentials::from_lookup(env(&[(USERNAME_VAR, "ana")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv(PASSWORD_VAR)));
    }

    #[test]
    fn credentials_debug_redacts_password() {
        let rendered = format!("{:?}", Credentials::new("ana", "s3cret"));
        assert!(rendered.contains("ana"));
        assert!(!rendered.contains("s3cret"));
    }
}
