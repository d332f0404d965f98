//! Configuration loading
//!
//! Resolution order, per field:
//! 1. Command-line argument / environment variable (applied by the binary)
//! 2. TOML config file
//! 3. Compiled default
//!
//! A missing config file is not fatal; a malformed one is.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::normalize::{DigitFolding, Normalizer, ARABIC_INDIC_DIGITS, DEFAULT_WIDTH, PERSIAN_DIGITS};
use crate::{Error, Result};

/// Outbound SMS notifier settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// Provider endpoint; `None` disables outbound replies
    pub url: Option<String>,
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_ms: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_attempts: 3,
            initial_backoff_ms: 200,
            max_backoff_ms: 2000,
            timeout_ms: 5000,
        }
    }
}

/// Service configuration as read from TOML
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub bind_addr: String,
    pub database_path: PathBuf,
    /// Secret path segment of the webhook URL; empty disables the webhook
    pub callback_token: String,
    /// Bearer token for admin routes; empty disables admin auth
    pub admin_token: String,
    pub identifier_width: usize,
    /// Ten-character numeral alphabets (digits 0..9) folded to ASCII
    pub numeral_alphabets: Vec<String>,
    pub database_max_lock_wait_ms: u64,
    pub notifier: NotifierConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5800".to_string(),
            database_path: default_database_path(),
            callback_token: String::new(),
            admin_token: String::new(),
            identifier_width: DEFAULT_WIDTH,
            numeral_alphabets: vec![PERSIAN_DIGITS.to_string(), ARABIC_INDIC_DIGITS.to_string()],
            database_max_lock_wait_ms: 5000,
            notifier: NotifierConfig::default(),
        }
    }
}

impl ServiceConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| Error::Config(format!("Invalid config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, or from the default location when `None`
    ///
    /// Falls back to defaults (with a warning) when the file does not exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) => p,
                None => {
                    warn!("Could not determine config directory, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        if !path.exists() {
            warn!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.identifier_width == 0 {
            return Err(Error::Config("identifier_width must be positive".to_string()));
        }
        if self.notifier.max_attempts == 0 {
            return Err(Error::Config("notifier.max_attempts must be at least 1".to_string()));
        }
        self.digit_folding().map(|_| ())
    }

    pub fn digit_folding(&self) -> Result<DigitFolding> {
        DigitFolding::new(&self.numeral_alphabets)
    }

    /// Normalizer built from the configured width and numeral table
    pub fn normalizer(&self) -> Result<Normalizer> {
        Ok(Normalizer::new(self.identifier_width, self.digit_folding()?))
    }
}

/// `<config_dir>/svs/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("svs").join("config.toml"))
}

/// `<data_local_dir>/svs/svs.db`, or `./svs_data/svs.db` when unknown
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("svs"))
        .unwrap_or_else(|| PathBuf::from("./svs_data"))
        .join("svs.db")
}
