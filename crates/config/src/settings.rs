// Export settings
// Loaded from ~/.config/stripe-csv/settings.json (override: STRIPE_CSV_CONFIG)

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that points at an alternate settings file.
pub const CONFIG_ENV: &str = "STRIPE_CSV_CONFIG";

pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Export
    #[serde(rename = "export.defaultCurrency")]
    pub default_currency: String,

    #[serde(rename = "export.outputDir")]
    pub output_dir: PathBuf,

    // Stripe
    /// Connect account to act as (`acct_...`), sent as `Stripe-Account`.
    #[serde(rename = "stripe.account")]
    pub stripe_account: Option<String>,

    #[serde(rename = "stripe.apiBase")]
    pub api_base: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_currency: DEFAULT_CURRENCY.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            stripe_account: None,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            if !path.is_empty() {
                return PathBuf::from(path);
            }
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("stripe-csv")
            .join("settings.json")
    }

    /// Load settings from the default location, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load settings from `path`. A missing file means defaults; an
    /// unreadable or malformed one logs a warning and also means defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            log::debug!("no settings file at {}, using defaults", path.display());
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(settings) => {
                    log::debug!("loaded settings from {}", path.display());
                    settings
                }
                Err(e) => {
                    log::warn!("error parsing {}: {}; using default settings", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("error reading {}: {}; using default settings", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse settings JSON. Lines starting with `//` are comments.
    pub fn parse(contents: &str) -> Result<Self, String> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");

        if cleaned.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_json::from_str(&cleaned).map_err(|e| e.to_string())
    }
}
