// Cloudshelf Configuration Module
// Persistent listing configuration storage

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::remote::ListingError;
use crate::selection::DEFAULT_PASSWORD_MARKER;

/// Listing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Public base URL of the index (e.g., https://drive.example.com)
    pub base_url: String,
    /// Whether proxied downloads may be offered
    #[serde(default)]
    pub allow_proxy: bool,
    /// Password-protected route prefixes
    #[serde(default)]
    pub protected_routes: Vec<String>,
    /// File name marking a protected folder; never selectable
    #[serde(default = "default_password_marker")]
    pub password_marker: String,
    /// chrono format string for the "Last Modified" column
    #[serde(default = "default_datetime_format")]
    pub datetime_format: String,
}

fn default_password_marker() -> String {
    DEFAULT_PASSWORD_MARKER.to_string()
}

fn default_datetime_format() -> String {
    "%Y-%m-%d %H:%M:%S".to_string()
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            allow_proxy: false,
            protected_routes: Vec::new(),
            password_marker: default_password_marker(),
            datetime_format: default_datetime_format(),
        }
    }
}

/// Get the path to the config file
pub fn get_config_path() -> PathBuf {
    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")));
    config_dir.join("cloudshelf").join("config.json")
}

/// Load configuration from the default location
pub fn load_config() -> ListingConfig {
    load_config_from(&get_config_path())
}

/// Load configuration from disk, falling back to defaults
pub fn load_config_from(config_path: &Path) -> ListingConfig {
    if config_path.exists() {
        match fs::read_to_string(config_path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to parse listing config: {}", e);
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read listing config: {}", e);
            }
        }
    }

    ListingConfig::default()
}

/// Save configuration to disk
pub fn save_config(config: &ListingConfig, config_path: &Path) -> Result<(), ListingError> {
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(config)?;
    fs::write(config_path, content)?;

    tracing::info!("Listing config saved to {:?}", config_path);
    Ok(())
}

/// Validate listing configuration
pub fn validate_config(config: &ListingConfig) -> Result<(), ListingError> {
    let base = url::Url::parse(&config.base_url)
        .map_err(|e| ListingError::InvalidConfig(format!("Invalid base URL: {}", e)))?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(ListingError::InvalidConfig(
            "Base URL must use http or https".to_string(),
        ));
    }
    if base.query().is_some() || base.fragment().is_some() {
        return Err(ListingError::InvalidConfig(
            "Base URL cannot carry a query or fragment".to_string(),
        ));
    }

    if let Some(route) = config.protected_routes.iter().find(|r| !r.starts_with('/')) {
        return Err(ListingError::InvalidConfig(format!(
            "Protected route must be absolute: {}",
            route
        )));
    }

    if config.password_marker.trim().is_empty() {
        return Err(ListingError::InvalidConfig(
            "Password marker cannot be empty".to_string(),
        ));
    }

    Ok(())
}
