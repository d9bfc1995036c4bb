//! Application-level configuration loading: role keys, credit price defaults,
//! and the optional catalog-search API key.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "JUKEBOX_BACK_CONFIG_PATH";
/// Environment variable that overrides the venue-admin key.
const ADMIN_KEY_ENV: &str = "JUKEBOX_BACK_ADMIN_KEY";
/// Environment variable that overrides the platform-admin key.
const PLATFORM_KEY_ENV: &str = "JUKEBOX_BACK_PLATFORM_KEY";
/// Environment variable consulted for the catalog search API key.
const CATALOG_KEY_ENV: &str = "YOUTUBE_API_KEY";

/// Built-in venue-admin key; only suitable for local development.
const DEFAULT_ADMIN_KEY: &str = "1234";
/// Built-in platform-admin key; only suitable for local development.
const DEFAULT_PLATFORM_KEY: &str = "123456";
/// What a new venue pays the platform per credit, in whole currency units.
const DEFAULT_BUY_PRICE: u32 = 3;
/// What a new venue charges patrons per credit, in whole currency units.
const DEFAULT_SELL_PRICE: u32 = 5;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    admin_key: String,
    platform_key: String,
    default_buy_price: u32,
    default_sell_price: u32,
    catalog_api_key: Option<String>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in
    /// defaults, then apply environment overrides.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let mut config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), "loaded configuration from file");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        if let Some(key) = non_empty_env(ADMIN_KEY_ENV) {
            config.admin_key = key;
        }
        if let Some(key) = non_empty_env(PLATFORM_KEY_ENV) {
            config.platform_key = key;
        }
        if config.catalog_api_key.is_none() {
            config.catalog_api_key = non_empty_env(CATALOG_KEY_ENV);
        }

        if config.admin_key == DEFAULT_ADMIN_KEY {
            warn!("venue-admin key is the built-in default; set {ADMIN_KEY_ENV} in production");
        }
        if config.platform_key == DEFAULT_PLATFORM_KEY {
            warn!(
                "platform-admin key is the built-in default; set {PLATFORM_KEY_ENV} in production"
            );
        }

        config
    }

    /// Static key required by venue-admin routes.
    pub fn admin_key(&self) -> &str {
        &self.admin_key
    }

    /// Static key required by platform-admin routes.
    pub fn platform_key(&self) -> &str {
        &self.platform_key
    }

    /// Per-credit price a new venue pays the platform.
    pub fn default_buy_price(&self) -> u32 {
        self.default_buy_price
    }

    /// Per-credit price a new venue charges its patrons.
    pub fn default_sell_price(&self) -> u32 {
        self.default_sell_price
    }

    /// API key for the external catalog search provider, when configured.
    pub fn catalog_api_key(&self) -> Option<&str> {
        self.catalog_api_key.as_deref()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            admin_key: DEFAULT_ADMIN_KEY.to_owned(),
            platform_key: DEFAULT_PLATFORM_KEY.to_owned(),
            default_buy_price: DEFAULT_BUY_PRICE,
            default_sell_price: DEFAULT_SELL_PRICE,
            catalog_api_key: None,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    admin_key: Option<String>,
    platform_key: Option<String>,
    default_buy_price: Option<u32>,
    default_sell_price: Option<u32>,
    catalog_api_key: Option<String>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            admin_key: value.admin_key.unwrap_or(defaults.admin_key),
            platform_key: value.platform_key.unwrap_or(defaults.platform_key),
            default_buy_price: value.default_buy_price.unwrap_or(defaults.default_buy_price),
            default_sell_price: value
                .default_sell_price
                .unwrap_or(defaults.default_sell_price),
            catalog_api_key: value.catalog_api_key.filter(|key| !key.is_empty()),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_config_fills_missing_fields_with_defaults() {
        let raw: RawConfig = serde_json::from_str(r#"{"admin_key": "secret"}"#).unwrap();
        let config: AppConfig = raw.into();

        assert_eq!(config.admin_key(), "secret");
        assert_eq!(config.platform_key(), DEFAULT_PLATFORM_KEY);
        assert_eq!(config.default_buy_price(), DEFAULT_BUY_PRICE);
        assert_eq!(config.default_sell_price(), DEFAULT_SELL_PRICE);
        assert!(config.catalog_api_key().is_none());
    }

    #[test]
    fn empty_catalog_key_is_treated_as_absent() {
        let raw: RawConfig = serde_json::from_str(r#"{"catalog_api_key": ""}"#).unwrap();
        let config: AppConfig = raw.into();
        assert!(config.catalog_api_key().is_none());
    }
}
