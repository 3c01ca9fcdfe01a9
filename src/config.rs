//! Configuration types.

use std::path::PathBuf;

use crate::dialogs::messages::Locale;
use crate::error::ConfigError;

/// Default port used by Bot Framework samples and the emulator.
pub const DEFAULT_PORT: u16 = 3978;

/// Where conversation and user state is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// Process-local map. State is lost on restart.
    Memory,
    /// libSQL database file at the given path.
    LibSql(PathBuf),
}

/// Bot server configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Interface the HTTP server binds to.
    pub host: String,
    /// HTTP port.
    pub port: u16,
    /// Language for all user-facing messages.
    pub locale: Locale,
    /// State storage backend.
    pub storage: StorageBackend,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            locale: Locale::default(),
            storage: StorageBackend::Memory,
        }
    }
}

impl BotConfig {
    /// Load configuration from the environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let host = lookup("ACAI_BOT_HOST")
            .filter(|h| !h.trim().is_empty())
            .unwrap_or(defaults.host);

        let port = match lookup("PORT").or_else(|| lookup("port")) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::InvalidValue {
                key: "PORT".to_string(),
                message: format!("{raw:?} is not a valid port: {e}"),
            })?,
            None => defaults.port,
        };

        let locale = match lookup("ACAI_BOT_LOCALE") {
            Some(raw) => raw.parse::<Locale>().map_err(|message| ConfigError::InvalidValue {
                key: "ACAI_BOT_LOCALE".to_string(),
                message,
            })?,
            None => defaults.locale,
        };

        let storage = match lookup("ACAI_BOT_DB_PATH") {
            Some(path) if !path.trim().is_empty() => StorageBackend::LibSql(PathBuf::from(path)),
            _ => StorageBackend::Memory,
        };

        Ok(Self {
            host,
            port,
            locale,
            storage,
        })
    }

    /// Socket address string for the HTTP listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_env_empty() {
        let config = BotConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.locale, Locale::English);
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.bind_addr(), "0.0.0.0:3978");
    }

    #[test]
    fn reads_all_values() {
        let config = BotConfig::from_lookup(lookup_from(&[
            ("ACAI_BOT_HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("ACAI_BOT_LOCALE", "pt-BR"),
            ("ACAI_BOT_DB_PATH", "./data/state.db"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.locale, Locale::Portuguese);
        assert_eq!(
            config.storage,
            StorageBackend::LibSql(PathBuf::from("./data/state.db"))
        );
    }

    #[test]
    fn lowercase_port_is_accepted() {
        let config = BotConfig::from_lookup(lookup_from(&[("port", "4000")])).unwrap();
        assert_eq!(config.port, 4000);
    }

    #[test]
    fn invalid_port_is_rejected() {
        let err = BotConfig::from_lookup(lookup_from(&[("PORT", "not-a-port")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "PORT"));
    }

    #[test]
    fn invalid_locale_is_rejected() {
        let err = BotConfig::from_lookup(lookup_from(&[("ACAI_BOT_LOCALE", "fr")])).unwrap_err();
        assert!(err.to_string().contains("ACAI_BOT_LOCALE"));
    }

    #[test]
    fn blank_db_path_means_memory() {
        let config = BotConfig::from_lookup(lookup_from(&[("ACAI_BOT_DB_PATH", "  ")])).unwrap();
        assert_eq!(config.storage, StorageBackend::Memory);
    }
}
