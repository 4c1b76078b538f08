//! Process settings from the environment (optionally seeded from `.env`).

use crate::error::ConfigError;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_ENTITY_CONFIG_PATH: &str = "entities.json";
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 50;

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: Option<String>,
    pub bind_addr: String,
    pub entity_config_path: String,
    pub max_body_bytes: usize,
    /// Upper bound for `pageSize` on index requests.
    pub max_page_size: u32,
    /// Shared secret for endpoints that authenticate by secret instead of user.
    pub access_secret: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_url: None,
            bind_addr: DEFAULT_BIND_ADDR.into(),
            entity_config_path: DEFAULT_ENTITY_CONFIG_PATH.into(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            access_secret: None,
        }
    }
}

impl Settings {
    /// Load `.env` if present, then read the environment.
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!(error = %e, "failed to read .env");
            }
        }
        Self::from_env()
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Settings::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Ok(Settings {
            database_url: non_empty("DATABASE_URL"),
            bind_addr: non_empty("BIND_ADDR").unwrap_or(defaults.bind_addr),
            entity_config_path: non_empty("ENTITY_CONFIG_PATH").unwrap_or(defaults.entity_config_path),
            max_body_bytes: parse_number(non_empty("MAX_BODY_BYTES"), "MAX_BODY_BYTES")?
                .unwrap_or(defaults.max_body_bytes),
            max_page_size: parse_number(non_empty("MAX_PAGE_SIZE"), "MAX_PAGE_SIZE")?
                .unwrap_or(defaults.max_page_size)
                .max(1),
            access_secret: non_empty("ACCESS_SECRET"),
        })
    }
}

fn parse_number<T: std::str::FromStr>(raw: Option<String>, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.map(|v| {
        v.trim().parse::<T>().map_err(|e| ConfigError::Setting {
            key,
            message: e.to_string(),
        })
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let env: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(s.max_page_size, 50);
        assert!(s.database_url.is_none());
        assert!(s.access_secret.is_none());
    }

    #[test]
    fn reads_overrides() {
        let s = settings(&[("MAX_PAGE_SIZE", "100"), ("ACCESS_SECRET", "k"), ("BIND_ADDR", " ")]).unwrap();
        assert_eq!(s.max_page_size, 100);
        assert_eq!(s.access_secret.as_deref(), Some("k"));
        assert_eq!(s.bind_addr, DEFAULT_BIND_ADDR);
    }

    #[test]
    fn rejects_bad_numbers() {
        assert!(matches!(
            settings(&[("MAX_BODY_BYTES", "lots")]),
            Err(ConfigError::Setting { key: "MAX_BODY_BYTES", .. })
        ));
    }
}
