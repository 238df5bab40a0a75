use std::net::SocketAddr;
use thiserror::Error;

pub const MAX_PAGE_LIMIT: u32 = 500;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is not valid: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Runtime settings, read from `OFFERS_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: String,
    pub addr: SocketAddr,
    pub max_workers: usize,
    /// Page size used when `/offers` is called without `limit`.
    pub page_limit: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: "offers.sqlite3".to_string(),
            addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            max_workers: 8,
            page_limit: 50,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup. Unset or blank keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(path) = get("OFFERS_DB_PATH") {
            config.db_path = path.trim().to_string();
        }
        if let Some(addr) = get("OFFERS_ADDR") {
            config.addr = parse_var("OFFERS_ADDR", &addr)?;
        }
        if let Some(workers) = get("OFFERS_MAX_WORKERS") {
            config.max_workers = parse_var("OFFERS_MAX_WORKERS", &workers)?;
            if config.max_workers == 0 {
                return Err(invalid("OFFERS_MAX_WORKERS", &workers, "must be at least 1"));
            }
        }
        if let Some(limit) = get("OFFERS_PAGE_LIMIT") {
            config.page_limit = parse_var("OFFERS_PAGE_LIMIT", &limit)?;
            if config.page_limit == 0 || config.page_limit > MAX_PAGE_LIMIT {
                return Err(invalid(
                    "OFFERS_PAGE_LIMIT",
                    &limit,
                    &format!("must be between 1 and {MAX_PAGE_LIMIT}"),
                ));
            }
        }

        Ok(config)
    }
}

fn parse_var<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| invalid(var, value, &e.to_string()))
}

fn invalid(var: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
