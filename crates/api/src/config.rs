//! Process configuration, read from environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `SILOS_BIND_ADDR` | `0.0.0.0:$PORT`, else `0.0.0.0:8080` |
//! | `DATABASE_URL` | unset: in-memory store |
//! | `SILOS_RETAIN_CEREAL_ON_EMPTY` | `true` |
//! | `SILOS_DELETE_POLICY` | `soft` (`cascade`, `block`, `soft`) |
//! | `SILOS_ALLOWED_CEREALS` | unset: any label |
//! | `SILOS_DISPLAY_UTC_OFFSET` | `+00:00` |

use std::net::SocketAddr;

use chrono::{FixedOffset, Offset, Utc};
use thiserror::Error;

use silos_inventory::{Cereal, CerealCatalog, DeletePolicy, InventoryPolicy};

pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: invalid socket address '{value}'")]
    InvalidBindAddr { var: &'static str, value: String },

    #[error("{var}: expected true/false, got '{value}'")]
    InvalidBool { var: &'static str, value: String },

    #[error("SILOS_DELETE_POLICY: {0}")]
    InvalidDeletePolicy(String),

    #[error("SILOS_ALLOWED_CEREALS: {0}")]
    InvalidCereal(String),

    #[error("SILOS_DISPLAY_UTC_OFFSET: expected ±HH:MM, got '{0}'")]
    InvalidOffset(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// Postgres connection string; `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub policy: InventoryPolicy,
    pub display_offset: FixedOffset,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            database_url: None,
            policy: InventoryPolicy::default(),
            display_offset: utc(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bind_addr = match (get("SILOS_BIND_ADDR"), get("PORT")) {
            (Some(addr), _) => addr.parse::<SocketAddr>().map_err(|_| ConfigError::InvalidBindAddr {
                var: "SILOS_BIND_ADDR",
                value: addr,
            })?,
            (None, Some(port)) => {
                let port: u16 = port.parse().map_err(|_| ConfigError::InvalidBindAddr {
                    var: "PORT",
                    value: port,
                })?;
                SocketAddr::from(([0, 0, 0, 0], port))
            }
            (None, None) => {
                tracing::debug!(port = DEFAULT_PORT, "no bind address configured; using default");
                SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT))
            }
        };

        let retain_cereal_on_empty = match get("SILOS_RETAIN_CEREAL_ON_EMPTY") {
            Some(raw) => parse_bool("SILOS_RETAIN_CEREAL_ON_EMPTY", &raw)?,
            None => true,
        };

        let delete = match get("SILOS_DELETE_POLICY") {
            Some(raw) => raw
                .parse::<DeletePolicy>()
                .map_err(ConfigError::InvalidDeletePolicy)?,
            None => DeletePolicy::default(),
        };

        let cereals = match get("SILOS_ALLOWED_CEREALS") {
            Some(raw) => parse_catalog(&raw)?,
            None => CerealCatalog::any(),
        };

        let display_offset = match get("SILOS_DISPLAY_UTC_OFFSET") {
            Some(raw) => parse_offset(&raw)?,
            None => utc(),
        };

        Ok(Self {
            bind_addr,
            database_url: get("DATABASE_URL").map(|url| normalize_database_url(&url)),
            policy: InventoryPolicy {
                retain_cereal_on_empty,
                delete,
                cereals,
            },
            display_offset,
        })
    }
}

fn utc() -> FixedOffset {
    Utc.fix()
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            var,
            value: raw.to_string(),
        }),
    }
}

fn parse_catalog(raw: &str) -> Result<CerealCatalog, ConfigError> {
    let cereals = raw
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|c| Cereal::parse(c).map_err(|e| ConfigError::InvalidCereal(e.to_string())))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(CerealCatalog::restricted(cereals))
}

fn parse_offset(raw: &str) -> Result<FixedOffset, ConfigError> {
    let invalid = || ConfigError::InvalidOffset(raw.to_string());

    let (sign, rest) = match raw.as_bytes().first() {
        Some(b'+') => (1, &raw[1..]),
        Some(b'-') => (-1, &raw[1..]),
        _ => return Err(invalid()),
    };
    let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
    if hours.len() != 2 || minutes.len() != 2 {
        return Err(invalid());
    }
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if minutes >= 60 {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

/// Accept the URL spellings hosting providers hand out and return one sqlx understands.
fn normalize_database_url(raw: &str) -> String {
    for prefix in ["postgresql+psycopg://", "postgresql+psycopg2://"] {
        if let Some(rest) = raw.strip_prefix(prefix) {
            return format!("postgres://{rest}");
        }
    }
    raw.to_string()
}
