//! # Application State
//!
//! [`AppState`] is built once in `main` and handed to the router. It carries
//! the shared [`CensusStore`] handle, the HTTP-layer configuration, and the
//! per-app Prometheus metrics. Everything inside is cheaply cloneable.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use census_store::{CensusStore, ConfigError};

use crate::middleware::metrics::ApiMetrics;

/// Environment variable for the HTTP port.
pub const ENV_PORT: &str = "PORT";
/// Environment variable for the bind address.
pub const ENV_BIND: &str = "CENSUS_BIND";
/// Environment variable naming a directory served as the router fallback.
pub const ENV_STATIC_DIR: &str = "CENSUS_STATIC_DIR";
/// Environment variable toggling `/metrics` and the metrics middleware.
pub const ENV_METRICS_ENABLED: &str = "CENSUS_METRICS_ENABLED";
/// Environment variable selecting `text` or `json` log output.
pub const ENV_LOG_FORMAT: &str = "CENSUS_LOG_FORMAT";

/// HTTP-layer configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub bind: IpAddr,
    /// Front-end bundle served for paths no route matches.
    pub static_dir: Option<PathBuf>,
    pub metrics_enabled: bool,
    pub log_json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            static_dir: None,
            metrics_enabled: true,
            log_json: false,
        }
    }
}

impl AppConfig {
    /// Read configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = parse_var(&lookup, ENV_PORT)?.unwrap_or(defaults.port);
        let bind = parse_var(&lookup, ENV_BIND)?.unwrap_or(defaults.bind);
        let static_dir = lookup(ENV_STATIC_DIR)
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from);
        // Anything other than "false" keeps metrics on.
        let metrics_enabled = lookup(ENV_METRICS_ENABLED)
            .map(|v| v.trim().to_lowercase() != "false")
            .unwrap_or(defaults.metrics_enabled);
        let log_json = match lookup(ENV_LOG_FORMAT) {
            None => defaults.log_json,
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "json" => true,
                "text" | "" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: ENV_LOG_FORMAT.to_string(),
                        value: raw,
                    })
                }
            },
        };

        Ok(Self {
            port,
            bind,
            static_dir,
            metrics_enabled,
            log_json,
        })
    }

    /// Socket address the server listens on.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                var: var.to_string(),
                value: raw,
            }),
    }
}

/// Shared state for all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: CensusStore,
    pub config: AppConfig,
    pub metrics: ApiMetrics,
}

impl AppState {
    /// Wrap a store with a fresh metrics registry.
    pub fn new(store: CensusStore, config: AppConfig) -> Result<Self, prometheus::Error> {
        Ok(Self {
            store,
            config,
            metrics: ApiMetrics::new()?,
        })
    }
}
