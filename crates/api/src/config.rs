//! Server configuration from the environment.

use std::net::SocketAddr;

use implodesc_engine::config::{parse_or, var};
use implodesc_engine::{ConfigError, EngineConfig};
use implodesc_observability::LogConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log: LogConfig,
    pub engine: EngineConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let debug = var(&lookup, "DEBUG").is_some_and(|v| is_truthy(&v));
        let level = var(&lookup, "LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            host: var(&lookup, "HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 8000)?,
            log: LogConfig::new(level, debug),
            engine: EngineConfig::from_lookup(&lookup)?,
        })
    }

    /// `host:port`, for binding.
    pub fn bind_address(&self) -> String {
        match self.host.parse::<std::net::IpAddr>() {
            Ok(ip) => SocketAddr::new(ip, self.port).to_string(),
            Err(_) => format!("{}:{}", self.host, self.port),
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use implodesc_observability::LogFormat;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:8000");
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.log.level, "info");
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn debug_and_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "9001"),
            ("DEBUG", "True"),
            ("LOG_LEVEL", "DEBUG"),
            ("MAX_SESSIONS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.bind_address(), "127.0.0.1:9001");
        assert_eq!(config.log.format, LogFormat::Pretty);
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.engine.max_sessions, 5);
    }

    #[test]
    fn invalid_port_is_reported() {
        let err = ServerConfig::from_lookup(lookup(&[("PORT", "http")])).unwrap_err();
        let ConfigError::Invalid { name, .. } = err;
        assert_eq!(name, "PORT");
    }
}
