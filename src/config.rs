//! Runner options: the `[runner]` table of `trellis.toml`, overridden by
//! `TRELLIS_*` environment variables.
use serde::Deserialize;
use std::{env, path::PathBuf, time::Duration};

/// Environment variable prefix
const ENV_PREFIX: &str = "TRELLIS";

/// Options controlling where results are sent and where tests run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Send report lines to `host_name:host_port` instead of the console.
    pub network: bool,
    pub host_name: String,
    pub host_port: u16,
    /// Seconds to wait for the network sink to accept the connection.
    pub connect_timeout: u64,
    /// Directory tests and fixtures run in. Defaults to the current directory.
    pub work_directory: Option<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            network: false,
            host_name: "127.0.0.1".to_string(),
            host_port: 16384,
            connect_timeout: 5,
            work_directory: None,
        }
    }
}

impl Options {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    /// Apply overrides from the environment.
    pub fn with_env(mut self, env: &EnvConfig) -> Self {
        if let Some(network) = env.network {
            self.network = network;
        }
        if let Some(host) = &env.host {
            self.host_name = host.clone();
        }
        if let Some(port) = env.port {
            self.host_port = port;
        }
        if let Some(timeout) = env.timeout {
            self.connect_timeout = timeout;
        }
        self
    }
}

/// Overrides read from `TRELLIS_*` variables.
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// From TRELLIS_NETWORK
    pub network: Option<bool>,
    /// From TRELLIS_HOST
    pub host: Option<String>,
    /// From TRELLIS_PORT
    pub port: Option<u16>,
    /// From TRELLIS_TIMEOUT
    pub timeout: Option<u64>,
    /// From TRELLIS_LOG
    pub log: Option<String>,
}

impl EnvConfig {
    pub fn load() -> Self {
        Self {
            network: get_env_bool("NETWORK"),
            host: get_env("HOST"),
            port: get_env_parse("PORT"),
            timeout: get_env_parse("TIMEOUT"),
            log: get_env("LOG"),
        }
    }
}

fn get_env(name: &str) -> Option<String> {
    env::var(format!("{}_{}", ENV_PREFIX, name)).ok()
}

fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.parse().ok())
}

fn get_env_bool(name: &str) -> Option<bool> {
    get_env(name).map(|v| parse_bool(&v))
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let options: Options = toml::from_str("network = true").unwrap();
        assert!(options.network);
        assert_eq!(options.host_name, "127.0.0.1");
        assert_eq!(options.host_port, 16384);
        assert_eq!(options.connect_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn env_overrides_file() {
        let env = EnvConfig {
            network: Some(true),
            host: Some("build-host".to_string()),
            port: Some(9000),
            ..EnvConfig::default()
        };
        let options = Options::default().with_env(&env);
        assert!(options.network);
        assert_eq!(options.host_name, "build-host");
        assert_eq!(options.host_port, 9000);
        assert_eq!(options.connect_timeout, 5);
    }

    #[test]
    fn bool_parsing() {
        assert!(parse_bool("TRUE"));
        assert!(parse_bool("1"));
        assert!(!parse_bool("no"));
    }
}
