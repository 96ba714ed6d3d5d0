//! Ambient configuration layer: the maintenance intervals, peer-client
//! timeout and connection-retry backoff are read from an optional INI file
//! and merged with CLI flags, with flags taking precedence. This lets an
//! operator run a whole cluster off one shared config file and only
//! override the per-node address and bootstrap peer on the command line.

use std::time::Duration;

use ini::Ini;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub stabilize_interval: Duration,
    pub fix_fingers_interval: Duration,
    pub check_predecessor_interval: Duration,
    pub rpc_timeout: Duration,
    pub connection_retry_backoff: Duration,
    pub max_connection_retries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            stabilize_interval: Duration::from_secs(1),
            fix_fingers_interval: Duration::from_secs(1),
            check_predecessor_interval: Duration::from_secs(2),
            rpc_timeout: Duration::from_secs(5),
            connection_retry_backoff: Duration::from_millis(100),
            max_connection_retries: 15,
        }
    }
}

impl Config {
    /// Loads a `[maintenance]` section from an INI file, falling back to
    /// [`Config::default`] for any key that is absent or the file itself
    /// missing. Parse errors for an individual key are logged and ignored
    /// rather than failing node startup over a typo in a tunable.
    pub fn from_ini_file(path: &str) -> Config {
        let mut config = Config::default();

        let ini = match Ini::load_from_file(path) {
            Ok(ini) => ini,
            Err(err) => {
                log::debug!("no usable config file at {}: {}", path, err);
                return config;
            }
        };

        let Some(section) = ini.section(Some("maintenance")) else {
            return config;
        };

        if let Some(millis) = parse_millis(section.get("stabilize_interval_ms")) {
            config.stabilize_interval = Duration::from_millis(millis);
        }
        if let Some(millis) = parse_millis(section.get("fix_fingers_interval_ms")) {
            config.fix_fingers_interval = Duration::from_millis(millis);
        }
        if let Some(millis) = parse_millis(section.get("check_predecessor_interval_ms")) {
            config.check_predecessor_interval = Duration::from_millis(millis);
        }
        if let Some(millis) = parse_millis(section.get("rpc_timeout_ms")) {
            config.rpc_timeout = Duration::from_millis(millis);
        }
        if let Some(millis) = parse_millis(section.get("connection_retry_backoff_ms")) {
            config.connection_retry_backoff = Duration::from_millis(millis);
        }
        if let Some(retries) = section
            .get("max_connection_retries")
            .and_then(|v| v.parse::<u32>().ok())
        {
            config.max_connection_retries = retries;
        }

        config
    }
}

fn parse_millis(value: Option<&str>) -> Option<u64> {
    value.and_then(|v| v.parse::<u64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_spec_figures() {
        let config = Config::default();
        assert_eq!(config.stabilize_interval, Duration::from_secs(1));
        assert_eq!(config.fix_fingers_interval, Duration::from_secs(1));
        assert_eq!(config.check_predecessor_interval, Duration::from_secs(2));
        assert_eq!(config.rpc_timeout, Duration::from_secs(5));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = Config::from_ini_file("/nonexistent/path/to/chordrs.ini");
        assert_eq!(config.stabilize_interval, Duration::from_secs(1));
    }
}
