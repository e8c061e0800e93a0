//! Connection configuration.
//!
//! Configuration comes either from the builder or from a JSON group file of
//! the form
//!
//! ```json
//! {
//!     "main": {
//!         "username": "app",
//!         "password": "secret",
//!         "master": "db01:3306",
//!         "slave": ["db02", "db03:3307"]
//!     }
//! }
//! ```
//!
//! `slave` may be a single host, a list, or absent, in which case reads go
//! to the master.

use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::core::{Result, StoreError};

pub const DEFAULT_PORT: u16 = 3306;

/// A host and port pair. The identifier (`host:port`) is what the host
/// registry dedupes on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostAddress {
    pub host: String,
    pub port: u16,
}

impl HostAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse `host` or `host:port`.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(StoreError::Configuration("empty host address".into()));
        }

        match raw.split_once(':') {
            None => Ok(Self::new(raw, DEFAULT_PORT)),
            Some((host, port)) => {
                let port = port.parse().map_err(|_| {
                    StoreError::Configuration(format!("bad port in host address {raw:?}"))
                })?;
                Ok(Self::new(host, port))
            }
        }
    }

    pub fn identifier(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for HostAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Credentials and topology for one connection group.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub username: String,
    pub password: String,
    pub master: HostAddress,
    pub slaves: Vec<HostAddress>,
}

impl ConnectionConfig {
    pub fn new(username: impl Into<String>, password: impl Into<String>, master: HostAddress) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            master,
            slaves: Vec::new(),
        }
    }

    pub fn slave(mut self, slave: HostAddress) -> Self {
        self.slaves.push(slave);
        self
    }

    /// Slaves to read from: the configured ones, or the master when none
    /// were configured.
    pub fn read_hosts(&self) -> Vec<HostAddress> {
        if self.slaves.is_empty() {
            vec![self.master.clone()]
        } else {
            self.slaves.clone()
        }
    }

    /// Load one named group from a JSON group file.
    pub fn from_group_file(path: impl AsRef<Path>, group: &str) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            StoreError::Configuration(format!("read {}: {e}", path.display()))
        })?;
        Self::from_group_json(&text, group)
    }

    /// Load one named group from JSON text.
    pub fn from_group_json(json: &str, group: &str) -> Result<Self> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            One(String),
            Many(Vec<String>),
        }

        #[derive(Deserialize)]
        struct RawGroup {
            username: String,
            password: String,
            master: String,
            #[serde(default)]
            slave: Option<OneOrMany>,
        }

        let mut groups: std::collections::HashMap<String, RawGroup> =
            serde_json::from_str(json)
                .map_err(|e| StoreError::Configuration(format!("parse connection config: {e}")))?;

        let raw = groups.remove(group).ok_or_else(|| {
            StoreError::Configuration(format!("connection group {group:?} not found"))
        })?;

        let mut config = Self::new(raw.username, raw.password, HostAddress::parse(&raw.master)?);

        let slave_hosts = match raw.slave {
            None => Vec::new(),
            Some(OneOrMany::One(host)) => vec![host],
            Some(OneOrMany::Many(hosts)) => hosts,
        };
        for host in slave_hosts {
            config.slaves.push(HostAddress::parse(&host)?);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    #[test]
    fn test_host_address_parse() {
        assert_eq!(
            HostAddress::parse("db01").unwrap(),
            HostAddress::new("db01", DEFAULT_PORT)
        );
        assert_eq!(
            HostAddress::parse("db01:3307").unwrap(),
            HostAddress::new("db01", 3307)
        );
        assert!(HostAddress::parse("").is_err());
        assert!(HostAddress::parse("db01:many").is_err());
    }

    #[test]
    fn test_group_with_slave_list() {
        let config = ConnectionConfig::from_group_json(
            r#"{"main": {
                "username": "app",
                "password": "secret",
                "master": "db01",
                "slave": ["db02", "db03:3307"]
            }}"#,
            "main",
        )
        .unwrap();

        assert_eq!(config.username, "app");
        assert_eq!(config.master.identifier(), "db01:3306");
        assert_eq!(config.slaves.len(), 2);
        assert_eq!(config.slaves[1].port, 3307);
    }

    #[test]
    fn test_slave_defaults_to_master() {
        let config = ConnectionConfig::from_group_json(
            r#"{"main": {"username": "app", "password": "", "master": "db01"}}"#,
            "main",
        )
        .unwrap();

        assert!(config.slaves.is_empty());
        assert_eq!(config.read_hosts(), vec![config.master.clone()]);
    }

    #[test]
    fn test_single_slave_string() {
        let config = ConnectionConfig::from_group_json(
            r#"{"main": {"username": "app", "password": "", "master": "db01", "slave": "db02"}}"#,
            "main",
        )
        .unwrap();
        assert_eq!(config.slaves, vec![HostAddress::new("db02", DEFAULT_PORT)]);
    }

    #[test]
    fn test_missing_group_is_configuration_error() {
        let err = ConnectionConfig::from_group_json(r#"{}"#, "main").unwrap_err();
        assert!(matches!(err, StoreError::Configuration(_)));
    }

    #[test]
    fn test_from_group_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"main": {{"username": "app", "password": "pw", "master": "db01:3307"}}}}"#
        )
        .unwrap();

        let config = ConnectionConfig::from_group_file(file.path(), "main").unwrap();
        assert_eq!(config.master, HostAddress::new("db01", 3307));
    }
}
