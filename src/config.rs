use std::time::Duration;

use crate::{Error, Result};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the openHAB instance lives and how to authenticate against it.
#[derive(Debug, Clone, PartialEq)]
pub struct HubConfig {
    pub host: String,
    pub port: u16,
    pub protocol: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout: Duration,
}

impl HubConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            protocol: "http".to_string(),
            username: None,
            password: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Reads the deployment variables `hostname`, `port`, `user`, `password`
    /// and the optional `protocol`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = lookup("hostname")
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::Config("hostname is not set".to_string()))?;
        let mut config = Self::new(host);

        if let Some(port) = lookup("port") {
            config.port = port
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("invalid port: {port}")))?;
        }
        if let Some(protocol) = lookup("protocol") {
            config.protocol = protocol;
        }
        config.username = lookup("user").filter(|u| !u.is_empty());
        config.password = lookup("password");
        Ok(config)
    }

    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }
}
