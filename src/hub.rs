use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use reqwest::Url;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};

use crate::config::HubConfig;
use crate::logger::{MessageLogMode, MessageLogger};
use crate::types::Item;
use crate::{Error, Result};

/// Read/write access to the openHAB item registry.
///
/// Every call is a single attempt; an `Err` means the hub could not be
/// reached or answered with a non-success status.
pub trait Hub: Send + Sync {
    /// All items, without group members.
    fn items(&self) -> impl Future<Output = Result<Vec<Item>>> + Send;

    /// One item; groups come back with their `members`.
    fn item(&self, name: &str) -> impl Future<Output = Result<Item>> + Send;

    fn send_command(&self, name: &str, command: &str) -> impl Future<Output = Result<()>> + Send;
}

pub struct HubClientBuilder {
    config: HubConfig,
    log_mode: Option<MessageLogMode>,
    log_path: Option<String>,
}

impl HubClientBuilder {
    pub fn new(host: impl Into<String>) -> Self {
        Self::from_config(HubConfig::new(host))
    }

    pub fn from_config(config: HubConfig) -> Self {
        Self {
            config,
            log_mode: None,
            log_path: None,
        }
    }

    pub fn protocol(mut self, proto: &str) -> Self {
        self.config.protocol = proto.to_string();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.username = Some(username.into());
        self.config.password = Some(password.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn message_log(mut self, mode: MessageLogMode, path: impl Into<String>) -> Self {
        self.log_mode = Some(mode);
        self.log_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<HubClient> {
        let http = reqwest::Client::builder()
            .timeout(self.config.timeout)
            .build()?;

        let logger = match (self.log_mode, self.log_path) {
            (Some(mode), Some(path)) => Some(Mutex::new(MessageLogger::new(mode, &path)?)),
            _ => None,
        };

        let base_url = self.config.base_url();
        let items_url = Url::parse(&format!("{base_url}/rest/items"))
            .map_err(|e| Error::Config(format!("invalid hub address {base_url}: {e}")))?;
        if items_url.cannot_be_a_base() {
            return Err(Error::Config(format!("invalid hub address {base_url}")));
        }

        Ok(HubClient {
            http,
            base_url,
            items_url,
            username: self.config.username,
            password: self.config.password,
            logger,
        })
    }
}

/// [`Hub`] over openHAB's REST API (`/rest/items`).
pub struct HubClient {
    http: reqwest::Client,
    base_url: String,
    items_url: Url,
    username: Option<String>,
    password: Option<String>,
    logger: Option<Mutex<MessageLogger>>,
}

impl HubClient {
    pub fn builder(host: impl Into<String>) -> HubClientBuilder {
        HubClientBuilder::new(host)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn with_logger(&self, f: impl FnOnce(&mut MessageLogger)) {
        if let Some(logger) = &self.logger
            && let Ok(mut guard) = logger.lock()
        {
            f(&mut *guard);
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.username {
            Some(user) => request.basic_auth(user, self.password.as_ref()),
            None => request,
        }
    }

    /// `/rest/items/{name}` with the name escaped as one path segment.
    fn item_url(&self, name: &str) -> Result<Url> {
        if matches!(name, "" | "." | "..") {
            return Err(Error::MalformedEvent(format!("invalid item name {name:?}")));
        }
        let mut url = self.items_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("invalid hub address {}", self.base_url)))?
            .push(name);
        Ok(url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T> {
        let path = url.path().to_string();
        debug!(url = %url, "fetching from openHAB");
        self.with_logger(|l| l.log_request("GET", &path));

        let resp = self.authorize(self.http.get(url.clone())).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        self.with_logger(|l| l.log_response(&path, status.as_u16(), &body));

        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "openHAB rejected request");
            return Err(Error::Status(status.as_u16()));
        }
        Ok(serde_json::from_str(&body)?)
    }
}

impl Hub for HubClient {
    async fn items(&self) -> Result<Vec<Item>> {
        self.get_json(self.items_url.clone()).await
    }

    async fn item(&self, name: &str) -> Result<Item> {
        self.get_json(self.item_url(name)?).await
    }

    async fn send_command(&self, name: &str, command: &str) -> Result<()> {
        let url = self.item_url(name)?;
        let path = url.path().to_string();
        debug!(item = name, command, "sending command to openHAB");
        self.with_logger(|l| l.log_command(name, command));

        let resp = self
            .authorize(self.http.post(url))
            .header(CONTENT_TYPE, "text/plain")
            .body(command.to_string())
            .send()
            .await?;
        let status = resp.status();
        self.with_logger(|l| l.log_response(&path, status.as_u16(), ""));

        if !status.is_success() {
            warn!(item = name, status = status.as_u16(), "openHAB rejected command");
            return Err(Error::Status(status.as_u16()));
        }
        Ok(())
    }
}
