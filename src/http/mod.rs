pub mod fetcher;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use std::collections::HashMap;
use tracing::warn;

#[derive(Clone)]
pub struct Http {
    url: String,
    headers: Option<HashMap<String, String>>,
    basic_auth: Option<(String, String)>,
}

impl Http {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: None,
            basic_auth: None,
        }
    }
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let map = self.headers.get_or_insert_with(HashMap::new);
        map.insert(key.into(), value.into());
        self
    }
    /// Chargebee authenticates with the site API key as username and an empty password.
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth = Some((username.into(), password.into()));
        self
    }
    pub fn build_client(&self) -> Client {
        let mut headers = reqwest::header::HeaderMap::new();

        if let Some(header_map) = &self.headers {
            for (key, value) in header_map {
                if let (Ok(name), Ok(val)) = (
                    reqwest::header::HeaderName::from_bytes(key.as_bytes()),
                    reqwest::header::HeaderValue::from_str(value),
                ) {
                    headers.insert(name, val);
                }
            }
        }
        if let Some((user, pass)) = &self.basic_auth {
            let encoded = STANDARD.encode(format!("{user}:{pass}"));
            match reqwest::header::HeaderValue::from_str(&format!("Basic {encoded}")) {
                Ok(mut header_value) => {
                    header_value.set_sensitive(true);
                    headers.insert(reqwest::header::AUTHORIZATION, header_value);
                }
                Err(_) => {
                    warn!("invalid characters in credentials, skipping authorization header");
                }
            }
        }

        Client::builder()
            .default_headers(headers)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Some(std::time::Duration::from_secs(90)))
            .timeout(std::time::Duration::from_secs(30))
            .connect_timeout(std::time::Duration::from_secs(10))
            .tcp_keepalive(Some(std::time::Duration::from_secs(60)))
            .build()
            .unwrap_or_else(|_| Client::new())
    }
    /// Base URL that request paths are joined onto.
    pub fn url(&self) -> &str {
        &self.url
    }
}
