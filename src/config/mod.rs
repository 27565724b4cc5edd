use std::{fs::File, path::Path};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{ChargetapError, Result};

pub mod templating;


pub const DEFAULT_PAGE_SIZE: u64 = 100;

/// Chargebee product catalog version of the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductCatalog {
    #[serde(rename = "1.0")]
    V1,
    #[serde(rename = "2.0")]
    V2,
}

impl ProductCatalog {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductCatalog::V1 => "1.0",
            ProductCatalog::V2 => "2.0",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Retry {
    /// Retries after the first request; a failing request is sent `max_retries + 1` times.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for Retry {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl Retry {
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }
}

fn default_max_retries() -> u32 {
    3
}
fn default_min_delay_ms() -> u64 {
    250
}
fn default_max_delay_ms() -> u64 {
    8_000
}
fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub site: String,
    #[serde(default)]
    pub site_api_key: String,
    /// Name of an environment variable holding the API key; used when `site_api_key` is empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_api_key_env: Option<String>,
    pub product_catalog: ProductCatalog,
    pub start_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    #[serde(default)]
    pub retry: Retry,
}

impl SourceConfig {
    /// `https://{site}.chargebee.com/api/v2` unless overridden.
    pub fn api_base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}.chargebee.com/api/v2", self.site),
        }
    }

    /// Resolve env-backed secrets and check required fields.
    pub fn validate(mut self) -> Result<Self> {
        if self.site.trim().is_empty() {
            return Err(ChargetapError::ConfigError("site must not be empty".into()));
        }
        if self.site_api_key.is_empty() {
            let var = self.site_api_key_env.as_deref().ok_or_else(|| {
                ChargetapError::ConfigError("site_api_key or site_api_key_env is required".into())
            })?;
            self.site_api_key = std::env::var(var).map_err(|_| {
                ChargetapError::ConfigError(format!("environment variable {var} is not set"))
            })?;
        }
        if let Some(url) = &self.base_url {
            url::Url::parse(url)?;
        }
        if self.page_size == 0 || self.page_size > DEFAULT_PAGE_SIZE {
            return Err(ChargetapError::ConfigError(format!(
                "page_size must be between 1 and {DEFAULT_PAGE_SIZE}, got {}",
                self.page_size
            )));
        }
        Ok(self)
    }
}

pub fn load_config_from_path<P: AsRef<Path>>(path: P) -> Result<SourceConfig> {
    let f = File::open(path)?;
    let cfg: SourceConfig = serde_yaml::from_reader(f)?;
    cfg.validate()
}

/// Fluent builder for configs, mostly handy in tests and fixtures.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    site: String,
    site_api_key: String,
    product_catalog: ProductCatalog,
    start_date: DateTime<Utc>,
    base_url: Option<String>,
    page_size: u64,
    retry: Retry,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self {
            site: "ConfigBuilder default site".to_string(),
            site_api_key: "ConfigBuilder default site api key".to_string(),
            product_catalog: ProductCatalog::V2,
            start_date: DateTime::<Utc>::from_timestamp(1_514_764_800, 0).unwrap_or_default(),
            base_url: None,
            page_size: DEFAULT_PAGE_SIZE,
            retry: Retry::default(),
        }
    }
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_site(mut self, site: impl Into<String>) -> Self {
        self.site = site.into();
        self
    }
    pub fn with_site_api_key(mut self, key: impl Into<String>) -> Self {
        self.site_api_key = key.into();
        self
    }
    pub fn with_product_catalog(mut self, catalog: ProductCatalog) -> Self {
        self.product_catalog = catalog;
        self
    }
    pub fn with_start_date(mut self, start_date: DateTime<Utc>) -> Self {
        self.start_date = start_date;
        self
    }
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }
    pub fn with_retry(mut self, retry: Retry) -> Self {
        self.retry = retry;
        self
    }
    pub fn build(self) -> SourceConfig {
        SourceConfig {
            site: self.site,
            site_api_key: self.site_api_key,
            site_api_key_env: None,
            product_catalog: self.product_catalog,
            start_date: self.start_date,
            base_url: self.base_url,
            page_size: self.page_size,
            retry: self.retry,
        }
    }
}
