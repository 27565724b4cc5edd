use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use minijinja::Environment;
use serde_json::Value;
use tracing::debug;

use crate::config::SourceConfig;
use crate::config::templating::{SCHEDULED_CHANGES_PATH, build_env, render_path};
use crate::errors::{ChargetapError, Result};
use crate::http::Http;
use crate::http::fetcher::{
    ErrorFilter, FetchStats, PageOutcome, PaginatedFetcher, Pagination, RecordPath,
};
use crate::pipeline::{CURSOR_FIELD, PRIMARY_KEY};
use crate::utils::http_retry::build_client_with_retry;

const SUBSCRIPTIONS_PATH: &str = "subscriptions";
const SUBSCRIPTION_RESOURCE: &str = "subscription";

/// HTTP side of the subscription streams: the parent listing and the
/// per-parent scheduled-changes lookup.
pub struct SubscriptionSource {
    parent: PaginatedFetcher,
    child: PaginatedFetcher,
    env: Environment<'static>,
    start_date: DateTime<Utc>,
}

impl SubscriptionSource {
    pub fn new(config: &SourceConfig) -> Self {
        let http = Http::new(config.api_base_url())
            .header("Accept", "application/json")
            .basic_auth(config.site_api_key.clone(), "");
        let client = build_client_with_retry(http.build_client(), &config.retry);

        let parent = PaginatedFetcher::new(client.clone(), http.url())
            .with_pagination(Pagination::chargebee())
            .with_page_size(config.page_size)
            .with_record_path(RecordPath::chargebee(SUBSCRIPTION_RESOURCE));

        // A subscription without scheduled changes answers 404.
        let child = PaginatedFetcher::new(client, http.url())
            .with_pagination(Pagination::chargebee())
            .with_page_size(config.page_size)
            .with_record_path(RecordPath::chargebee(SUBSCRIPTION_RESOURCE))
            .with_error_filter(ErrorFilter::new().ignore(404));

        Self {
            parent,
            child,
            env: build_env(),
            start_date: config.start_date,
        }
    }

    pub fn start_date(&self) -> DateTime<Utc> {
        self.start_date
    }

    /// Query for the subscription listing, bounded to `[lower, upper]` epoch seconds.
    pub fn subscription_query(lower: i64, upper: i64) -> Vec<(String, String)> {
        vec![
            ("sort_by[asc]".to_string(), CURSOR_FIELD.to_string()),
            ("include_deleted".to_string(), "true".to_string()),
            (
                format!("{CURSOR_FIELD}[between]"),
                format!("[{lower}, {upper}]"),
            ),
        ]
    }

    /// Subscriptions updated within `[lower, upper]`, in listing order.
    pub fn subscriptions(&self, lower: i64, upper: i64) -> BoxStream<'_, Result<Value>> {
        debug!(lower, upper, "listing subscriptions");
        self.parent
            .stream_records(SUBSCRIPTIONS_PATH.to_string(), Self::subscription_query(lower, upper))
    }

    /// Scheduled-changes records of one subscription. Empty when the
    /// sub-resource is absent.
    pub async fn scheduled_changes(&self, parent_id: &str) -> Result<Vec<Value>> {
        let path = render_path(&self.env, SCHEDULED_CHANGES_PATH, parent_id)?;
        self.child.fetch_all(&path, &[]).await
    }

    /// Hit the listing endpoint with the configured credentials.
    pub async fn check(&self) -> Result<()> {
        match self.parent.fetch_page(SUBSCRIPTIONS_PATH, &[], None).await? {
            PageOutcome::Page { .. } => Ok(()),
            PageOutcome::Ignored { status } => Err(ChargetapError::HttpStatus {
                status,
                url: SUBSCRIPTIONS_PATH.to_string(),
                body: String::new(),
            }),
        }
    }

    pub fn parent_stats(&self) -> FetchStats {
        self.parent.stats()
    }

    pub fn child_stats(&self) -> FetchStats {
        self.child.stats()
    }
}

/// Primary key of a parent record as a string.
pub fn parent_id(record: &Value) -> Result<Value> {
    match record.get(PRIMARY_KEY) {
        Some(Value::String(s)) if !s.is_empty() => Ok(Value::String(s.clone())),
        Some(n @ Value::Number(_)) => Ok(n.clone()),
        _ => Err(ChargetapError::MissingField(PRIMARY_KEY.to_string())),
    }
}

/// Id as it appears in a request path: strings verbatim, numbers in decimal.
pub fn id_segment(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Cursor value of a record in epoch seconds.
pub fn cursor_value(record: &Value) -> Option<i64> {
    record.get(CURSOR_FIELD).and_then(Value::as_i64)
}
