use crate::errors::{ChargetapError, Result};
use futures::stream::{BoxStream, StreamExt};
use reqwest::StatusCode;
use reqwest_middleware::ClientWithMiddleware;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Mutex;
use tracing::{debug, debug_span, error, info, trace, Instrument};

// =========================== Pagination types ================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Pagination {
    /// Token pagination: the response carries the token for the next page,
    /// which is sent back verbatim in `offset_param`.
    NextOffset {
        limit_param: String,
        offset_param: String,
        next_offset_field: String,
    },
    Default,
}

impl Pagination {
    /// Chargebee's `limit` / `offset` / `next_offset` scheme.
    pub fn chargebee() -> Self {
        Pagination::NextOffset {
            limit_param: "limit".to_string(),
            offset_param: "offset".to_string(),
            next_offset_field: "next_offset".to_string(),
        }
    }
}

// =========================== Error filter ====================================

/// What to do with a response, decided from its status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseAction {
    Success,
    Ignore,
    Fail,
}

#[derive(Debug, Clone, Default)]
pub struct ErrorFilter {
    ignore_statuses: Vec<u16>,
}

impl ErrorFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ignore(mut self, status: u16) -> Self {
        if !self.ignore_statuses.contains(&status) {
            self.ignore_statuses.push(status);
        }
        self
    }

    pub fn action(&self, status: StatusCode) -> ResponseAction {
        if status.is_success() {
            ResponseAction::Success
        } else if self.ignore_statuses.contains(&status.as_u16()) {
            ResponseAction::Ignore
        } else {
            ResponseAction::Fail
        }
    }
}

// =========================== Record path =====================================

/// Where records live in a response body.
///
/// Chargebee wraps list entries in an envelope keyed by the resource name,
/// e.g. `{"list": [{"subscription": {...}, "customer": {...}}]}`. Single
/// resource endpoints return the envelope at the top level.
#[derive(Debug, Clone)]
pub struct RecordPath {
    list_field: Option<String>,
    envelope: Option<String>,
}

impl RecordPath {
    pub fn new(list_field: Option<&str>, envelope: Option<&str>) -> Self {
        Self {
            list_field: list_field.map(str::to_string),
            envelope: envelope.map(str::to_string),
        }
    }

    pub fn chargebee(resource: &str) -> Self {
        Self::new(Some("list"), Some(resource))
    }

    pub fn extract(&self, body: &Value) -> Vec<Value> {
        let unwrap = |entry: &Value| -> Option<Value> {
            match &self.envelope {
                Some(key) => entry.get(key).filter(|v| !v.is_null()).cloned(),
                None => Some(entry.clone()),
            }
        };

        if let Some(list_field) = &self.list_field {
            if let Some(items) = body.get(list_field).and_then(Value::as_array) {
                return items.iter().filter_map(unwrap).collect();
            }
        }
        match (&self.envelope, body) {
            (Some(_), _) => unwrap(body).into_iter().collect(),
            (None, Value::Array(items)) => items.clone(),
            (None, Value::Null) => Vec::new(),
            (None, other) => vec![other.clone()],
        }
    }
}

// =========================== Fetcher =========================================

#[derive(Debug)]
pub enum PageOutcome {
    Page {
        records: Vec<Value>,
        next_offset: Option<String>,
    },
    Ignored {
        status: u16,
    },
}

pub struct PaginatedFetcher {
    client: ClientWithMiddleware,
    base_url: String,
    pagination_config: Pagination,
    page_size: u64,
    error_filter: ErrorFilter,
    record_path: RecordPath,
    stats: Mutex<FetchStats>,
}

impl PaginatedFetcher {
    pub fn new(client: ClientWithMiddleware, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            pagination_config: Pagination::Default,
            page_size: 100,
            error_filter: ErrorFilter::default(),
            record_path: RecordPath::new(None, None),
            stats: Mutex::new(FetchStats::new()),
        }
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination_config = pagination;
        self
    }

    pub fn with_page_size(mut self, n: u64) -> Self {
        self.page_size = n.max(1);
        self
    }

    pub fn with_error_filter(mut self, filter: ErrorFilter) -> Self {
        self.error_filter = filter;
        self
    }

    pub fn with_record_path(mut self, record_path: RecordPath) -> Self {
        self.record_path = record_path;
        self
    }

    pub fn stats(&self) -> FetchStats {
        self.stats.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn url_for(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn record_stats(&self, f: impl FnOnce(&mut FetchStats)) {
        if let Ok(mut stats) = self.stats.lock() {
            f(&mut stats);
        }
    }

    // -------------------- Public entry points --------------------------------

    /// Fetch a single page. `offset` is the token returned by the previous page.
    pub async fn fetch_page(
        &self,
        path: &str,
        query: &[(String, String)],
        offset: Option<&str>,
    ) -> Result<PageOutcome> {
        let url = self.url_for(path);
        let mut params: Vec<(String, String)> = query.to_vec();
        let next_offset_field = match &self.pagination_config {
            Pagination::NextOffset {
                limit_param,
                offset_param,
                next_offset_field,
            } => {
                params.push((limit_param.clone(), self.page_size.to_string()));
                if let Some(token) = offset {
                    params.push((offset_param.clone(), token.to_string()));
                }
                Some(next_offset_field.as_str())
            }
            Pagination::Default => None,
        };

        let span = debug_span!("http.request", method = "GET", source = %url, query_len = params.len());
        let started = std::time::Instant::now();
        let resp = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .instrument(span)
            .await?;

        let status = resp.status();
        debug!(status = %status, elapsed_ms = started.elapsed().as_millis() as u64, source = %url, "http response received");

        match self.error_filter.action(status) {
            ResponseAction::Success => {
                let body: Value = resp.json().await?;
                let records = self.record_path.extract(&body);
                let next_offset = next_offset_field
                    .and_then(|field| body.get(field))
                    .and_then(|v| match v {
                        Value::Null => None,
                        Value::String(s) if s.is_empty() => None,
                        Value::String(s) => Some(s.clone()),
                        other => Some(other.to_string()),
                    });
                trace!(items = records.len(), has_next = next_offset.is_some(), "parsed page");
                self.record_stats(|s| s.add_page(records.len()));
                Ok(PageOutcome::Page {
                    records,
                    next_offset,
                })
            }
            ResponseAction::Ignore => {
                info!(status = status.as_u16(), source = %url, "ignoring response");
                self.record_stats(|s| s.add_ignored());
                Ok(PageOutcome::Ignored {
                    status: status.as_u16(),
                })
            }
            ResponseAction::Fail => {
                let body = resp.text().await.unwrap_or_default();
                error!(status = status.as_u16(), source = %url, "request failed");
                self.record_stats(|s| s.add_error());
                Err(ChargetapError::HttpStatus {
                    status: status.as_u16(),
                    url,
                    body,
                })
            }
        }
    }

    /// Stream every record of every page, following next-offset tokens until
    /// the server stops returning one. An ignored response ends the stream
    /// without records; a failing response yields its error and ends it.
    pub fn stream_records<'a>(
        &'a self,
        path: String,
        query: Vec<(String, String)>,
    ) -> BoxStream<'a, Result<Value>> {
        let source = self.url_for(&path);
        let s = async_stream::try_stream! {
            let mut offset: Option<String> = None;
            let mut page = 0u64;
            loop {
                let outcome = self.fetch_page(&path, &query, offset.as_deref()).await?;
                let (records, next_offset) = match outcome {
                    PageOutcome::Page { records, next_offset } => (records, next_offset),
                    PageOutcome::Ignored { .. } => break,
                };
                debug!(page = page, items = records.len(), source = %source, "fetched page");
                for record in records {
                    yield record;
                }
                match next_offset {
                    Some(next) if offset.as_deref() == Some(next.as_str()) => {
                        Err::<(), _>(ChargetapError::PaginationError(format!(
                            "server returned the same offset twice: {next}"
                        )))?;
                    }
                    Some(next) => offset = Some(next),
                    None => break,
                }
                page += 1;
            }
        };
        s.boxed()
    }

    /// Collect every record of a paginated resource.
    pub async fn fetch_all(&self, path: &str, query: &[(String, String)]) -> Result<Vec<Value>> {
        let mut out = Vec::new();
        let mut s = self.stream_records(path.to_string(), query.to_vec());
        while let Some(item) = s.next().await {
            out.push(item?);
        }
        Ok(out)
    }
}

// ============================== Stats =======================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchStats {
    pub success_count: usize,
    pub ignored_count: usize,
    pub error_count: usize,
    pub total_items: usize,
}

impl FetchStats {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn requests(&self) -> usize {
        self.success_count + self.ignored_count + self.error_count
    }
    fn add_page(&mut self, items: usize) {
        self.success_count += 1;
        self.total_items += items;
    }
    fn add_ignored(&mut self) {
        self.ignored_count += 1;
    }
    fn add_error(&mut self) {
        self.error_count += 1;
    }
}
