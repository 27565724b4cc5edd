//! Shared fixtures for the Chargebee mock-server tests.

#![allow(dead_code)]

use chargetap::config::{ConfigBuilder, ProductCatalog, Retry, SourceConfig};
use chargetap::errors::Result;
use chargetap::pipeline::run::{ReadSummary, read};
use chargetap::pipeline::{CatalogBuilder, State, SyncMode};
use chargetap::writer::MemoryWriter;
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use wiremock::MockServer;

pub const SITE: &str = "test-site";
pub const SITE_API_KEY: &str = "test-api-key";
pub const PARENT_PATH: &str = "/api/v2/subscriptions";

pub fn child_path(parent_id: &str) -> String {
    format!("/api/v2/subscriptions/{parent_id}/retrieve_with_scheduled_changes")
}

/// A subscription as Chargebee lists it.
pub fn a_subscription(id: &str) -> Value {
    json!({
        "id": id,
        "customer_id": format!("cust_{id}"),
        "plan_id": "basic-usd",
        "status": "active",
        "updated_at": 1_700_000_000,
        "resource_version": 1_700_000_000_000i64,
        "deleted": false,
        "object": "subscription"
    })
}

/// A subscription carrying scheduled changes, as the lookup returns it.
pub fn a_scheduled_change(id: &str) -> Value {
    json!({
        "id": id,
        "plan_id": "pro-usd",
        "plan_quantity": 2,
        "status": "active",
        "has_scheduled_changes": true,
        "updated_at": 1_700_000_500,
        "cf_sales_rep": "jane",
        "object": "subscription"
    })
}

/// Listing body: `{"list": [{"subscription": ...}], "next_offset": ...}`.
pub fn a_list_response(subscriptions: Vec<Value>, next_offset: Option<&str>) -> Value {
    let list: Vec<Value> = subscriptions
        .into_iter()
        .map(|s| {
            let customer = json!({"id": s["customer_id"].clone(), "object": "customer"});
            json!({"subscription": s, "customer": customer})
        })
        .collect();
    let mut body = json!({ "list": list });
    if let Some(offset) = next_offset {
        body["next_offset"] = json!(offset);
    }
    body
}

pub fn config(server: &MockServer) -> ConfigBuilder {
    ConfigBuilder::new()
        .with_site(SITE)
        .with_site_api_key(SITE_API_KEY)
        .with_product_catalog(ProductCatalog::V2)
        .with_start_date(Utc::now() - Duration::days(28))
        .with_base_url(format!("{}/api/v2", server.uri()))
        .with_retry(Retry::disabled())
}

pub async fn read_stream(
    config: &SourceConfig,
    stream: &str,
    sync_mode: SyncMode,
    state: &State,
) -> (Result<ReadSummary>, MemoryWriter) {
    let catalog = CatalogBuilder::new().with_stream(stream, sync_mode).build();
    let writer = MemoryWriter::new();
    let result = read(config, &catalog, state, &writer).await;
    (result, writer)
}
