// Config files and catalogs as they arrive from disk.

use std::io::Write;

use chargetap::config::{ProductCatalog, load_config_from_path};
use chargetap::pipeline::{ConfiguredCatalog, StreamName, SyncMode, discover};

fn write_temp(contents: &str) -> tempfile::TempPath {
    let mut f = tempfile::NamedTempFile::new().expect("create temp file");
    write!(f, "{}", contents).expect("write temp file");
    f.into_temp_path()
}

#[test]
fn test_parse_complete_config() {
    let yaml = r#"
site: acme
site_api_key: test_key
product_catalog: "2.0"
start_date: "2023-06-01T00:00:00Z"
page_size: 50
retry:
  max_retries: 5
  min_delay_ms: 100
  max_delay_ms: 2000
"#;

    let cfg = load_config_from_path(write_temp(yaml)).unwrap();

    assert_eq!(cfg.site, "acme");
    assert_eq!(cfg.product_catalog, ProductCatalog::V2);
    assert_eq!(cfg.page_size, 50);
    assert_eq!(cfg.retry.max_retries, 5);
    assert_eq!(cfg.start_date.timestamp(), 1_685_577_600);
    assert_eq!(cfg.api_base_url(), "https://acme.chargebee.com/api/v2");
}

#[test]
fn test_missing_product_catalog_is_rejected() {
    let yaml = r#"
site: acme
site_api_key: test_key
start_date: "2023-06-01T00:00:00Z"
"#;
    assert!(load_config_from_path(write_temp(yaml)).is_err());
}

#[test]
fn test_unknown_product_catalog_is_rejected() {
    let yaml = r#"
site: acme
site_api_key: test_key
product_catalog: "3.0"
start_date: "2023-06-01T00:00:00Z"
"#;
    assert!(load_config_from_path(write_temp(yaml)).is_err());
}

#[test]
fn test_empty_site_is_rejected() {
    let yaml = r#"
site: ""
site_api_key: test_key
product_catalog: "1.0"
start_date: "2023-06-01T00:00:00Z"
"#;
    let err = load_config_from_path(write_temp(yaml)).unwrap_err();
    assert!(err.to_string().contains("site"));
}

#[test]
fn test_catalog_round_trip_through_discover() {
    let discovered = discover();
    let configured = ConfiguredCatalog {
        streams: discovered
            .streams
            .iter()
            .map(|s| chargetap::pipeline::ConfiguredStream {
                name: s.name.clone(),
                sync_mode: SyncMode::FullRefresh,
            })
            .collect(),
    };

    let resolved = configured.resolve().unwrap();
    assert_eq!(
        resolved,
        vec![
            (StreamName::Subscription, SyncMode::FullRefresh),
            (StreamName::SubscriptionWithScheduledChanges, SyncMode::FullRefresh),
        ]
    );
}
