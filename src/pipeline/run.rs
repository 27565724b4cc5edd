use futures::StreamExt;
use indexmap::IndexMap;
use serde_json::json;
use tracing::{Instrument, debug, error, info, info_span};

use crate::{
    config::SourceConfig,
    errors::Result,
    pipeline::{
        ConfiguredCatalog, PARENT_KEY_FIELD, State, StreamName, SyncMode, state_cursor,
        streams::{SubscriptionSource, cursor_value, id_segment, parent_id},
    },
    utils::transform::{add_field, collect_custom_fields},
    writer::{LogLevel, Message, RecordWriter},
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadSummary {
    pub records_per_stream: IndexMap<String, usize>,
    pub requests: usize,
    pub ignored_requests: usize,
}

impl ReadSummary {
    pub fn total_records(&self) -> usize {
        self.records_per_stream.values().sum()
    }
}

/// Connectivity check against the subscription listing.
pub async fn check(config: &SourceConfig) -> Result<()> {
    let source = SubscriptionSource::new(config);
    source.check().await?;
    info!(site = %config.site, product_catalog = config.product_catalog.as_str(), "check succeeded");
    Ok(())
}

/// Read every configured stream in catalog order, emitting records through
/// `writer`. The first fatal error stops the read and is returned.
pub async fn read(
    config: &SourceConfig,
    catalog: &ConfiguredCatalog,
    state: &State,
    writer: &dyn RecordWriter,
) -> Result<ReadSummary> {
    let streams = catalog.resolve()?;
    let source = SubscriptionSource::new(config);
    let mut summary = ReadSummary::default();

    writer.begin().await?;

    for (name, mode) in streams {
        writer
            .write(Message::Log {
                level: LogLevel::Info,
                message: format!("Starting syncing {name} ({mode})"),
            })
            .await?;
        let span = info_span!("stream", stream = %name, sync_mode = %mode);
        let result = match name {
            StreamName::Subscription => {
                read_subscriptions(&source, mode, state, writer)
                    .instrument(span)
                    .await
            }
            StreamName::SubscriptionWithScheduledChanges => {
                read_scheduled_changes(&source, writer).instrument(span).await
            }
        };

        match result {
            Ok(count) => {
                info!(stream = %name, records = count, "stream completed");
                *summary
                    .records_per_stream
                    .entry(name.as_str().to_string())
                    .or_insert(0) += count;
            }
            Err(e) => {
                error!(stream = %name, error = %e, "stream failed");
                writer
                    .write(Message::Trace {
                        stream: Some(name.as_str().to_string()),
                        error: e.to_string(),
                    })
                    .await?;
                return Err(e);
            }
        }
    }

    writer.commit().await?;

    let parent = source.parent_stats();
    let child = source.child_stats();
    summary.requests = parent.requests() + child.requests();
    summary.ignored_requests = parent.ignored_count + child.ignored_count;
    info!(
        records = summary.total_records(),
        requests = summary.requests,
        ignored = summary.ignored_requests,
        "read finished"
    );
    Ok(summary)
}

async fn read_subscriptions(
    source: &SubscriptionSource,
    mode: SyncMode,
    state: &State,
    writer: &dyn RecordWriter,
) -> Result<usize> {
    let stream = StreamName::Subscription;
    let mut lower = source.start_date().timestamp();
    if mode == SyncMode::Incremental {
        if let Some(cursor) = state_cursor(state, stream) {
            lower = lower.max(cursor);
        }
    }
    let upper = chrono::Utc::now().timestamp();

    let mut max_cursor = lower;
    let mut count = 0usize;
    let mut records = source.subscriptions(lower, upper);
    while let Some(record) = records.next().await {
        let record = record?;
        if let Some(c) = cursor_value(&record) {
            max_cursor = max_cursor.max(c);
        }
        writer
            .write(Message::record(stream.as_str(), collect_custom_fields(record)))
            .await?;
        count += 1;
    }

    if mode == SyncMode::Incremental {
        writer
            .write(Message::State {
                stream: stream.as_str().to_string(),
                data: json!({ "updated_at": max_cursor }),
            })
            .await?;
    }
    Ok(count)
}

async fn read_scheduled_changes(
    source: &SubscriptionSource,
    writer: &dyn RecordWriter,
) -> Result<usize> {
    let stream = StreamName::SubscriptionWithScheduledChanges;
    let lower = source.start_date().timestamp();
    let upper = chrono::Utc::now().timestamp();

    let mut count = 0usize;
    let mut parents = source.subscriptions(lower, upper);
    while let Some(parent) = parents.next().await {
        let id = parent_id(&parent?)?;
        let segment = id_segment(&id);
        let children = source.scheduled_changes(&segment).await?;
        if children.is_empty() {
            debug!(subscription_id = %segment, "no scheduled changes");
            continue;
        }
        for child in children {
            let data = add_field(child, PARENT_KEY_FIELD, id.clone());
            writer
                .write(Message::record(stream.as_str(), collect_custom_fields(data)))
                .await?;
            count += 1;
        }
    }
    Ok(count)
}
