use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Mutex;
use tokio::io::AsyncWriteExt;

use crate::errors::{ChargetapError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// One message on the connector output channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum Message {
    Record {
        stream: String,
        data: Value,
        /// Milliseconds since the epoch.
        emitted_at: i64,
    },
    State {
        stream: String,
        data: Value,
    },
    Log {
        level: LogLevel,
        message: String,
    },
    Trace {
        stream: Option<String>,
        error: String,
    },
}

impl Message {
    pub fn record(stream: impl Into<String>, data: Value) -> Self {
        Message::Record {
            stream: stream.into(),
            data,
            emitted_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

#[async_trait]
pub trait RecordWriter: Send + Sync {
    async fn write(&self, message: Message) -> Result<()>;

    /// Lifecycle hooks.
    async fn begin(&self) -> Result<()> {
        Ok(())
    }
    async fn commit(&self) -> Result<()> {
        Ok(())
    }
}

/// Writes one JSON message per line to stdout.
#[derive(Debug, Default)]
pub struct StdoutWriter;

#[async_trait]
impl RecordWriter for StdoutWriter {
    async fn write(&self, message: Message) -> Result<()> {
        let mut line = serde_json::to_vec(&message)?;
        line.push(b'\n');
        let mut out = tokio::io::stdout();
        out.write_all(&line).await?;
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        tokio::io::stdout().flush().await?;
        Ok(())
    }
}

/// Keeps every message in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemoryWriter {
    messages: Mutex<Vec<Message>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }

    /// `(stream, data)` of every record.
    pub fn records(&self) -> Vec<(String, Value)> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                Message::Record { stream, data, .. } => Some((stream, data)),
                _ => None,
            })
            .collect()
    }

    pub fn records_for(&self, stream: &str) -> Vec<Value> {
        self.records()
            .into_iter()
            .filter(|(s, _)| s == stream)
            .map(|(_, data)| data)
            .collect()
    }

    pub fn states(&self) -> Vec<(String, Value)> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                Message::State { stream, data } => Some((stream, data)),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                Message::Trace { error, .. } => Some(error),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl RecordWriter for MemoryWriter {
    async fn write(&self, message: Message) -> Result<()> {
        self.messages
            .lock()
            .map_err(|e| ChargetapError::WriterError(e.to_string()))?
            .push(message);
        Ok(())
    }
}
