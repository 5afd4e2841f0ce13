//! Streaming event types.
//!
//! A stream is `Chunk* Final` on success or `Chunk* Error` on failure. Content
//! received before an `Error` event is partial.

use crate::response::Usage;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// Event emitted to the caller of a streaming request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Incremental text delta
    Chunk {
        /// Text delta
        content: String,
        /// Provider producing the stream
        provider: String,
        /// Model identifier
        model: String,
    },
    /// Terminal summary
    #[serde(rename = "final")]
    Finalized(StreamSummary),
    /// Terminal failure; content already received is unreliable
    Error {
        /// Error description
        error: String,
        /// Provider producing the stream
        provider: String,
    },
}

impl StreamEvent {
    /// Delta text if this is a chunk
    #[must_use]
    pub fn delta(&self) -> Option<&str> {
        match self {
            Self::Chunk { content, .. } => Some(content),
            _ => None,
        }
    }

    /// Whether this event ends the stream
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Chunk { .. })
    }
}

/// Summary carried by the terminal `final` event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamSummary {
    /// Concatenation of every chunk delta
    pub full_content: String,
    /// Provider that produced the stream
    pub provider: String,
    /// Model identifier
    pub model: String,
    /// Token usage; `usage.estimated` is set when derived from character counts
    pub usage: Usage,
    /// Cost computed from `usage`
    pub cost: f64,
    /// Time from stream open to completion
    pub duration_seconds: f64,
    /// Completion time
    pub timestamp: DateTime<Utc>,
}

/// Stream of events handed to the caller
pub type EventStream = BoxStream<'static, StreamEvent>;
