//! Stream aggregation.
//!
//! Turns the fragments of one provider stream into caller events: a `Chunk`
//! per text delta, then exactly one terminal `Finalized` or `Error`.

use async_stream::stream;
use chrono::Utc;
use futures::StreamExt;
use gateway_core::{
    EventStream, FragmentStream, ProviderDescriptor, StreamEvent, StreamFragment, StreamSummary,
    Usage,
};
use gateway_telemetry::{CostAccountant, UsageTracker};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Aggregates one provider stream
#[derive(Debug)]
pub struct StreamAggregator {
    descriptor: ProviderDescriptor,
    prompt_chars: usize,
    idle_timeout: Duration,
    usage: Option<Arc<UsageTracker>>,
}

impl StreamAggregator {
    /// Create an aggregator for a stream opened on `descriptor`
    #[must_use]
    pub fn new(descriptor: ProviderDescriptor, prompt_chars: usize, idle_timeout: Duration) -> Self {
        Self {
            descriptor,
            prompt_chars,
            idle_timeout,
            usage: None,
        }
    }

    /// Record the outcome in `tracker`
    #[must_use]
    pub fn with_usage_tracker(mut self, tracker: Arc<UsageTracker>) -> Self {
        self.usage = Some(tracker);
        self
    }

    /// Wrap `fragments` into caller events
    ///
    /// The returned stream is lazy: nothing is read from the provider until
    /// it is polled, and dropping it drops the provider stream.
    #[must_use]
    pub fn aggregate(self, mut fragments: FragmentStream) -> EventStream {
        let Self {
            descriptor,
            prompt_chars,
            idle_timeout,
            usage: tracker,
        } = self;

        let events = stream! {
            let started = Instant::now();
            let mut content = String::new();
            let mut reported: Option<Usage> = None;

            loop {
                let next = match tokio::time::timeout(idle_timeout, fragments.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        let error = format!(
                            "no data from {} for {}ms",
                            descriptor.name,
                            idle_timeout.as_millis()
                        );
                        warn!(provider = %descriptor.name, received_chars = content.len(), "Stream idle timeout");
                        if let Some(tracker) = &tracker {
                            tracker.record_failure(&descriptor.name);
                        }
                        yield StreamEvent::Error { error, provider: descriptor.name.clone() };
                        return;
                    }
                };

                match next {
                    Some(Ok(StreamFragment::Delta(delta))) => {
                        content.push_str(&delta);
                        yield StreamEvent::Chunk {
                            content: delta,
                            provider: descriptor.name.clone(),
                            model: descriptor.model.clone(),
                        };
                    }
                    Some(Ok(StreamFragment::Usage(usage))) => reported = Some(usage),
                    Some(Err(e)) => {
                        warn!(provider = %descriptor.name, error = %e, received_chars = content.len(), "Stream failed");
                        if let Some(tracker) = &tracker {
                            tracker.record_failure(&descriptor.name);
                        }
                        yield StreamEvent::Error { error: e.to_string(), provider: descriptor.name.clone() };
                        return;
                    }
                    None => break,
                }
            }

            let usage = reported.filter(|u| !u.is_empty()).unwrap_or_else(|| {
                CostAccountant::estimate_usage(prompt_chars, content.chars().count())
            });
            let cost = CostAccountant::cost_or_zero(&descriptor, &usage);
            let duration = started.elapsed();

            info!(
                provider = %descriptor.name,
                model = %descriptor.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                estimated = usage.estimated,
                cost,
                duration_ms = duration.as_millis(),
                "Stream completed"
            );
            if let Some(tracker) = &tracker {
                tracker.record_success(&descriptor.name, &usage, cost);
            }

            yield StreamEvent::Finalized(StreamSummary {
                full_content: content,
                provider: descriptor.name.clone(),
                model: descriptor.model.clone(),
                usage,
                cost,
                duration_seconds: duration.as_secs_f64(),
                timestamp: Utc::now(),
            });
        };

        Box::pin(events)
    }
}
