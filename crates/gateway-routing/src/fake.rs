//! Scripted providers for router and gateway tests.

use async_trait::async_trait;
use futures::{stream, StreamExt};
use gateway_core::{
    Completion, FragmentStream, GatewayRequest, LLMProvider, ProviderDescriptor, ProviderError,
    StreamFragment, Usage,
};
use gateway_providers::ProviderRegistry;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Per-provider invocation counters
#[derive(Debug, Clone, Default)]
pub(crate) struct Calls(Arc<Mutex<HashMap<String, usize>>>);

impl Calls {
    pub(crate) fn get(&self, id: &str) -> usize {
        self.0.lock().get(id).copied().unwrap_or(0)
    }

    fn bump(&self, id: &str) {
        *self.0.lock().entry(id.to_string()).or_default() += 1;
    }
}

pub(crate) struct FakeProvider {
    descriptor: ProviderDescriptor,
    outcome: Result<String, ProviderError>,
    usage: Option<Usage>,
    delay: Option<Duration>,
    streaming: bool,
    held_open: Option<Arc<AtomicBool>>,
    calls: Calls,
}

/// Sets its flag when dropped
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl FakeProvider {
    pub(crate) fn ok(id: &str, content: &str) -> Self {
        Self {
            descriptor: ProviderDescriptor::new(id, format!("{id}-model")),
            outcome: Ok(content.to_string()),
            usage: None,
            delay: None,
            streaming: true,
            held_open: None,
            calls: Calls::default(),
        }
    }

    pub(crate) fn failing(id: &str, error: ProviderError) -> Self {
        Self {
            outcome: Err(error),
            ..Self::ok(id, "")
        }
    }

    pub(crate) fn unavailable(mut self) -> Self {
        self.descriptor.is_available = false;
        self
    }

    pub(crate) fn with_pricing(mut self, input: f64, output: f64) -> Self {
        self.descriptor = self.descriptor.with_pricing(input, output);
        self
    }

    pub(crate) fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn blocking_only(mut self) -> Self {
        self.streaming = false;
        self
    }

    /// Keep the stream open after its fragments; `dropped` is set once the
    /// stream is dropped
    pub(crate) fn held_open(mut self, dropped: Arc<AtomicBool>) -> Self {
        self.held_open = Some(dropped);
        self
    }

    async fn start(&self) -> Result<String, ProviderError> {
        self.calls.bump(self.id());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.clone()
    }
}

#[async_trait]
impl LLMProvider for FakeProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    fn supports_streaming(&self) -> bool {
        self.streaming
    }

    async fn generate(&self, _request: &GatewayRequest) -> Result<Completion, ProviderError> {
        let content = self.start().await?;
        let mut completion = Completion::new(content, self.model());
        if let Some(usage) = self.usage {
            completion = completion.with_usage(usage);
        }
        Ok(completion)
    }

    async fn stream(&self, _request: &GatewayRequest) -> Result<FragmentStream, ProviderError> {
        let content = self.start().await?;
        let mut fragments: Vec<Result<StreamFragment, ProviderError>> = content
            .split_inclusive(' ')
            .map(|word| Ok(StreamFragment::Delta(word.to_string())))
            .collect();
        if let Some(usage) = self.usage {
            fragments.push(Ok(StreamFragment::Usage(usage)));
        }
        let fragments = stream::iter(fragments);
        match self.held_open.clone() {
            Some(dropped) => {
                let guard = DropFlag(dropped);
                Ok(Box::pin(fragments.chain(stream::pending()).map(move |item| {
                    let _held = &guard;
                    item
                })))
            }
            None => Ok(Box::pin(fragments)),
        }
    }
}

/// Registry over `providers`, all sharing one call counter
pub(crate) fn registry(providers: Vec<FakeProvider>) -> (Arc<ProviderRegistry>, Calls) {
    let calls = Calls::default();
    let registry = providers
        .into_iter()
        .fold(ProviderRegistry::new(), |registry, mut provider| {
            provider.calls = calls.clone();
            registry.with_provider(Arc::new(provider))
        });
    (Arc::new(registry), calls)
}
