//! Scripted collaborators for tests.
//!
//! [`ScriptedBackend`] replays a fixed queue of completions and records every
//! prompt it receives. [`StaticFetcher`] returns the same fetch outcome every
//! time. Neither touches the network.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{BackendError, FetchError};
use crate::invoker::LlmBackend;
use crate::pipeline::MetadataFetcher;
use crate::types::{RawContext, VideoReference};

/// LLM backend that answers from a queue.
///
/// Once the queue is empty every call fails with a transport error.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Result<String, BackendError>>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl ScriptedBackend {
    /// Creates a backend that returns `responses` in order.
    #[must_use]
    pub fn new(responses: impl IntoIterator<Item = Result<String, BackendError>>) -> Self {
        Self {
            script: Mutex::new(responses.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Creates a backend that replies with each text in order.
    #[must_use]
    pub fn replying<S: Into<String>>(responses: impl IntoIterator<Item = S>) -> Self {
        Self::new(responses.into_iter().map(|r| Ok(r.into())))
    }

    /// Delays every answer, for timeout tests.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `complete` calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every prompt received, oldest first.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn complete(&self, prompt: &str) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prompt.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        next.unwrap_or_else(|| Err(BackendError::Transport("script exhausted".to_string())))
    }
}

/// Metadata fetcher with a fixed outcome.
#[derive(Debug)]
pub struct StaticFetcher {
    outcome: Result<RawContext, FetchError>,
    calls: AtomicUsize,
}

impl StaticFetcher {
    /// Always returns `context`.
    #[must_use]
    pub const fn returning(context: RawContext) -> Self {
        Self {
            outcome: Ok(context),
            calls: AtomicUsize::new(0),
        }
    }

    /// Always fails with `error`.
    #[must_use]
    pub const fn failing(error: FetchError) -> Self {
        Self {
            outcome: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    /// Returns a caption-only context for any URL.
    #[must_use]
    pub fn with_caption(caption: &str) -> Self {
        let mut context = RawContext::new("");
        context.caption = Some(caption.to_string());
        Self::returning(context)
    }

    /// Number of `fetch` calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataFetcher for StaticFetcher {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn fetch(&self, video: &VideoReference) -> Result<RawContext, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone().map(|mut context| {
            if context.source_url.is_empty() {
                context.source_url.clone_from(&video.url);
            }
            context
        })
    }
}
