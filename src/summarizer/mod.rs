//! Background bullet summaries of the captured text.
//!
//! Each activation gets one [`SummaryHandle`]. The remote call runs on a tokio
//! task; the handle exposes non-blocking status reads, and completion is
//! announced by sending the handle id on the settled channel. Cancelling a
//! handle marks it superseded so a late result is never written into it.

pub mod provider;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub use provider::OpenAiSummarizer;

pub type SummaryId = u64;

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("no API key configured")]
    MissingApiKey,
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("provider returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Produces the bullet list for one piece of text.
#[async_trait]
pub trait SummaryBackend: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<Vec<String>, SummaryError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryStatus {
    Pending,
    Ready,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Outcome {
    Pending,
    Ready(Vec<String>),
    Failed(String),
}

/// One summarization request. Superseded, never reused.
#[derive(Debug)]
pub struct SummaryHandle {
    id: SummaryId,
    source_text: Arc<str>,
    outcome: Arc<Mutex<Outcome>>,
    superseded: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl SummaryHandle {
    pub fn id(&self) -> SummaryId {
        self.id
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn status(&self) -> SummaryStatus {
        match &*self.outcome.lock().unwrap_or_else(PoisonError::into_inner) {
            Outcome::Pending => SummaryStatus::Pending,
            Outcome::Ready(_) => SummaryStatus::Ready,
            Outcome::Failed(_) => SummaryStatus::Failed,
        }
    }

    /// Bullets or failure reason; `None` while pending.
    pub fn result(&self) -> Option<Result<Vec<String>, String>> {
        match &*self.outcome.lock().unwrap_or_else(PoisonError::into_inner) {
            Outcome::Pending => None,
            Outcome::Ready(bullets) => Some(Ok(bullets.clone())),
            Outcome::Failed(reason) => Some(Err(reason.clone())),
        }
    }

    pub fn is_superseded(&self) -> bool {
        self.superseded.load(Ordering::Acquire)
    }
}

pub struct Summarizer {
    backend: Option<Arc<dyn SummaryBackend>>,
    settled_tx: mpsc::UnboundedSender<SummaryId>,
    next_id: SummaryId,
}

impl Summarizer {
    /// `backend = None` means no credential: every request fails immediately.
    pub fn new(
        backend: Option<Arc<dyn SummaryBackend>>,
        settled_tx: mpsc::UnboundedSender<SummaryId>,
    ) -> Self {
        if backend.is_none() {
            warn!("Summarizer has no backend, summaries will be unavailable");
        }
        Self {
            backend,
            settled_tx,
            next_id: 1,
        }
    }

    /// Start summarizing `text`. Returns at once; must run inside a tokio runtime.
    pub fn start(&mut self, text: &str) -> SummaryHandle {
        let id = self.next_id;
        self.next_id += 1;

        let source_text: Arc<str> = Arc::from(text);
        let superseded = Arc::new(AtomicBool::new(false));

        let Some(backend) = self.backend.clone() else {
            return SummaryHandle {
                id,
                source_text,
                outcome: Arc::new(Mutex::new(Outcome::Failed(
                    SummaryError::MissingApiKey.to_string(),
                ))),
                superseded,
                task: None,
            };
        };

        let outcome = Arc::new(Mutex::new(Outcome::Pending));
        let task = tokio::spawn({
            let outcome = Arc::clone(&outcome);
            let superseded = Arc::clone(&superseded);
            let source_text = Arc::clone(&source_text);
            let settled_tx = self.settled_tx.clone();
            async move {
                let result = backend.summarize(&source_text).await;
                if superseded.load(Ordering::Acquire) {
                    debug!("Summary #{id} finished after supersession, discarding");
                    return;
                }
                let settled = match result {
                    Ok(bullets) => {
                        info!("Summary #{id} ready ({} bullets)", bullets.len());
                        Outcome::Ready(bullets)
                    }
                    Err(e) => {
                        warn!("Summary #{id} failed: {e}");
                        Outcome::Failed(e.to_string())
                    }
                };
                *outcome.lock().unwrap_or_else(PoisonError::into_inner) = settled;
                let _ = settled_tx.send(id);
            }
        });

        debug!("Summary #{id} started ({} chars)", text.len());
        SummaryHandle {
            id,
            source_text,
            outcome,
            superseded,
            task: Some(task),
        }
    }

    /// Supersede `handle`. Its late result, if any, is dropped.
    pub fn cancel(&self, handle: &mut SummaryHandle) {
        handle.superseded.store(true, Ordering::Release);
        if let Some(task) = handle.task.take() {
            task.abort();
        }
        debug!("Summary #{} superseded", handle.id);
    }
}
