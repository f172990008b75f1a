//! Debounced summarization scheduler.
//!
//! Watches the queue's change stream and runs one summarization cycle at a
//! time: a change arms (or re-arms) a 2 s debounce timer; when the timer
//! elapses a single request is issued with the snapshot at fire time; a
//! change while the request is in flight cancels it and starts a new
//! cycle. The select shape below is the state machine — `deadline` armed
//! means pending, `inflight` occupied means a request is out, and a change
//! always empties the in-flight slot before re-arming, so at most one
//! request is ever outstanding and only the newest request's result can
//! reach the feed.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::models::{Message, SummaryState};
use crate::queue::MessageQueue;

use super::client::{SummarizeError, Summarizer};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Quiet period after the last queue change before a request fires.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(2000);

struct InFlight {
    handle: JoinHandle<Option<Result<String, SummarizeError>>>,
    cancel: CancellationToken,
}

impl InFlight {
    /// Abandons the request. The handle is dropped with the slot, so a
    /// cancelled request's eventual result has nowhere to go.
    fn cancel(self) {
        self.cancel.cancel();
    }
}

pub struct SchedulerController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    feed: watch::Receiver<SummaryState>,
}

impl SchedulerController {
    pub fn start(queue: &MessageQueue, summarizer: Arc<dyn Summarizer>) -> Self {
        let cancel_token = CancellationToken::new();
        let token_clone = cancel_token.clone();

        let (feed_tx, feed_rx) = watch::channel(SummaryState::Idle);
        let handle = tokio::spawn(summarize_loop(
            queue.changes(),
            summarizer,
            feed_tx,
            token_clone,
        ));

        Self {
            handle: Some(handle),
            cancel_token: Some(cancel_token),
            feed: feed_rx,
        }
    }

    /// The surfaced summary state. Holds the latest value; `Ready`/`Failed`
    /// persist until the next cycle or a clear.
    pub fn feed(&self) -> watch::Receiver<SummaryState> {
        self.feed.clone()
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("summarize loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

async fn summarize_loop(
    mut changes: watch::Receiver<Vec<Message>>,
    summarizer: Arc<dyn Summarizer>,
    feed: watch::Sender<SummaryState>,
    cancel_token: CancellationToken,
) {
    let mut deadline: Option<Instant> = None;
    let mut inflight: Option<InFlight> = None;

    // Messages rehydrated before the loop attached count as a change.
    if !changes.borrow_and_update().is_empty() {
        deadline = Some(Instant::now() + DEBOUNCE_WINDOW);
    }

    loop {
        let armed = deadline;
        tokio::select! {
            _ = cancel_token.cancelled() => {
                if let Some(request) = inflight.take() {
                    request.cancel();
                }
                log_info!("summarize loop shutting down");
                break;
            }
            changed = changes.changed() => {
                if changed.is_err() {
                    // Queue dropped; nothing left to watch.
                    break;
                }
                let is_empty = changes.borrow_and_update().is_empty();
                if let Some(request) = inflight.take() {
                    log_info!("queue changed mid-request, cancelling stale summary");
                    request.cancel();
                }
                if is_empty {
                    deadline = None;
                    let _ = feed.send(SummaryState::Idle);
                } else {
                    deadline = Some(Instant::now() + DEBOUNCE_WINDOW);
                }
            }
            _ = wait_for_deadline(armed), if armed.is_some() => {
                deadline = None;
                let snapshot = changes.borrow().clone();
                log_info!("debounce window elapsed, summarizing {} messages", snapshot.len());
                inflight = Some(spawn_request(Arc::clone(&summarizer), snapshot));
                let _ = feed.send(SummaryState::Summarizing);
            }
            outcome = join_request(&mut inflight), if inflight.is_some() => {
                inflight = None;
                match outcome {
                    Some(Ok(text)) => {
                        let _ = feed.send(SummaryState::Ready { text });
                    }
                    Some(Err(err)) => {
                        log_warn!("summarization failed: {err}");
                        let _ = feed.send(SummaryState::Failed {
                            error: err.to_string(),
                        });
                    }
                    // Request observed its cancel token; discard.
                    None => {}
                }
            }
        }
    }
}

fn spawn_request(summarizer: Arc<dyn Summarizer>, snapshot: Vec<Message>) -> InFlight {
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let handle = tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => None,
            result = summarizer.summarize(&snapshot) => Some(result),
        }
    });

    InFlight { handle, cancel }
}

async fn wait_for_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

async fn join_request(inflight: &mut Option<InFlight>) -> Option<Result<String, SummarizeError>> {
    match inflight.as_mut() {
        Some(request) => match (&mut request.handle).await {
            Ok(outcome) => outcome,
            Err(err) => {
                log::error!("summarization task panicked: {err}");
                Some(Err(SummarizeError::TransportFailure(
                    "summarization task failed".to_string(),
                )))
            }
        },
        None => std::future::pending().await,
    }
}
