use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;

use crate::capture::{normalize_notification, normalize_snapshot, Deduplicator};
use crate::models::{AccessibilitySnapshot, Message, NotificationEvent, SummaryState};
use crate::queue::MessageQueue;
use crate::settings::SettingsStore;
use crate::store::Database;
use crate::summarizer::{GeminiClient, SchedulerController, Summarizer};

/// The capture/summarization core wired end to end: event adapters feed
/// the deduplicator, accepted messages land in the durable queue, and the
/// scheduler watches the queue's change stream.
pub struct Pipeline {
    dedup: Deduplicator,
    queue: MessageQueue,
    settings: Arc<SettingsStore>,
    scheduler: SchedulerController,
}

impl Pipeline {
    /// Opens (or creates) the store and settings under `data_dir`,
    /// rehydrates the queue, and starts the scheduler against the Gemini
    /// client.
    pub async fn start(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let settings = Arc::new(SettingsStore::new(data_dir.join("settings.json"))?);
        let summarizer = Arc::new(GeminiClient::new(Arc::clone(&settings)));
        Self::start_with_summarizer(data_dir, settings, summarizer).await
    }

    /// Same wiring with an injected summarization client.
    pub async fn start_with_summarizer(
        data_dir: &Path,
        settings: Arc<SettingsStore>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let store = Database::new(data_dir.join("chatsum.sqlite3"))?;
        let queue = MessageQueue::load(store).await?;
        let scheduler = SchedulerController::start(&queue, summarizer);

        Ok(Self {
            dedup: Deduplicator::new(),
            queue,
            settings,
            scheduler,
        })
    }

    /// Routes a posted notification through normalize → dedup → append.
    /// Returns whether a new message was captured.
    pub fn handle_notification(&self, event: &NotificationEvent) -> bool {
        let Some(observation) = normalize_notification(event) else {
            return false;
        };
        let Some(message) = self.dedup.accept(observation) else {
            log::debug!("Duplicate notification observation dropped");
            return false;
        };

        log::info!("Captured message from {} via notification", message.sender);
        self.queue.append(message);
        true
    }

    /// Routes an accessibility snapshot through the same path. Returns how
    /// many new messages were captured.
    pub fn handle_snapshot(&self, snapshot: &AccessibilitySnapshot) -> usize {
        let mut captured = 0;
        for observation in normalize_snapshot(snapshot) {
            if let Some(message) = self.dedup.accept(observation) {
                log::info!("Captured message from {} via screen content", message.sender);
                self.queue.append(message);
                captured += 1;
            }
        }
        captured
    }

    pub fn messages(&self) -> Vec<Message> {
        self.queue.snapshot()
    }

    /// User action: drop all captured messages and the durable snapshot.
    pub async fn clear_messages(&self) -> Result<()> {
        self.queue.clear().await
    }

    pub fn set_api_key(&self, api_key: &str) -> Result<()> {
        self.settings.set_api_key(api_key)
    }

    pub fn summary_feed(&self) -> watch::Receiver<SummaryState> {
        self.scheduler.feed()
    }

    pub async fn shutdown(mut self) -> Result<()> {
        self.scheduler.shutdown().await
    }
}
