use anyhow::Result;
use tokio::sync::watch;

use crate::models::Message;
use crate::store::Database;

/// Ordered store of captured messages with a durable mirror and an
/// observable change stream.
///
/// The sequence lives inside the watch sender, so a mutation and its
/// notification are one atomic step: every value a subscriber sees is a
/// complete snapshot of the queue at some instant, and back-to-back
/// mutations coalesce to the latest snapshot (consumers are state-based).
#[derive(Clone)]
pub struct MessageQueue {
    changes: watch::Sender<Vec<Message>>,
    store: Database,
}

impl MessageQueue {
    /// Rehydrates the queue from the last durable snapshot; absent or
    /// corrupt data starts the queue empty.
    pub async fn load(store: Database) -> Result<Self> {
        let messages = store.load_messages().await.unwrap_or_else(|err| {
            log::warn!("Failed to load persisted messages, starting empty: {err:#}");
            Vec::new()
        });

        let (changes, _) = watch::channel(messages);
        Ok(Self { changes, store })
    }

    /// Appends in memory (visible once this returns) and schedules a
    /// best-effort overwrite of the durable snapshot off the critical path.
    pub fn append(&self, message: Message) {
        let mut snapshot = Vec::new();
        self.changes.send_modify(|messages| {
            messages.push(message);
            snapshot = messages.clone();
        });
        self.store.save_messages_detached(snapshot);
    }

    /// A copy of the current sequence, insertion order preserved.
    pub fn snapshot(&self) -> Vec<Message> {
        self.changes.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.changes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.borrow().is_empty()
    }

    /// Empties the queue and removes the durable snapshot.
    pub async fn clear(&self) -> Result<()> {
        self.changes.send_modify(Vec::clear);
        self.store.remove_messages().await
    }

    /// Subscribes to queue snapshots. The current snapshot is readable
    /// immediately; every append/clear publishes a new one.
    pub fn changes(&self) -> watch::Receiver<Vec<Message>> {
        self.changes.subscribe()
    }
}
