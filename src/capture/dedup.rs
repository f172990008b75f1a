use std::collections::HashSet;
use std::sync::Mutex;

use crate::models::{Message, RawObservation};

/// Suppresses repeated observations of the same logical message.
///
/// The recency set never evicts: a message identity seen once is suppressed
/// for the rest of the process lifetime, and memory grows with the number
/// of distinct messages seen. Bounding it would let an evicted message be
/// captured twice, so the set stays unbounded and stores 8-byte keys.
pub struct Deduplicator {
    seen: Mutex<HashSet<u64>>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self {
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// Returns the built `Message` the first time an identity is seen,
    /// `None` on every repeat. Safe to call concurrently from both capture
    /// channels; the lock is only held for the set probe.
    pub fn accept(&self, observation: RawObservation) -> Option<Message> {
        let key = observation.dedup_key();

        {
            let mut seen = match self.seen.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if !seen.insert(key) {
                return None;
            }
        }

        Some(observation.into_message())
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        match self.seen.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new()
    }
}
