use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

fn default_chat_name() -> String {
    "Unknown".to_string()
}

/// A captured chat message. Immutable once built; the queue only ever
/// appends whole values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub sender: String,
    pub text: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default = "default_chat_name")]
    pub chat_name: String,
}

impl Message {
    pub fn new(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            text: text.into(),
            timestamp: Utc::now(),
            chat_name: default_chat_name(),
        }
    }

    pub fn with_chat_name(mut self, chat_name: impl Into<String>) -> Self {
        self.chat_name = chat_name.into();
        self
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.sender, self.text)
    }
}

/// What the presentation layer sees from the summarization scheduler.
/// Never persisted.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum SummaryState {
    Idle,
    Summarizing,
    Ready { text: String },
    Failed { error: String },
}
