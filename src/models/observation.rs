use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use super::Message;

/// Which capture channel produced an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Notification,
    AccessibilityTree,
}

/// A raw capture event, after normalization but before dedup.
///
/// `hint` is the node's content description (or the notification title) and
/// combines with `body` into the derived dedup identity; it is never shown
/// to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct RawObservation {
    pub source: SourceKind,
    pub title: String,
    pub body: String,
    pub subtext: String,
    pub package_id: String,
    pub hint: String,
}

impl RawObservation {
    /// Derived identity for dedup: stable within the process lifetime.
    pub fn dedup_key(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hint.hash(&mut hasher);
        self.body.hash(&mut hasher);
        hasher.finish()
    }

    pub fn into_message(self) -> Message {
        let chat_name = match self.source {
            // Notification titles carry the conversation name.
            SourceKind::Notification => self.title.clone(),
            SourceKind::AccessibilityTree => "WhatsApp Chat".to_string(),
        };
        Message::new(self.title, self.body).with_chat_name(chat_name)
    }
}

/// A posted-notification event as delivered by the host platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    pub package_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub sub_text: Option<String>,
}

/// A snapshot of the accessibility node tree for the foreground window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessibilitySnapshot {
    pub package_id: String,
    pub root: AccessibilityNode,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessibilityNode {
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub content_description: Option<String>,
    #[serde(default)]
    pub children: Vec<AccessibilityNode>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(source: SourceKind) -> RawObservation {
        RawObservation {
            source,
            title: "Alice".into(),
            body: "lunch?".into(),
            subtext: String::new(),
            package_id: "com.whatsapp".into(),
            hint: "Message from Alice".into(),
        }
    }

    #[test]
    fn dedup_key_depends_on_hint_and_body() {
        let a = observation(SourceKind::Notification);
        let mut b = a.clone();
        assert_eq!(a.dedup_key(), b.dedup_key());

        b.body = "dinner?".into();
        assert_ne!(a.dedup_key(), b.dedup_key());

        let mut c = a.clone();
        c.hint = String::new();
        assert_ne!(a.dedup_key(), c.dedup_key());
    }

    #[test]
    fn notification_message_keeps_title_as_chat_name() {
        let message = observation(SourceKind::Notification).into_message();
        assert_eq!(message.sender, "Alice");
        assert_eq!(message.chat_name, "Alice");
    }

    #[test]
    fn tree_message_uses_generic_chat_name() {
        let message = observation(SourceKind::AccessibilityTree).into_message();
        assert_eq!(message.chat_name, "WhatsApp Chat");
    }
}
