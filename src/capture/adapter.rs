//! Normalizes the two heterogeneous capture channels (posted notifications
//! and accessibility-tree snapshots) into `RawObservation`s.
//!
//! Pure transformations: malformed or foreign input yields no observations,
//! never an error.

use crate::models::{
    AccessibilityNode, AccessibilitySnapshot, NotificationEvent, RawObservation, SourceKind,
};

pub const WHATSAPP_PACKAGE: &str = "com.whatsapp";
pub const WHATSAPP_BUSINESS_PACKAGE: &str = "com.whatsapp.w4b";

/// Anything this long is almost certainly a whole-screen dump, not a chat
/// bubble.
const MAX_BUBBLE_TEXT_LEN: usize = 500;

/// How far up the tree we look for a sender label.
const MAX_SENDER_ANCESTORS: usize = 5;

fn is_watched_package(package_id: &str) -> bool {
    package_id == WHATSAPP_PACKAGE || package_id == WHATSAPP_BUSINESS_PACKAGE
}

/// Turns a posted notification into a single observation, or nothing when
/// the notification is foreign or missing its title/text.
pub fn normalize_notification(event: &NotificationEvent) -> Option<RawObservation> {
    if !is_watched_package(&event.package_id) {
        return None;
    }

    let title = event.title.as_deref().filter(|t| !t.is_empty())?;
    let text = event.text.as_deref().filter(|t| !t.is_empty())?;
    let subtext = event.sub_text.clone().unwrap_or_default();

    Some(RawObservation {
        source: SourceKind::Notification,
        title: title.to_string(),
        body: text.to_string(),
        subtext,
        package_id: event.package_id.clone(),
        hint: title.to_string(),
    })
}

/// Walks the snapshot tree depth-first and emits one observation per node
/// that looks like a message bubble.
pub fn normalize_snapshot(snapshot: &AccessibilitySnapshot) -> Vec<RawObservation> {
    if !is_watched_package(&snapshot.package_id) {
        return Vec::new();
    }

    let mut observations = Vec::new();
    let mut ancestors = Vec::new();
    collect_bubbles(
        &snapshot.root,
        &snapshot.package_id,
        &mut ancestors,
        &mut observations,
    );
    observations
}

fn collect_bubbles<'a>(
    node: &'a AccessibilityNode,
    package_id: &str,
    ancestors: &mut Vec<&'a AccessibilityNode>,
    out: &mut Vec<RawObservation>,
) {
    if let Some(text) = node.text.as_deref() {
        if !text.is_empty() && text.chars().count() < MAX_BUBBLE_TEXT_LEN {
            let sender = resolve_sender(ancestors);
            let hint = node.content_description.clone().unwrap_or_default();

            out.push(RawObservation {
                source: SourceKind::AccessibilityTree,
                title: sender,
                body: text.to_string(),
                subtext: String::new(),
                package_id: package_id.to_string(),
                hint,
            });
        }
    }

    ancestors.push(node);
    for child in &node.children {
        collect_bubbles(child, package_id, ancestors, out);
    }
    ancestors.pop();
}

/// Sender heuristic, kept exactly as observed against real output: the
/// nearest of up to 5 ancestors whose accessible label mentions "message"
/// names the sender before its first comma; otherwise the bubble is ours.
fn resolve_sender(ancestors: &[&AccessibilityNode]) -> String {
    for ancestor in ancestors.iter().rev().take(MAX_SENDER_ANCESTORS) {
        let Some(label) = ancestor.content_description.as_deref() else {
            continue;
        };
        if label.to_lowercase().contains("message") {
            return label.split(',').next().unwrap_or(label).trim().to_string();
        }
    }
    "You".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(package_id: &str, title: Option<&str>, text: Option<&str>) -> NotificationEvent {
        NotificationEvent {
            package_id: package_id.to_string(),
            title: title.map(str::to_string),
            text: text.map(str::to_string),
            sub_text: None,
        }
    }

    fn leaf(text: &str) -> AccessibilityNode {
        AccessibilityNode {
            text: Some(text.to_string()),
            ..Default::default()
        }
    }

    fn labeled(label: &str, children: Vec<AccessibilityNode>) -> AccessibilityNode {
        AccessibilityNode {
            content_description: Some(label.to_string()),
            children,
            ..Default::default()
        }
    }

    #[test]
    fn notification_is_normalized() {
        let obs =
            normalize_notification(&notification("com.whatsapp", Some("Alice"), Some("hey")))
                .unwrap();
        assert_eq!(obs.source, SourceKind::Notification);
        assert_eq!(obs.title, "Alice");
        assert_eq!(obs.body, "hey");
        assert_eq!(obs.hint, "Alice");
    }

    #[test]
    fn foreign_package_is_ignored() {
        assert!(
            normalize_notification(&notification("com.example.mail", Some("Bob"), Some("hi")))
                .is_none()
        );
    }

    #[test]
    fn business_variant_is_accepted() {
        assert!(
            normalize_notification(&notification("com.whatsapp.w4b", Some("Shop"), Some("order")))
                .is_some()
        );
    }

    #[test]
    fn missing_title_or_text_is_dropped() {
        assert!(normalize_notification(&notification("com.whatsapp", None, Some("hi"))).is_none());
        assert!(normalize_notification(&notification("com.whatsapp", Some("Alice"), None)).is_none());
        assert!(
            normalize_notification(&notification("com.whatsapp", Some(""), Some("hi"))).is_none()
        );
    }

    #[test]
    fn snapshot_collects_qualifying_leaves_in_order() {
        let snapshot = AccessibilitySnapshot {
            package_id: "com.whatsapp".into(),
            root: AccessibilityNode {
                children: vec![leaf("first"), leaf("second")],
                ..Default::default()
            },
        };

        let observations = normalize_snapshot(&snapshot);
        assert_eq!(observations.len(), 2);
        assert_eq!(observations[0].body, "first");
        assert_eq!(observations[1].body, "second");
    }

    #[test]
    fn long_text_is_rejected() {
        let snapshot = AccessibilitySnapshot {
            package_id: "com.whatsapp".into(),
            root: leaf(&"x".repeat(500)),
        };
        assert!(normalize_snapshot(&snapshot).is_empty());

        let snapshot = AccessibilitySnapshot {
            package_id: "com.whatsapp".into(),
            root: leaf(&"x".repeat(499)),
        };
        assert_eq!(normalize_snapshot(&snapshot).len(), 1);
    }

    #[test]
    fn sender_comes_from_ancestor_label() {
        let snapshot = AccessibilitySnapshot {
            package_id: "com.whatsapp".into(),
            root: labeled("Message from Alice, 10:42", vec![leaf("lunch?")]),
        };

        let observations = normalize_snapshot(&snapshot);
        assert_eq!(observations[0].title, "Message from Alice");
    }

    #[test]
    fn bubble_length_counts_characters_not_bytes() {
        // 300 characters but 600 UTF-8 bytes: still a valid bubble.
        let snapshot = AccessibilitySnapshot {
            package_id: "com.whatsapp".into(),
            root: leaf(&"é".repeat(300)),
        };
        assert_eq!(normalize_snapshot(&snapshot).len(), 1);

        let snapshot = AccessibilitySnapshot {
            package_id: "com.whatsapp".into(),
            root: leaf(&"é".repeat(500)),
        };
        assert!(normalize_snapshot(&snapshot).is_empty());
    }

    #[test]
    fn matched_label_names_the_sender_even_when_blank() {
        // The pre-comma text of a matched label wins outright; a blank one
        // still short-circuits the ancestor scan.
        let snapshot = AccessibilitySnapshot {
            package_id: "com.whatsapp".into(),
            root: labeled(
                "Message from Alice, 10:42",
                vec![labeled(", message at 10:43", vec![leaf("ping")])],
            ),
        };
        assert_eq!(normalize_snapshot(&snapshot)[0].title, "");
    }

    #[test]
    fn sender_defaults_to_you() {
        let snapshot = AccessibilitySnapshot {
            package_id: "com.whatsapp".into(),
            root: labeled("some container", vec![leaf("on my way")]),
        };
        assert_eq!(normalize_snapshot(&snapshot)[0].title, "You");
    }

    #[test]
    fn sender_lookup_stops_after_five_ancestors() {
        // The labeled node sits six levels above the bubble.
        let mut node = leaf("deep");
        for _ in 0..5 {
            node = AccessibilityNode {
                children: vec![node],
                ..Default::default()
            };
        }
        let snapshot = AccessibilitySnapshot {
            package_id: "com.whatsapp".into(),
            root: labeled("Message from Carol, 9:00", vec![node]),
        };
        assert_eq!(normalize_snapshot(&snapshot)[0].title, "You");
    }

    #[test]
    fn node_hint_is_its_own_content_description() {
        let mut bubble = leaf("ping");
        bubble.content_description = Some("bubble-desc".into());
        let snapshot = AccessibilitySnapshot {
            package_id: "com.whatsapp".into(),
            root: AccessibilityNode {
                children: vec![bubble],
                ..Default::default()
            },
        };
        assert_eq!(normalize_snapshot(&snapshot)[0].hint, "bubble-desc");
    }
}
