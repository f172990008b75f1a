pub mod message;
pub mod observation;

pub use message::{Message, SummaryState};
pub use observation::{
    AccessibilityNode, AccessibilitySnapshot, NotificationEvent, RawObservation, SourceKind,
};
