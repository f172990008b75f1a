mod capture;
mod models;
mod pipeline;
mod queue;
mod settings;
mod store;
mod summarizer;
mod utils;

pub use capture::{normalize_notification, normalize_snapshot, Deduplicator};
pub use models::{
    AccessibilityNode, AccessibilitySnapshot, Message, NotificationEvent, RawObservation,
    SourceKind, SummaryState,
};
pub use pipeline::Pipeline;
pub use queue::MessageQueue;
pub use settings::SettingsStore;
pub use store::Database;
pub use summarizer::{
    GeminiClient, SchedulerController, SummarizeError, Summarizer, DEBOUNCE_WINDOW,
};
