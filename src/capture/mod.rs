pub mod adapter;
pub mod dedup;

pub use adapter::{normalize_notification, normalize_snapshot};
pub use dedup::Deduplicator;
