pub mod client;
pub mod scheduler;

pub use client::{GeminiClient, SummarizeError, Summarizer};
pub use scheduler::{SchedulerController, DEBOUNCE_WINDOW};
