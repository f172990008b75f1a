use std::path::PathBuf;

use anyhow::Result;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};

use chatsum::{AccessibilitySnapshot, NotificationEvent, Pipeline, SummaryState};

/// One capture event per stdin line, tagged by kind. Stand-in feed for the
/// platform listeners that produce these events in production.
#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
enum InputEvent {
    Notification(NotificationEvent),
    Snapshot(AccessibilitySnapshot),
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let data_dir = std::env::var("CHATSUM_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./chatsum-data"));

    log::info!("chatsum starting up, data dir {}", data_dir.display());
    let pipeline = Pipeline::start(&data_dir).await?;

    let mut feed = pipeline.summary_feed();
    tokio::spawn(async move {
        while feed.changed().await.is_ok() {
            match &*feed.borrow() {
                SummaryState::Idle => println!("-- no messages --"),
                SummaryState::Summarizing => println!("-- summarizing... --"),
                SummaryState::Ready { text } => println!("SUMMARY: {text}"),
                SummaryState::Failed { error } => println!("SUMMARY ERROR: {error}"),
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<InputEvent>(&line) {
            Ok(InputEvent::Notification(event)) => {
                pipeline.handle_notification(&event);
            }
            Ok(InputEvent::Snapshot(snapshot)) => {
                pipeline.handle_snapshot(&snapshot);
            }
            Ok(InputEvent::Clear) => {
                if let Err(err) = pipeline.clear_messages().await {
                    log::error!("Failed to clear messages: {err:#}");
                }
            }
            Err(err) => log::warn!("Skipping malformed event: {err}"),
        }
    }

    pipeline.shutdown().await
}
