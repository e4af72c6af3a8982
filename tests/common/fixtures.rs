//! Inputs, configs, and event helpers for integration tests

use std::time::Duration;

use squishfile::{Config, Event, FileInput, FileRecord, Pipeline};
use tokio::sync::broadcast;

/// Input of `kb` kilobytes filled with a recognizable pattern
pub fn input(name: &str, kb: usize) -> FileInput {
    let data: Vec<u8> = (0..kb * 1024).map(|i| (i % 251) as u8).collect();
    FileInput::new(name, data)
}

/// Config pointing at a stub service, with a fast progress ticker
pub fn test_config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.service.base_url = base_url.to_string();
    config.service.request_timeout = Duration::from_secs(5);
    config.progress.interval = Duration::from_millis(50);
    config
}

/// Collect events until one matches `pred` (inclusive) or the timeout elapses
pub async fn collect_events_until(
    rx: &mut broadcast::Receiver<Event>,
    timeout: Duration,
    pred: impl Fn(&Event) -> bool,
) -> Vec<Event> {
    let mut events = Vec::new();
    let _ = tokio::time::timeout(timeout, async {
        while let Ok(event) = rx.recv().await {
            let done = pred(&event);
            events.push(event);
            if done {
                break;
            }
        }
    })
    .await;
    events
}

/// The record with this original filename
pub async fn record_named(pipeline: &Pipeline, name: &str) -> FileRecord {
    pipeline
        .snapshot()
        .await
        .into_iter()
        .find(|r| r.original_filename == name)
        .unwrap_or_else(|| panic!("no record named {name}"))
}
