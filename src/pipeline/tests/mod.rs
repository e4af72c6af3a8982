mod download;

use std::time::Duration;

use tokio::sync::broadcast;

use crate::types::{Event, FileId};

/// Drain every event currently buffered in a receiver
pub(super) fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Wait for the first event matching `pred`
pub(super) async fn wait_for(
    rx: &mut broadcast::Receiver<Event>,
    pred: impl Fn(&Event) -> bool,
) -> Event {
    tokio::time::timeout(Duration::from_secs(60), async {
        loop {
            let event = rx.recv().await.unwrap();
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// Progress values reported for one record, in order
pub(super) fn progress_of(events: &[Event], id: &FileId) -> Vec<u8> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Progress { id: eid, percent } if eid == id => Some(*percent),
            _ => None,
        })
        .collect()
}

/// The `skipped` flag of the compressed event for one record
pub(super) fn skipped_flag(events: &[Event], id: &FileId) -> Option<bool> {
    events.iter().find_map(|e| match e {
        Event::Compressed {
            id: eid, skipped, ..
        } if eid == id => Some(*skipped),
        _ => None,
    })
}
