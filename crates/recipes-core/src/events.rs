//! Side-channel events emitted while a batch runs

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum BatchEvent {
    Info { message: String },
    Progress { current: u64, total: u64 },
}

impl BatchEvent {
    pub fn event_type_name(&self) -> &'static str {
        match self {
            BatchEvent::Info { .. } => "info",
            BatchEvent::Progress { .. } => "progress",
        }
    }
}

/// Receives batch events synchronously at fixed points of the run.
///
/// Errors are logged by the driver and never abort the batch.
#[async_trait]
pub trait BatchObserver: Send + Sync {
    async fn on_info(&self, message: &str) -> anyhow::Result<()>;
    async fn on_progress(&self, current: u64, total: u64) -> anyhow::Result<()>;
}

/// Observer that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

#[async_trait]
impl BatchObserver for NoopObserver {
    async fn on_info(&self, _message: &str) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_progress(&self, _current: u64, _total: u64) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Observer that keeps every event in order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<BatchEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<BatchEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn infos(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                BatchEvent::Info { message } => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn progress(&self) -> Vec<(u64, u64)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                BatchEvent::Progress { current, total } => Some((current, total)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: BatchEvent) -> anyhow::Result<()> {
        self.events
            .lock()
            .map_err(|_| anyhow::anyhow!("event log poisoned"))?
            .push(event);
        Ok(())
    }
}

#[async_trait]
impl BatchObserver for RecordingObserver {
    async fn on_info(&self, message: &str) -> anyhow::Result<()> {
        self.record(BatchEvent::Info {
            message: message.to_string(),
        })
    }

    async fn on_progress(&self, current: u64, total: u64) -> anyhow::Result<()> {
        self.record(BatchEvent::Progress { current, total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_observer_keeps_order() {
        let observer = RecordingObserver::new();
        observer.on_info("hello").await.unwrap();
        observer.on_progress(1, 2).await.unwrap();
        observer.on_progress(2, 2).await.unwrap();

        assert_eq!(observer.infos(), vec!["hello".to_string()]);
        assert_eq!(observer.progress(), vec![(1, 2), (2, 2)]);
        assert_eq!(observer.events()[0].event_type_name(), "info");
    }

    #[test]
    fn test_event_serialization() {
        let event = BatchEvent::Progress {
            current: 3,
            total: 4,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"event_type": "progress", "current": 3, "total": 4})
        );
    }
}
