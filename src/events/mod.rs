// src/events/mod.rs
// =============================================================================
// EventStream: the live, ordered, per-job progress channel.
//
// Rules:
// - Exactly one writer, the job worker. `publish` never waits on a reader:
//   every subscriber gets its own unbounded queue.
// - Any number of readers. A reader sees events from the moment it
//   subscribes; nothing published earlier is replayed.
// - `done` or `error` closes the stream. Subscribing afterwards yields a
//   subscription that ends immediately.
//
// Backpressure is intentionally absent. A job with a huge URL list and a
// subscriber that never reads will keep growing that subscriber's queue.
// =============================================================================

pub mod sse;

use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

/// One progress notification. On the wire: `{"type": ..., "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum AuditEvent {
    Start(StartEvent),
    PageStart(PageStartEvent),
    Check(CheckEvent),
    Result(ResultEvent),
    Progress(ProgressEvent),
    Done(DoneEvent),
    Error(ErrorEvent),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartEvent {
    pub job_id: Uuid,
    pub country: String,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageStartEvent {
    /// 1-based position in the job's URL list
    pub index: usize,
    pub url: String,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckEvent {
    pub index: usize,
    pub url: String,
    pub name: String,
    pub ok: bool,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEvent {
    pub index: usize,
    pub url: String,
    pub all_ok: bool,
    pub passed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub done: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoneEvent {
    pub job_id: Uuid,
    pub total: usize,
    pub done: usize,
    pub output_url: String,
    /// Pages with every check passing
    pub passed: usize,
    /// Pages with at least one failing check
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEvent {
    pub job_id: Uuid,
    pub message: String,
}

impl AuditEvent {
    /// The SSE `event:` name.
    pub fn name(&self) -> &'static str {
        match self {
            AuditEvent::Start(_) => "start",
            AuditEvent::PageStart(_) => "page-start",
            AuditEvent::Check(_) => "check",
            AuditEvent::Result(_) => "result",
            AuditEvent::Progress(_) => "progress",
            AuditEvent::Done(_) => "done",
            AuditEvent::Error(_) => "error",
        }
    }

    /// The payload alone, as JSON, for the SSE `data:` line.
    pub fn data_json(&self) -> serde_json::Result<String> {
        match self {
            AuditEvent::Start(e) => serde_json::to_string(e),
            AuditEvent::PageStart(e) => serde_json::to_string(e),
            AuditEvent::Check(e) => serde_json::to_string(e),
            AuditEvent::Result(e) => serde_json::to_string(e),
            AuditEvent::Progress(e) => serde_json::to_string(e),
            AuditEvent::Done(e) => serde_json::to_string(e),
            AuditEvent::Error(e) => serde_json::to_string(e),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AuditEvent::Done(_) | AuditEvent::Error(_))
    }
}

#[derive(Debug, Default)]
struct Fanout {
    subscribers: Vec<UnboundedSender<AuditEvent>>,
    closed: bool,
}

/// Per-job event channel, write-only for the worker and fan-out for readers.
#[derive(Debug, Default)]
pub struct EventStream {
    inner: Mutex<Fanout>,
}

impl EventStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event for every current subscriber. Never blocks on them.
    pub fn publish(&self, event: AuditEvent) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.closed {
            return;
        }

        let terminal = event.is_terminal();

        // Subscribers whose receiving end is gone are dropped here
        inner
            .subscribers
            .retain(|tx| tx.send(event.clone()).is_ok());

        if terminal {
            inner.closed = true;
            // Dropping the senders lets each reader drain and then end
            inner.subscribers.clear();
        }
    }

    /// Attaches a new reader from this point on.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if !inner.closed {
            inner.subscribers.push(tx);
        }
        // When closed, `tx` is dropped right here and `rx` ends at once
        Subscription { rx }
    }

    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).closed
    }

    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .subscribers
            .len()
    }
}

/// A reader's view of one job's events.
#[derive(Debug)]
pub struct Subscription {
    rx: UnboundedReceiver<AuditEvent>,
}

impl Subscription {
    /// Next event, or None once the stream has closed and been drained.
    pub async fn recv(&mut self) -> Option<AuditEvent> {
        self.rx.recv().await
    }

    pub fn into_stream(self) -> impl Stream<Item = AuditEvent> + Send + 'static {
        stream::unfold(self.rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        })
    }
}
