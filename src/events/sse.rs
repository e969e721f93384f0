// src/events/sse.rs
// =============================================================================
// Server-sent-events framing for a Subscription.
//
// Frame order on the wire:
//   : connected                      (initial comment)
//   event: <type>\ndata: <json>\n\n  (one per AuditEvent)
//   : heartbeat                      (every `heartbeat`, independent of jobs)
//
// The response ends after `done` or `error` because the subscription ends.
// The heartbeat timer belongs to the response body, so when the client goes
// away and axum drops the body, the heartbeat and the reader stop with it.
// The job itself keeps running.
// =============================================================================

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tracing::warn;

use super::{AuditEvent, Subscription};

pub fn to_sse_event(event: &AuditEvent) -> Event {
    match event.data_json() {
        Ok(data) => Event::default().event(event.name()).data(data),
        Err(e) => {
            warn!(error = %e, event = event.name(), "failed to serialize event");
            Event::default().comment(format!("dropped {} event", event.name()))
        }
    }
}

pub fn event_stream(
    subscription: Subscription,
) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    let hello = stream::once(async { Ok(Event::default().comment("connected")) });
    let events = subscription
        .into_stream()
        .map(|event| Ok(to_sse_event(&event)));
    hello.chain(events)
}

pub fn sse_response(
    subscription: Subscription,
    heartbeat: Duration,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send + 'static> {
    Sse::new(event_stream(subscription)).keep_alive(
        KeepAlive::new()
            .interval(heartbeat)
            .text("heartbeat"),
    )
}
