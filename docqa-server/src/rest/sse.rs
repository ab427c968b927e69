//! SSE framing of delivery events.
//!
//! `start`, `data` and `end` go out as `message` events whose data is
//! `{"type": ..., "content": ...}`; a failure goes out as one `error` event
//! with `{"error": ...}`.

use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use docqa_model::{EventStream, StreamEvent};
use futures::{Stream, StreamExt};
use serde_json::json;

pub fn to_sse_event(event: StreamEvent) -> Event {
    match event {
        StreamEvent::Start => message("start", ""),
        StreamEvent::Data { content } => message("data", &content),
        StreamEvent::End => message("end", ""),
        StreamEvent::Error { message } => {
            Event::default().event("error").data(json!({ "error": message }).to_string())
        }
    }
}

fn message(kind: &str, content: &str) -> Event {
    Event::default().event("message").data(json!({ "type": kind, "content": content }).to_string())
}

/// Serve `events` as an SSE response. Each event is written before the next is pulled.
pub fn sse_response(events: EventStream) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    Sse::new(events.map(|event| Ok::<_, Infallible>(to_sse_event(event)))).keep_alive(KeepAlive::default())
}
