//! Incremental answer delivery.
//!
//! A [`DeliveryMachine`] frames the output of a [`FragmentStream`] as an
//! ordered sequence of [`StreamEvent`]s:
//!
//! ```text
//! idle ──start──▶ started ──data*──▶ ended
//!                    │        │
//!                    └─error──┴────▶ errored
//! ```
//!
//! `start` is always first, empty fragments are suppressed, and exactly one of
//! `end` or `error` closes the sequence. [`deliver`] drives the machine over a
//! model stream lazily, so dropping the returned stream stops pulling
//! fragments and drops the model stream with it.

use std::future::Future;
use std::pin::Pin;

use async_stream::stream;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::model::FragmentStream;

/// One framed event pushed to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    /// Generation has begun and the channel is live.
    Start,
    /// A non-empty content fragment.
    Data { content: String },
    /// The generation failed; nothing follows.
    Error { message: String },
    /// The generation completed; nothing follows.
    End,
}

impl StreamEvent {
    /// Whether this event closes the sequence.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::End | Self::Error { .. })
    }
}

/// The states of a single delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryState {
    #[default]
    Idle,
    Started,
    Streaming,
    Ended,
    Errored,
}

/// Per-request state machine enforcing the event framing.
///
/// Every transition returns the event to emit, or `None` when the input
/// produces no event (an empty fragment) or is not allowed in the current
/// state (anything after a terminal event).
#[derive(Debug, Default)]
pub struct DeliveryMachine {
    state: DeliveryState,
}

impl DeliveryMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DeliveryState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, DeliveryState::Ended | DeliveryState::Errored)
    }

    /// `idle → started`.
    pub fn start(&mut self) -> Option<StreamEvent> {
        if self.state != DeliveryState::Idle {
            debug!(state = ?self.state, "ignoring duplicate start");
            return None;
        }
        self.state = DeliveryState::Started;
        Some(StreamEvent::Start)
    }

    /// `started | streaming → streaming` for a non-empty fragment.
    pub fn fragment(&mut self, content: String) -> Option<StreamEvent> {
        match self.state {
            DeliveryState::Started | DeliveryState::Streaming => {}
            state => {
                debug!(?state, "dropping fragment outside an open delivery");
                return None;
            }
        }
        if content.is_empty() {
            return None;
        }
        self.state = DeliveryState::Streaming;
        Some(StreamEvent::Data { content })
    }

    /// `started | streaming → ended`.
    pub fn finish(&mut self) -> Option<StreamEvent> {
        match self.state {
            DeliveryState::Started | DeliveryState::Streaming => {
                self.state = DeliveryState::Ended;
                Some(StreamEvent::End)
            }
            _ => None,
        }
    }

    /// `started | streaming → errored`.
    pub fn fail(&mut self, message: impl Into<String>) -> Option<StreamEvent> {
        match self.state {
            DeliveryState::Started | DeliveryState::Streaming => {
                self.state = DeliveryState::Errored;
                Some(StreamEvent::Error { message: message.into() })
            }
            _ => None,
        }
    }
}

/// A boxed stream of framed events.
pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// Frame the fragments of a model stream.
///
/// `open` is awaited first; if it fails the caller observes `start` followed
/// by `error`. Fragments are forwarded one at a time in received order, so a
/// consumer that writes each event before polling again sees tokens as they
/// arrive.
pub fn deliver<F>(open: F) -> EventStream
where
    F: Future<Output = Result<FragmentStream>> + Send + 'static,
{
    Box::pin(stream! {
        let mut machine = DeliveryMachine::new();
        let opened = open.await;

        if let Some(event) = machine.start() {
            yield event;
        }

        let mut fragments = match opened {
            Ok(fragments) => fragments,
            Err(e) => {
                warn!(error = %e, "failed to open model stream");
                if let Some(event) = machine.fail(e.to_string()) {
                    yield event;
                }
                return;
            }
        };

        while let Some(item) = fragments.next().await {
            match item {
                Ok(content) => {
                    if let Some(event) = machine.fragment(content) {
                        yield event;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "model stream failed");
                    if let Some(event) = machine.fail(e.to_string()) {
                        yield event;
                    }
                    return;
                }
            }
        }

        if let Some(event) = machine.finish() {
            yield event;
        }
    })
}

/// Deliver a fixed text as a complete event sequence.
pub fn deliver_text(text: impl Into<String>) -> EventStream {
    let text = text.into();
    deliver(async move {
        let fragments: FragmentStream = Box::pin(futures::stream::once(async move { Ok(text) }));
        Ok(fragments)
    })
}
