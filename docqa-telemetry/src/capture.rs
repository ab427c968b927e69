//! In-memory capture of log events.
//!
//! [`CaptureLayer`] records every event it sees into an [`EventStorage`].
//! [`capture_events`] installs it as the thread's default subscriber, which
//! is how tests check that a warning was actually emitted.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use serde::Serialize;
use serde_json::Value;
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};

/// One recorded event.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CapturedEvent {
    pub level: String,
    pub target: String,
    pub message: String,
    pub fields: BTreeMap<String, Value>,
}

impl CapturedEvent {
    /// A field rendered as a string, if present.
    pub fn field_str(&self, name: &str) -> Option<String> {
        self.fields.get(name).map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// Shared storage for captured events.
#[derive(Debug, Clone, Default)]
pub struct EventStorage {
    events: Arc<RwLock<Vec<CapturedEvent>>>,
}

impl EventStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.read().map(|e| e.clone()).unwrap_or_default()
    }

    /// Events at `level` (`"WARN"`, `"INFO"`, ...).
    pub fn at_level(&self, level: &str) -> Vec<CapturedEvent> {
        self.events().into_iter().filter(|e| e.level.eq_ignore_ascii_case(level)).collect()
    }

    fn push(&self, event: CapturedEvent) {
        if let Ok(mut events) = self.events.write() {
            events.push(event);
        }
    }
}

/// A tracing layer that captures events in memory.
pub struct CaptureLayer {
    storage: EventStorage,
}

impl CaptureLayer {
    pub fn new(storage: EventStorage) -> Self {
        Self { storage }
    }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = JsonVisitor::default();
        event.record(&mut visitor);
        let mut fields = visitor.0;
        let message = match fields.remove("message") {
            Some(Value::String(s)) => s,
            Some(other) => other.to_string(),
            None => String::new(),
        };

        let metadata = event.metadata();
        self.storage.push(CapturedEvent {
            level: metadata.level().to_string(),
            target: metadata.target().to_string(),
            message,
            fields,
        });
    }
}

/// Capture every event on this thread until the guard is dropped.
pub fn capture_events() -> (EventStorage, DefaultGuard) {
    let storage = EventStorage::new();
    let subscriber = tracing_subscriber::registry().with(CaptureLayer::new(storage.clone()));
    let guard = tracing::subscriber::set_default(subscriber);
    (storage, guard)
}

#[derive(Default)]
struct JsonVisitor(BTreeMap<String, Value>);

impl tracing::field::Visit for JsonVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), Value::String(format!("{value:?}")));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.insert(field.name().to_string(), Value::String(value.to_string()));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.insert(field.name().to_string(), Value::Bool(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0.insert(field.name().to_string(), Value::from(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.insert(field.name().to_string(), Value::from(value));
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0.insert(field.name().to_string(), Value::from(value));
    }
}
