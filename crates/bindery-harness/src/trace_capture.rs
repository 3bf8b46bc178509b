#![forbid(unsafe_code)]

//! Capture `tracing` spans and events emitted by a closure.
//!
//! Spans keep the fields they were opened with plus anything recorded later
//! (for example `duration_us`). Fields declared `Empty` and never recorded
//! show up as empty strings.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedSpan {
    pub name: String,
    pub fields: HashMap<String, String>,
}

impl CapturedSpan {
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedEvent {
    pub level: tracing::Level,
    pub target: String,
    pub fields: HashMap<String, String>,
}

impl CapturedEvent {
    /// The event's formatted message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.fields.get("message").map(String::as_str)
    }
}

/// Everything captured during one [`capture_tracing`] call.
#[derive(Debug, Clone, Default)]
pub struct Captured {
    pub spans: Vec<CapturedSpan>,
    pub events: Vec<CapturedEvent>,
}

impl Captured {
    /// Spans with the given name, in open order.
    #[must_use]
    pub fn spans_named(&self, name: &str) -> Vec<&CapturedSpan> {
        self.spans.iter().filter(|s| s.name == name).collect()
    }

    /// Whether any event's message contains `needle`.
    #[must_use]
    pub fn has_message(&self, needle: &str) -> bool {
        self.events
            .iter()
            .filter_map(CapturedEvent::message)
            .any(|m| m.contains(needle))
    }
}

/// Index of a span in [`Captured::spans`], kept in the span's extensions.
struct SpanSlot(usize);

struct FieldVisitor<'a>(&'a mut HashMap<String, String>);

impl Visit for FieldVisitor<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{value:?}"));
    }
    fn record_u64(&mut self, field: &Field, value: u64) {
        self.0.insert(field.name().to_string(), value.to_string());
    }
    fn record_i64(&mut self, field: &Field, value: i64) {
        self.0.insert(field.name().to_string(), value.to_string());
    }
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }
    fn record_bool(&mut self, field: &Field, value: bool) {
        self.0.insert(field.name().to_string(), value.to_string());
    }
}

struct CaptureLayer {
    captured: Arc<Mutex<Captured>>,
}

impl CaptureLayer {
    fn lock(&self) -> MutexGuard<'_, Captured> {
        // A panicking test body must not hide what was captured before it.
        self.captured
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl<S> tracing_subscriber::Layer<S> for CaptureLayer
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut fields = HashMap::new();
        attrs.record(&mut FieldVisitor(&mut fields));
        for field in attrs.metadata().fields() {
            fields.entry(field.name().to_string()).or_default();
        }
        let slot = {
            let mut captured = self.lock();
            captured.spans.push(CapturedSpan {
                name: attrs.metadata().name().to_string(),
                fields,
            });
            captured.spans.len() - 1
        };
        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(SpanSlot(slot));
        }
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };
        let extensions = span.extensions();
        let Some(SpanSlot(slot)) = extensions.get::<SpanSlot>() else {
            return;
        };
        let mut captured = self.lock();
        if let Some(captured_span) = captured.spans.get_mut(*slot) {
            values.record(&mut FieldVisitor(&mut captured_span.fields));
        }
    }

    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = HashMap::new();
        event.record(&mut FieldVisitor(&mut fields));
        self.lock().events.push(CapturedEvent {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            fields,
        });
    }
}

/// Run `f` with a capturing subscriber installed for the current thread.
pub fn capture_tracing(f: impl FnOnce()) -> Captured {
    let captured = Arc::new(Mutex::new(Captured::default()));
    let layer = CaptureLayer {
        captured: Arc::clone(&captured),
    };
    let subscriber = tracing_subscriber::registry().with(layer);
    tracing::subscriber::with_default(subscriber, f);
    let guard = captured
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    Captured::clone(&guard)
}
