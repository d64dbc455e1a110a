//! Custom tracing layer for JSONL output.
//!
//! This layer produces machine-parseable JSONL logs on stderr while
//! keeping stdout clean for command payloads.

use std::io::{self, Write};
use std::sync::Mutex;

use chrono::Utc;
use tracing::span::{Attributes, Id};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use super::events::Level;

/// Correlation keys promoted to the top level of each line.
const CORRELATION_KEYS: [&str; 3] = ["run_id", "batch_id", "stage"];

/// Storage for span context data.
#[derive(Debug, Clone, Default)]
struct SpanContext {
    run_id: Option<String>,
    batch_id: Option<String>,
    stage: Option<String>,
}

impl SpanContext {
    fn slot(&mut self, name: &str) -> Option<&mut Option<String>> {
        match name {
            "run_id" => Some(&mut self.run_id),
            "batch_id" => Some(&mut self.batch_id),
            "stage" => Some(&mut self.stage),
            _ => None,
        }
    }
}

/// A visitor that extracts field values from tracing events.
struct JsonFieldVisitor {
    fields: serde_json::Map<String, serde_json::Value>,
    message: Option<String>,
}

impl JsonFieldVisitor {
    fn new() -> Self {
        JsonFieldVisitor {
            fields: serde_json::Map::new(),
            message: None,
        }
    }

    fn insert(&mut self, name: &str, value: serde_json::Value) {
        self.fields.insert(name.to_string(), value);
    }
}

impl tracing::field::Visit for JsonFieldVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.insert(field.name(), serde_json::Value::String(value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        let s = format!("{:?}", value);
        if field.name() == "message" {
            self.message = Some(s);
        } else {
            self.insert(field.name(), serde_json::Value::String(s));
        }
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.insert(field.name(), serde_json::Value::Number(value.into()));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.insert(field.name(), serde_json::Value::Number(value.into()));
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        // NaN and infinities have no JSON number form.
        let value = match serde_json::Number::from_f64(value) {
            Some(n) => serde_json::Value::Number(n),
            None => serde_json::Value::String(value.to_string()),
        };
        self.insert(field.name(), value);
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.insert(field.name(), serde_json::Value::Bool(value));
    }
}

/// A visitor for extracting span context.
struct SpanContextVisitor {
    context: SpanContext,
}

impl tracing::field::Visit for SpanContextVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if let Some(slot) = self.context.slot(field.name()) {
            *slot = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if let Some(slot) = self.context.slot(field.name()) {
            *slot = Some(format!("{:?}", value));
        }
    }
}

/// JSONL tracing layer that outputs to stderr.
pub struct JsonlLayer<W = io::Stderr> {
    writer: Mutex<W>,
}

impl JsonlLayer<io::Stderr> {
    /// Create a new JSONL layer writing to stderr.
    pub fn stderr() -> Self {
        JsonlLayer {
            writer: Mutex::new(io::stderr()),
        }
    }
}

impl<W: Write> JsonlLayer<W> {
    /// Create a new JSONL layer with a custom writer.
    pub fn new(writer: W) -> Self {
        JsonlLayer {
            writer: Mutex::new(writer),
        }
    }
}

impl<S, W> Layer<S> for JsonlLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: Write + 'static,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut visitor = SpanContextVisitor {
            context: SpanContext::default(),
        };
        attrs.record(&mut visitor);

        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(visitor.context);
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let ts = Utc::now();

        let mut visitor = JsonFieldVisitor::new();
        event.record(&mut visitor);

        // Event fields win over enclosing spans.
        let mut correlation = SpanContext::default();
        for key in CORRELATION_KEYS {
            if let Some(serde_json::Value::String(value)) = visitor.fields.remove(key) {
                if value.is_empty() {
                    continue;
                }
                if let Some(slot) = correlation.slot(key) {
                    *slot = Some(value);
                }
            }
        }
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope {
                if let Some(span_ctx) = span.extensions().get::<SpanContext>() {
                    if correlation.run_id.is_none() {
                        correlation.run_id.clone_from(&span_ctx.run_id);
                    }
                    if correlation.batch_id.is_none() {
                        correlation.batch_id.clone_from(&span_ctx.batch_id);
                    }
                    if correlation.stage.is_none() {
                        correlation.stage.clone_from(&span_ctx.stage);
                    }
                }
            }
        }

        let level: Level = (*event.metadata().level()).into();
        let mut obj = serde_json::Map::new();

        obj.insert("ts".to_string(), serde_json::json!(ts.to_rfc3339()));
        obj.insert("level".to_string(), serde_json::json!(level));
        obj.insert(
            "event".to_string(),
            serde_json::json!(event.metadata().target()),
        );
        if let Some(id) = correlation.run_id {
            obj.insert("run_id".to_string(), serde_json::json!(id));
        }
        if let Some(id) = correlation.batch_id {
            obj.insert("batch_id".to_string(), serde_json::json!(id));
        }
        if let Some(s) = correlation.stage {
            obj.insert("stage".to_string(), serde_json::json!(s));
        }
        if let Some(msg) = visitor.message {
            obj.insert("message".to_string(), serde_json::json!(msg));
        }
        if !visitor.fields.is_empty() {
            obj.insert(
                "fields".to_string(),
                serde_json::Value::Object(visitor.fields),
            );
        }

        let json = serde_json::to_string(&serde_json::Value::Object(obj)).unwrap_or_default();
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", json);
        }
    }
}
