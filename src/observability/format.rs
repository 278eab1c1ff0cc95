//! Conversion of `tracing` events into `LogEvent`s.

use std::fmt::{self, Write};

use tracing::field::{Field, Visit};
use tracing::Event;

use crate::observability::event::{Level, LogEvent};

/// Collects the `message` field, a `sensitive` flag, and every other field
/// as ` key=value` pairs.
#[derive(Default)]
pub(crate) struct LineVisitor {
    message: String,
    fields: String,
    sensitive: bool,
}

impl Visit for LineVisitor {
    fn record_bool(&mut self, field: &Field, value: bool) {
        if field.name() == "sensitive" {
            self.sensitive = value;
        } else {
            self.record_debug(field, &value);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

/// Build a `LogEvent` stamped now from a tracing event.
pub(crate) fn to_log_event(event: &Event<'_>) -> LogEvent {
    let mut visitor = LineVisitor::default();
    event.record(&mut visitor);

    let level = Level::from_tracing(event.metadata().level());
    let mut message = visitor.message;
    message.push_str(&visitor.fields);
    LogEvent::new(level, message).sensitive(visitor.sensitive)
}
