//! Tracing layer forwarding events to a remote append log.

use tracing::{Event, Subscriber};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::{Context, Layer};

use crate::observability::event::Level;
use crate::observability::format::to_log_event;
use crate::observability::FALLBACK_TARGET;
use crate::storage::SinkWriter;

/// Root target of every event this crate emits.
const CRATE_TARGET: &str = env!("CARGO_CRATE_NAME");

/// Targets the remote destination accepts at `level` and above.
///
/// Only this crate's events qualify. Events from the HTTP stack carrying the
/// remote appends would otherwise be appended themselves, and the fallback
/// target is where the sink reports its own failures.
pub fn forwarded_targets(level: Level) -> Targets {
    Targets::new()
        .with_target(CRATE_TARGET, level.to_filter())
        .with_target(FALLBACK_TARGET, LevelFilter::OFF)
}

/// Renders each event as one line and queues it on a `SinkWriter`.
///
/// Events arriving before the sink is ready, after the writer closed, or
/// while its queue is full are dropped without affecting other layers.
/// Compose with `forwarded_targets` to keep the sink's own traffic out.
#[derive(Debug, Clone)]
pub struct RemoteLayer {
    writer: SinkWriter,
}

impl RemoteLayer {
    pub fn new(writer: SinkWriter) -> Self {
        Self { writer }
    }
}

impl<S: Subscriber> Layer<S> for RemoteLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let line = to_log_event(event).render();
        let _ = self.writer.submit(line);
    }
}
