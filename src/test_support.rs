//! Event capture for unit tests.

use std::sync::{Arc, Mutex};

use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use crate::observability::format::to_log_event;
use crate::observability::LogEvent;

/// Layer recording every event it sees, in order.
#[derive(Debug, Clone, Default)]
pub(crate) struct CapturedEvents {
    events: Arc<Mutex<Vec<LogEvent>>>,
}

impl CapturedEvents {
    pub(crate) fn subscriber(&self) -> impl Subscriber + Send + Sync + 'static {
        tracing_subscriber::registry().with(self.clone())
    }

    pub(crate) fn events(&self) -> Vec<LogEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl<S: Subscriber> Layer<S> for CapturedEvents {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(to_log_event(event));
    }
}
