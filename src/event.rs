use std::fmt;
use std::sync::Arc;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "message", rename_all = "kebab-case")]
pub enum SensorEvent {
    Started,
    Detected,
    Stopped,
    Error(String),
}

impl SensorEvent {
    pub fn is_error(&self) -> bool {
        matches!(self, SensorEvent::Error(_))
    }
}

pub type EventCallback = Arc<dyn Fn(SensorEvent) + Send + Sync>;

/// Hands events to the caller. Must never be invoked while driver state is
/// locked.
#[derive(Clone)]
pub struct EventDispatcher {
    callback: EventCallback,
}

impl EventDispatcher {
    pub fn new(callback: EventCallback) -> Self {
        Self { callback }
    }

    pub fn dispatch(&self, event: SensorEvent) {
        (self.callback)(event);
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher").finish_non_exhaustive()
    }
}
