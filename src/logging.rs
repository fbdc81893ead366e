use std::sync::Arc;

use log::Level;

/// Destination for driver log lines.
pub trait LogSink: Send + Sync {
    fn log(&self, level: Level, message: &str);
}

/// Forwards to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogCrateSink;

impl LogSink for LogCrateSink {
    fn log(&self, level: Level, message: &str) {
        log::log!(target: "pird", level, "{message}");
    }
}

/// Per-instance logger. Debug lines are only emitted when the driver was
/// configured with `debug: true`.
#[derive(Clone)]
pub struct DriverLogger {
    sink: Arc<dyn LogSink>,
    debug: bool,
}

impl DriverLogger {
    pub fn new(sink: Arc<dyn LogSink>, debug: bool) -> Self {
        Self { sink, debug }
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn debug(&self, message: &str) {
        if self.debug {
            self.sink.log(Level::Debug, message);
        }
    }

    pub fn info(&self, message: &str) {
        self.sink.log(Level::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.sink.log(Level::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.sink.log(Level::Error, message);
    }
}

impl Default for DriverLogger {
    fn default() -> Self {
        Self::new(Arc::new(LogCrateSink), false)
    }
}
