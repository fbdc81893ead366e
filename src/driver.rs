use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::{DriverConfig, Mode, PirOptions, TriggerMode, host_gpio_unsupported};
use crate::event::{EventCallback, EventDispatcher, SensorEvent};
use crate::gpio::GpioController;
use crate::logging::{DriverLogger, LogCrateSink, LogSink};
use crate::sensor::{
    BackendContext, DirectLineBackend, DriverState, SensorBackend, SharedState, SubprocessBackend,
};

/// PIR sensor driver. `start` and `stop` never block or fail; outcomes are
/// reported through the event callback. Both must be called from within a
/// tokio runtime.
pub struct SensorDriver {
    config: Arc<DriverConfig>,
    gpio: Arc<dyn GpioController>,
    events: EventDispatcher,
    log: DriverLogger,
    state: SharedState,
    backend: Mutex<Option<Box<dyn SensorBackend>>>,
}

impl SensorDriver {
    pub fn new(options: PirOptions, gpio: Arc<dyn GpioController>, callback: EventCallback) -> Self {
        Self::with_log_sink(options, gpio, callback, Arc::new(LogCrateSink))
    }

    pub fn with_log_sink(
        options: PirOptions,
        gpio: Arc<dyn GpioController>,
        callback: EventCallback,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        let log = DriverLogger::new(sink, options.debug.unwrap_or(false));
        let config = DriverConfig::resolve(options, host_gpio_unsupported(), &log);
        Self::from_config(config, gpio, callback, log)
    }

    pub fn from_config(
        config: DriverConfig,
        gpio: Arc<dyn GpioController>,
        callback: EventCallback,
        log: DriverLogger,
    ) -> Self {
        Self {
            config: Arc::new(config),
            gpio,
            events: EventDispatcher::new(callback),
            log,
            state: Arc::new(Mutex::new(DriverState::default())),
            backend: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    pub fn start(&self) {
        if self.state.lock().running {
            return;
        }
        if self.config.is_disabled() {
            self.log.info("Disabled.");
            return;
        }

        match self.config.trigger_mode {
            TriggerMode::LowToHighEdge => self.log.info(
                "triggerMode LH selected: read LOW (0, no-motion) to HIGH (1, motion)",
            ),
            TriggerMode::LevelHigh => {
                self.log.info("triggerMode H selected: read HIGH (1, motion)")
            }
        }

        // leftovers of a run that ended without stop()
        if let Some(mut stale) = self.backend.lock().take() {
            stale.release();
        }

        let mut backend = self.select_backend();
        self.log.info(&format!(
            "Mode {} selected ({})",
            self.config.mode,
            backend.name()
        ));

        {
            let mut state = self.state.lock();
            state.ready_to_detect = true;
            state.previous_value = None;
        }

        let ctx = self.context();
        if let Err(e) = backend.open(&ctx) {
            backend.release();
            self.log.error(&e.to_string());
            self.events.dispatch(SensorEvent::Error(e.to_string()));
            return;
        }

        // stored before going live so a concurrent stop() always finds it
        *self.backend.lock() = Some(backend);
        self.state.lock().running = true;
        self.log.info("Started!");
        self.events.dispatch(SensorEvent::Started);

        // stop() flips `running` before it takes the backend, so holding the
        // slot here either arms a live run or sees that it already ended
        let mut slot = self.backend.lock();
        if let Some(backend) = slot.as_mut()
            && self.is_running()
        {
            backend.arm(ctx);
        }
    }

    pub fn stop(&self) {
        {
            let mut state = self.state.lock();
            if !state.running {
                return;
            }
            state.running = false;
        }

        if let Some(mut backend) = self.backend.lock().take() {
            backend.release();
        }
        self.log.debug("Stop");
        self.events.dispatch(SensorEvent::Stopped);
    }

    fn select_backend(&self) -> Box<dyn SensorBackend> {
        match self.config.mode {
            Mode::DirectLine => Box::new(DirectLineBackend::new(self.gpio.clone())),
            Mode::Subprocess => Box::new(SubprocessBackend::new()),
        }
    }

    fn context(&self) -> BackendContext {
        BackendContext {
            config: self.config.clone(),
            events: self.events.clone(),
            log: self.log.clone(),
            state: self.state.clone(),
        }
    }
}

impl Drop for SensorDriver {
    fn drop(&mut self) {
        if let Some(mut backend) = self.backend.get_mut().take() {
            backend.release();
        }
    }
}
