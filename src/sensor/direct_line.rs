use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::{ChipSelector, TriggerMode};
use crate::error::DriverError;
use crate::event::SensorEvent;
use crate::gpio::{GpioChip, GpioController, InputLine, MAX_CHIP_INDEX};
use crate::logging::DriverLogger;
use crate::sensor::{BackendContext, SensorBackend};

type LineSlot = Arc<Mutex<Option<Box<dyn InputLine>>>>;

/// Probes chips `0..=MAX_CHIP_INDEX` in order and returns the first whose
/// label matches `selector`. A chip that cannot be opened ends the probe.
pub fn discover_chip(
    gpio: &dyn GpioController,
    selector: &ChipSelector,
    log: &DriverLogger,
) -> Result<(u32, Box<dyn GpioChip>), DriverError> {
    for index in 0..=MAX_CHIP_INDEX {
        let chip = match gpio.open_chip(index) {
            Ok(chip) => chip,
            Err(e) => {
                log.debug(&format!("[GPIOD] Probe ended at chip {index}: {e}"));
                break;
            }
        };
        let label = match chip.label() {
            Ok(label) => label,
            Err(e) => {
                log.debug(&format!("[GPIOD] Probe ended at chip {index}: {e}"));
                break;
            }
        };

        log.debug(&format!("[GPIOD] Check chip {index}: {label}"));
        if selector.matches(&label) {
            log.info(&format!("[GPIOD] - {selector} - Found chip {index}: {label}"));
            return Ok((index, chip));
        }
    }

    Err(DriverError::ChipNotFound)
}

/// Whether a sample counts as motion. Edge mode needs the previous sample to
/// differ; an unset previous sample counts as different.
pub fn is_detection(trigger: TriggerMode, previous: Option<u8>, value: u8) -> bool {
    if value != 1 {
        return false;
    }
    match trigger {
        TriggerMode::LevelHigh => true,
        TriggerMode::LowToHighEdge => previous != Some(value),
    }
}

struct Poller {
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Reads one line of a libgpiod-style chip on a fixed timer.
pub struct DirectLineBackend {
    gpio: Arc<dyn GpioController>,
    line: LineSlot,
    poller: Option<Poller>,
}

impl DirectLineBackend {
    pub fn new(gpio: Arc<dyn GpioController>) -> Self {
        Self {
            gpio,
            line: Arc::new(Mutex::new(None)),
            poller: None,
        }
    }

    fn poll_once(line: &LineSlot, ctx: &BackendContext) {
        let read = {
            let mut slot = line.lock();
            match slot.as_mut() {
                Some(line) => line.value(),
                None => return,
            }
        };

        match read {
            Ok(value) => {
                let detected = {
                    let mut state = ctx.state.lock();
                    if !state.running {
                        return;
                    }
                    let detected =
                        is_detection(ctx.config.trigger_mode, state.previous_value, value);
                    state.previous_value = Some(value);
                    detected
                };
                ctx.log.debug(&format!("Sensor read value: {value}"));
                if detected {
                    ctx.log.debug("Detected presence");
                    ctx.events.dispatch(SensorEvent::Detected);
                }
            }
            Err(e) => {
                ctx.log.error(&format!("[GPIOD] {e}"));
                ctx.events.dispatch(SensorEvent::Error(e.to_string()));
            }
        }
    }
}

impl SensorBackend for DirectLineBackend {
    fn name(&self) -> &'static str {
        "gpiod library"
    }

    fn open(&mut self, ctx: &BackendContext) -> Result<(), DriverError> {
        let (index, chip) = discover_chip(self.gpio.as_ref(), &ctx.config.chip, &ctx.log)?;
        let line = chip.request_input(ctx.config.gpio_line)?;
        ctx.log.debug(&format!(
            "[GPIOD] Requested line {} on chip {index} as input",
            ctx.config.gpio_line
        ));
        *self.line.lock() = Some(line);
        Ok(())
    }

    fn arm(&mut self, ctx: BackendContext) {
        let cancel = Arc::new(AtomicBool::new(false));
        let cancel_flag = cancel.clone();
        let line = self.line.clone();
        let period = ctx.config.poll_interval;
        let first_tick = Instant::now() + period;

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(first_tick, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            while !cancel_flag.load(Ordering::Relaxed) {
                ticker.tick().await;
                if cancel_flag.load(Ordering::Relaxed) {
                    break;
                }
                Self::poll_once(&line, &ctx);
            }
        });

        self.poller = Some(Poller {
            cancel,
            handle: Some(handle),
        });
    }

    fn release(&mut self) {
        self.poller.take();
        self.line.lock().take();
    }
}

impl Drop for DirectLineBackend {
    fn drop(&mut self) {
        self.release();
    }
}
