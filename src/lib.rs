mod backend;
mod config;
mod driver;
mod error;
mod event;
mod gpio;
mod logging;
mod sensor;

pub use config::{
    AUTO_CHIP_MARKER, ChipSelector, DEFAULT_GPIO_LINE, DEFAULT_POLL_INTERVAL_MS, DriverConfig,
    HelperCommand, HelperOptions, Mode, PirOptions, TriggerMode, host_gpio_unsupported,
};
pub use driver::SensorDriver;
pub use error::DriverError;
pub use event::{EventCallback, EventDispatcher, SensorEvent};
pub use gpio::{GpioChip, GpioController, InputLine, MAX_CHIP_INDEX};
pub use logging::{DriverLogger, LogCrateSink, LogSink};
pub use sensor::protocol::{HelperMessage, MessageOutcome, apply_message};
pub use sensor::{
    BackendContext, DirectLineBackend, DriverState, SensorBackend, SharedState,
    SubprocessBackend, discover_chip, is_detection,
};

#[cfg(feature = "hardware-gpio")]
pub use backend::LibgpiodController;
pub use backend::{MockGpio, MockRead};
