pub mod direct_line;
pub mod protocol;
pub mod subprocess;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::DriverConfig;
use crate::error::DriverError;
use crate::event::EventDispatcher;
use crate::logging::DriverLogger;

pub use direct_line::{DirectLineBackend, discover_chip, is_detection};
pub use subprocess::SubprocessBackend;

#[derive(Debug, Default)]
pub struct DriverState {
    pub running: bool,
    /// Cleared after a `Motion` message in edge mode, set again by `NoMotion`.
    pub ready_to_detect: bool,
    pub previous_value: Option<u8>,
}

pub type SharedState = Arc<Mutex<DriverState>>;

/// Everything a backend needs to report back to the driver.
#[derive(Clone)]
pub struct BackendContext {
    pub config: Arc<DriverConfig>,
    pub events: EventDispatcher,
    pub log: DriverLogger,
    pub state: SharedState,
}

/// One way of turning the sensor into events. A backend instance serves a
/// single run: `open`, then `arm`, then `release`.
pub trait SensorBackend: Send {
    fn name(&self) -> &'static str;

    /// Acquires the backend's resources. An error ends the start attempt.
    fn open(&mut self, ctx: &BackendContext) -> Result<(), DriverError>;

    /// Begins producing events. Called after `Started` was dispatched.
    fn arm(&mut self, ctx: BackendContext);

    /// Releases whatever `open` and `arm` acquired. Safe to call repeatedly.
    fn release(&mut self);
}
