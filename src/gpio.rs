use crate::error::DriverError;

/// Highest chip index probed during discovery.
pub const MAX_CHIP_INDEX: u32 = 10;

/// Entry point to a set of GPIO controllers, addressed by index.
pub trait GpioController: Send + Sync {
    /// Fails when there is no controller at `index`.
    fn open_chip(&self, index: u32) -> Result<Box<dyn GpioChip>, DriverError>;
}

pub trait GpioChip {
    fn label(&self) -> Result<String, DriverError>;
    fn request_input(&self, line: u32) -> Result<Box<dyn InputLine>, DriverError>;
}

/// A requested input line. Dropping it releases the line.
pub trait InputLine: Send {
    /// Current digital level, `0` or `1`.
    fn value(&mut self) -> Result<u8, DriverError>;
}
