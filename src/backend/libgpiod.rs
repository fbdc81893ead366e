use std::path::PathBuf;

use libgpiod::{chip::Chip, line, request};

use crate::error::DriverError;
use crate::gpio::{GpioChip, GpioController, InputLine};

const LIBGPIOD_CHIP_PATH_PREFIX: &str = "/dev/gpiochip";

/// Character-device GPIO access through libgpiod v2.
#[derive(Debug, Default)]
pub struct LibgpiodController;

impl LibgpiodController {
    pub fn new() -> Self {
        Self
    }
}

impl GpioController for LibgpiodController {
    fn open_chip(&self, index: u32) -> Result<Box<dyn GpioChip>, DriverError> {
        let path = PathBuf::from(format!("{LIBGPIOD_CHIP_PATH_PREFIX}{index}"));
        let chip = Chip::open(&path)
            .map_err(|e| DriverError::Gpio(format!("open chip {}: {e}", path.display())))?;
        Ok(Box::new(GpiodChip { chip }))
    }
}

struct GpiodChip {
    chip: Chip,
}

impl GpiodChip {
    fn make_input_config(offset: u32) -> Result<line::Config, DriverError> {
        let mut ls = line::Settings::new()
            .map_err(|e| DriverError::LineAccess(format!("libgpiod settings: {e}")))?;
        ls.set_direction(line::Direction::Input)
            .map_err(|e| DriverError::LineAccess(format!("set direction: {e}")))?;

        let mut cfg = line::Config::new()
            .map_err(|e| DriverError::LineAccess(format!("line config: {e}")))?;
        cfg.add_line_settings(&[offset], ls)
            .map_err(|e| DriverError::LineAccess(format!("line config add settings: {e}")))?;
        Ok(cfg)
    }

    fn request_lines(&self, line_cfg: &line::Config) -> Result<request::Request, DriverError> {
        let mut req_cfg = request::Config::new()
            .map_err(|e| DriverError::LineAccess(format!("request config: {e}")))?;
        req_cfg
            .set_consumer(env!("CARGO_PKG_NAME"))
            .map_err(|e| DriverError::LineAccess(format!("request consumer: {e}")))?;
        self.chip
            .request_lines(Some(&req_cfg), line_cfg)
            .map_err(|e| DriverError::LineAccess(format!("request lines: {e}")))
    }
}

impl GpioChip for GpiodChip {
    fn label(&self) -> Result<String, DriverError> {
        let info = self
            .chip
            .info()
            .map_err(|e| DriverError::Gpio(format!("chip info: {e}")))?;
        info.label()
            .map(str::to_string)
            .map_err(|e| DriverError::Gpio(format!("chip label: {e}")))
    }

    fn request_input(&self, offset: u32) -> Result<Box<dyn InputLine>, DriverError> {
        let line_cfg = Self::make_input_config(offset)?;
        let request = self.request_lines(&line_cfg)?;
        Ok(Box::new(GpiodLine { request, offset }))
    }
}

// the request is released by libgpiod when dropped
struct GpiodLine {
    request: request::Request,
    offset: u32,
}

impl InputLine for GpiodLine {
    fn value(&mut self) -> Result<u8, DriverError> {
        let value = self
            .request
            .value(self.offset)
            .map_err(|e| DriverError::Gpio(format!("get value: {e}")))?;
        Ok(match value {
            line::Value::InActive => 0,
            line::Value::Active => 1,
        })
    }
}
