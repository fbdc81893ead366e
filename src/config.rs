use std::{fmt, fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DriverError;
use crate::logging::DriverLogger;

pub const DEFAULT_GPIO_LINE: u32 = 21;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_HELPER_PROGRAM: &str = "python3";
pub const DEFAULT_HELPER_SCRIPT: &str = "MotionSensor.py";

/// Label prefix of the SoC's built-in GPIO controller, used by `"auto"`.
pub const AUTO_CHIP_MARKER: &str = "pinctrl-";
const AUTO_CHIP_SELECTOR: &str = "auto";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    DirectLine,
    Subprocess,
}

impl Mode {
    /// Accepts the numeric form (`0`, `1`) as well as the named one.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => match n.as_u64() {
                Some(0) => Some(Mode::DirectLine),
                Some(1) => Some(Mode::Subprocess),
                _ => None,
            },
            Value::String(s) => match s.as_str() {
                "direct-line" | "gpiod" => Some(Mode::DirectLine),
                "subprocess" | "gpiozero" => Some(Mode::Subprocess),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::DirectLine => f.write_str("direct-line"),
            Mode::Subprocess => f.write_str("subprocess"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerMode {
    LevelHigh,
    #[default]
    LowToHighEdge,
}

impl TriggerMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "H" | "level-high" => Some(TriggerMode::LevelHigh),
            "LH" | "low-to-high" => Some(TriggerMode::LowToHighEdge),
            _ => None,
        }
    }
}

impl fmt::Display for TriggerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerMode::LevelHigh => f.write_str("H"),
            TriggerMode::LowToHighEdge => f.write_str("LH"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChipSelector {
    #[default]
    Auto,
    Label(String),
}

impl ChipSelector {
    pub fn from_raw(raw: &str) -> Self {
        if raw == AUTO_CHIP_SELECTOR {
            ChipSelector::Auto
        } else {
            ChipSelector::Label(raw.to_string())
        }
    }

    pub fn matches(&self, label: &str) -> bool {
        match self {
            ChipSelector::Auto => label.contains(AUTO_CHIP_MARKER),
            ChipSelector::Label(wanted) => label.contains(wanted.as_str()),
        }
    }
}

impl fmt::Display for ChipSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChipSelector::Auto => f.write_str("Auto"),
            ChipSelector::Label(_) => f.write_str("Manual"),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct HelperOptions {
    pub program: Option<String>,
    pub args: Option<Vec<String>>,
}

/// Command line of the helper process, without the line argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for HelperCommand {
    fn default() -> Self {
        Self {
            program: DEFAULT_HELPER_PROGRAM.to_string(),
            args: vec!["-u".to_string(), DEFAULT_HELPER_SCRIPT.to_string()],
        }
    }
}

/// Caller-supplied options. Every field is optional; `DriverConfig::resolve`
/// fills in the rest.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct PirOptions {
    pub debug: Option<bool>,
    pub gpio: Option<u32>,
    pub mode: Option<Value>,
    pub chip: Option<String>,
    #[serde(alias = "triggerMode")]
    pub trigger_mode: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub helper: Option<HelperOptions>,
}

impl PirOptions {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, DriverError> {
        let contents = fs::read_to_string(&path)
            .map_err(|e| DriverError::Config(format!("Failed to read config: {e}")))?;
        serde_json::from_str(&contents)
            .map_err(|e| DriverError::Config(format!("Invalid config json: {e}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    pub debug: bool,
    /// `0` disables the sensor.
    pub gpio_line: u32,
    pub mode: Mode,
    pub chip: ChipSelector,
    pub trigger_mode: TriggerMode,
    pub poll_interval: Duration,
    pub helper: HelperCommand,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            debug: false,
            gpio_line: DEFAULT_GPIO_LINE,
            mode: Mode::default(),
            chip: ChipSelector::default(),
            trigger_mode: TriggerMode::default(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            helper: HelperCommand::default(),
        }
    }
}

impl DriverConfig {
    /// Merges `options` over the defaults. Invalid values are logged and
    /// replaced, so this always yields a usable config.
    pub fn resolve(options: PirOptions, gpio_unsupported: bool, log: &DriverLogger) -> Self {
        let defaults = Self::default();

        let mut gpio_line = options.gpio.unwrap_or(defaults.gpio_line);
        if gpio_unsupported {
            log.info("GPIO access is not supported on this host, sensor disabled");
            gpio_line = 0;
        }

        let trigger_mode = match options.trigger_mode.as_deref() {
            None => defaults.trigger_mode,
            Some(raw) => TriggerMode::parse(raw).unwrap_or_else(|| {
                log.warn(&format!(
                    "triggerMode: {raw} is not a valid value, using {}",
                    defaults.trigger_mode
                ));
                defaults.trigger_mode
            }),
        };

        let mode = match options.mode.as_ref() {
            None => defaults.mode,
            Some(raw) => Mode::from_value(raw).unwrap_or_else(|| {
                log.warn(&format!(
                    "mode: {raw} is not a valid value, using {}",
                    defaults.mode
                ));
                defaults.mode
            }),
        };

        let poll_interval = match options.poll_interval_ms {
            None => defaults.poll_interval,
            Some(0) => {
                log.warn("poll_interval_ms must be positive, using the default");
                defaults.poll_interval
            }
            Some(ms) => Duration::from_millis(ms),
        };

        let helper = match options.helper {
            None => defaults.helper,
            Some(helper) => HelperCommand {
                program: helper.program.unwrap_or(defaults.helper.program),
                args: helper.args.unwrap_or(defaults.helper.args),
            },
        };

        Self {
            debug: options.debug.unwrap_or(defaults.debug),
            gpio_line,
            mode,
            chip: options
                .chip
                .as_deref()
                .map(ChipSelector::from_raw)
                .unwrap_or(defaults.chip),
            trigger_mode,
            poll_interval,
            helper,
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.gpio_line == 0
    }
}

/// Native GPIO character devices only exist on Linux hosts.
pub fn host_gpio_unsupported() -> bool {
    !cfg!(target_os = "linux")
}
