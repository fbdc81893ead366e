use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("No Chip Found")]
    ChipNotFound,
    #[error("Line access failed: {0}")]
    LineAccess(String),
    #[error("Helper spawn failed: {0}")]
    Spawn(String),
    #[error("{0}")]
    Protocol(String),
    #[error("Helper exited: {0}")]
    ProcessExit(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("GPIO error: {0}")]
    Gpio(String),
}

