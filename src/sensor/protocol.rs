//! Line protocol spoken by the motion helper process on its stdout.
//!
//! The helper prints exactly `Motion` or `NoMotion`, one per line. Anything
//! else is a protocol violation and ends the run.

use crate::config::TriggerMode;

pub const MOTION: &str = "Motion";
pub const NO_MOTION: &str = "NoMotion";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HelperMessage {
    Motion,
    NoMotion,
    Unrecognized(String),
}

impl HelperMessage {
    pub fn parse(line: &str) -> Self {
        match line {
            MOTION => HelperMessage::Motion,
            NO_MOTION => HelperMessage::NoMotion,
            other => HelperMessage::Unrecognized(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    Detected,
    /// `Motion` while a previous detection has not been cleared yet.
    Suppressed,
    Rearmed,
    Violation(String),
}

/// Applies one message to the debounce flag.
pub fn apply_message(
    message: HelperMessage,
    trigger: TriggerMode,
    ready_to_detect: &mut bool,
) -> MessageOutcome {
    match message {
        HelperMessage::Motion if !*ready_to_detect => MessageOutcome::Suppressed,
        HelperMessage::Motion => {
            if trigger == TriggerMode::LowToHighEdge {
                *ready_to_detect = false;
            }
            MessageOutcome::Detected
        }
        HelperMessage::NoMotion => {
            *ready_to_detect = true;
            MessageOutcome::Rearmed
        }
        HelperMessage::Unrecognized(line) => MessageOutcome::Violation(line),
    }
}

