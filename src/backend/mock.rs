use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::error::DriverError;
use crate::gpio::{GpioChip, GpioController, InputLine};

/// One scripted outcome of reading the mock line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockRead {
    Value(u8),
    Fault(String),
}

#[derive(Debug, Default)]
struct MockGpioState {
    probed: Vec<u32>,
    requested: Option<(u32, u32)>, // (chip index, line)
    released: bool,
    reads: usize,
    script: VecDeque<MockRead>,
    refuse_requests: bool,
}

/// In-memory controllers. Every requested line shares one scripted read
/// queue; once it runs dry the line reads `0`.
#[derive(Debug, Clone, Default)]
pub struct MockGpio {
    chips: Arc<FxHashMap<u32, String>>, // keyed by chip index
    state: Arc<Mutex<MockGpioState>>,
}

impl MockGpio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chip(mut self, index: u32, label: &str) -> Self {
        Arc::make_mut(&mut self.chips).insert(index, label.to_string());
        self
    }

    pub fn with_values(self, values: &[u8]) -> Self {
        self.state
            .lock()
            .script
            .extend(values.iter().map(|v| MockRead::Value(*v)));
        self
    }

    pub fn refuse_requests(self) -> Self {
        self.state.lock().refuse_requests = true;
        self
    }

    pub fn push_read(&self, read: MockRead) {
        self.state.lock().script.push_back(read);
    }

    /// Chip indices in the order they were opened.
    pub fn probed(&self) -> Vec<u32> {
        self.state.lock().probed.clone()
    }

    pub fn requested(&self) -> Option<(u32, u32)> {
        self.state.lock().requested
    }

    pub fn is_released(&self) -> bool {
        self.state.lock().released
    }

    pub fn reads(&self) -> usize {
        self.state.lock().reads
    }
}

impl GpioController for MockGpio {
    fn open_chip(&self, index: u32) -> Result<Box<dyn GpioChip>, DriverError> {
        self.state.lock().probed.push(index);
        let label = self
            .chips
            .get(&index)
            .ok_or_else(|| DriverError::Gpio(format!("no chip at index {index}")))?;
        Ok(Box::new(MockChip {
            index,
            label: label.clone(),
            state: self.state.clone(),
        }))
    }
}

struct MockChip {
    index: u32,
    label: String,
    state: Arc<Mutex<MockGpioState>>,
}

impl GpioChip for MockChip {
    fn label(&self) -> Result<String, DriverError> {
        Ok(self.label.clone())
    }

    fn request_input(&self, line: u32) -> Result<Box<dyn InputLine>, DriverError> {
        let mut state = self.state.lock();
        if state.refuse_requests {
            return Err(DriverError::LineAccess(format!(
                "line {line} on chip {} is busy",
                self.index
            )));
        }
        state.requested = Some((self.index, line));
        state.released = false;
        Ok(Box::new(MockLine {
            state: self.state.clone(),
        }))
    }
}

struct MockLine {
    state: Arc<Mutex<MockGpioState>>,
}

impl InputLine for MockLine {
    fn value(&mut self) -> Result<u8, DriverError> {
        let mut state = self.state.lock();
        state.reads += 1;
        match state.script.pop_front() {
            Some(MockRead::Value(v)) => Ok(v),
            Some(MockRead::Fault(msg)) => Err(DriverError::Gpio(msg)),
            None => Ok(0),
        }
    }
}

impl Drop for MockLine {
    fn drop(&mut self) {
        self.state.lock().released = true;
    }
}
