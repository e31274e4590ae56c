use thiserror::Error;

use crate::TELEMETRY_BUFFER_SIZE;

#[derive(Error, Debug, PartialEq)]
pub enum TelemetryError {
    #[error("Telemetry message for {0} does not fit the send buffer")]
    Overflow(String),
    #[error("Telemetry value for {0} is not a finite number")]
    NonFinite(String),
}

/// Counts authenticated poll ticks and fires once every `interval` of them
#[derive(Debug, Clone)]
pub struct TelemetryGate {
    count: u32,
    interval: u32,
}

impl TelemetryGate {
    pub fn new(interval: u32) -> Self {
        Self {
            count: 0,
            interval: interval.max(1),
        }
    }

    /// Count one authenticated tick, returning true when a sample is due
    pub fn tick(&mut self) -> bool {
        self.count += 1;
        if self.count >= self.interval {
            self.count = 0;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }
}

/// Render a single `{"<name>":<value>}` telemetry message with two decimals
pub fn format_metric(name: &str, value: f32) -> Result<String, TelemetryError> {
    if !value.is_finite() {
        return Err(TelemetryError::NonFinite(name.to_string()));
    }

    let message = format!("{{\"{name}\":{value:3.2}}}");
    // leave room for the terminator the transport appends
    if message.len() >= TELEMETRY_BUFFER_SIZE {
        return Err(TelemetryError::Overflow(name.to_string()));
    }
    Ok(message)
}
