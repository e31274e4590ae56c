//! Peripheral lib defining the device-side interfaces the sphere
//! agent drives: twin-bound actuators (LEDs), the push button that
//! triggers a telemetry message, and the climate sensor sampled for
//! periodic telemetry.
//!
//! The actual drivers are external. This crate only defines:
//!
//! 1. [`Actuator`], the bound side effect of a boolean twin property,
//! with an active-low GPIO implementation ([`led::ActiveLowLed`]) over
//! any `embedded-hal` output pin and a log-only stand in
//! ([`led::LogLed`]) for boards without the LED wired.
//!
//! 2. [`button::Button`], an edge-detecting wrapper over an
//! `embedded-hal` input pin.
//!
//! 3. [`climate::ClimateSensor`], anything able to produce a
//! temperature / humidity pair.
//!
//! Static device metadata (reported once per authentication) is build-time
//! configuration, read from `cfg.toml` via `toml-cfg`.

pub mod button;
pub mod climate;
pub mod led;

use thiserror::Error;

pub use button::{Button, PressDetector};
pub use climate::{ClimateReading, ClimateSensor, SimulatedClimate};
pub use led::{ActiveLowLed, LogLed};

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("I/O Error")]
    Io(#[from] std::io::Error),
    #[error("GPIO write error on {0}")]
    GpioWrite(String),
    #[error("GPIO read error on {0}")]
    GpioRead(String),
    #[error("Sensor read error {0}")]
    SensorRead(String),
}

/// Side effect bound to a boolean twin property
pub trait Actuator {
    fn apply(&mut self, on: bool) -> Result<(), DeviceError>;
}

#[toml_cfg::toml_config]
pub struct DeviceInfo {
    #[default("Microsoft")]
    manufacturer: &'static str,
    #[default("Azure Sphere Sample Device")]
    model: &'static str,
}

/// JSON document pushed as reported state once the hub authenticates
/// the device, e.g. `{"manufacturer":"Microsoft","model":"..."}`
pub fn metadata_report() -> String {
    serde_json::json!({
        "manufacturer": DEVICE_INFO.manufacturer,
        "model": DEVICE_INFO.model,
    })
    .to_string()
}
