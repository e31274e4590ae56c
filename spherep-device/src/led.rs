use embedded_hal::digital::OutputPin;

use crate::{Actuator, DeviceError};

/// LED wired to sink current: driving the pin low lights it, which is how
/// the status and RGB LEDs on the sample boards are connected
pub struct ActiveLowLed<P: OutputPin> {
    name: &'static str,
    pin: P,
}

impl<P: OutputPin> ActiveLowLed<P> {
    pub fn new(name: &'static str, pin: P) -> Self {
        Self { name, pin }
    }

    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P: OutputPin> Actuator for ActiveLowLed<P> {
    fn apply(&mut self, on: bool) -> Result<(), DeviceError> {
        let res = if on {
            self.pin.set_low()
        } else {
            self.pin.set_high()
        };

        res.map_err(|e| {
            log::error!("Unable to drive {} {e:?}", self.name);
            DeviceError::GpioWrite(self.name.to_string())
        })
    }
}

/// Stand in for an LED that is not wired on this board: only logs
pub struct LogLed {
    name: &'static str,
    on: bool,
}

impl LogLed {
    pub fn new(name: &'static str) -> Self {
        Self { name, on: false }
    }

    pub fn is_on(&self) -> bool {
        self.on
    }
}

impl Actuator for LogLed {
    fn apply(&mut self, on: bool) -> Result<(), DeviceError> {
        self.on = on;
        log::info!("{} is now {}", self.name, if on { "on" } else { "off" });
        Ok(())
    }
}
