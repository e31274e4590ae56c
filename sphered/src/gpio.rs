use embedded_hal::digital::PinState;
use linux_embedded_hal::SysfsPin;

use sphere_link::{ExitCode, TwinSynchronizer, LED_PROPERTIES};
use spherep_device::{Actuator, ActiveLowLed, Button, LogLed, PressDetector};

use crate::{Config, SphereError, SphereResult};

fn export(gpio: u64) -> SphereResult<SysfsPin> {
    let pin = SysfsPin::new(gpio);
    pin.export()
        .map_err(|e| SphereError::Gpio(gpio, format!("{e:?}")))?;
    Ok(pin)
}

/// Open `gpio` as an active low LED, initially off
pub fn open_led(name: &'static str, gpio: u64) -> SphereResult<Box<dyn Actuator>> {
    let pin = export(gpio)?
        .into_output_pin(PinState::High)
        .map_err(|e| SphereError::Gpio(gpio, format!("{e:?}")))?;
    log::info!("{name} bound to GPIO {gpio}");
    Ok(Box::new(ActiveLowLed::new(name, pin)))
}

pub fn open_button(gpio: u64) -> SphereResult<Box<dyn Button>> {
    let pin = export(gpio)?
        .into_input_pin()
        .map_err(|e| SphereError::Gpio(gpio, format!("{e:?}")))?;
    log::info!("Button bound to GPIO {gpio}");
    Ok(Box::new(PressDetector::new("button", pin)))
}

fn led_exit_code(name: &str) -> ExitCode {
    match name {
        "RLED" => ExitCode::InitTwinRLed,
        "GLED" => ExitCode::InitTwinGLed,
        "BLED" => ExitCode::InitTwinBLed,
        _ => ExitCode::InitTwinStatusLed,
    }
}

/// Bind the four LED twin properties. LEDs without a configured GPIO only
/// log their state
pub fn bind_leds(config: &Config) -> Result<TwinSynchronizer, ExitCode> {
    let mut twin = TwinSynchronizer::new();
    for (name, gpio) in LED_PROPERTIES.into_iter().zip(config.led_gpios) {
        let actuator = match gpio {
            Some(gpio) => open_led(name, gpio).map_err(|e| {
                log::error!("Unable to open {name} {e:}");
                led_exit_code(name)
            })?,
            None => {
                log::info!("{name} has no GPIO, logging its state only");
                Box::new(LogLed::new(name))
            }
        };
        twin.bind(name, actuator);
    }
    Ok(twin)
}
