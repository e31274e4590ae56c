use embedded_hal::digital::InputPin;

use crate::DeviceError;

pub trait Button {
    /// Returns true once per press
    fn is_pressed(&mut self) -> Result<bool, DeviceError>;
}

/// Edge detector for a button that pulls its line low while held. A press
/// is reported when the line reads low and the previous sample did not
pub struct PressDetector<P: InputPin> {
    name: &'static str,
    pin: P,
    was_low: bool,
}

impl<P: InputPin> PressDetector<P> {
    pub fn new(name: &'static str, pin: P) -> Self {
        Self {
            name,
            pin,
            was_low: false,
        }
    }
}

impl<P: InputPin> Button for PressDetector<P> {
    fn is_pressed(&mut self) -> Result<bool, DeviceError> {
        let is_low = self.pin.is_low().map_err(|e| {
            log::error!("Could not read button {} {e:?}", self.name);
            DeviceError::GpioRead(self.name.to_string())
        })?;

        let pressed = is_low && !self.was_low;
        self.was_low = is_low;
        Ok(pressed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::digital::{ErrorKind, ErrorType};
    use std::collections::VecDeque;

    // Scripted line levels, true == high
    struct ScriptedPin(VecDeque<Result<bool, ErrorKind>>);

    impl ErrorType for ScriptedPin {
        type Error = ErrorKind;
    }

    impl InputPin for ScriptedPin {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            self.0.pop_front().unwrap_or(Ok(true))
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            self.is_high().map(|high| !high)
        }
    }

    #[test]
    fn press_reported_once_per_falling_edge() {
        let levels = [true, false, false, false, true, false, true]
            .into_iter()
            .map(Ok)
            .collect();
        let mut button = PressDetector::new("button-a", ScriptedPin(levels));

        let presses = (0..7)
            .map(|_| button.is_pressed().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(
            presses,
            vec![false, true, false, false, false, true, false]
        );
    }

    #[test]
    fn read_failure_surfaces() {
        let mut button = PressDetector::new(
            "button-a",
            ScriptedPin(VecDeque::from([Err(ErrorKind::Other)])),
        );
        assert!(matches!(
            button.is_pressed(),
            Err(DeviceError::GpioRead(_))
        ));
    }
}
