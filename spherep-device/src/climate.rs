use crate::DeviceError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateReading {
    /// Degrees celsius
    pub temperature: f32,
    /// Relative humidity, percent
    pub humidity: f32,
}

pub trait ClimateSensor {
    fn read(&mut self) -> Result<ClimateReading, DeviceError>;
}

/// Random walk used when no temperature / humidity sensor is attached.
/// Each read moves both values by a step in [-1.0, +1.0]
pub struct SimulatedClimate {
    current: ClimateReading,
}

impl SimulatedClimate {
    pub fn new(start: ClimateReading) -> Self {
        Self { current: start }
    }

    fn step() -> f32 {
        rand::random_range(0..=40u8) as f32 / 20.0 - 1.0
    }
}

impl Default for SimulatedClimate {
    fn default() -> Self {
        Self::new(ClimateReading {
            temperature: 50.0,
            humidity: 40.0,
        })
    }
}

impl ClimateSensor for SimulatedClimate {
    fn read(&mut self) -> Result<ClimateReading, DeviceError> {
        self.current.temperature += Self::step();
        self.current.humidity = (self.current.humidity + Self::step()).clamp(0.0, 100.0);
        Ok(self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_steps_stay_bounded() {
        let mut sensor = SimulatedClimate::new(ClimateReading {
            temperature: 20.0,
            humidity: 99.5,
        });
        let mut last = sensor.current;
        for _ in 0..200 {
            let next = sensor.read().unwrap();
            assert!((next.temperature - last.temperature).abs() <= 1.0 + f32::EPSILON);
            assert!((0.0..=100.0).contains(&next.humidity));
            last = next;
        }
    }
}
