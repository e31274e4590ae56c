use serde_json::{json, Map, Value};
use spherep_device::Actuator;

/// One boolean twin property and the device side effect bound to it
pub struct TwinProperty {
    name: &'static str,
    desired: bool,
    reported: bool,
    actuator: Box<dyn Actuator>,
}

impl TwinProperty {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Last value the hub asked for
    pub fn desired(&self) -> bool {
        self.desired
    }

    /// Last value successfully applied to the actuator
    pub fn reported(&self) -> bool {
        self.reported
    }
}

/// Applies desired twin state to bound actuators and produces the reported
/// state echoes. Every property starts off
#[derive(Default)]
pub struct TwinSynchronizer {
    properties: Vec<TwinProperty>,
}

/// Booleans, or the unsigned integers 0 / 1. Floats such as `1.0` and
/// negative numbers are not switch values
fn as_switch(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_u64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        _ => None,
    }
}

impl TwinSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a property name to an actuator. Rebinding a name replaces the
    /// previous actuator
    pub fn bind(&mut self, name: &'static str, actuator: Box<dyn Actuator>) {
        let property = TwinProperty {
            name,
            desired: false,
            reported: false,
            actuator,
        };
        match self.properties.iter_mut().find(|p| p.name == name) {
            Some(existing) => *existing = property,
            None => self.properties.push(property),
        }
    }

    pub fn property(&self, name: &str) -> Option<&TwinProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn properties(&self) -> impl Iterator<Item = &TwinProperty> {
        self.properties.iter()
    }

    /// Handle a desired properties payload, full twin document or patch, and
    /// return the reported state messages to send back
    pub fn on_desired_properties(&mut self, payload: &[u8]) -> Vec<String> {
        let root: Value = match serde_json::from_slice(payload) {
            Ok(root) => root,
            Err(e) => {
                log::warn!("Cannot parse desired properties as JSON {e:}");
                return vec![];
            }
        };

        let Some(root) = root.as_object() else {
            log::warn!("Desired properties payload is not a JSON object");
            return vec![];
        };

        // complete twin documents nest the desired section, patches do not
        let desired: &Map<String, Value> = match root.get("desired") {
            Some(Value::Object(desired)) => desired,
            _ => root,
        };

        let mut reports = vec![];
        for property in self.properties.iter_mut() {
            let Some(value) = desired.get(property.name) else {
                continue;
            };

            let Some(on) = as_switch(value) else {
                log::debug!("Ignoring non boolean value {value} for {}", property.name);
                continue;
            };

            property.desired = on;
            match property.actuator.apply(on) {
                Ok(()) => property.reported = on,
                Err(e) => log::error!("Failed to apply {} to {on}: {e:}", property.name),
            }

            log::info!("Received {}: {on}", property.name);
            reports.push(json!({ property.name: property.reported }).to_string());
        }
        reports
    }

    /// Turn every bound actuator off
    pub fn release(&mut self) {
        for property in self.properties.iter_mut() {
            match property.actuator.apply(false) {
                Ok(()) => property.reported = false,
                Err(e) => log::warn!("Unable to turn off {} {e:}", property.name),
            }
        }
    }
}
