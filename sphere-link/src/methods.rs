use crate::MethodResponse;

/// Handler for one direct method: gets the raw request payload and builds the
/// response handed back to the hub
pub type MethodHandler = fn(&[u8]) -> MethodResponse;

const METHODS: &[(&str, MethodHandler)] = &[("TriggerAlarm", trigger_alarm)];

const NOT_FOUND_STATUS: i32 = -1;

fn trigger_alarm(_payload: &[u8]) -> MethodResponse {
    log::info!("  ----- ALARM TRIGGERED! -----");
    let body = serde_json::to_vec("Alarm Triggered").unwrap_or_else(|e| {
        log::error!("Unable to encode alarm response {e:}");
        b"{}".to_vec()
    });
    MethodResponse::new(200, body)
}

/// Static table of direct methods, matched case sensitively by name
#[derive(Debug, Default)]
pub struct MethodDispatcher;

impl MethodDispatcher {
    pub fn new() -> Self {
        Self
    }

    pub fn on_method_invoked(&self, name: &str, payload: &[u8]) -> MethodResponse {
        log::info!("Received direct method call: {name}");

        match METHODS.iter().find(|(method, _)| *method == name) {
            Some((_, handler)) => handler(payload),
            None => {
                log::warn!("Method not found {name}");
                MethodResponse::new(NOT_FOUND_STATUS, &b"{}"[..])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_alarm_answers_200() {
        let response = MethodDispatcher::new().on_method_invoked("TriggerAlarm", b"{}");
        assert_eq!(response.status, 200);
        assert_eq!(response.body, br#""Alarm Triggered""#.to_vec());
    }

    #[test]
    fn unknown_or_miscased_method_is_not_found() {
        let dispatcher = MethodDispatcher::new();
        for name in ["Reboot", "triggeralarm", ""] {
            let response = dispatcher.on_method_invoked(name, b"null");
            assert_eq!(response.status, -1);
            assert_eq!(response.body, b"{}".to_vec());
        }
    }
}
