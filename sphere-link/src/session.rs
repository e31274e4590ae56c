use std::time::Duration;

use spherep_device::{Button, ClimateSensor};

use crate::{
    format_metric, ConnectionManager, ExitCode, HubEvent, MethodDispatcher, NetworkError,
    Reachability, TelemetryGate, TwinSynchronizer, POLLS_PER_TELEMETRY,
};

const BUTTON_PRESS_MESSAGE: &str = r#"{"ButtonPress":"True"}"#;

/// Everything the agent loop owns: the connection, the bound twin, the
/// device inputs and the first fatal error seen
pub struct Session {
    connection: ConnectionManager,
    twin: TwinSynchronizer,
    methods: MethodDispatcher,
    network: Box<dyn Reachability>,
    climate: Box<dyn ClimateSensor>,
    gate: TelemetryGate,
    button: Option<(Box<dyn Button>, Duration)>,
    exit_code: Option<ExitCode>,
}

impl Session {
    pub fn new(
        connection: ConnectionManager,
        twin: TwinSynchronizer,
        network: Box<dyn Reachability>,
        climate: Box<dyn ClimateSensor>,
    ) -> Self {
        Self {
            connection,
            twin,
            methods: MethodDispatcher::new(),
            network,
            climate,
            gate: TelemetryGate::new(POLLS_PER_TELEMETRY),
            button: None,
            exit_code: None,
        }
    }

    /// Poll `button` every `period`, sending a telemetry message per press
    pub fn with_button(mut self, button: Box<dyn Button>, period: Duration) -> Self {
        self.button = Some((button, period));
        self
    }

    pub fn with_telemetry_interval(mut self, polls: u32) -> Self {
        self.gate = TelemetryGate::new(polls);
        self
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn twin(&self) -> &TwinSynchronizer {
        &self.twin
    }

    pub fn poll_period(&self) -> Duration {
        self.connection.poll_period()
    }

    pub fn button_period(&self) -> Option<Duration> {
        self.button.as_ref().map(|(_, period)| *period)
    }

    pub fn exit_code(&self) -> Option<ExitCode> {
        self.exit_code
    }

    /// Record a fatal error. The first one sticks
    pub fn stop(&mut self, code: ExitCode) {
        if self.exit_code.is_none() {
            log::error!("Stopping with exit code {code:?}");
            self.exit_code = Some(code);
        }
    }

    /// `Ok(false)` covers both a down link and a stack that is not ready yet.
    /// Any other failure stops the session
    fn check_reachability(&mut self) -> Option<bool> {
        match self.network.is_connected_to_internet() {
            Ok(reachable) => Some(reachable),
            Err(NetworkError::NotReady) => {
                log::info!("Networking stack is not ready");
                Some(false)
            }
            Err(e) => {
                log::error!("Unable to query network status {e:}");
                self.stop(ExitCode::InterfaceConnectionStatusFailed);
                None
            }
        }
    }

    /// One poll tick: reachability, connection setup, periodic telemetry and
    /// a pump of the hub client
    pub fn on_tick(&mut self) {
        let Some(reachable) = self.check_reachability() else {
            return;
        };

        self.connection.on_tick(reachable);

        if self.connection.is_authenticated() {
            if self.gate.tick() {
                self.send_climate_telemetry();
            }
        } else {
            self.gate.reset();
        }

        for event in self.connection.pump() {
            self.dispatch(event);
        }
    }

    /// React to one event delivered by the hub client
    pub fn dispatch(&mut self, event: HubEvent) {
        match event {
            HubEvent::ConnectionStatusChanged { status, reason } => {
                self.connection.on_connection_status_changed(status, reason)
            }
            HubEvent::DesiredProperties { kind, payload } => {
                log::debug!("Twin update ({kind:?}) of {} bytes", payload.len());
                for report in self.twin.on_desired_properties(&payload) {
                    self.connection.report_state(report.as_bytes());
                }
            }
            HubEvent::MethodInvoked { id, name, payload } => {
                let response = self.methods.on_method_invoked(&name, &payload);
                if let Err(e) = self.connection.respond_to_method(id, response) {
                    log::error!("Unable to answer method {name}: {e:}");
                }
            }
            HubEvent::EventConfirmed(result) => {
                log::info!("Hub client confirmed event with result {result:?}");
            }
            HubEvent::ReportedStateConfirmed(status) => {
                log::info!("Hub client acknowledged reported state with status {status}");
            }
        }
    }

    /// Send a telemetry message, but only while authenticated and online.
    /// Returns whether it was handed to the client
    pub fn send_telemetry(&mut self, message: &str) -> bool {
        if !self.connection.is_authenticated() {
            log::warn!("Hub not authenticated, dropping telemetry {message}");
            return false;
        }

        match self.check_reachability() {
            Some(true) => {}
            Some(false) => {
                log::warn!("No internet connectivity, dropping telemetry {message}");
                return false;
            }
            None => return false,
        }

        log::info!("Sending telemetry {message}");
        match self.connection.send_event(message) {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failure requesting hub client to send telemetry {e:}");
                false
            }
        }
    }

    /// Sample the climate sensor and send both metrics, or nothing
    pub fn send_climate_telemetry(&mut self) {
        let reading = match self.climate.read() {
            Ok(reading) => reading,
            Err(e) => {
                log::error!("Unable to read climate sensor {e:}");
                return;
            }
        };

        let messages = format_metric("Temperature", reading.temperature)
            .and_then(|t| Ok([t, format_metric("Humidity", reading.humidity)?]));
        match messages {
            Ok(messages) => {
                for message in messages {
                    self.send_telemetry(&message);
                }
            }
            Err(e) => log::error!("Cannot write telemetry {e:}"),
        }
    }

    /// Poll the button once, sending a message on a press
    pub fn poll_button(&mut self) {
        let Some((button, _)) = self.button.as_mut() else {
            return;
        };

        match button.is_pressed() {
            Ok(true) => {
                self.send_telemetry(BUTTON_PRESS_MESSAGE);
            }
            Ok(false) => {}
            Err(e) => {
                log::error!("Could not read button {e:}");
                self.stop(ExitCode::IsButtonPressedGetValue);
            }
        }
    }

    /// Leave the LEDs off and drop the hub client
    pub fn close(&mut self) {
        log::info!("Closing session");
        self.twin.release();
        self.connection.close();
    }
}
