//! Interfaces to the hub transport library. The real implementation (TLS,
//! MQTT, device auth) is provided by the platform SDK; see
//! [`crate::LoopbackConnector`] for the in-process stand in

use std::{fmt, time::Duration};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HubClientError {
    #[error("I/O Error")]
    Io(#[from] std::io::Error),
    #[error("Provisioning returned {0}")]
    Provisioning(ProvisioningResult),
    #[error("Hub client error {0}")]
    Client(String),
}

/// Outcome of scope based device provisioning, when it did not succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningResult {
    InvalidParam,
    NetworkNotReady,
    DeviceAuthNotReady,
    ProvDeviceError,
    GenericError,
}

impl fmt::Display for ProvisioningResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProvisioningResult::InvalidParam => "PROV_RESULT_INVALID_PARAM",
            ProvisioningResult::NetworkNotReady => "PROV_RESULT_NETWORK_NOT_READY",
            ProvisioningResult::DeviceAuthNotReady => "PROV_RESULT_DEVICEAUTH_NOT_READY",
            ProvisioningResult::ProvDeviceError => "PROV_RESULT_PROV_DEVICE_ERROR",
            ProvisioningResult::GenericError => "PROV_RESULT_GENERIC_ERROR",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Authenticated,
    Unauthenticated,
}

/// Why the hub client reported a connection status change. Expired SAS
/// tokens and revoked credentials arrive here as `Unauthenticated`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusReason {
    ExpiredSasToken,
    DeviceDisabled,
    BadCredential,
    RetryExpired,
    NoNetwork,
    CommunicationError,
    Ok,
    NoPingResponse,
    Unknown,
}

impl fmt::Display for StatusReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatusReason::ExpiredSasToken => "CONNECTION_EXPIRED_SAS_TOKEN",
            StatusReason::DeviceDisabled => "CONNECTION_DEVICE_DISABLED",
            StatusReason::BadCredential => "CONNECTION_BAD_CREDENTIAL",
            StatusReason::RetryExpired => "CONNECTION_RETRY_EXPIRED",
            StatusReason::NoNetwork => "CONNECTION_NO_NETWORK",
            StatusReason::CommunicationError => "CONNECTION_COMMUNICATION_ERROR",
            StatusReason::Ok => "CONNECTION_OK",
            StatusReason::NoPingResponse => "CONNECTION_NO_PING_RESPONSE",
            StatusReason::Unknown => "unknown reason",
        };
        f.write_str(s)
    }
}

/// Event kinds a client only delivers once subscribed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subscription {
    ConnectionStatus,
    DeviceTwin,
    DirectMethod,
}

/// Whether a twin payload is the full twin document or a desired patch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwinUpdateKind {
    Complete,
    Partial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationResult {
    Ok,
    Destroyed,
    MessageTimeout,
    Error,
}

pub type MethodRequestId = u32;

/// Result code and JSON body answering a direct method. The buffer is owned;
/// handing it to [`HubClient::respond_to_method`] gives it to the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodResponse {
    pub status: i32,
    pub body: Vec<u8>,
}

impl MethodResponse {
    pub fn new(status: i32, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Everything a client can hand back from [`HubClient::pump`]. These take the
/// place of the transport library's registered callbacks
#[derive(Debug, Clone, PartialEq)]
pub enum HubEvent {
    ConnectionStatusChanged {
        status: ConnectionStatus,
        reason: StatusReason,
    },
    DesiredProperties {
        kind: TwinUpdateKind,
        payload: Vec<u8>,
    },
    MethodInvoked {
        id: MethodRequestId,
        name: String,
        payload: Vec<u8>,
    },
    /// A previously accepted telemetry event was processed
    EventConfirmed(ConfirmationResult),
    /// A previously accepted reported state was processed, with the hub's
    /// status code
    ReportedStateConfirmed(i32),
}

/// Handle to a created hub client. Sends are enqueued and only go out on a
/// later [`HubClient::pump`], which is also where inbound events surface
pub trait HubClient {
    fn subscribe(&mut self, subscription: Subscription) -> Result<(), HubClientError>;
    fn send_event(&mut self, message: &str) -> Result<(), HubClientError>;
    fn report_state(&mut self, state: &[u8]) -> Result<(), HubClientError>;
    fn respond_to_method(
        &mut self,
        id: MethodRequestId,
        response: MethodResponse,
    ) -> Result<(), HubClientError>;
    /// Flush queued sends and receives. Must return promptly
    fn pump(&mut self) -> Vec<HubEvent>;
    fn disconnect(&mut self);
}

/// Creates hub clients using one of the two supported provisioning modes
pub trait HubConnector {
    /// Certificate based connection straight to a known hub
    fn connect_direct(
        &mut self,
        hostname: &str,
        device_id: &str,
    ) -> Result<Box<dyn HubClient>, HubClientError>;

    /// Scope based enrollment through the provisioning service
    fn provision(
        &mut self,
        scope_id: &str,
        timeout: Duration,
    ) -> Result<Box<dyn HubClient>, HubClientError>;
}
