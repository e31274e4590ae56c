//! The `sphere-link` crate defines the connectivity layer of the sphere
//! device agent: everything needed to keep one logical connection to the
//! cloud hub alive over a flaky network, keep a handful of boolean device
//! twin properties in sync, and answer direct method calls.
//!
//! The hub transport itself (security, provisioning, wire framing) is an
//! external collaborator reached through the [`HubConnector`] and
//! [`HubClient`] traits. On top of that the crate provides:
//! 1. [`ReconnectPolicy`], the exponential backoff applied to the poll period
//!    after failed client setups, reset after a successful one
//! 2. [`ConnectionManager`], the authentication state machine. It is the only
//!    owner of the hub client handle: it creates it, subscribes to its events,
//!    and destroys it before every new setup attempt
//! 3. [`TwinSynchronizer`], which applies desired LED states to the bound
//!    [`spherep_device::Actuator`]s and echoes each one back as reported state
//! 4. [`MethodDispatcher`], the static direct method table
//! 5. [`Session`], the context object tying the above together. Every poll
//!    tick it checks reachability, advances the state machine, gates periodic
//!    telemetry and pumps the client, dispatching the [`HubEvent`]s the pump
//!    hands back
//! 6. [`agent::run`], the single threaded event loop driving a [`Session`]
//!    from timers until shutdown or a fatal [`ExitCode`]
//!
//! # Examples
//! ```rust,no_run
//! use sphere_link::{
//!     agent, ConnectionManager, InterfaceStatus, Journal, LoopbackConnector, Provisioning,
//!     ReconnectPolicy, Session, TwinSynchronizer,
//! };
//! use spherep_device::{LogLed, SimulatedClimate};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let connection = ConnectionManager::new(
//!         Box::new(LoopbackConnector::new(Journal::default())),
//!         Provisioning::Dps {
//!             scope_id: "0ne000A1B2C".to_string(),
//!         },
//!         ReconnectPolicy::default(),
//!     );
//!
//!     let mut twin = TwinSynchronizer::new();
//!     for name in sphere_link::LED_PROPERTIES {
//!         twin.bind(name, Box::new(LogLed::new(name)));
//!     }
//!
//!     let mut session = Session::new(
//!         connection,
//!         twin,
//!         Box::new(InterfaceStatus::new("wlan0")),
//!         Box::new(SimulatedClimate::default()),
//!     );
//!
//!     let code = agent::run(&mut session, tokio::signal::ctrl_c()).await;
//!     log::info!("Agent exited with {code:?}");
//! }
//! ```

pub mod agent;
mod backoff;
mod client;
mod connection;
mod exit;
mod loopback;
mod methods;
mod network;
mod session;
mod telemetry;
mod twin;

pub use backoff::ReconnectPolicy;
pub use client::{
    ConfirmationResult, ConnectionStatus, HubClient, HubClientError, HubConnector, HubEvent,
    MethodRequestId, MethodResponse, ProvisioningResult, StatusReason, Subscription,
    TwinUpdateKind,
};
pub use connection::{ConnectionManager, ConnectionState, Provisioning};
pub use exit::ExitCode;
pub use loopback::{Journal, LoopbackConnector, LoopbackHub, Outgoing};
pub use methods::{MethodDispatcher, MethodHandler};
pub use network::{InterfaceStatus, NetworkError, Reachability};
pub use session::Session;
pub use telemetry::{format_metric, TelemetryError, TelemetryGate};
pub use twin::{TwinProperty, TwinSynchronizer};

use std::time::Duration;

/// Twin properties bound to LEDs on the sample board
pub const LED_PROPERTIES: [&str; 4] = ["StatusLED", "RLED", "GLED", "BLED"];

/// Poll period while connected or idle
pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_secs(2);
/// First poll period after a failed client setup
pub const MIN_RECONNECT_PERIOD: Duration = Duration::from_secs(60);
/// Backoff limit
pub const MAX_RECONNECT_PERIOD: Duration = Duration::from_secs(10 * 60);

/// Telemetry is sampled once every this many polls while authenticated
pub const POLLS_PER_TELEMETRY: u32 = 10;

/// Telemetry messages must fit (with room for a terminator) in this many bytes
pub const TELEMETRY_BUFFER_SIZE: usize = 100;

/// Upper bound handed to scope based provisioning
pub const PROVISIONING_TIMEOUT: Duration = Duration::from_millis(10_000);
