use std::{fmt, time::Duration};

use crate::{
    ConnectionStatus, HubClient, HubClientError, HubConnector, HubEvent, MethodRequestId,
    MethodResponse, ReconnectPolicy, StatusReason, Subscription, PROVISIONING_TIMEOUT,
};

/// Authentication standing with the hub, independent of raw reachability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    NotAuthenticated,
    /// A client was set up and is waiting on its first status report; no
    /// further setup is attempted meanwhile
    AuthenticationInitiated,
    Authenticated,
}

/// How a hub client gets its identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provisioning {
    Direct { hostname: String, device_id: String },
    Dps { scope_id: String },
}

impl fmt::Display for Provisioning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provisioning::Direct { hostname, .. } => {
                write!(f, "Direct Connection: Hub Hostname {hostname}")
            }
            Provisioning::Dps { scope_id } => write!(f, "DPS Connection: DPS Scope ID {scope_id}"),
        }
    }
}

/// [`ConnectionManager`] is the authentication state machine and the sole
/// owner of the hub client handle. Client setup runs from the poll tick when
/// the network is reachable and no client is authenticated or pending.
/// Setup outcomes feed the [`ReconnectPolicy`] that sets the poll period
pub struct ConnectionManager {
    state: ConnectionState,
    policy: ReconnectPolicy,
    provisioning: Provisioning,
    connector: Box<dyn HubConnector>,
    client: Option<Box<dyn HubClient>>,
    metadata: String,
}

impl ConnectionManager {
    pub fn new(
        connector: Box<dyn HubConnector>,
        provisioning: Provisioning,
        policy: ReconnectPolicy,
    ) -> Self {
        log::info!("Using {provisioning:}");
        Self {
            state: ConnectionState::NotAuthenticated,
            policy,
            provisioning,
            connector,
            client: None,
            metadata: spherep_device::metadata_report(),
        }
    }

    /// Replace the static device metadata reported on authentication
    pub fn with_metadata(mut self, metadata: String) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == ConnectionState::Authenticated
    }

    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// Period the poll timer should currently run at
    pub fn poll_period(&self) -> Duration {
        self.policy.current()
    }

    /// Start a client setup if the network is up and nothing is authenticated
    /// or in flight. Returns whether a setup was attempted
    pub fn on_tick(&mut self, reachable: bool) -> bool {
        if reachable && self.state == ConnectionState::NotAuthenticated {
            self.set_up_client();
            true
        } else {
            false
        }
    }

    /// (Re)create the hub client, destroying any existing one first. A handle
    /// whose SAS token expired never authenticates again
    pub fn set_up_client(&mut self) -> bool {
        self.destroy_client();

        let created = match &self.provisioning {
            Provisioning::Direct {
                hostname,
                device_id,
            } => self.connector.connect_direct(hostname, device_id),
            Provisioning::Dps { scope_id } => {
                self.connector.provision(scope_id, PROVISIONING_TIMEOUT)
            }
        };

        let mut client = match created {
            Ok(client) => client,
            Err(e) => {
                let period = self.policy.on_failure();
                log::error!(
                    "Failed to create hub client {e:} - will retry in {} seconds",
                    period.as_secs()
                );
                return false;
            }
        };

        self.policy.on_success();
        self.state = ConnectionState::AuthenticationInitiated;

        for subscription in [
            Subscription::DeviceTwin,
            Subscription::DirectMethod,
            Subscription::ConnectionStatus,
        ] {
            client
                .subscribe(subscription)
                .map_err(|e| {
                    log::error!("Failure to subscribe to {subscription:?} {e:}");
                })
                .ok();
        }

        self.client = Some(client);
        true
    }

    /// Entry point for connection status reports from the client
    pub fn on_connection_status_changed(&mut self, status: ConnectionStatus, reason: StatusReason) {
        log::info!("Hub connection status: {reason:}");

        if status != ConnectionStatus::Authenticated {
            self.state = ConnectionState::NotAuthenticated;
            return;
        }

        self.state = ConnectionState::Authenticated;

        let metadata = self.metadata.clone();
        self.report_state(metadata.as_bytes());
    }

    /// Enqueue a reported state document, sent on the next pump
    pub fn report_state(&mut self, state: &[u8]) -> bool {
        let Some(client) = self.client.as_mut() else {
            log::error!("Hub client not initialized");
            return false;
        };

        let text = String::from_utf8_lossy(state);
        match client.report_state(state) {
            Ok(()) => {
                log::info!("Hub client accepted request to report state '{text}'");
                true
            }
            Err(e) => {
                log::error!("Hub client error {e:} when reporting state '{text}'");
                false
            }
        }
    }

    pub fn send_event(&mut self, message: &str) -> Result<(), HubClientError> {
        self.client
            .as_mut()
            .ok_or_else(|| HubClientError::Client("client not initialized".to_string()))?
            .send_event(message)
    }

    pub fn respond_to_method(
        &mut self,
        id: MethodRequestId,
        response: MethodResponse,
    ) -> Result<(), HubClientError> {
        self.client
            .as_mut()
            .ok_or_else(|| HubClientError::Client("client not initialized".to_string()))?
            .respond_to_method(id, response)
    }

    /// Let the client do its work, collecting the events it delivers
    pub fn pump(&mut self) -> Vec<HubEvent> {
        match self.client.as_mut() {
            Some(client) => client.pump(),
            None => vec![],
        }
    }

    /// Tear down the client on shutdown
    pub fn close(&mut self) {
        self.destroy_client();
        self.state = ConnectionState::NotAuthenticated;
    }

    fn destroy_client(&mut self) {
        if let Some(mut stale) = self.client.take() {
            log::debug!("Destroying previous hub client");
            stale.disconnect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Journal, LoopbackConnector, Outgoing};

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn manager(journal: &Journal, failures: u32) -> ConnectionManager {
        ConnectionManager::new(
            Box::new(LoopbackConnector::new(journal.clone()).failing_first(failures)),
            Provisioning::Direct {
                hostname: "hub.example.net".to_string(),
                device_id: "sphere-01".to_string(),
            },
            ReconnectPolicy::default(),
        )
        .with_metadata(r#"{"manufacturer":"Acme","model":"Test Board"}"#.to_string())
    }

    #[test]
    fn unreachable_tick_does_nothing() {
        let journal = Journal::default();
        let mut conn = manager(&journal, 0);
        assert!(!conn.on_tick(false));
        assert_eq!(journal.connects(), 0);
        assert_eq!(conn.state(), ConnectionState::NotAuthenticated);
    }

    #[test]
    fn failed_setup_backs_off_and_stays_unauthenticated() {
        let journal = Journal::default();
        let mut conn = manager(&journal, 2);

        assert!(conn.on_tick(true));
        assert_eq!(conn.state(), ConnectionState::NotAuthenticated);
        assert_eq!(conn.poll_period(), secs(60));
        assert!(!conn.has_client());

        assert!(conn.on_tick(true));
        assert_eq!(conn.poll_period(), secs(120));

        assert!(conn.on_tick(true));
        assert_eq!(conn.state(), ConnectionState::AuthenticationInitiated);
        assert_eq!(conn.poll_period(), secs(2));
        assert_eq!(journal.connects(), 3);
    }

    #[test]
    fn setup_subscribes_to_all_events() {
        let journal = Journal::default();
        let mut conn = manager(&journal, 0);
        conn.on_tick(true);
        let subs = journal.subscriptions();
        assert_eq!(subs.len(), 3);
        assert!(subs.contains(&Subscription::ConnectionStatus));
        assert!(subs.contains(&Subscription::DeviceTwin));
        assert!(subs.contains(&Subscription::DirectMethod));
    }

    #[test]
    fn no_setup_while_initiated_or_authenticated() {
        let journal = Journal::default();
        let mut conn = manager(&journal, 0);
        conn.on_tick(true);
        assert!(!conn.on_tick(true));
        conn.on_connection_status_changed(ConnectionStatus::Authenticated, StatusReason::Ok);
        assert!(!conn.on_tick(true));
        assert_eq!(journal.connects(), 1);
    }

    #[test]
    fn authenticated_status_reports_metadata_once() {
        let journal = Journal::default();
        let mut conn = manager(&journal, 0);
        conn.on_tick(true);
        conn.on_connection_status_changed(ConnectionStatus::Authenticated, StatusReason::Ok);

        assert_eq!(conn.state(), ConnectionState::Authenticated);
        assert_eq!(
            journal.outgoing(),
            vec![Outgoing::ReportedState(
                r#"{"manufacturer":"Acme","model":"Test Board"}"#.to_string()
            )]
        );
    }

    #[test]
    fn unauthenticated_status_always_resets_state() {
        let journal = Journal::default();
        let mut conn = manager(&journal, 0);

        // from NotAuthenticated
        conn.on_connection_status_changed(
            ConnectionStatus::Unauthenticated,
            StatusReason::NoNetwork,
        );
        assert_eq!(conn.state(), ConnectionState::NotAuthenticated);

        // from AuthenticationInitiated
        conn.on_tick(true);
        conn.on_connection_status_changed(
            ConnectionStatus::Unauthenticated,
            StatusReason::BadCredential,
        );
        assert_eq!(conn.state(), ConnectionState::NotAuthenticated);

        // from Authenticated
        conn.on_tick(true);
        conn.on_connection_status_changed(ConnectionStatus::Authenticated, StatusReason::Ok);
        conn.on_connection_status_changed(
            ConnectionStatus::Unauthenticated,
            StatusReason::ExpiredSasToken,
        );
        assert_eq!(conn.state(), ConnectionState::NotAuthenticated);
    }

    #[test]
    fn every_setup_destroys_the_previous_client() {
        let journal = Journal::default();
        let mut conn = manager(&journal, 0);
        conn.on_tick(true);
        conn.on_connection_status_changed(
            ConnectionStatus::Unauthenticated,
            StatusReason::ExpiredSasToken,
        );
        conn.on_tick(true);
        assert_eq!(journal.connects(), 2);
        assert_eq!(journal.disconnects(), 1);

        conn.close();
        assert_eq!(journal.disconnects(), 2);
        assert!(!conn.has_client());
    }

    #[test]
    fn client_recovering_on_its_own_is_kept() {
        let journal = Journal::default();
        let mut conn = manager(&journal, 0);
        conn.on_tick(true);
        conn.on_connection_status_changed(ConnectionStatus::Authenticated, StatusReason::Ok);
        journal.clear_outgoing();

        // the client retries internally and authenticates again on the same handle
        conn.on_connection_status_changed(
            ConnectionStatus::Unauthenticated,
            StatusReason::NoNetwork,
        );
        conn.on_connection_status_changed(ConnectionStatus::Authenticated, StatusReason::Ok);
        assert_eq!(conn.state(), ConnectionState::Authenticated);
        assert_eq!(
            journal.reported_states(),
            vec![r#"{"manufacturer":"Acme","model":"Test Board"}"#.to_string()]
        );

        assert!(!conn.on_tick(true));
        assert_eq!(journal.connects(), 1);
        assert_eq!(journal.disconnects(), 0);
    }

    #[test]
    fn report_without_client_is_refused() {
        let journal = Journal::default();
        let mut conn = manager(&journal, 0);
        assert!(!conn.report_state(br#"{"StatusLED":true}"#));
        assert!(conn.send_event("{}").is_err());
    }
}
