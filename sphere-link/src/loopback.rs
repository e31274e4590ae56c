//! In-process hub used when no vendor transport is linked in. It records
//! everything the agent sends into a shared [`Journal`], confirms it on the
//! following pump and can be scripted to fail setups or deliver inbound
//! events, which is also what the tests drive

use std::{cell::RefCell, collections::VecDeque, rc::Rc, time::Duration};

use crate::{
    ConfirmationResult, ConnectionStatus, HubClient, HubClientError, HubConnector, HubEvent,
    MethodRequestId, MethodResponse, ProvisioningResult, StatusReason, Subscription,
};

/// Traffic leaving the device
#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing {
    Event(String),
    ReportedState(String),
    MethodResponse(MethodRequestId, MethodResponse),
}

#[derive(Default)]
struct JournalInner {
    outgoing: Vec<Outgoing>,
    inbound: VecDeque<HubEvent>,
    subscriptions: Vec<Subscription>,
    connects: usize,
    disconnects: usize,
    failures_remaining: u32,
}

/// Shared record of the loopback hub, cloned into every client it creates
#[derive(Clone, Default)]
pub struct Journal {
    inner: Rc<RefCell<JournalInner>>,
}

impl Journal {
    /// Queue an event for delivery on the next pump of a subscribed client
    pub fn inject(&self, event: HubEvent) {
        self.inner.borrow_mut().inbound.push_back(event);
    }

    pub fn outgoing(&self) -> Vec<Outgoing> {
        self.inner.borrow().outgoing.clone()
    }

    pub fn events(&self) -> Vec<String> {
        self.inner
            .borrow()
            .outgoing
            .iter()
            .filter_map(|o| match o {
                Outgoing::Event(e) => Some(e.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn reported_states(&self) -> Vec<String> {
        self.inner
            .borrow()
            .outgoing
            .iter()
            .filter_map(|o| match o {
                Outgoing::ReportedState(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear_outgoing(&self) {
        self.inner.borrow_mut().outgoing.clear();
    }

    /// Subscriptions made by the most recently created client
    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.inner.borrow().subscriptions.clone()
    }

    /// Setup attempts, failed ones included
    pub fn connects(&self) -> usize {
        self.inner.borrow().connects
    }

    pub fn disconnects(&self) -> usize {
        self.inner.borrow().disconnects
    }
}

/// Creates [`LoopbackHub`] clients for either provisioning mode
pub struct LoopbackConnector {
    journal: Journal,
}

impl LoopbackConnector {
    pub fn new(journal: Journal) -> Self {
        Self { journal }
    }

    /// Fail the next `failures` setup attempts
    pub fn failing_first(self, failures: u32) -> Self {
        self.journal.inner.borrow_mut().failures_remaining = failures;
        self
    }

    /// Count a setup attempt, returning false when it is scripted to fail
    fn admit(&mut self) -> bool {
        let mut inner = self.journal.inner.borrow_mut();
        inner.connects += 1;
        if inner.failures_remaining > 0 {
            inner.failures_remaining -= 1;
            return false;
        }
        inner.subscriptions.clear();
        true
    }
}

impl HubConnector for LoopbackConnector {
    fn connect_direct(
        &mut self,
        hostname: &str,
        device_id: &str,
    ) -> Result<Box<dyn HubClient>, HubClientError> {
        if !self.admit() {
            return Err(HubClientError::Client(format!(
                "loopback refused {device_id}@{hostname}"
            )));
        }
        log::debug!("Loopback client for {device_id}@{hostname} created");
        Ok(Box::new(LoopbackHub::new(self.journal.clone())))
    }

    fn provision(
        &mut self,
        scope_id: &str,
        _timeout: Duration,
    ) -> Result<Box<dyn HubClient>, HubClientError> {
        if !self.admit() {
            return Err(HubClientError::Provisioning(
                ProvisioningResult::ProvDeviceError,
            ));
        }
        log::debug!("Loopback client provisioned in scope {scope_id}");
        Ok(Box::new(LoopbackHub::new(self.journal.clone())))
    }
}

/// A connected loopback client. It authenticates on its first pump after a
/// connection status subscription
pub struct LoopbackHub {
    journal: Journal,
    subscriptions: Vec<Subscription>,
    announced: bool,
    pending: Vec<HubEvent>,
    connected: bool,
}

impl LoopbackHub {
    fn new(journal: Journal) -> Self {
        Self {
            journal,
            subscriptions: vec![],
            announced: false,
            pending: vec![],
            connected: true,
        }
    }

    fn is_subscribed(&self, event: &HubEvent) -> bool {
        let needed = match event {
            HubEvent::ConnectionStatusChanged { .. } => Subscription::ConnectionStatus,
            HubEvent::DesiredProperties { .. } => Subscription::DeviceTwin,
            HubEvent::MethodInvoked { .. } => Subscription::DirectMethod,
            HubEvent::EventConfirmed(_) | HubEvent::ReportedStateConfirmed(_) => return true,
        };
        self.subscriptions.contains(&needed)
    }

    fn record(&mut self, outgoing: Outgoing) -> Result<(), HubClientError> {
        if !self.connected {
            return Err(HubClientError::Client("client disconnected".to_string()));
        }
        let confirmation = match &outgoing {
            Outgoing::Event(_) => Some(HubEvent::EventConfirmed(ConfirmationResult::Ok)),
            Outgoing::ReportedState(_) => Some(HubEvent::ReportedStateConfirmed(200)),
            Outgoing::MethodResponse(..) => None,
        };
        self.journal.inner.borrow_mut().outgoing.push(outgoing);
        self.pending.extend(confirmation);
        Ok(())
    }
}

impl HubClient for LoopbackHub {
    fn subscribe(&mut self, subscription: Subscription) -> Result<(), HubClientError> {
        if !self.subscriptions.contains(&subscription) {
            self.subscriptions.push(subscription);
            self.journal
                .inner
                .borrow_mut()
                .subscriptions
                .push(subscription);
        }
        Ok(())
    }

    fn send_event(&mut self, message: &str) -> Result<(), HubClientError> {
        log::info!("[loopback] event {message}");
        self.record(Outgoing::Event(message.to_string()))
    }

    fn report_state(&mut self, state: &[u8]) -> Result<(), HubClientError> {
        let state = String::from_utf8_lossy(state).into_owned();
        log::info!("[loopback] reported state {state}");
        self.record(Outgoing::ReportedState(state))
    }

    fn respond_to_method(
        &mut self,
        id: MethodRequestId,
        response: MethodResponse,
    ) -> Result<(), HubClientError> {
        log::info!("[loopback] method {id} answered with {}", response.status);
        self.record(Outgoing::MethodResponse(id, response))
    }

    fn pump(&mut self) -> Vec<HubEvent> {
        if !self.connected {
            return vec![];
        }

        let mut events = std::mem::take(&mut self.pending);

        if !self.announced && self.subscriptions.contains(&Subscription::ConnectionStatus) {
            self.announced = true;
            events.push(HubEvent::ConnectionStatusChanged {
                status: ConnectionStatus::Authenticated,
                reason: StatusReason::Ok,
            });
        }

        let inbound: Vec<HubEvent> = self.journal.inner.borrow_mut().inbound.drain(..).collect();
        for event in inbound {
            if self.is_subscribed(&event) {
                events.push(event);
            } else {
                log::debug!("[loopback] dropping unsubscribed {event:?}");
            }
        }
        events
    }

    fn disconnect(&mut self) {
        if self.connected {
            self.connected = false;
            self.journal.inner.borrow_mut().disconnects += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TwinUpdateKind;

    fn connected(journal: &Journal) -> Box<dyn HubClient> {
        LoopbackConnector::new(journal.clone())
            .connect_direct("hub.example.net", "sphere-01")
            .unwrap()
    }

    #[test]
    fn scripted_failures_then_success() {
        let journal = Journal::default();
        let mut connector = LoopbackConnector::new(journal.clone()).failing_first(2);
        assert!(matches!(
            connector.provision("0ne0001", Duration::from_secs(10)),
            Err(HubClientError::Provisioning(ProvisioningResult::ProvDeviceError))
        ));
        assert!(matches!(
            connector.connect_direct("hub", "dev"),
            Err(HubClientError::Client(_))
        ));
        assert!(connector.provision("0ne0001", Duration::from_secs(10)).is_ok());
        assert_eq!(journal.connects(), 3);
    }

    #[test]
    fn authenticates_only_once_subscribed() {
        let journal = Journal::default();
        let mut client = connected(&journal);
        assert!(client.pump().is_empty());

        client.subscribe(Subscription::ConnectionStatus).unwrap();
        assert_eq!(
            client.pump(),
            vec![HubEvent::ConnectionStatusChanged {
                status: ConnectionStatus::Authenticated,
                reason: StatusReason::Ok,
            }]
        );
        assert!(client.pump().is_empty());
    }

    #[test]
    fn sends_are_confirmed_on_next_pump() {
        let journal = Journal::default();
        let mut client = connected(&journal);
        client.send_event(r#"{"Temperature":20.00}"#).unwrap();
        client.report_state(br#"{"RLED":true}"#).unwrap();

        assert_eq!(journal.events(), vec![r#"{"Temperature":20.00}"#.to_string()]);
        assert_eq!(journal.reported_states(), vec![r#"{"RLED":true}"#.to_string()]);
        assert_eq!(
            client.pump(),
            vec![
                HubEvent::EventConfirmed(ConfirmationResult::Ok),
                HubEvent::ReportedStateConfirmed(200)
            ]
        );
    }

    #[test]
    fn inbound_events_respect_subscriptions() {
        let journal = Journal::default();
        let mut client = connected(&journal);
        client.subscribe(Subscription::DeviceTwin).unwrap();

        let twin = HubEvent::DesiredProperties {
            kind: TwinUpdateKind::Partial,
            payload: br#"{"desired":{"GLED":true}}"#.to_vec(),
        };
        journal.inject(twin.clone());
        journal.inject(HubEvent::MethodInvoked {
            id: 1,
            name: "TriggerAlarm".to_string(),
            payload: vec![],
        });
        assert_eq!(client.pump(), vec![twin]);
    }

    #[test]
    fn disconnected_client_refuses_sends() {
        let journal = Journal::default();
        let mut client = connected(&journal);
        client.disconnect();
        client.disconnect();
        assert_eq!(journal.disconnects(), 1);
        assert!(client.send_event("{}").is_err());
        assert!(client.pump().is_empty());
    }
}
