//! In-memory transport used by the driver and service tests.

use crate::domain::error::TransportError;
use crate::infrastructure::bluetooth::protocol::format_uuid;
use crate::infrastructure::bluetooth::transport::{
    DeviceFilter, LinkId, LinkLossNotifier, Transport,
};
use std::cell::RefCell;
use std::rc::Rc;
use tokio::sync::Notify;

#[derive(Default)]
pub struct MockState {
    pub device_available: bool,
    pub connect_fails: bool,
    pub missing_characteristics: Vec<u128>,
    /// When set, device selection waits for a permit
    pub selection_gate: Option<Rc<Notify>>,
    /// When set, the next channel lookup waits for a permit
    pub resolve_gate: Option<Rc<Notify>>,
    pub requests: usize,
    pub writes: Vec<(u128, Vec<u8>)>,
    pub released: Vec<LinkId>,
    pub notifiers: Vec<LinkLossNotifier>,
    pub last_filter: Option<DeviceFilter>,
}

#[derive(Clone)]
pub struct MockTransport {
    pub state: Rc<RefCell<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(MockState {
                device_available: true,
                ..Default::default()
            })),
        }
    }

    pub fn writes(&self) -> Vec<(u128, Vec<u8>)> {
        self.state.borrow().writes.clone()
    }

    pub fn writes_to(&self, characteristic: u128) -> Vec<Vec<u8>> {
        self.state
            .borrow()
            .writes
            .iter()
            .filter(|(uuid, _)| *uuid == characteristic)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    /// Simulate the peripheral dropping the most recent link.
    pub fn drop_link(&self) {
        let notifier = self.state.borrow().notifiers.last().cloned();
        if let Some(notifier) = notifier {
            notifier.notify();
        }
    }
}

impl Transport for MockTransport {
    type Device = ();
    type Link = LinkId;
    type Channel = u128;

    async fn request_device(&self, filter: &DeviceFilter) -> Result<(), TransportError> {
        let gate = {
            let mut state = self.state.borrow_mut();
            state.requests += 1;
            state.last_filter = Some(filter.clone());
            state.selection_gate.clone()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.state.borrow().device_available {
            Ok(())
        } else {
            Err(TransportError::NoDeviceSelected)
        }
    }

    async fn connect(
        &self,
        _device: (),
        link_lost: LinkLossNotifier,
    ) -> Result<LinkId, TransportError> {
        let mut state = self.state.borrow_mut();
        if state.connect_fails {
            return Err(TransportError::Connect("peripheral refused".to_string()));
        }
        let link_id = link_lost.link_id();
        state.notifiers.push(link_lost);
        Ok(link_id)
    }

    async fn resolve_channel(
        &self,
        _link: &LinkId,
        _service_uuid: u128,
        characteristic_uuid: u128,
    ) -> Result<u128, TransportError> {
        let gate = self.state.borrow_mut().resolve_gate.take();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self
            .state
            .borrow()
            .missing_characteristics
            .contains(&characteristic_uuid)
        {
            return Err(TransportError::CharacteristicNotFound(format_uuid(
                characteristic_uuid,
            )));
        }
        Ok(characteristic_uuid)
    }

    fn write(&self, channel: &u128, payload: &[u8]) -> Result<(), TransportError> {
        self.state
            .borrow_mut()
            .writes
            .push((*channel, payload.to_vec()));
        Ok(())
    }

    fn release(&self, link: LinkId) {
        self.state.borrow_mut().released.push(link);
    }
}
