//! BLE Transport Abstraction
//!
//! The driver only needs five things from a BLE stack: pick a device, open a
//! GATT link, look up a characteristic, write to it and let go of the link.
//! Backends implement [`Transport`]; link loss is reported through the
//! [`LinkLossNotifier`] handed over at connect time.

use crate::domain::error::TransportError;
use tokio::sync::mpsc;

/// Static device filter. A device matches when it advertises the service
/// **or** uses the name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFilter {
    pub service_uuid: u128,
    pub name: String,
}

impl DeviceFilter {
    pub fn matches(&self, advertised_services: &[u128], local_name: &str) -> bool {
        advertised_services.contains(&self.service_uuid)
            || (!local_name.is_empty() && local_name == self.name)
    }
}

/// Identifies one GATT link. Every successful connect gets a fresh id.
pub type LinkId = u64;

/// Handle a backend uses to report that the peripheral dropped the link.
#[derive(Debug, Clone)]
pub struct LinkLossNotifier {
    link_id: LinkId,
    sender: mpsc::UnboundedSender<LinkId>,
}

impl LinkLossNotifier {
    pub fn new(link_id: LinkId, sender: mpsc::UnboundedSender<LinkId>) -> Self {
        Self { link_id, sender }
    }

    pub fn link_id(&self) -> LinkId {
        self.link_id
    }

    pub fn notify(&self) {
        // The driver may already be gone; nothing to report to then
        let _ = self.sender.send(self.link_id);
    }
}

#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Selected but not yet connected device
    type Device;
    /// Open GATT link
    type Link;
    /// Writable characteristic
    type Channel;

    /// Ask the platform for a device matching `filter`.
    ///
    /// Fails with [`TransportError::NoDeviceSelected`] when selection is
    /// aborted or nothing matches.
    async fn request_device(&self, filter: &DeviceFilter)
        -> Result<Self::Device, TransportError>;

    /// Open a GATT link. `link_lost` must be fired when the peripheral drops it.
    async fn connect(
        &self,
        device: Self::Device,
        link_lost: LinkLossNotifier,
    ) -> Result<Self::Link, TransportError>;

    async fn resolve_channel(
        &self,
        link: &Self::Link,
        service_uuid: u128,
        characteristic_uuid: u128,
    ) -> Result<Self::Channel, TransportError>;

    /// Submit a write without waiting for its completion.
    fn write(&self, channel: &Self::Channel, payload: &[u8]) -> Result<(), TransportError>;

    /// Tear the link down. Must tolerate links the peripheral already dropped.
    fn release(&self, link: Self::Link);
}
