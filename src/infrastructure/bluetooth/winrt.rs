//! WinRT Transport
//!
//! [`Transport`] on top of the Windows Bluetooth LE APIs. Device selection
//! is an active advertisement scan that takes the first advertiser matching
//! the filter; nothing within the selection window counts as a cancelled
//! selection.

use crate::domain::error::TransportError;
use crate::infrastructure::bluetooth::protocol::format_uuid;
use crate::infrastructure::bluetooth::transport::{DeviceFilter, LinkLossNotifier, Transport};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time;
use tracing::{debug, info, warn};
use windows::core::{Ref, GUID};
use windows::Devices::Bluetooth::Advertisement::{
    BluetoothLEAdvertisementReceivedEventArgs, BluetoothLEAdvertisementWatcher,
    BluetoothLEScanningMode,
};
use windows::Devices::Bluetooth::GenericAttributeProfile::{
    GattCharacteristic, GattCommunicationStatus,
};
use windows::Devices::Bluetooth::{BluetoothConnectionStatus, BluetoothLEDevice};
use windows::Foundation::TypedEventHandler;
use windows::Storage::Streams::DataWriter;

impl From<windows::core::Error> for TransportError {
    fn from(e: windows::core::Error) -> Self {
        TransportError::Platform(e.to_string())
    }
}

fn connect_error(e: windows::core::Error) -> TransportError {
    TransportError::Connect(e.to_string())
}

pub struct WinRtTransport {
    selection_timeout: Duration,
}

impl WinRtTransport {
    pub fn new(selection_timeout: Duration) -> Self {
        Self { selection_timeout }
    }
}

/// Open link to one peripheral
pub struct WinRtLink {
    device: BluetoothLEDevice,
    status_token: i64,
}

impl Transport for WinRtTransport {
    /// Bluetooth address
    type Device = u64;
    type Link = WinRtLink;
    type Channel = GattCharacteristic;

    async fn request_device(&self, filter: &DeviceFilter) -> Result<u64, TransportError> {
        let watcher = BluetoothLEAdvertisementWatcher::new()?;
        watcher.SetScanningMode(BluetoothLEScanningMode::Active)?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let filter = filter.clone();
        let handler = TypedEventHandler::new(
            move |_: Ref<BluetoothLEAdvertisementWatcher>,
                  args: Ref<BluetoothLEAdvertisementReceivedEventArgs>| {
                if let Some(args) = args.as_ref() {
                    let adv = args.Advertisement()?;
                    let service_uuids = adv.ServiceUuids()?;
                    let mut services = Vec::new();
                    for i in 0..service_uuids.Size()? {
                        services.push(service_uuids.GetAt(i)?.to_u128());
                    }

                    let name = adv.LocalName()?.to_string();
                    if filter.matches(&services, &name) {
                        let _ = tx.send((args.BluetoothAddress()?, name));
                    }
                }
                Ok(())
            },
        );

        let token = watcher.Received(&handler)?;
        watcher.Start()?;
        debug!("Advertisement watcher started");

        let selected = time::timeout(self.selection_timeout, rx.recv()).await;

        let _ = watcher.RemoveReceived(token);
        if let Err(e) = watcher.Stop() {
            warn!("Failed to stop advertisement watcher: {}", e);
        }

        match selected {
            Ok(Some((address, name))) => {
                info!("Selected {:?} at {:#X}", name, address);
                Ok(address)
            }
            _ => {
                info!(
                    "No matching device within {} ms",
                    self.selection_timeout.as_millis()
                );
                Err(TransportError::NoDeviceSelected)
            }
        }
    }

    async fn connect(
        &self,
        address: u64,
        link_lost: LinkLossNotifier,
    ) -> Result<WinRtLink, TransportError> {
        let device = BluetoothLEDevice::FromBluetoothAddressAsync(address)
            .map_err(connect_error)?
            .await
            .map_err(connect_error)?;
        info!("Device opened: {:?}", device.Name());

        let status_handler =
            TypedEventHandler::new(move |dev: Ref<BluetoothLEDevice>, _| {
                if let Some(dev) = dev.as_ref() {
                    if dev.ConnectionStatus()? == BluetoothConnectionStatus::Disconnected {
                        link_lost.notify();
                    }
                }
                Ok(())
            });
        let status_token = device
            .ConnectionStatusChanged(&status_handler)
            .map_err(connect_error)?;

        Ok(WinRtLink {
            device,
            status_token,
        })
    }

    async fn resolve_channel(
        &self,
        link: &WinRtLink,
        service_uuid: u128,
        characteristic_uuid: u128,
    ) -> Result<GattCharacteristic, TransportError> {
        let services_result = link
            .device
            .GetGattServicesForUuidAsync(GUID::from_u128(service_uuid))?
            .await?;
        if services_result.Status()? != GattCommunicationStatus::Success {
            warn!(
                "Failed to get GATT services: {:?}",
                services_result.Status()?
            );
            return Err(TransportError::ServiceNotFound(format_uuid(service_uuid)));
        }

        let services = services_result.Services()?;
        if services.Size()? == 0 {
            return Err(TransportError::ServiceNotFound(format_uuid(service_uuid)));
        }
        let service = services.GetAt(0)?;

        let chars_result = service
            .GetCharacteristicsForUuidAsync(GUID::from_u128(characteristic_uuid))?
            .await?;
        if chars_result.Status()? != GattCommunicationStatus::Success {
            return Err(TransportError::CharacteristicNotFound(format_uuid(
                characteristic_uuid,
            )));
        }

        let characteristics = chars_result.Characteristics()?;
        if characteristics.Size()? == 0 {
            return Err(TransportError::CharacteristicNotFound(format_uuid(
                characteristic_uuid,
            )));
        }
        Ok(characteristics.GetAt(0)?)
    }

    fn write(&self, channel: &GattCharacteristic, payload: &[u8]) -> Result<(), TransportError> {
        let writer = DataWriter::new()?;
        writer.WriteBytes(payload)?;
        let buffer = writer.DetachBuffer()?;

        // Fire-and-forget write
        let _ = channel
            .WriteValueAsync(&buffer)
            .map_err(|e| TransportError::Write(e.to_string()))?;
        Ok(())
    }

    fn release(&self, link: WinRtLink) {
        let _ = link
            .device
            .RemoveConnectionStatusChanged(link.status_token);
        if let Err(e) = link.device.Close() {
            debug!("Closing device failed: {}", e);
        }
    }
}
