//! Error types for the driver and its transport.
//!
//! Transport failures never leave the connection layer: [`Driver`] converts
//! them into a [`DriverError`] at the lifecycle boundary.
//!
//! [`Driver`]: crate::infrastructure::bluetooth::driver::Driver

use thiserror::Error;

/// Outcome of a failed `scan()` / `open_device()`.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The user or the platform aborted device selection.
    #[error("device selection was cancelled")]
    SelectionCancelled,

    /// GATT connect or channel resolution failed after a device was chosen.
    #[error("link error: {0}")]
    Link(String),

    /// Another connection attempt is still in progress.
    #[error("a connection attempt is already in progress")]
    AlreadyConnecting,

    /// The driver already holds a connected peripheral.
    #[error("already connected to a peripheral")]
    AlreadyConnected,
}

/// Failures reported by a BLE backend.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Selection finished without a device (timeout, user abort).
    #[error("no matching device was selected")]
    NoDeviceSelected,

    #[error("GATT connect failed: {0}")]
    Connect(String),

    #[error("service {0} not found")]
    ServiceNotFound(String),

    #[error("characteristic {0} not found")]
    CharacteristicNotFound(String),

    #[cfg_attr(not(windows), allow(dead_code))]
    #[error("write failed: {0}")]
    Write(String),

    /// Raw platform error that does not fit another variant.
    #[cfg_attr(not(windows), allow(dead_code))]
    #[error("platform error: {0}")]
    Platform(String),
}

impl From<TransportError> for DriverError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::NoDeviceSelected => DriverError::SelectionCancelled,
            other => DriverError::Link(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_failures_map_to_selection_cancelled() {
        let err: DriverError = TransportError::NoDeviceSelected.into();
        assert!(matches!(err, DriverError::SelectionCancelled));
    }

    #[test]
    fn other_transport_failures_map_to_link_error() {
        let err: DriverError = TransportError::CharacteristicNotFound("buttons".into()).into();
        match err {
            DriverError::Link(reason) => assert!(reason.contains("buttons")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
