//! Bluetooth Module
//!
//! Drives the Simple Mouse Link peripheral over BLE.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                         service                          │
//! │  (driver thread: UI commands, link loss, sample ticker)  │
//! └─────────────────────┬────────────────────────────────────┘
//!                       │
//!         ┌─────────────┼──────────────┐
//!         │             │              │
//!         ▼             ▼              ▼
//! ┌────────────┐  ┌────────────┐  ┌───────────┐
//! │   Driver   │  │ Connection │  │ Protocol  │
//! │            │  │            │  │           │
//! │ - Lifecycle│  │ - Channels │  │ - UUIDs   │
//! │ - Writes   │  │ - Config   │  │ - Codec   │
//! └─────┬──────┘  └────────────┘  └───────────┘
//!       │
//!       ▼
//! ┌────────────┐
//! │ Transport  │  (WinRT on Windows)
//! └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`protocol`] - UUIDs and command payload encoding
//! - [`transport`] - Platform seam for device selection, GATT access and writes
//! - [`connection`] - Connection state and channel resolution
//! - [`driver`] - Connection lifecycle and command writes
//! - [`service`] - Driver thread and command loop

pub mod connection;
pub mod driver;
#[cfg(test)]
pub mod mock;
pub mod protocol;
pub mod service;
pub mod transport;
#[cfg(windows)]
pub mod winrt;
