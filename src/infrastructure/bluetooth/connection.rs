//! BLE Connection Module
//!
//! Connection state, the resolved command channels and the configuration
//! needed to find them.

use crate::domain::error::TransportError;
use crate::domain::models::{ChannelKind, ConnectionStatus, MotionMode};
use crate::domain::settings::Settings;
use crate::infrastructure::bluetooth::protocol::{self, format_uuid};
use crate::infrastructure::bluetooth::transport::{DeviceFilter, LinkId, Transport};
use anyhow::Result;
use tracing::{debug, info};

/// Configuration for connection behavior
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Filter offered to device selection
    pub filter: DeviceFilter,
    /// Service holding every command characteristic
    pub service_uuid: u128,
    pub move_char_uuid: u128,
    pub velocity_char_uuid: u128,
    pub buttons_char_uuid: u128,
    /// Decides which motion characteristic is required
    pub motion_mode: MotionMode,
}

impl ConnectionConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let service_uuid = protocol::parse_uuid(&settings.ble_service_uuid)?;
        Ok(Self {
            filter: DeviceFilter {
                service_uuid,
                name: settings.device_name.clone(),
            },
            service_uuid,
            move_char_uuid: protocol::parse_uuid(&settings.ble_move_char_uuid)?,
            velocity_char_uuid: protocol::parse_uuid(&settings.ble_velocity_char_uuid)?,
            buttons_char_uuid: protocol::parse_uuid(&settings.ble_buttons_char_uuid)?,
            motion_mode: settings.motion_mode,
        })
    }

    pub fn characteristic_uuid(&self, kind: ChannelKind) -> u128 {
        match kind {
            ChannelKind::MoveDelta => self.move_char_uuid,
            ChannelKind::Velocity => self.velocity_char_uuid,
            ChannelKind::Buttons => self.buttons_char_uuid,
        }
    }

    /// Channels that must all resolve before the link counts as connected
    pub fn required_channels(&self) -> [ChannelKind; 2] {
        [self.motion_mode.channel(), ChannelKind::Buttons]
    }
}

/// Write handles keyed by command kind
pub struct CommandChannels<C> {
    move_xy: Option<C>,
    velocity_xy: Option<C>,
    buttons: Option<C>,
}

impl<C> CommandChannels<C> {
    pub fn new() -> Self {
        Self {
            move_xy: None,
            velocity_xy: None,
            buttons: None,
        }
    }

    pub fn insert(&mut self, kind: ChannelKind, channel: C) {
        *self.slot_mut(kind) = Some(channel);
    }

    pub fn get(&self, kind: ChannelKind) -> Option<&C> {
        match kind {
            ChannelKind::MoveDelta => self.move_xy.as_ref(),
            ChannelKind::Velocity => self.velocity_xy.as_ref(),
            ChannelKind::Buttons => self.buttons.as_ref(),
        }
    }

    fn slot_mut(&mut self, kind: ChannelKind) -> &mut Option<C> {
        match kind {
            ChannelKind::MoveDelta => &mut self.move_xy,
            ChannelKind::Velocity => &mut self.velocity_xy,
            ChannelKind::Buttons => &mut self.buttons,
        }
    }
}

impl<C> Default for CommandChannels<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// The single logical link of a driver. Channels only exist while connected.
pub enum Connection<L, C> {
    Disconnected,
    /// `pending` is the link being opened, once it has an id. `lost` is set
    /// when the peripheral drops that link before the attempt completes.
    Connecting {
        pending: Option<LinkId>,
        lost: bool,
    },
    Connected {
        link_id: LinkId,
        link: L,
        channels: CommandChannels<C>,
    },
}

impl<L, C> Connection<L, C> {
    pub fn status(&self) -> ConnectionStatus {
        match self {
            Connection::Disconnected => ConnectionStatus::Disconnected,
            Connection::Connecting { .. } => ConnectionStatus::Connecting,
            Connection::Connected { .. } => ConnectionStatus::Connected,
        }
    }

    pub fn channels(&self) -> Option<&CommandChannels<C>> {
        match self {
            Connection::Connected { channels, .. } => Some(channels),
            _ => None,
        }
    }
}

/// Look up every required characteristic. Fails on the first missing one.
pub async fn resolve_channels<T: Transport>(
    transport: &T,
    link: &T::Link,
    config: &ConnectionConfig,
) -> Result<CommandChannels<T::Channel>, TransportError> {
    let mut channels = CommandChannels::new();

    for kind in config.required_channels() {
        let uuid = config.characteristic_uuid(kind);
        debug!("Resolving {:?} characteristic {}", kind, format_uuid(uuid));
        let channel = transport
            .resolve_channel(link, config.service_uuid, uuid)
            .await?;
        info!("Found {:?} characteristic", kind);
        channels.insert(kind, channel);
    }

    Ok(channels)
}
