//! Device Driver
//!
//! Owns the single connection to the peripheral: selection, GATT connect,
//! channel resolution, teardown and lifecycle notifications. Every command
//! write goes through here and is dropped silently unless connected.
//!
//! The driver is meant to live on one thread (see [`service`]); state is
//! kept in `RefCell`s and no borrow is ever held across an `.await`.
//!
//! [`service`]: crate::infrastructure::bluetooth::service

use crate::domain::error::DriverError;
use crate::domain::mapper::CommandSink;
use crate::domain::models::{ButtonState, ChannelKind, ConnectionStatus, LifecycleEvent};
use crate::infrastructure::bluetooth::connection::{
    resolve_channels, CommandChannels, Connection, ConnectionConfig,
};
use crate::infrastructure::bluetooth::protocol;
use crate::infrastructure::bluetooth::transport::{LinkId, LinkLossNotifier, Transport};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

type Observer = Rc<dyn Fn()>;

#[derive(Default)]
struct Observers {
    connect: Vec<Observer>,
    disconnect: Vec<Observer>,
}

pub struct Driver<T: Transport> {
    transport: T,
    config: ConnectionConfig,
    connection: RefCell<Connection<T::Link, T::Channel>>,
    next_link_id: Cell<LinkId>,
    link_loss_tx: mpsc::UnboundedSender<LinkId>,
    observers: RefCell<Observers>,
}

impl<T: Transport> Driver<T> {
    /// Create a disconnected driver.
    ///
    /// The returned receiver yields the id of every link the peripheral
    /// dropped; feed each one back into [`Driver::handle_link_loss`].
    pub fn new(
        transport: T,
        config: ConnectionConfig,
    ) -> (Self, mpsc::UnboundedReceiver<LinkId>) {
        let (link_loss_tx, link_loss_rx) = mpsc::unbounded_channel();
        let driver = Self {
            transport,
            config,
            connection: RefCell::new(Connection::Disconnected),
            next_link_id: Cell::new(1),
            link_loss_tx,
            observers: RefCell::new(Observers::default()),
        };
        (driver, link_loss_rx)
    }

    pub fn status(&self) -> ConnectionStatus {
        self.connection.borrow().status()
    }

    pub fn on_connect(&self, observer: impl Fn() + 'static) {
        self.observers.borrow_mut().connect.push(Rc::new(observer));
    }

    pub fn on_disconnect(&self, observer: impl Fn() + 'static) {
        self.observers.borrow_mut().disconnect.push(Rc::new(observer));
    }

    /// Select a device matching the configured filter and connect to it.
    ///
    /// Rejected with [`DriverError::AlreadyConnecting`] while another attempt
    /// is running. On any failure the driver is left disconnected.
    pub async fn scan(&self) -> Result<(), DriverError> {
        let attempt = self.begin_attempt()?;
        info!(
            "Requesting device (service {} or name {:?})",
            protocol::format_uuid(self.config.filter.service_uuid),
            self.config.filter.name
        );

        let device = match self.transport.request_device(&self.config.filter).await {
            Ok(device) => device,
            Err(e) => {
                warn!("Device selection failed: {}", e);
                return Err(e.into());
            }
        };

        self.establish(attempt, device).await
    }

    /// Connect to a device that was already selected.
    pub async fn open_device(&self, device: T::Device) -> Result<(), DriverError> {
        let attempt = self.begin_attempt()?;
        self.establish(attempt, device).await
    }

    /// Tear down the link. No-op unless connected.
    pub fn disconnect(&self) {
        self.teardown("disconnect requested");
    }

    /// React to the peripheral dropping `lost_id`.
    ///
    /// A loss of the link that is still being opened fails that attempt
    /// once it reaches the end of channel resolution.
    pub fn handle_link_loss(&self, lost_id: LinkId) {
        let connected = {
            let mut connection = self.connection.borrow_mut();
            match &mut *connection {
                Connection::Connected { link_id, .. } => *link_id == lost_id,
                Connection::Connecting { pending, lost } if *pending == Some(lost_id) => {
                    info!("Link {} lost while connecting", lost_id);
                    *lost = true;
                    return;
                }
                _ => false,
            }
        };

        if connected {
            self.teardown("link lost");
        } else {
            debug!("Ignoring link loss for stale link {}", lost_id);
        }
    }

    fn begin_attempt(&self) -> Result<ConnectAttempt<'_, T::Link, T::Channel>, DriverError> {
        let mut connection = self.connection.borrow_mut();
        match *connection {
            Connection::Connecting { .. } => Err(DriverError::AlreadyConnecting),
            Connection::Connected { .. } => Err(DriverError::AlreadyConnected),
            Connection::Disconnected => {
                *connection = Connection::Connecting {
                    pending: None,
                    lost: false,
                };
                Ok(ConnectAttempt {
                    connection: &self.connection,
                })
            }
        }
    }

    async fn establish(
        &self,
        attempt: ConnectAttempt<'_, T::Link, T::Channel>,
        device: T::Device,
    ) -> Result<(), DriverError> {
        let link_id = self.next_link_id.get();
        self.next_link_id.set(link_id + 1);
        let notifier = LinkLossNotifier::new(link_id, self.link_loss_tx.clone());
        attempt.set_pending(link_id);

        let link = match self.transport.connect(device, notifier).await {
            Ok(link) => link,
            Err(e) => {
                warn!("GATT connect failed: {}", e);
                return Err(DriverError::Link(e.to_string()));
            }
        };

        let channels = match resolve_channels(&self.transport, &link, &self.config).await {
            Ok(channels) => channels,
            Err(e) => {
                warn!("Channel resolution failed: {}", e);
                self.transport.release(link);
                return Err(DriverError::Link(e.to_string()));
            }
        };

        if attempt.link_lost() {
            warn!("Link {} dropped during channel resolution", link_id);
            self.transport.release(link);
            return Err(DriverError::Link(
                "peripheral dropped the link while connecting".to_string(),
            ));
        }

        attempt.complete(link_id, link, channels);
        info!("Connected (link {})", link_id);
        self.notify(LifecycleEvent::Connect);
        Ok(())
    }

    fn teardown(&self, reason: &str) {
        let previous = {
            let mut connection = self.connection.borrow_mut();
            if !matches!(*connection, Connection::Connected { .. }) {
                trace!("Nothing to tear down ({})", reason);
                return;
            }
            std::mem::replace(&mut *connection, Connection::Disconnected)
        };

        if let Connection::Connected { link_id, link, .. } = previous {
            info!("Disconnected link {}: {}", link_id, reason);
            self.transport.release(link);
        }
        self.notify(LifecycleEvent::Disconnect);
    }

    fn notify(&self, event: LifecycleEvent) {
        // Clone the list so observers may register further observers
        let observers = {
            let observers = self.observers.borrow();
            match event {
                LifecycleEvent::Connect => observers.connect.clone(),
                LifecycleEvent::Disconnect => observers.disconnect.clone(),
            }
        };
        for observer in observers {
            observer();
        }
    }

    fn write(&self, kind: ChannelKind, payload: &[u8]) {
        let connection = self.connection.borrow();
        let Some(channel) = connection.channels().and_then(|c| c.get(kind)) else {
            trace!("Dropping {:?} write while not connected", kind);
            return;
        };

        trace!("Writing {:?}: {:02X?}", kind, payload);
        if let Err(e) = self.transport.write(channel, payload) {
            warn!("{:?} write failed: {}", kind, e);
        }
    }
}

impl<T: Transport> CommandSink for Driver<T> {
    fn move_delta(&self, dx: f64, dy: f64) {
        match protocol::encode_move_delta(dx, dy) {
            Some(payload) => self.write(ChannelKind::MoveDelta, &payload),
            None => trace!("Zero move suppressed"),
        }
    }

    fn velocity(&self, vx: f64, vy: f64) {
        self.write(ChannelKind::Velocity, &protocol::encode_velocity(vx, vy));
    }

    fn buttons(&self, state: ButtonState) {
        let bits = protocol::encode_buttons(state.left, state.right, state.middle);
        self.write(ChannelKind::Buttons, &[bits]);
    }
}

/// Marks the connection as `Connecting` for the duration of one attempt and
/// puts it back to `Disconnected` unless the attempt completed.
struct ConnectAttempt<'a, L, C> {
    connection: &'a RefCell<Connection<L, C>>,
}

impl<L, C> ConnectAttempt<'_, L, C> {
    fn set_pending(&self, link_id: LinkId) {
        if let Connection::Connecting { pending, .. } = &mut *self.connection.borrow_mut() {
            *pending = Some(link_id);
        }
    }

    fn link_lost(&self) -> bool {
        matches!(
            *self.connection.borrow(),
            Connection::Connecting { lost: true, .. }
        )
    }

    fn complete(self, link_id: LinkId, link: L, channels: CommandChannels<C>) {
        *self.connection.borrow_mut() = Connection::Connected {
            link_id,
            link,
            channels,
        };
    }
}

impl<L, C> Drop for ConnectAttempt<'_, L, C> {
    fn drop(&mut self) {
        if let Ok(mut connection) = self.connection.try_borrow_mut() {
            if matches!(*connection, Connection::Connecting { .. }) {
                *connection = Connection::Disconnected;
            }
        }
    }
}
