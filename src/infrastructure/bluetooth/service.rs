//! Bluetooth Service Module
//!
//! Runs the driver on a dedicated thread with a current-thread runtime and a
//! `LocalSet`. UI commands, link-loss reports and the sampling ticker are
//! the only sources of work; each handler runs to completion before the next
//! one starts.

use crate::domain::error::DriverError;
use crate::domain::mapper::{strategy_from_settings, InputMapper};
use crate::domain::models::{
    AppEvent, ConnectionStatus, DriverCommand, MessageSeverity, StatusMessage,
};
use crate::domain::settings::Settings;
use crate::infrastructure::bluetooth::connection::ConnectionConfig;
use crate::infrastructure::bluetooth::driver::Driver;
use crate::infrastructure::bluetooth::transport::Transport;
use anyhow::Result;
use std::rc::Rc;
use tokio::sync::mpsc;
use tokio::time::{self, Interval, MissedTickBehavior};
use tracing::{info, warn};

/// Start the driver thread.
///
/// The transport is built on that thread, so it does not need to be `Send`.
#[cfg(windows)]
pub fn spawn_driver_thread<T, F>(
    make_transport: F,
    settings: Settings,
    commands: mpsc::UnboundedReceiver<DriverCommand>,
    events: mpsc::UnboundedSender<AppEvent>,
) -> std::io::Result<std::thread::JoinHandle<()>>
where
    T: Transport + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    std::thread::Builder::new()
        .name("ble-driver".to_string())
        .spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    tracing::error!("Failed to create tokio runtime for Bluetooth: {}", e);
                    return;
                }
            };

            let local = tokio::task::LocalSet::new();
            let driver_events = events.clone();
            let result = local.block_on(&rt, async move {
                let transport = make_transport()?;
                run(transport, &settings, commands, driver_events).await
            });

            if let Err(e) = result {
                tracing::error!("Bluetooth driver stopped: {:#}", e);
                let _ = events.send(AppEvent::LogMessage(StatusMessage::new(
                    format!("Bluetooth unavailable: {}", e),
                    MessageSeverity::Error,
                )));
            }
        })
}

/// Drive the peripheral until the command channel closes.
///
/// Must be polled inside a `LocalSet`: scans run as local tasks so input
/// keeps flowing while a connection attempt is pending.
pub async fn run<T: Transport + 'static>(
    transport: T,
    settings: &Settings,
    mut commands: mpsc::UnboundedReceiver<DriverCommand>,
    events: mpsc::UnboundedSender<AppEvent>,
) -> Result<()> {
    let config = ConnectionConfig::from_settings(settings)?;
    let (driver, mut link_lost) = Driver::new(transport, config);
    let driver = Rc::new(driver);
    register_status_observers(&driver, &events);

    let mut mapper = InputMapper::new(driver.clone(), strategy_from_settings(settings));
    let mut ticker = mapper.sample_period().map(|period| {
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    });
    info!("Driver ready ({:?} mode)", mapper.mode());

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else { break };
                match command {
                    DriverCommand::Scan => spawn_scan(driver.clone(), events.clone()),
                    DriverCommand::Disconnect => driver.disconnect(),
                    DriverCommand::Move(sample) => mapper.handle_position(sample),
                    DriverCommand::Button(button, pressed) => {
                        mapper.handle_button(button, pressed)
                    }
                }
            }
            Some(link_id) = link_lost.recv() => driver.handle_link_loss(link_id),
            _ = next_tick(&mut ticker) => mapper.tick(),
        }
    }

    info!("Command channel closed, shutting down driver");
    driver.disconnect();
    Ok(())
}

fn register_status_observers<T: Transport>(
    driver: &Driver<T>,
    events: &mpsc::UnboundedSender<AppEvent>,
) {
    let tx = events.clone();
    driver.on_connect(move || {
        let _ = tx.send(AppEvent::ConnectionStatus(ConnectionStatus::Connected));
        let _ = tx.send(AppEvent::LogMessage(StatusMessage::new(
            "Connected to Simple Mouse Link",
            MessageSeverity::Success,
        )));
    });

    let tx = events.clone();
    driver.on_disconnect(move || {
        let _ = tx.send(AppEvent::ConnectionStatus(ConnectionStatus::Disconnected));
        let _ = tx.send(AppEvent::LogMessage(StatusMessage::new(
            "Disconnected from device",
            MessageSeverity::Info,
        )));
    });
}

fn spawn_scan<T: Transport + 'static>(
    driver: Rc<Driver<T>>,
    events: mpsc::UnboundedSender<AppEvent>,
) {
    tokio::task::spawn_local(async move {
        // Nothing is awaited between this check and the state change at the
        // start of `scan()`, so only an accepted scan announces itself
        if driver.status() == ConnectionStatus::Disconnected {
            let _ = events.send(AppEvent::ConnectionStatus(ConnectionStatus::Connecting));
            let _ = events.send(AppEvent::LogMessage(StatusMessage::new(
                "Scanning for Simple Mouse Link...",
                MessageSeverity::Info,
            )));
        }

        let (message, severity) = match driver.scan().await {
            Ok(()) => return,
            Err(e @ (DriverError::AlreadyConnecting | DriverError::AlreadyConnected)) => {
                info!("Scan ignored: {}", e);
                return;
            }
            Err(e @ DriverError::SelectionCancelled) => {
                (format!("Connection cancelled: {}", e), MessageSeverity::Warning)
            }
            Err(e @ DriverError::Link(_)) => {
                (format!("Connection failed: {}", e), MessageSeverity::Error)
            }
        };

        warn!("{}", message);
        let _ = events.send(AppEvent::LogMessage(StatusMessage::new(message, severity)));
        let _ = events.send(AppEvent::ConnectionStatus(driver.status()));
    });
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{MotionMode, MouseButton, Position};
    use crate::infrastructure::bluetooth::mock::MockTransport;
    use std::time::Duration;
    use tokio::task::LocalSet;

    async fn wait_for_status(
        events: &mut mpsc::UnboundedReceiver<AppEvent>,
        wanted: ConnectionStatus,
    ) {
        let wait = async {
            while let Some(event) = events.recv().await {
                if let AppEvent::ConnectionStatus(status) = event {
                    if status == wanted {
                        return;
                    }
                }
            }
            panic!("event channel closed before {wanted:?}");
        };
        time::timeout(Duration::from_secs(5), wait)
            .await
            .expect("timed out waiting for status");
    }

    fn start(
        mock: &MockTransport,
        settings: Settings,
    ) -> (
        mpsc::UnboundedSender<DriverCommand>,
        mpsc::UnboundedReceiver<AppEvent>,
        tokio::task::JoinHandle<Result<()>>,
    ) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let mock = mock.clone();
        let handle = tokio::task::spawn_local(async move {
            run(mock, &settings, cmd_rx, event_tx).await
        });
        (cmd_tx, event_rx, handle)
    }

    #[tokio::test]
    async fn velocity_and_button_commands_reach_the_peripheral() {
        LocalSet::new()
            .run_until(async {
                let mock = MockTransport::new();
                let settings = Settings::default();
                let config = ConnectionConfig::from_settings(&settings).unwrap();
                let (cmd_tx, mut events, handle) = start(&mock, settings);

                cmd_tx.send(DriverCommand::Scan).unwrap();
                wait_for_status(&mut events, ConnectionStatus::Connected).await;

                cmd_tx
                    .send(DriverCommand::Move(Some(Position::new(0.1, -0.2))))
                    .unwrap();
                cmd_tx.send(DriverCommand::Move(None)).unwrap();
                cmd_tx
                    .send(DriverCommand::Button(MouseButton::Left, true))
                    .unwrap();
                cmd_tx
                    .send(DriverCommand::Button(MouseButton::Left, false))
                    .unwrap();
                drop(cmd_tx);
                handle.await.unwrap().unwrap();

                assert_eq!(
                    mock.writes_to(config.velocity_char_uuid),
                    vec![vec![0xC8, 0x00, 0x70, 0xFE], vec![0, 0, 0, 0]]
                );
                assert_eq!(
                    mock.writes_to(config.buttons_char_uuid),
                    vec![vec![1], vec![0]]
                );
                // Shutdown tears the link down
                assert_eq!(mock.state.borrow().released, vec![1]);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn sampled_mode_writes_once_per_tick_while_held() {
        LocalSet::new()
            .run_until(async {
                let mock = MockTransport::new();
                let settings = Settings {
                    motion_mode: MotionMode::SampledDelta,
                    ..Settings::default()
                };
                let config = ConnectionConfig::from_settings(&settings).unwrap();
                let (cmd_tx, mut events, handle) = start(&mock, settings);

                cmd_tx.send(DriverCommand::Scan).unwrap();
                wait_for_status(&mut events, ConnectionStatus::Connected).await;

                // Let the immediate first tick pass before holding a position
                time::sleep(Duration::from_millis(50)).await;
                cmd_tx
                    .send(DriverCommand::Move(Some(Position::new(0.05, 0.05))))
                    .unwrap();
                time::sleep(Duration::from_millis(300)).await;
                cmd_tx.send(DriverCommand::Move(None)).unwrap();
                time::sleep(Duration::from_millis(300)).await;

                drop(cmd_tx);
                handle.await.unwrap().unwrap();

                assert_eq!(
                    mock.writes_to(config.move_char_uuid),
                    vec![vec![5, 5], vec![5, 5], vec![5, 5]]
                );
            })
            .await;
    }

    #[tokio::test]
    async fn queued_scans_announce_connecting_once() {
        LocalSet::new()
            .run_until(async {
                let mock = MockTransport::new();
                let gate = Rc::new(tokio::sync::Notify::new());
                mock.state.borrow_mut().selection_gate = Some(gate.clone());
                let (cmd_tx, mut events, handle) = start(&mock, Settings::default());

                cmd_tx.send(DriverCommand::Scan).unwrap();
                cmd_tx.send(DriverCommand::Scan).unwrap();
                wait_for_status(&mut events, ConnectionStatus::Connecting).await;

                // Let both scan tasks run before the selection completes
                for _ in 0..5 {
                    tokio::task::yield_now().await;
                }
                gate.notify_one();

                let mut repeated_announcements = 0;
                let wait = async {
                    while let Some(event) = events.recv().await {
                        match event {
                            AppEvent::ConnectionStatus(ConnectionStatus::Connecting) => {
                                repeated_announcements += 1
                            }
                            AppEvent::ConnectionStatus(ConnectionStatus::Connected) => break,
                            _ => {}
                        }
                    }
                };
                time::timeout(Duration::from_secs(5), wait).await.unwrap();
                assert_eq!(repeated_announcements, 0);
                assert_eq!(mock.state.borrow().requests, 1);

                drop(cmd_tx);
                handle.await.unwrap().unwrap();
            })
            .await;
    }

    #[tokio::test]
    async fn failed_scan_reports_and_returns_to_disconnected() {
        LocalSet::new()
            .run_until(async {
                let mock = MockTransport::new();
                mock.state.borrow_mut().device_available = false;
                let (cmd_tx, mut events, handle) = start(&mock, Settings::default());

                cmd_tx.send(DriverCommand::Scan).unwrap();
                wait_for_status(&mut events, ConnectionStatus::Connecting).await;

                let mut warned = false;
                let wait = async {
                    while let Some(event) = events.recv().await {
                        match event {
                            AppEvent::LogMessage(msg) => {
                                warned |= msg.severity == MessageSeverity::Warning
                            }
                            AppEvent::ConnectionStatus(ConnectionStatus::Disconnected) => break,
                            AppEvent::ConnectionStatus(_) => {}
                        }
                    }
                };
                time::timeout(Duration::from_secs(5), wait).await.unwrap();
                assert!(warned);

                drop(cmd_tx);
                handle.await.unwrap().unwrap();
                assert!(mock.writes().is_empty());
            })
            .await;
    }

    #[tokio::test]
    async fn peripheral_link_loss_is_reported() {
        LocalSet::new()
            .run_until(async {
                let mock = MockTransport::new();
                let (cmd_tx, mut events, handle) = start(&mock, Settings::default());

                cmd_tx.send(DriverCommand::Scan).unwrap();
                wait_for_status(&mut events, ConnectionStatus::Connected).await;

                mock.drop_link();
                wait_for_status(&mut events, ConnectionStatus::Disconnected).await;

                // Input after link loss is dropped
                cmd_tx
                    .send(DriverCommand::Move(Some(Position::new(0.2, 0.2))))
                    .unwrap();
                drop(cmd_tx);
                handle.await.unwrap().unwrap();
                assert!(mock.writes().is_empty());
            })
            .await;
    }
}
