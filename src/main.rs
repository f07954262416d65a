mod domain;
mod infrastructure;
mod presentation;

use crate::domain::models::{AppEvent, DriverCommand};
use crate::domain::settings::{Settings, SettingsService};
use crate::presentation::app::RemoteMouseApp;
use eframe::egui;
use tokio::sync::mpsc;

fn main() -> anyhow::Result<()> {
    let settings_service = SettingsService::new()?;
    let settings = settings_service.get().clone();

    let logging_guard = infrastructure::logging::init_logger(&settings.log_settings)
        .map_err(|e| eprintln!("Failed to initialize logging: {}", e))
        .ok();

    tracing::info!("Starting Simple Mouse Link");

    if !settings_service.path().exists() {
        if let Err(e) = settings_service.save() {
            tracing::warn!("Failed to write default settings: {}", e);
        }
    }

    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    start_driver(settings, command_rx, event_tx)?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([800.0, 480.0])
            .with_title("Simple Mouse Link"),
        ..Default::default()
    };

    eframe::run_native(
        "Simple Mouse Link",
        options,
        Box::new(move |cc| {
            Ok(Box::new(RemoteMouseApp::new(
                &cc.egui_ctx,
                command_tx,
                event_rx,
                logging_guard,
            )))
        }),
    )
    .map_err(|e| anyhow::anyhow!("UI error: {}", e))
}

#[cfg(windows)]
fn start_driver(
    settings: Settings,
    commands: mpsc::UnboundedReceiver<DriverCommand>,
    events: mpsc::UnboundedSender<AppEvent>,
) -> anyhow::Result<()> {
    use crate::infrastructure::bluetooth::service::spawn_driver_thread;
    use crate::infrastructure::bluetooth::winrt::WinRtTransport;
    use std::time::Duration;

    let selection_timeout = Duration::from_millis(settings.scan_timeout_ms);
    spawn_driver_thread(
        move || Ok(WinRtTransport::new(selection_timeout)),
        settings,
        commands,
        events,
    )?;
    Ok(())
}

#[cfg(not(windows))]
fn start_driver(
    _settings: Settings,
    commands: mpsc::UnboundedReceiver<DriverCommand>,
    events: mpsc::UnboundedSender<AppEvent>,
) -> anyhow::Result<()> {
    use crate::domain::models::{MessageSeverity, StatusMessage};

    tracing::error!("No Bluetooth LE backend for this platform");
    drop(commands);
    let _ = events.send(AppEvent::LogMessage(StatusMessage::new(
        "No Bluetooth LE backend is available on this platform",
        MessageSeverity::Error,
    )));
    Ok(())
}
