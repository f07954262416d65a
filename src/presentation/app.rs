use crate::domain::models::{
    AppEvent, ConnectionStatus, DriverCommand, MessageSeverity, MouseButton, StatusMessage,
};
use crate::infrastructure::logging::LoggingGuard;
use crate::presentation::components::{Components, HoldButton};
use crate::presentation::joystick::Joystick;
use crate::presentation::theme::{self, Palette};
use eframe::egui;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub struct RemoteMouseApp {
    // Driver
    pub(crate) driver_tx: mpsc::UnboundedSender<DriverCommand>,
    pub(crate) event_rx: mpsc::UnboundedReceiver<AppEvent>,

    // State
    pub(crate) connection_status: ConnectionStatus,
    pub(crate) status_message: Option<StatusMessage>,

    // Input widgets
    pub(crate) joystick: Joystick,
    pub(crate) buttons: [HoldButton; 3],

    pub(crate) palette: Palette,

    // Logging guard
    pub(crate) _logging_guard: Option<LoggingGuard>,
}

impl RemoteMouseApp {
    pub fn new(
        ctx: &egui::Context,
        driver_tx: mpsc::UnboundedSender<DriverCommand>,
        event_rx: mpsc::UnboundedReceiver<AppEvent>,
        logging_guard: Option<LoggingGuard>,
    ) -> Self {
        theme::configure_style(ctx);

        Self {
            driver_tx,
            event_rx,
            connection_status: ConnectionStatus::Disconnected,
            status_message: None,
            joystick: Joystick::new(),
            buttons: [
                HoldButton::new(MouseButton::Left),
                HoldButton::new(MouseButton::Middle),
                HoldButton::new(MouseButton::Right),
            ],
            palette: Palette::new(),
            _logging_guard: logging_guard,
        }
    }

    fn send(&mut self, command: DriverCommand) {
        if self.driver_tx.send(command).is_err() {
            warn!("Driver is not running, dropped {:?}", command);
            self.connection_status = ConnectionStatus::Disconnected;
            self.status_message = Some(StatusMessage::new(
                "Bluetooth driver is not running",
                MessageSeverity::Error,
            ));
        }
    }

    /// Connect button: disconnect when connected, scan when disconnected,
    /// ignore clicks while an attempt is in flight.
    pub(crate) fn toggle_connection(&mut self) {
        match self.connection_status {
            ConnectionStatus::Connected => self.send(DriverCommand::Disconnect),
            ConnectionStatus::Disconnected => {
                self.connection_status = ConnectionStatus::Connecting;
                self.send(DriverCommand::Scan);
            }
            ConnectionStatus::Connecting => debug!("Connection attempt already in progress"),
        }
    }

    pub(crate) fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::ConnectionStatus(status) => self.connection_status = status,
            AppEvent::LogMessage(message) => self.status_message = Some(message),
        }
    }

    fn render_connect_button(&mut self, ui: &mut egui::Ui) {
        let time = ui.input(|i| i.time);
        let ring = self.palette.connection_color(self.connection_status, time);
        let label = match self.connection_status {
            ConnectionStatus::Disconnected => "Connect",
            ConnectionStatus::Connecting => "Connecting...",
            ConnectionStatus::Connected => "Disconnect",
        };
        let button = egui::Button::new(egui::RichText::new(label).strong())
            .fill(egui::Color32::WHITE)
            .stroke(egui::Stroke::new(6.0, ring))
            .rounding(12.0)
            .min_size(egui::vec2(180.0, 60.0));

        if ui.add(button).clicked() {
            self.toggle_connection();
        }
    }

    fn render_status(&self, ui: &mut egui::Ui) {
        let (text, color) = match &self.status_message {
            Some(msg) => (msg.message.as_str(), self.palette.severity_color(msg.severity)),
            None => (
                "Press the button to connect",
                self.palette.connection_color(self.connection_status, 0.0),
            ),
        };
        Components::status_banner(ui, text, color, egui::Color32::WHITE);
    }

    fn render_controls(&mut self, ui: &mut egui::Ui) {
        let available = ui.available_size();
        let side = (available.x * 0.7).min(available.y).max(120.0);
        let button_size = egui::vec2(
            (available.x - side - 24.0).clamp(60.0, 140.0),
            (side - 24.0) / 3.0,
        );
        let accent = self.palette.connection_color(self.connection_status, 0.0);

        ui.horizontal(|ui| {
            if let Some(sample) = self.joystick.show(ui, side, accent) {
                self.send(DriverCommand::Move(sample));
            }

            ui.vertical(|ui| {
                let mut edges = Vec::new();
                for button in self.buttons.iter_mut() {
                    if let Some(pressed) = button.show(ui, button_size) {
                        edges.push(DriverCommand::Button(button.button(), pressed));
                    }
                }
                for command in edges {
                    self.send(command);
                }
            });
        });
    }
}

impl eframe::App for RemoteMouseApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        while let Ok(event) = self.event_rx.try_recv() {
            self.handle_event(event);
        }

        // Driver events arrive from another thread
        ctx.request_repaint_after(Duration::from_millis(30));

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.add_space(8.0);
            ui.vertical_centered(|ui| {
                self.render_connect_button(ui);
            });
            self.render_status(ui);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.render_controls(ui);
        });
    }
}
