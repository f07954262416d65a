use crate::domain::models::{ConnectionStatus, MessageSeverity};
use eframe::egui;

pub struct Palette {
    pub bg: egui::Color32,
    pub fg: egui::Color32,
    pub stroke: egui::Color32,
    pub disconnected: egui::Color32,
    pub connecting: egui::Color32,
    pub connected: egui::Color32,
    pub warning: egui::Color32,
}

impl Palette {
    pub fn new() -> Self {
        Self {
            bg: egui::Color32::from_rgb(245, 245, 245),
            fg: egui::Color32::BLACK,
            stroke: egui::Color32::BLACK,
            disconnected: egui::Color32::from_rgb(230, 40, 40),
            connecting: egui::Color32::from_rgb(40, 90, 240),
            connected: egui::Color32::from_rgb(20, 190, 80),
            warning: egui::Color32::from_rgb(255, 200, 0),
        }
    }

    /// Ring color of the connect button. `Connecting` pulses once per second.
    pub fn connection_color(&self, status: ConnectionStatus, time: f64) -> egui::Color32 {
        match status {
            ConnectionStatus::Disconnected => self.disconnected,
            ConnectionStatus::Connected => self.connected,
            ConnectionStatus::Connecting => {
                let phase = (time * std::f64::consts::TAU).sin() * 0.5 + 0.5;
                self.connecting.gamma_multiply(0.35 + 0.65 * phase as f32)
            }
        }
    }

    pub fn severity_color(&self, severity: MessageSeverity) -> egui::Color32 {
        match severity {
            MessageSeverity::Info => self.connecting,
            MessageSeverity::Success => self.connected,
            MessageSeverity::Warning => self.warning,
            MessageSeverity::Error => self.disconnected,
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new()
    }
}

pub fn configure_style(ctx: &egui::Context) {
    let mut style = (*ctx.style()).clone();
    let palette = Palette::new();

    style
        .text_styles
        .iter_mut()
        .for_each(|(text_style, font_id)| {
            font_id.size = match text_style {
                egui::TextStyle::Heading => 28.0,
                egui::TextStyle::Body => 16.0,
                egui::TextStyle::Button => 18.0,
                _ => font_id.size,
            };
        });

    style.spacing.item_spacing = egui::vec2(12.0, 12.0);

    style.visuals.widgets.noninteractive.bg_stroke = egui::Stroke::new(2.0, palette.stroke);
    style.visuals.widgets.noninteractive.fg_stroke = egui::Stroke::new(1.0, palette.fg);
    style.visuals.widgets.noninteractive.bg_fill = palette.bg;
    style.visuals.widgets.inactive.bg_fill = egui::Color32::WHITE;
    style.visuals.widgets.inactive.fg_stroke = egui::Stroke::new(1.0, palette.fg);

    style.visuals.panel_fill = palette.bg;
    style.visuals.override_text_color = Some(palette.fg);

    ctx.set_style(style);
}
