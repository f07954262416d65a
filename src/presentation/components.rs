use crate::domain::models::MouseButton;
use eframe::egui;

pub struct Components;

impl Components {
    pub fn status_banner(
        ui: &mut egui::Ui,
        text: &str,
        bg_color: egui::Color32,
        text_color: egui::Color32,
    ) {
        ui.add_sized(
            [ui.available_width(), 35.0],
            egui::Label::new(
                egui::RichText::new(text)
                    .color(text_color)
                    .background_color(bg_color)
                    .size(16.0)
                    .strong(),
            )
            .wrap_mode(egui::TextWrapMode::Truncate),
        );
    }
}

/// Mouse button that reports press on pointer-down and release on pointer-up.
pub struct HoldButton {
    button: MouseButton,
    pressed: bool,
}

impl HoldButton {
    pub fn new(button: MouseButton) -> Self {
        Self {
            button,
            pressed: false,
        }
    }

    pub fn button(&self) -> MouseButton {
        self.button
    }

    fn label(&self) -> &'static str {
        match self.button {
            MouseButton::Left => "L",
            MouseButton::Middle => "M",
            MouseButton::Right => "R",
        }
    }

    /// Edge detection: `Some(state)` only when the held state flips.
    pub fn update(&mut self, down: bool) -> Option<bool> {
        if down == self.pressed {
            return None;
        }
        self.pressed = down;
        Some(down)
    }

    pub fn show(&mut self, ui: &mut egui::Ui, size: egui::Vec2) -> Option<bool> {
        let (rect, response) = ui.allocate_exact_size(size, egui::Sense::click_and_drag());
        let edge = self.update(response.is_pointer_button_down_on());

        let (fill, text) = if self.pressed {
            (egui::Color32::BLACK, egui::Color32::WHITE)
        } else {
            (egui::Color32::WHITE, egui::Color32::BLACK)
        };
        let stroke = ui.style().visuals.widgets.noninteractive.bg_stroke;
        let painter = ui.painter();
        painter.rect(rect, 8.0, fill, stroke);
        painter.text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            self.label(),
            egui::FontId::proportional(size.y.min(size.x) * 0.4),
            text,
        );

        edge
    }
}
