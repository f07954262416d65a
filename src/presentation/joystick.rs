//! Square touch area that turns a dragged pointer into normalized positions.

use crate::domain::models::{InputSample, Position};
use eframe::egui;

/// Map a pointer inside `rect` to a position relative to its center,
/// scaled so the edges sit at +/-0.5. Screen y grows downward.
pub fn normalize(pointer: egui::Pos2, rect: egui::Rect) -> Position {
    let center = rect.center();
    Position::new(
        f64::from((pointer.x - center.x) / rect.width()),
        f64::from((pointer.y - center.y) / rect.height()),
    )
}

#[derive(Default)]
pub struct Joystick {
    current: InputSample,
}

impl Joystick {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest pointer state. Returns the new sample when it differs
    /// from the previous one.
    pub fn update(&mut self, sample: InputSample) -> Option<InputSample> {
        if sample == self.current {
            return None;
        }
        self.current = sample;
        Some(sample)
    }

    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        side: f32,
        accent: egui::Color32,
    ) -> Option<InputSample> {
        let (rect, response) =
            ui.allocate_exact_size(egui::vec2(side, side), egui::Sense::drag());

        let sample = if response.is_pointer_button_down_on() {
            response
                .interact_pointer_pos()
                .map(|pointer| normalize(pointer, rect))
        } else {
            None
        };
        let changed = self.update(sample);

        let stroke = ui.style().visuals.widgets.noninteractive.bg_stroke;
        let painter = ui.painter_at(rect);
        painter.rect(rect, 8.0, egui::Color32::WHITE, stroke);
        painter.line_segment(
            [rect.center_top(), rect.center_bottom()],
            egui::Stroke::new(1.0, egui::Color32::LIGHT_GRAY),
        );
        painter.line_segment(
            [rect.left_center(), rect.right_center()],
            egui::Stroke::new(1.0, egui::Color32::LIGHT_GRAY),
        );

        let knob = match self.current {
            Some(pos) => {
                rect.center()
                    + egui::vec2(pos.x as f32 * rect.width(), pos.y as f32 * rect.height())
            }
            None => rect.center(),
        };
        painter.circle_filled(knob, side * 0.08, accent);

        changed
    }
}
