//! Input-to-command mapping.
//!
//! Turns the joystick stream and the button edges into motion and button
//! commands. The motion protocol is a [`MotionStrategy`] picked once at
//! construction; buttons are always event driven.

use crate::domain::models::{ButtonState, InputSample, MotionMode, MouseButton};
use crate::domain::settings::Settings;
use std::rc::Rc;
use std::time::Duration;
use tracing::trace;

/// Receiver of logical mouse commands. Implemented by the driver.
pub trait CommandSink {
    fn move_delta(&self, dx: f64, dy: f64);
    fn velocity(&self, vx: f64, vy: f64);
    fn buttons(&self, state: ButtonState);
}

impl<S: CommandSink + ?Sized> CommandSink for Rc<S> {
    fn move_delta(&self, dx: f64, dy: f64) {
        (**self).move_delta(dx, dy)
    }

    fn velocity(&self, vx: f64, vy: f64) {
        (**self).velocity(vx, vy)
    }

    fn buttons(&self, state: ButtonState) {
        (**self).buttons(state)
    }
}

pub trait MotionStrategy {
    /// Called for every pointer move notification.
    fn handle_position(&mut self, position: InputSample, sink: &dyn CommandSink);

    /// Called on every sampling tick. Only sampled strategies act on it.
    fn tick(&mut self, _sink: &dyn CommandSink) {}

    /// Tick period, `None` for purely event-driven strategies.
    fn sample_period(&self) -> Option<Duration> {
        None
    }

    fn mode(&self) -> MotionMode;
}

/// Writes a velocity on every position change and `(0, 0)` on release.
pub struct VelocityStrategy {
    gain: f64,
}

impl VelocityStrategy {
    pub fn new(gain: f64) -> Self {
        Self { gain }
    }
}

impl MotionStrategy for VelocityStrategy {
    fn handle_position(&mut self, position: InputSample, sink: &dyn CommandSink) {
        match position {
            Some(pos) => sink.velocity(pos.x * self.gain, pos.y * self.gain),
            None => sink.velocity(0.0, 0.0),
        }
    }

    fn mode(&self) -> MotionMode {
        MotionMode::Velocity
    }
}

/// Remembers the last position and writes a relative move once per tick.
pub struct SampledDeltaStrategy {
    gain: f64,
    period: Duration,
    last_position: InputSample,
}

impl SampledDeltaStrategy {
    pub fn new(gain: f64, period: Duration) -> Self {
        Self {
            gain,
            period,
            last_position: None,
        }
    }
}

impl MotionStrategy for SampledDeltaStrategy {
    fn handle_position(&mut self, position: InputSample, _sink: &dyn CommandSink) {
        self.last_position = position;
    }

    fn tick(&mut self, sink: &dyn CommandSink) {
        if let Some(pos) = self.last_position {
            sink.move_delta(pos.x * self.gain, pos.y * self.gain);
        }
    }

    fn sample_period(&self) -> Option<Duration> {
        Some(self.period)
    }

    fn mode(&self) -> MotionMode {
        MotionMode::SampledDelta
    }
}

/// Build the strategy selected in the settings.
pub fn strategy_from_settings(settings: &Settings) -> Box<dyn MotionStrategy> {
    match settings.motion_mode {
        MotionMode::Velocity => Box::new(VelocityStrategy::new(settings.velocity_gain)),
        MotionMode::SampledDelta => Box::new(SampledDeltaStrategy::new(
            settings.move_gain,
            // A zero period would make the ticker spin
            Duration::from_millis(settings.sample_period_ms.max(1)),
        )),
    }
}

pub struct InputMapper<S: CommandSink> {
    sink: S,
    strategy: Box<dyn MotionStrategy>,
    buttons: ButtonState,
}

impl<S: CommandSink> InputMapper<S> {
    pub fn new(sink: S, strategy: Box<dyn MotionStrategy>) -> Self {
        Self {
            sink,
            strategy,
            buttons: ButtonState::default(),
        }
    }

    pub fn handle_position(&mut self, position: InputSample) {
        trace!("Pointer moved: {:?}", position);
        self.strategy.handle_position(position, &self.sink);
    }

    /// Update one flag and write the whole bitmask, even when nothing changed.
    pub fn handle_button(&mut self, button: MouseButton, pressed: bool) {
        self.buttons.set(button, pressed);
        self.sink.buttons(self.buttons);
    }

    pub fn tick(&mut self) {
        self.strategy.tick(&self.sink);
    }

    pub fn sample_period(&self) -> Option<Duration> {
        self.strategy.sample_period()
    }

    pub fn mode(&self) -> MotionMode {
        self.strategy.mode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Position;
    use std::cell::RefCell;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Sent {
        Move(f64, f64),
        Velocity(f64, f64),
        Buttons(ButtonState),
    }

    #[derive(Default)]
    struct RecordingSink {
        sent: RefCell<Vec<Sent>>,
    }

    impl CommandSink for RecordingSink {
        fn move_delta(&self, dx: f64, dy: f64) {
            self.sent.borrow_mut().push(Sent::Move(dx, dy));
        }
        fn velocity(&self, vx: f64, vy: f64) {
            self.sent.borrow_mut().push(Sent::Velocity(vx, vy));
        }
        fn buttons(&self, state: ButtonState) {
            self.sent.borrow_mut().push(Sent::Buttons(state));
        }
    }

    fn mapper(strategy: Box<dyn MotionStrategy>) -> InputMapper<Rc<RecordingSink>> {
        InputMapper::new(Rc::new(RecordingSink::default()), strategy)
    }

    fn sent(mapper: &InputMapper<Rc<RecordingSink>>) -> Vec<Sent> {
        mapper.sink.sent.borrow().clone()
    }

    #[test]
    fn velocity_mode_writes_immediately_and_stops_on_release() {
        let mut m = mapper(Box::new(VelocityStrategy::new(2000.0)));

        m.handle_position(Some(Position::new(0.1, -0.2)));
        m.handle_position(None);

        let sent = sent(&m);
        assert_eq!(sent.len(), 2);
        match sent[0] {
            Sent::Velocity(vx, vy) => {
                assert!((vx - 200.0).abs() < 1e-9);
                assert!((vy + 400.0).abs() < 1e-9);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(sent[1], Sent::Velocity(0.0, 0.0));
    }

    #[test]
    fn velocity_mode_ignores_ticks() {
        let mut m = mapper(Box::new(VelocityStrategy::new(2000.0)));
        m.handle_position(Some(Position::new(0.2, 0.2)));
        m.tick();
        m.tick();
        assert_eq!(sent(&m).len(), 1);
        assert_eq!(m.sample_period(), None);
    }

    #[test]
    fn sampled_mode_only_writes_on_ticks() {
        let mut m = mapper(Box::new(SampledDeltaStrategy::new(
            100.0,
            Duration::from_millis(100),
        )));

        m.handle_position(Some(Position::new(0.05, 0.05)));
        assert!(sent(&m).is_empty());

        m.tick();
        m.tick();
        m.tick();

        let sent = sent(&m);
        assert_eq!(sent.len(), 3);
        for cmd in sent {
            match cmd {
                Sent::Move(dx, dy) => {
                    assert!((dx - 5.0).abs() < 1e-9);
                    assert!((dy - 5.0).abs() < 1e-9);
                }
                other => panic!("unexpected command: {other:?}"),
            }
        }
    }

    #[test]
    fn sampled_mode_is_silent_after_release() {
        let mut m = mapper(Box::new(SampledDeltaStrategy::new(
            100.0,
            Duration::from_millis(100),
        )));

        m.handle_position(Some(Position::new(0.3, 0.0)));
        m.tick();
        m.handle_position(None);
        m.tick();
        m.tick();

        assert_eq!(sent(&m).len(), 1);
        assert_eq!(m.sample_period(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn button_edges_write_the_full_state_each_time() {
        let mut m = mapper(Box::new(VelocityStrategy::new(2000.0)));

        m.handle_button(MouseButton::Left, true);
        m.handle_button(MouseButton::Left, false);

        let left = ButtonState {
            left: true,
            ..Default::default()
        };
        assert_eq!(
            sent(&m),
            vec![Sent::Buttons(left), Sent::Buttons(ButtonState::default())]
        );
    }

    #[test]
    fn repeated_press_is_still_written() {
        let mut m = mapper(Box::new(SampledDeltaStrategy::new(
            100.0,
            Duration::from_millis(100),
        )));

        m.handle_button(MouseButton::Right, true);
        m.handle_button(MouseButton::Right, true);

        assert_eq!(sent(&m).len(), 2);
        assert!(m.buttons.right);
    }

    #[test]
    fn strategy_follows_settings() {
        let mut settings = Settings::default();
        assert_eq!(strategy_from_settings(&settings).mode(), MotionMode::Velocity);

        settings.motion_mode = MotionMode::SampledDelta;
        settings.sample_period_ms = 0;
        let strategy = strategy_from_settings(&settings);
        assert_eq!(strategy.mode(), MotionMode::SampledDelta);
        assert_eq!(strategy.sample_period(), Some(Duration::from_millis(1)));
    }
}
