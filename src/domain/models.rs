use serde::{Deserialize, Serialize};

/// Normalized joystick position. The origin is the widget center and both
/// components lie in `[-0.5, 0.5]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// Half-extent of the normalized joystick area
    pub const LIMIT: f64 = 0.5;

    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: x.clamp(-Self::LIMIT, Self::LIMIT),
            y: y.clamp(-Self::LIMIT, Self::LIMIT),
        }
    }
}

/// One sample from the pointer source. `None` means released / centered.
pub type InputSample = Option<Position>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

/// Current state of the three virtual mouse buttons
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonState {
    pub left: bool,
    pub middle: bool,
    pub right: bool,
}

impl ButtonState {
    pub fn set(&mut self, button: MouseButton, pressed: bool) {
        match button {
            MouseButton::Left => self.left = pressed,
            MouseButton::Middle => self.middle = pressed,
            MouseButton::Right => self.right = pressed,
        }
    }
}

/// Motion protocol spoken to the peripheral. Fixed for the lifetime of a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionMode {
    /// Velocity vector written on every position change
    Velocity,
    /// Relative displacement written on a fixed timer
    SampledDelta,
}

/// Logical command channel, one GATT characteristic each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    MoveDelta,
    Velocity,
    Buttons,
}

impl MotionMode {
    pub fn channel(&self) -> ChannelKind {
        match self {
            MotionMode::Velocity => ChannelKind::Velocity,
            MotionMode::SampledDelta => ChannelKind::MoveDelta,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Connect,
    Disconnect,
}

/// Requests sent from the UI to the driver task
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriverCommand {
    Scan,
    Disconnect,
    Move(InputSample),
    Button(MouseButton, bool),
}

/// Notifications sent from the driver task to the UI
#[derive(Debug, Clone)]
pub enum AppEvent {
    ConnectionStatus(ConnectionStatus),
    LogMessage(StatusMessage),
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub message: String,
    pub severity: MessageSeverity,
}

impl StatusMessage {
    pub fn new(message: impl Into<String>, severity: MessageSeverity) -> Self {
        Self {
            message: message.into(),
            severity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSeverity {
    Info,
    Success,
    Warning,
    Error,
}
