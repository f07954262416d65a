pub mod app;
pub mod components;
pub mod joystick;
pub mod theme;
