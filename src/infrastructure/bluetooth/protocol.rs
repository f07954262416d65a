//! Simple Mouse Link Protocol
//!
//! GATT layout of the peripheral and the binary encoding of every command.
//! All functions here are pure.
//!
//! # Characteristics
//!
//! ```text
//! Move XY      [dx: i8, dy: i8]                      relative displacement
//! Velocity XY  [vx: i16 LE, vy: i16 LE]              persists until next write
//! Buttons      [bits: u8]  bit0 left, bit1 right, bit2 middle
//! ```

use anyhow::Result;

/// Simple Mouse Link service UUID
pub const SERVICE_UUID: &str = "56beb2d8-64eb-4e33-96d4-e3f394041d0b";

/// Relative move characteristic (2 bytes)
pub const MOVE_XY_CHAR_UUID: &str = "83986548-8703-4272-a124-84abb9d03217";

/// Velocity characteristic (4 bytes)
pub const VELOCITY_XY_CHAR_UUID: &str = "3cabb56e-27a7-45fa-996a-582f581d6aa3";

/// Button bitmask characteristic (1 byte)
pub const BUTTONS_CHAR_UUID: &str = "5062c9c1-ca09-47f9-84f6-725ef8091bf9";

/// Name the peripheral advertises
pub const DEVICE_NAME: &str = "Simple Mouse Link";

/// Largest magnitude of a single move component
pub const MOVE_LIMIT: f64 = 127.0;

pub const BUTTON_LEFT: u8 = 1 << 0;
pub const BUTTON_RIGHT: u8 = 1 << 1;
pub const BUTTON_MIDDLE: u8 = 1 << 2;

/// Round to the nearest integer, then clamp to the i8 move range.
fn cap_move(value: f64) -> i8 {
    value.round().clamp(-MOVE_LIMIT, MOVE_LIMIT) as i8
}

/// Encode a relative move.
///
/// Returns `None` when both components round to zero: such a move must not
/// be written at all.
pub fn encode_move_delta(dx: f64, dy: f64) -> Option<[u8; 2]> {
    let (x, y) = (cap_move(dx), cap_move(dy));
    if x == 0 && y == 0 {
        return None;
    }
    Some([x as u8, y as u8])
}

/// Encode a velocity. `(0, 0)` is a real command (stop) and is always encoded.
///
/// Values outside the i16 range saturate.
pub fn encode_velocity(vx: f64, vy: f64) -> [u8; 4] {
    let x = (vx.round() as i16).to_le_bytes();
    let y = (vy.round() as i16).to_le_bytes();
    [x[0], x[1], y[0], y[1]]
}

pub fn encode_buttons(left: bool, right: bool, middle: bool) -> u8 {
    let mut bits = 0;
    if left {
        bits |= BUTTON_LEFT;
    }
    if right {
        bits |= BUTTON_RIGHT;
    }
    if middle {
        bits |= BUTTON_MIDDLE;
    }
    bits
}

/// Parse a UUID string ("xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx") into its
/// 128-bit value.
pub fn parse_uuid(uuid_str: &str) -> Result<u128> {
    let hex = uuid_str.trim().replace('-', "");

    if hex.len() != 32 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(anyhow::anyhow!("Invalid UUID format: {}", uuid_str));
    }

    Ok(u128::from_str_radix(&hex, 16)?)
}

/// Format a 128-bit UUID in canonical hyphenated lower-case form.
pub fn format_uuid(uuid: u128) -> String {
    format!(
        "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
        (uuid >> 96) as u32,
        (uuid >> 80) as u16,
        (uuid >> 64) as u16,
        (uuid >> 48) as u16,
        uuid & 0xffff_ffff_ffff
    )
}
