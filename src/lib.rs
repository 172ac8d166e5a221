//! Polled gamepad input for real-time applications.
//!
//! Discovers evdev gamepads under `/dev/input`, normalizes their button,
//! axis and hat streams into dense 0-based indices, and exposes per-frame
//! polled state. The embedding application calls [`Gamepads::update`] once
//! per frame; there are no threads and no blocking I/O.
//!
//! Buttons and axes are reported raw; mapping them onto a common logical
//! layout is left to an external table keyed by [`Gamepad::sdl_id`].

mod config;
mod error;
mod gamepad;
mod sdl_id;

pub use config::{Config, DEFAULT_DEVICE_DIR};
pub use error::{Error, Result};
pub use gamepad::{Gamepad, Gamepads, HAT_CENTERED, HAT_DOWN, HAT_LEFT, HAT_RIGHT, HAT_UP};
pub use sdl_id::sdl_gamepad_id;
