//! Keyboard and gamepad input for the Sprig engine.
//!
//! [`KeyboardState`] is fed window events by the runner and keeps per-key
//! [`ButtonState`]s, the current [`Modifiers`] and the most recent
//! [`KeyInput`]. [`Gamepads`] polls gilrs and tracks the active pad's
//! buttons in a [`GamepadState`].

mod button_state;
mod gamepad;
mod keyboard;
mod modifiers;

pub use button_state::ButtonState;
pub use gamepad::{GamepadState, Gamepads};
pub use keyboard::{KeyInput, KeyboardState};
pub use modifiers::Modifiers;

pub use gilrs::{Axis, Button};
pub use winit::event::WindowEvent;
pub use winit::keyboard::{KeyCode, KeyLocation};
