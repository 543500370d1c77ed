//! Keyboard input state tracking.

use hashbrown::HashMap;
use tracing::trace;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::keyboard::{KeyCode, KeyLocation, PhysicalKey};

use crate::button_state::ButtonState;
use crate::modifiers::Modifiers;

/// One decoded key transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub code: KeyCode,
    pub location: KeyLocation,
    pub pressed: bool,
    pub modifiers: Modifiers,
}

/// Keyboard input state.
#[derive(Debug, Default)]
pub struct KeyboardState {
    keys: HashMap<KeyCode, ButtonState>,
    modifiers: Modifiers,
    last: Option<KeyInput>,
}

impl KeyboardState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a window event. Returns `true` if it was keyboard input.
    pub fn process_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                self.process_key_event(event);
                true
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.set_modifiers(modifiers.state().into());
                true
            }
            WindowEvent::Focused(false) => {
                self.release_all();
                false
            }
            _ => false,
        }
    }

    /// Process a key event. Keys without a physical code are ignored.
    pub fn process_key_event(&mut self, event: &KeyEvent) {
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        self.record(code, event.location, event.state == ElementState::Pressed);
    }

    /// Record a transition of `code`.
    pub fn record(&mut self, code: KeyCode, location: KeyLocation, pressed: bool) {
        let state = self.keys.entry(code).or_default();
        if pressed {
            state.press();
        } else {
            state.release();
        }

        let input = KeyInput {
            code,
            location,
            pressed,
            modifiers: self.modifiers,
        };
        trace!(?input, "key");
        self.last = Some(input);
    }

    pub fn set_modifiers(&mut self, modifiers: Modifiers) {
        self.modifiers = modifiers;
    }

    #[must_use]
    pub fn is_pressed(&self, key: KeyCode) -> bool {
        self.keys.get(&key).is_some_and(|s| s.is_pressed())
    }

    #[must_use]
    pub fn is_just_pressed(&self, key: KeyCode) -> bool {
        self.keys.get(&key).is_some_and(|s| s.is_just_pressed())
    }

    #[must_use]
    pub fn is_just_released(&self, key: KeyCode) -> bool {
        self.keys.get(&key).is_some_and(|s| s.is_just_released())
    }

    #[must_use]
    pub const fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// The most recent key transition, if any.
    #[must_use]
    pub const fn last_input(&self) -> Option<KeyInput> {
        self.last
    }

    /// Called at end of frame to drop this frame's edges.
    pub fn end_frame(&mut self) {
        for state in self.keys.values_mut() {
            state.end_frame();
        }
    }

    /// Release every held key, e.g. when the window loses focus.
    pub fn release_all(&mut self) {
        for state in self.keys.values_mut() {
            state.release();
        }
        self.modifiers = Modifiers::empty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_hold_release() {
        let mut keyboard = KeyboardState::new();
        assert!(!keyboard.is_pressed(KeyCode::KeyA));

        keyboard.record(KeyCode::KeyA, KeyLocation::Standard, true);
        assert!(keyboard.is_pressed(KeyCode::KeyA));
        assert!(keyboard.is_just_pressed(KeyCode::KeyA));

        keyboard.end_frame();
        assert!(keyboard.is_pressed(KeyCode::KeyA));
        assert!(!keyboard.is_just_pressed(KeyCode::KeyA));

        keyboard.record(KeyCode::KeyA, KeyLocation::Standard, false);
        assert!(!keyboard.is_pressed(KeyCode::KeyA));
        assert!(keyboard.is_just_released(KeyCode::KeyA));
    }

    #[test]
    fn last_input_carries_location_and_modifiers() {
        let mut keyboard = KeyboardState::new();
        keyboard.set_modifiers(Modifiers::CTRL | Modifiers::ALT);
        keyboard.record(KeyCode::ShiftRight, KeyLocation::Right, true);

        let input = keyboard.last_input().unwrap();
        assert_eq!(input.code, KeyCode::ShiftRight);
        assert_eq!(input.location, KeyLocation::Right);
        assert!(input.pressed);
        assert!(input.modifiers.ctrl() && input.modifiers.alt());
        assert!(!input.modifiers.meta());
    }

    #[test]
    fn focus_loss_releases_everything() {
        let mut keyboard = KeyboardState::new();
        keyboard.set_modifiers(Modifiers::SHIFT);
        keyboard.record(KeyCode::ArrowLeft, KeyLocation::Standard, true);

        assert!(!keyboard.process_window_event(&WindowEvent::Focused(false)));
        assert!(!keyboard.is_pressed(KeyCode::ArrowLeft));
        assert!(keyboard.is_just_released(KeyCode::ArrowLeft));
        assert_eq!(keyboard.modifiers(), Modifiers::empty());
    }
}
