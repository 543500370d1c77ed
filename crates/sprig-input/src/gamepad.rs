//! Gamepad input through gilrs.
//!
//! [`Gamepads`] owns the gilrs context and follows a single active pad. The
//! runner polls it once per loop iteration; button edges land in a
//! [`GamepadState`] that behaves like the keyboard's key map.

use gilrs::{Axis, Button, EventType, GamepadId, Gilrs};
use hashbrown::HashMap;
use tracing::{info, trace, warn};
use winit::event::WindowEvent;

use crate::button_state::ButtonState;

/// Buttons and axes of the active pad.
#[derive(Debug, Default)]
pub struct GamepadState {
    buttons: HashMap<Button, ButtonState>,
    axes: HashMap<Axis, f32>,
}

impl GamepadState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a transition of `button`.
    pub fn record_button(&mut self, button: Button, pressed: bool) {
        let state = self.buttons.entry(button).or_default();
        if pressed {
            state.press();
        } else {
            state.release();
        }
        trace!(?button, pressed, "gamepad button");
    }

    /// Record a new `axis` position, clamped to `-1.0..=1.0`. Non-finite
    /// values read as centered.
    pub fn record_axis(&mut self, axis: Axis, value: f32) {
        let value = if value.is_finite() {
            value.clamp(-1.0, 1.0)
        } else {
            0.0
        };
        self.axes.insert(axis, value);
    }

    /// Apply one gilrs event. Returns `true` if it changed a button or axis.
    pub fn apply(&mut self, event: &EventType) -> bool {
        match *event {
            EventType::ButtonPressed(button, _) => {
                self.record_button(button, true);
                true
            }
            EventType::ButtonReleased(button, _) => {
                self.record_button(button, false);
                true
            }
            EventType::AxisChanged(axis, value, _) => {
                self.record_axis(axis, value);
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn is_pressed(&self, button: Button) -> bool {
        self.buttons.get(&button).is_some_and(|s| s.is_pressed())
    }

    #[must_use]
    pub fn is_just_pressed(&self, button: Button) -> bool {
        self.buttons.get(&button).is_some_and(|s| s.is_just_pressed())
    }

    #[must_use]
    pub fn is_just_released(&self, button: Button) -> bool {
        self.buttons.get(&button).is_some_and(|s| s.is_just_released())
    }

    /// Last reported position of `axis`, `0.0` if it never moved.
    #[must_use]
    pub fn axis(&self, axis: Axis) -> f32 {
        self.axes.get(&axis).copied().unwrap_or(0.0)
    }

    /// Drop this frame's edges.
    pub fn end_frame(&mut self) {
        for state in self.buttons.values_mut() {
            state.end_frame();
        }
    }

    /// Release every held button and center every axis.
    pub fn release_all(&mut self) {
        for state in self.buttons.values_mut() {
            state.release();
        }
        self.axes.clear();
    }
}

/// The gilrs context plus the pad currently driving input.
///
/// A context that failed to start is kept as disabled: polling does nothing
/// and every button reads as released.
pub struct Gamepads {
    gilrs: Option<Gilrs>,
    active: Option<GamepadId>,
    state: GamepadState,
}

impl Gamepads {
    /// Start gilrs without opening a pad.
    pub fn new() -> Result<Self, gilrs::Error> {
        let gilrs = Gilrs::new()?;
        Ok(Self {
            gilrs: Some(gilrs),
            active: None,
            state: GamepadState::new(),
        })
    }

    /// A context that never reports input.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            gilrs: None,
            active: None,
            state: GamepadState::new(),
        }
    }

    /// Start gilrs, falling back to [`Gamepads::disabled`] on failure.
    pub fn new_or_disabled() -> Self {
        match Self::new() {
            Ok(gamepads) => gamepads,
            Err(e) => {
                warn!("Gamepad support unavailable: {e}");
                Self::disabled()
            }
        }
    }

    /// Make the first connected pad the active one.
    pub fn open_first(&mut self) -> Option<GamepadId> {
        let gilrs = self.gilrs.as_ref()?;
        let (id, gamepad) = gilrs.gamepads().find(|(_, pad)| pad.is_connected())?;
        info!("Controller Id: {}, Name: {}", usize::from(id), gamepad.name());
        self.active = Some(id);
        Some(id)
    }

    /// Drain pending gilrs events into the active pad's state.
    ///
    /// A newly connected pad becomes active when none is. Losing the active
    /// pad releases its buttons and switches to the next connected one.
    pub fn poll(&mut self) {
        let Some(gilrs) = self.gilrs.as_mut() else {
            return;
        };

        let mut lost_active = false;
        while let Some(event) = gilrs.next_event() {
            match event.event {
                EventType::Connected if self.active.is_none() => {
                    info!("Controller {} connected", usize::from(event.id));
                    self.active = Some(event.id);
                }
                EventType::Disconnected if self.active == Some(event.id) => {
                    info!("Controller {} disconnected", usize::from(event.id));
                    self.active = None;
                    self.state.release_all();
                    lost_active = true;
                }
                ref other if self.active == Some(event.id) => {
                    self.state.apply(other);
                }
                _ => {}
            }
        }

        if lost_active && self.active.is_none() {
            self.open_first();
        }
    }

    /// Feed a window event. Losing focus releases every button.
    pub fn process_window_event(&mut self, event: &WindowEvent) -> bool {
        if matches!(event, WindowEvent::Focused(false)) {
            self.state.release_all();
        }
        false
    }

    #[must_use]
    pub const fn state(&self) -> &GamepadState {
        &self.state
    }

    #[must_use]
    pub const fn active(&self) -> Option<GamepadId> {
        self.active
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.gilrs.is_some()
    }

    pub fn end_frame(&mut self) {
        self.state.end_frame();
    }

    /// Close the active pad and stop gilrs.
    pub fn shutdown(&mut self) {
        self.state.release_all();
        if let Some(id) = self.active.take() {
            info!("Controller {} closed", usize::from(id));
        }
        self.gilrs = None;
    }
}

impl Default for Gamepads {
    fn default() -> Self {
        Self::disabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_edges_last_one_frame() {
        let mut pad = GamepadState::new();
        assert!(!pad.is_pressed(Button::DPadLeft));

        pad.record_button(Button::DPadLeft, true);
        assert!(pad.is_pressed(Button::DPadLeft));
        assert!(pad.is_just_pressed(Button::DPadLeft));

        pad.end_frame();
        assert!(pad.is_pressed(Button::DPadLeft));
        assert!(!pad.is_just_pressed(Button::DPadLeft));

        pad.record_button(Button::DPadLeft, false);
        assert!(!pad.is_pressed(Button::DPadLeft));
        assert!(pad.is_just_released(Button::DPadLeft));

        pad.end_frame();
        assert!(!pad.is_just_released(Button::DPadLeft));
    }

    #[test]
    fn tap_within_one_frame_reports_both_edges() {
        let mut pad = GamepadState::new();
        pad.record_button(Button::South, true);
        pad.record_button(Button::South, false);
        assert!(!pad.is_pressed(Button::South));
        assert!(pad.is_just_pressed(Button::South));
        assert!(pad.is_just_released(Button::South));
    }

    #[test]
    fn axes_are_clamped_and_centered_by_default() {
        let mut pad = GamepadState::new();
        assert_eq!(pad.axis(Axis::LeftStickX), 0.0);

        pad.record_axis(Axis::LeftStickX, -3.0);
        assert_eq!(pad.axis(Axis::LeftStickX), -1.0);
        pad.record_axis(Axis::LeftStickY, f32::NAN);
        assert_eq!(pad.axis(Axis::LeftStickY), 0.0);
        pad.record_axis(Axis::LeftStickY, 0.25);
        assert_eq!(pad.axis(Axis::LeftStickY), 0.25);
    }

    #[test]
    fn release_all_drops_held_buttons_and_axes() {
        let mut pad = GamepadState::new();
        pad.record_button(Button::DPadDown, true);
        pad.record_axis(Axis::LeftStickX, 0.5);
        pad.end_frame();

        pad.release_all();
        assert!(!pad.is_pressed(Button::DPadDown));
        assert!(pad.is_just_released(Button::DPadDown));
        assert_eq!(pad.axis(Axis::LeftStickX), 0.0);
    }

    #[test]
    fn disabled_context_is_inert() {
        let mut gamepads = Gamepads::disabled();
        assert!(!gamepads.is_enabled());
        assert_eq!(gamepads.open_first(), None);

        gamepads.poll();
        gamepads.end_frame();
        assert_eq!(gamepads.active(), None);
        assert!(!gamepads.state().is_pressed(Button::South));

        gamepads.shutdown();
        assert!(!gamepads.is_enabled());
    }

    #[test]
    fn focus_loss_releases_gamepad_buttons() {
        let mut gamepads = Gamepads::disabled();
        gamepads.state.record_button(Button::DPadLeft, true);

        assert!(!gamepads.process_window_event(&WindowEvent::Focused(false)));
        assert!(!gamepads.state().is_pressed(Button::DPadLeft));
        assert!(gamepads.state().is_just_released(Button::DPadLeft));

        assert!(!gamepads.process_window_event(&WindowEvent::Focused(true)));
    }
}
