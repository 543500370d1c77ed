//! Modifier key flags.

use bitflags::bitflags;
use winit::keyboard::ModifiersState;

bitflags! {
    /// Held modifier keys.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const ALT   = 0b0000_0001;
        const CTRL  = 0b0000_0010;
        const SHIFT = 0b0000_0100;
        /// Windows / Command / Super key.
        const META  = 0b0000_1000;
    }
}

impl Modifiers {
    #[inline]
    #[must_use]
    pub const fn alt(self) -> bool {
        self.contains(Self::ALT)
    }

    #[inline]
    #[must_use]
    pub const fn ctrl(self) -> bool {
        self.contains(Self::CTRL)
    }

    #[inline]
    #[must_use]
    pub const fn shift(self) -> bool {
        self.contains(Self::SHIFT)
    }

    #[inline]
    #[must_use]
    pub const fn meta(self) -> bool {
        self.contains(Self::META)
    }
}

impl From<ModifiersState> for Modifiers {
    fn from(state: ModifiersState) -> Self {
        let mut modifiers = Self::empty();
        modifiers.set(Self::ALT, state.alt_key());
        modifiers.set(Self::CTRL, state.control_key());
        modifiers.set(Self::SHIFT, state.shift_key());
        modifiers.set(Self::META, state.super_key());
        modifiers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_winit_state() {
        let mods = Modifiers::from(ModifiersState::SHIFT | ModifiersState::SUPER);
        assert!(mods.shift());
        assert!(mods.meta());
        assert!(!mods.alt());
        assert!(!mods.ctrl());
    }

    #[test]
    fn empty_state_has_no_flags() {
        assert_eq!(Modifiers::from(ModifiersState::empty()), Modifiers::empty());
    }
}
