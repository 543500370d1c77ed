//! Per-key press tracking.

/// Held state of a key plus the edges seen since the last frame.
///
/// Edges are counted rather than stored as a single state so a tap that
/// both presses and releases within one frame still reports both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonState {
    down: bool,
    presses: u8,
    releases: u8,
}

impl ButtonState {
    #[inline]
    #[must_use]
    pub const fn is_pressed(self) -> bool {
        self.down
    }

    /// Returns `true` if the key went down at least once this frame.
    #[inline]
    #[must_use]
    pub const fn is_just_pressed(self) -> bool {
        self.presses > 0
    }

    /// Returns `true` if the key came up at least once this frame.
    #[inline]
    #[must_use]
    pub const fn is_just_released(self) -> bool {
        self.releases > 0
    }

    /// Number of down edges this frame.
    #[inline]
    #[must_use]
    pub const fn presses(self) -> u8 {
        self.presses
    }

    /// Record a down edge. Key repeat while held is ignored.
    #[inline]
    pub fn press(&mut self) {
        if !self.down {
            self.down = true;
            self.presses = self.presses.saturating_add(1);
        }
    }

    #[inline]
    pub fn release(&mut self) {
        if self.down {
            self.down = false;
            self.releases = self.releases.saturating_add(1);
        }
    }

    /// Forget this frame's edges, keeping the held state.
    #[inline]
    pub fn end_frame(&mut self) {
        self.presses = 0;
        self.releases = 0;
    }
}
