//! Change tracking for GPU-mirrored state.

use crate::error::{Error, Result};
use crate::limits::MAX_FRAMES_IN_FLIGHT;

/// One dirty bit per frame in flight.
///
/// Marking sets every frame's bit; each frame clears its own bit when it
/// uploads, so a change reaches every per-frame copy exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDirtyFlags {
    bits: u32,
    frames: u32,
}

impl FrameDirtyFlags {
    /// Track `frames` frames in flight, all initially dirty.
    ///
    /// `frames` must be in `1..=32`, one bit per frame.
    pub fn new(frames: usize) -> Result<Self> {
        if frames == 0 || frames > MAX_FRAMES_IN_FLIGHT {
            return Err(Error::OutOfBounds(format!(
                "{frames} frames in flight, expected 1..={MAX_FRAMES_IN_FLIGHT}"
            )));
        }
        let mut flags = Self {
            bits: 0,
            frames: frames as u32,
        };
        flags.mark_all();
        Ok(flags)
    }

    /// Flag every frame as needing an upload.
    pub fn mark_all(&mut self) {
        self.bits = if self.frames == 32 {
            u32::MAX
        } else {
            (1 << self.frames) - 1
        };
    }

    /// Returns whether `frame` was dirty and clears its bit.
    pub fn take(&mut self, frame: usize) -> bool {
        let Some(mask) = self.mask(frame) else {
            return false;
        };
        let was_dirty = self.bits & mask != 0;
        self.bits &= !mask;
        was_dirty
    }

    #[must_use]
    pub fn is_dirty(&self, frame: usize) -> bool {
        self.mask(frame).is_some_and(|mask| self.bits & mask != 0)
    }

    #[must_use]
    pub const fn any(&self) -> bool {
        self.bits != 0
    }

    #[must_use]
    pub const fn frames(&self) -> u32 {
        self.frames
    }

    fn mask(&self, frame: usize) -> Option<u32> {
        (frame < self.frames as usize).then(|| 1 << frame)
    }
}

/// A single dirty bit, for state shared by all frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirtyFlag(bool);

impl DirtyFlag {
    #[must_use]
    pub const fn dirty() -> Self {
        Self(true)
    }

    pub fn mark(&mut self) {
        self.0 = true;
    }

    /// Returns whether the flag was set and clears it.
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.0)
    }

    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_flags_start_dirty() {
        let flags = FrameDirtyFlags::new(2).unwrap();
        assert!(flags.is_dirty(0));
        assert!(flags.is_dirty(1));
        assert!(!flags.is_dirty(2));
    }

    #[test]
    fn take_clears_only_that_frame() {
        let mut flags = FrameDirtyFlags::new(3).unwrap();
        assert!(flags.take(1));
        assert!(!flags.take(1));
        assert!(flags.is_dirty(0));
        assert!(flags.is_dirty(2));
    }

    #[test]
    fn mark_all_after_clearing() {
        let mut flags = FrameDirtyFlags::new(2).unwrap();
        flags.take(0);
        flags.take(1);
        assert!(!flags.any());
        flags.mark_all();
        assert!(flags.is_dirty(0) && flags.is_dirty(1));
    }

    #[test]
    fn full_width_mask() {
        let mut flags = FrameDirtyFlags::new(32).unwrap();
        assert!(flags.take(31));
        assert!(flags.is_dirty(0));
    }

    #[test]
    fn out_of_range_frame_is_clean() {
        let mut flags = FrameDirtyFlags::new(2).unwrap();
        assert!(!flags.take(5));
    }

    #[test]
    fn frame_count_outside_the_mask_is_rejected() {
        assert!(matches!(FrameDirtyFlags::new(0), Err(Error::OutOfBounds(_))));
        assert!(matches!(FrameDirtyFlags::new(33), Err(Error::OutOfBounds(_))));
        assert!(matches!(
            FrameDirtyFlags::new(usize::MAX),
            Err(Error::OutOfBounds(_))
        ));
        assert_eq!(FrameDirtyFlags::new(1).unwrap().frames(), 1);
    }

    #[test]
    fn single_flag() {
        let mut flag = DirtyFlag::dirty();
        assert!(flag.take());
        assert!(!flag.take());
        flag.mark();
        assert!(flag.is_dirty());
    }
}
