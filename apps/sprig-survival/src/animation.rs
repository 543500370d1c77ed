//! Sprite-frame animation for the player character.

/// Which way the character faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    Front,
    Left,
}

/// What the character is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Idle,
    Walk,
}

/// A looping sequence of atlas indices played over `duration` seconds.
#[derive(Debug, PartialEq)]
pub struct SpriteAnimation {
    pub duration: f64,
    pub frames: &'static [u32],
}

/// Seconds each walk or idle frame stays on screen.
const FRAME_TIME: f64 = 1.0 / 3.75;

pub const IDLE_FRONT: SpriteAnimation = SpriteAnimation {
    duration: FRAME_TIME * 2.0,
    frames: &[3, 4],
};

pub const IDLE_LEFT: SpriteAnimation = SpriteAnimation {
    duration: 1.0,
    frames: &[5],
};

pub const WALK_LEFT: SpriteAnimation = SpriteAnimation {
    duration: FRAME_TIME * 7.0,
    frames: &[6, 7, 8, 9, 8, 7, 10],
};

pub const WALK_FRONT: SpriteAnimation = SpriteAnimation {
    duration: FRAME_TIME * 8.0,
    frames: &[11, 12, 13, 14, 15, 14, 13, 12],
};

/// Clip for a facing and motion.
pub const fn clip(facing: Facing, motion: Motion) -> &'static SpriteAnimation {
    match (facing, motion) {
        (Facing::Front, Motion::Idle) => &IDLE_FRONT,
        (Facing::Left, Motion::Idle) => &IDLE_LEFT,
        (Facing::Front, Motion::Walk) => &WALK_FRONT,
        (Facing::Left, Motion::Walk) => &WALK_LEFT,
    }
}

impl SpriteAnimation {
    /// Frame slot shown `seek` seconds into the clip.
    pub fn frame_at(&self, seek: f64) -> usize {
        let last = self.frames.len().saturating_sub(1);
        if self.duration <= 0.0 {
            return 0;
        }
        let slot = (seek / self.duration * self.frames.len() as f64).floor();
        (slot.max(0.0) as usize).min(last)
    }
}

/// Playback position within the current clip.
#[derive(Debug)]
pub struct AnimationState {
    facing: Facing,
    motion: Motion,
    seek: f64,
    frame: usize,
    anim: &'static SpriteAnimation,
}

impl AnimationState {
    pub fn new(facing: Facing, motion: Motion) -> Self {
        Self {
            facing,
            motion,
            seek: 0.0,
            frame: 0,
            anim: clip(facing, motion),
        }
    }

    /// Switch clips, restarting playback only if the clip changes.
    pub fn set(&mut self, facing: Facing, motion: Motion) {
        if (facing, motion) == (self.facing, self.motion) {
            return;
        }
        self.facing = facing;
        self.motion = motion;
        self.anim = clip(facing, motion);
        self.seek = 0.0;
        self.frame = 0;
    }

    /// Advance by `dt` seconds and return the atlas index to show.
    pub fn animate(&mut self, dt: f64) -> u32 {
        if self.anim.duration > 0.0 {
            self.seek = (self.seek + dt).rem_euclid(self.anim.duration);
        }
        self.frame = self.anim.frame_at(self.seek);
        self.texture_index()
    }

    /// Atlas index of the current frame.
    pub fn texture_index(&self) -> u32 {
        self.anim.frames.get(self.frame).copied().unwrap_or_default()
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn motion(&self) -> Motion {
        self.motion
    }

    pub fn seek(&self) -> f64 {
        self.seek
    }
}

impl Default for AnimationState {
    fn default() -> Self {
        Self::new(Facing::Left, Motion::Walk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn starts_walking_left() {
        let state = AnimationState::default();
        assert_eq!(state.facing(), Facing::Left);
        assert_eq!(state.motion(), Motion::Walk);
        assert_eq!(state.texture_index(), 6);
    }

    #[test]
    fn frames_advance_with_time() {
        let mut state = AnimationState::new(Facing::Front, Motion::Walk);
        assert_eq!(state.animate(0.0), 11);
        // Half a frame in still shows the first frame.
        assert_eq!(state.animate(FRAME_TIME * 0.5), 11);
        assert_eq!(state.animate(FRAME_TIME), 12);
        assert_eq!(state.animate(FRAME_TIME), 13);
    }

    #[test]
    fn seek_wraps_at_duration() {
        let mut state = AnimationState::new(Facing::Front, Motion::Idle);
        state.animate(IDLE_FRONT.duration + FRAME_TIME * 0.25);
        assert_relative_eq!(state.seek(), FRAME_TIME * 0.25, epsilon = 1e-9);
        assert_eq!(state.texture_index(), 3);
    }

    #[test]
    fn single_frame_clip_holds() {
        let mut state = AnimationState::new(Facing::Left, Motion::Idle);
        for _ in 0..10 {
            assert_eq!(state.animate(0.37), 5);
        }
    }

    #[test]
    fn frame_index_is_clamped() {
        assert_eq!(WALK_LEFT.frame_at(WALK_LEFT.duration), 6);
        assert_eq!(WALK_LEFT.frame_at(-1.0), 0);
    }

    #[test]
    fn switching_clip_restarts_playback() {
        let mut state = AnimationState::default();
        state.animate(FRAME_TIME * 2.5);
        assert_eq!(state.texture_index(), 8);

        // Same clip keeps its position.
        state.set(Facing::Left, Motion::Walk);
        assert_eq!(state.texture_index(), 8);

        state.set(Facing::Front, Motion::Idle);
        assert_eq!(state.texture_index(), 3);
        assert_relative_eq!(state.seek(), 0.0);
    }

    #[test]
    fn every_clip_fits_the_atlas() {
        for clip in [&IDLE_FRONT, &IDLE_LEFT, &WALK_LEFT, &WALK_FRONT] {
            assert!(!clip.frames.is_empty());
            assert!(clip.frames.iter().all(|&f| f < 16));
        }
    }
}
