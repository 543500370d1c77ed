//! Survival demo: a scrolling grassland backdrop with an animated viking.

use glam::Vec3;
use tracing::{info, warn};

use sprig_app::{EngineContext, SpriteApp};
use sprig_core::{assets, SpriteInstance};
use sprig_input::{Button, GamepadState, KeyCode, KeyboardState};

use crate::animation::{AnimationState, Facing, Motion};

/// Pixels covered by one world unit. The canvas is one unit across.
const PIXELS_PER_UNIT: f32 = 800.0;

/// Linear amplitude for the ambience loops.
const AMBIENCE_GAIN: f64 = 10.0;

/// Backdrop art size in pixels.
const BACKDROP_SIZE: (u32, u32) = (2632, 1721);

/// Character art size in pixels.
const CHARACTER_SIZE: (u32, u32) = (300, 450);

/// Atlas index of the backdrop.
const BACKDROP_TEXTURE: u32 = 0;

/// Atlas index shown before the first animation step.
const CHARACTER_TEXTURE: u32 = 4;

pub fn pixels_to_units(pixels: u32) -> f32 {
    pixels as f32 / PIXELS_PER_UNIT
}

/// Sprite scale for art of the given pixel size.
pub fn sprite_scale((width, height): (u32, u32)) -> Vec3 {
    Vec3::new(pixels_to_units(width), pixels_to_units(height), 1.0)
}

/// Clip the keyboard or gamepad asks for, or `None` to keep the current one.
pub fn requested_clip(
    keyboard: &KeyboardState,
    gamepad: &GamepadState,
    current: Facing,
) -> Option<(Facing, Motion)> {
    const LEFT: ([KeyCode; 2], Button) = ([KeyCode::ArrowLeft, KeyCode::KeyA], Button::DPadLeft);
    const FRONT: ([KeyCode; 2], Button) = ([KeyCode::ArrowDown, KeyCode::KeyS], Button::DPadDown);

    let held = |(keys, button): &([KeyCode; 2], Button)| {
        keys.iter().any(|&k| keyboard.is_pressed(k)) || gamepad.is_pressed(*button)
    };
    let released = |(keys, button): &([KeyCode; 2], Button)| {
        keys.iter().any(|&k| keyboard.is_just_released(k)) || gamepad.is_just_released(*button)
    };

    if held(&LEFT) {
        Some((Facing::Left, Motion::Walk))
    } else if held(&FRONT) {
        Some((Facing::Front, Motion::Walk))
    } else if released(&LEFT) || released(&FRONT) {
        Some((current, Motion::Idle))
    } else {
        None
    }
}

pub struct Survival {
    character: usize,
    animation: AnimationState,
}

impl SpriteApp for Survival {
    fn init(ctx: &mut EngineContext) -> anyhow::Result<Self> {
        ctx.camera.set_position(Vec3::new(0.0, 0.0, 1.0));
        ctx.camera.look_at(Vec3::ZERO);

        ctx.scene.push_instance(SpriteInstance::new(
            Vec3::ZERO,
            sprite_scale(BACKDROP_SIZE),
            BACKDROP_TEXTURE,
        ))?;
        let character = ctx.scene.push_instance(SpriteInstance::new(
            Vec3::ZERO,
            sprite_scale(CHARACTER_SIZE),
            CHARACTER_TEXTURE,
        ))?;

        for path in [assets::MUSIC_GRASSLAND, assets::SFX_GRASSLAND_FOOTSTEPS] {
            let started = ctx
                .audio
                .load(path)
                .and_then(|id| ctx.audio.play(id, true, AMBIENCE_GAIN));
            if let Err(e) = started {
                warn!("Skipping {path}: {e}");
            }
        }

        info!(
            "Scene ready with {} sprites, {} sounds",
            ctx.scene.instances().len(),
            ctx.audio.sound_count()
        );

        Ok(Self {
            character,
            animation: AnimationState::default(),
        })
    }

    fn on_render(&mut self, ctx: &mut EngineContext, dt: f32) -> anyhow::Result<()> {
        if let Some((facing, motion)) = requested_clip(
            &ctx.keyboard,
            ctx.gamepad.state(),
            self.animation.facing(),
        ) {
            self.animation.set(facing, motion);
        }

        let texture_index = self.animation.animate(f64::from(dt));
        ctx.scene
            .update_instance(self.character, |sprite| sprite.texture_index = texture_index)?;
        Ok(())
    }

    fn cleanup(&mut self, ctx: &mut EngineContext) {
        ctx.audio.stop_all();
        info!("Survival shutting down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sprig_input::KeyLocation;

    #[test]
    fn pixel_sizes_convert_to_units() {
        assert_relative_eq!(pixels_to_units(800), 1.0);
        let backdrop = sprite_scale(BACKDROP_SIZE);
        assert_relative_eq!(backdrop.x, 3.29);
        assert_relative_eq!(backdrop.y, 2.151_25);
        assert_relative_eq!(backdrop.z, 1.0);
        let character = sprite_scale(CHARACTER_SIZE);
        assert_relative_eq!(character.x, 0.375);
        assert_relative_eq!(character.y, 0.5625);
    }

    #[test]
    fn no_keys_keeps_the_clip() {
        let keyboard = KeyboardState::new();
        let gamepad = GamepadState::new();
        assert_eq!(requested_clip(&keyboard, &gamepad, Facing::Left), None);
    }

    #[test]
    fn held_keys_pick_walk_clips() {
        let mut keyboard = KeyboardState::new();
        let gamepad = GamepadState::new();
        keyboard.record(KeyCode::KeyS, KeyLocation::Standard, true);
        assert_eq!(
            requested_clip(&keyboard, &gamepad, Facing::Left),
            Some((Facing::Front, Motion::Walk))
        );

        keyboard.record(KeyCode::ArrowLeft, KeyLocation::Standard, true);
        assert_eq!(
            requested_clip(&keyboard, &gamepad, Facing::Front),
            Some((Facing::Left, Motion::Walk))
        );
    }

    #[test]
    fn releasing_goes_idle_in_place() {
        let mut keyboard = KeyboardState::new();
        let gamepad = GamepadState::new();
        keyboard.record(KeyCode::ArrowDown, KeyLocation::Standard, true);
        keyboard.end_frame();
        keyboard.record(KeyCode::ArrowDown, KeyLocation::Standard, false);
        assert_eq!(
            requested_clip(&keyboard, &gamepad, Facing::Front),
            Some((Facing::Front, Motion::Idle))
        );

        keyboard.end_frame();
        assert_eq!(requested_clip(&keyboard, &gamepad, Facing::Front), None);
    }

    #[test]
    fn dpad_drives_the_same_clips() {
        let keyboard = KeyboardState::new();
        let mut gamepad = GamepadState::new();

        gamepad.record_button(Button::DPadDown, true);
        assert_eq!(
            requested_clip(&keyboard, &gamepad, Facing::Left),
            Some((Facing::Front, Motion::Walk))
        );

        gamepad.record_button(Button::DPadLeft, true);
        assert_eq!(
            requested_clip(&keyboard, &gamepad, Facing::Front),
            Some((Facing::Left, Motion::Walk))
        );

        gamepad.end_frame();
        gamepad.record_button(Button::DPadLeft, false);
        gamepad.record_button(Button::DPadDown, false);
        assert_eq!(
            requested_clip(&keyboard, &gamepad, Facing::Left),
            Some((Facing::Left, Motion::Idle))
        );
    }
}
