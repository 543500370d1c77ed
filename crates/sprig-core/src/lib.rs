//! Core types and contracts for the Sprig sprite engine.
//!
//! This crate provides the foundational types used throughout the engine:
//! - Scene-facing instance and mesh vertex records
//! - Bounded sequences with an explicit capacity contract
//! - Aspect-ratio preserving viewport math
//! - Per-frame-in-flight dirty tracking
//! - Common error type, limits and asset paths

pub mod bounded;
pub mod dirty;
pub mod error;
pub mod types;
pub mod viewport;

pub use bounded::BoundedList;
pub use dirty::{DirtyFlag, FrameDirtyFlags};
pub use error::{Error, Result};
pub use types::{MeshVertex, SpriteInstance};
pub use viewport::AspectViewport;

/// Capacity contracts for the bounded lists used during GPU bootstrap.
pub mod limits {
    /// Instance-level extensions the engine may require.
    pub const REQUIRED_DRIVER_EXTENSIONS_CAP: usize = 16;
    /// Validation layers the engine may require.
    pub const REQUIRED_VALIDATION_LAYERS_CAP: usize = 4;
    /// Device-level extensions the engine may require.
    pub const REQUIRED_DEVICE_EXTENSIONS_CAP: usize = 8;
    /// Surface formats cached from the physical device.
    pub const SWAPCHAIN_FORMATS_CAP: usize = 64;
    /// Present modes cached from the physical device.
    pub const SWAPCHAIN_PRESENT_MODES_CAP: usize = 8;
    /// Images a swapchain may hand back.
    pub const SWAPCHAIN_IMAGES_CAP: usize = 8;
    /// Size of a precompiled shader binary in bytes.
    pub const SHADER_FILE_BYTES_CAP: u64 = 50 * 1024;
    /// Sprite instances uploaded into the instance buffer.
    pub const MAX_INSTANCES: usize = 255;
    /// Frames in flight tracked by a single dirty bitmask.
    pub const MAX_FRAMES_IN_FLIGHT: usize = 32;
}

/// Asset locations relative to the working directory.
pub mod assets {
    /// Fragment shader for the sprite pipeline.
    pub const SPRITE_FRAG_SHADER: &str = "assets/shaders/sprite.frag.spv";
    /// Vertex shader for the sprite pipeline.
    pub const SPRITE_VERT_SHADER: &str = "assets/shaders/sprite.vert.spv";
    /// Sprite atlas texture.
    pub const ATLAS_TEXTURE: &str = "assets/textures/atlas.png";
    /// Background music.
    pub const MUSIC_GRASSLAND: &str = "assets/audio/music/grassland.wav";
    /// Footstep loop.
    pub const SFX_GRASSLAND_FOOTSTEPS: &str = "assets/audio/sfx/grassland_footsteps.wav";
}
