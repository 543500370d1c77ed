//! Sprite rendering for the Sprig engine.
//!
//! This crate provides:
//! - The fixed sprite pipeline (render pass, descriptor layout, pipeline)
//! - Staged uploads of geometry and textures into device-local memory
//! - Per-frame uniform buffers and descriptor sets
//! - A dirty-tracked sprite scene
//! - The per-frame draw submission and swapchain recreate path

pub mod camera;
pub mod frame;
pub mod geometry;
pub mod renderer;
pub mod scene;
pub mod sprite_pipeline;
pub mod texture;
pub mod upload;

pub use camera::{ProjView, SpriteCamera};
pub use frame::FrameResources;
pub use geometry::{GeometryBuffers, VertexSlot};
pub use renderer::{rebuild_decision, FrameStatus, RebuildDecision, RendererConfig, SpriteRenderer};
pub use scene::{FrameUploader, SpriteScene, SyncReport};
pub use sprite_pipeline::SpritePipeline;
pub use texture::{RgbaPixels, Texture};
pub use upload::{stage_bytes, StagingMemory, Uploader};
