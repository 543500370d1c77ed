//! Vulkan layer for the Sprig sprite engine.
//!
//! This crate provides:
//! - Driver loading, validation layer and extension checks, instance creation
//! - Window surface binding
//! - Physical device selection by index, queue family selection and the
//!   logical device
//! - Swapchain creation and recreation
//! - Render pass, pipeline, descriptor, memory, command and sync helpers

pub mod command;
pub mod context;
pub mod descriptors;
pub mod device;
pub mod error;
pub mod image;
pub mod instance;
pub mod memory;
pub mod pipeline;
pub mod platform;
pub mod render_pass;
pub mod surface;
pub mod swapchain;
pub mod sync;

pub use command::{begin_single_time_commands, end_single_time_commands, CommandPool};
pub use context::{GpuContext, GpuContextBuilder};
pub use descriptors::{create_sprite_set_layout, write_sprite_set, SpriteDescriptorPool};
pub use device::{select_queue_families, QueueFamilyBinding, SwapchainSupport};
pub use error::{GpuError, Result, VkResultExt};
pub use instance::DriverContext;
pub use memory::{find_memory_type, GpuAllocator, GpuBuffer, GpuImage};
pub use pipeline::{read_shader_file, GraphicsPipeline, GraphicsPipelineConfig};
pub use platform::PlatformProfile;
pub use render_pass::{create_render_pass, Framebuffers};
pub use surface::SurfaceBinding;
pub use swapchain::{AcquireOutcome, Swapchain};
pub use sync::{create_fence, create_semaphore, FrameSync, FrameSyncManager};
