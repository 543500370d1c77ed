//! Application framework for the Sprig engine.
//!
//! This crate provides a trait-based application framework that handles
//! common boilerplate like:
//! - Window creation and window-state tracking
//! - GPU context and sprite renderer initialization
//! - Fixed-step physics and paced rendering, suspended while minimized
//! - Swapchain recreation on resize
//! - Event loop handling
//!
//! # Example
//!
//! ```no_run
//! use sprig_app::{run_app, AppConfig, EngineContext, SpriteApp};
//!
//! struct MyApp;
//!
//! impl SpriteApp for MyApp {
//!     fn init(ctx: &mut EngineContext) -> anyhow::Result<Self> {
//!         Ok(MyApp)
//!     }
//!
//!     fn on_render(&mut self, ctx: &mut EngineContext, dt: f32) -> anyhow::Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     run_app::<MyApp>(AppConfig::default())
//! }
//! ```

mod app;
mod config;
mod context;
mod frame_loop;
mod runner;

pub use app::SpriteApp;
pub use config::{AppConfig, ASPECT_SQUARE};
pub use context::EngineContext;
pub use frame_loop::{FrameCallbacks, FrameLoop, TickReport};
pub use runner::run_app;

// Re-export commonly used types for convenience
pub use sprig_gpu::{GpuContext, GpuContextBuilder};
pub use sprig_render::{SpriteCamera, SpriteScene};
pub use winit::event::WindowEvent;
