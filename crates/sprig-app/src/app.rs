//! `SpriteApp` trait definition.

use crate::context::EngineContext;
use winit::event::WindowEvent;

/// Trait for Sprig applications.
///
/// The framework handles window creation, GPU initialization, swapchain
/// management, frame pacing and the event loop.
pub trait SpriteApp: Sized {
    /// Initialize the application.
    ///
    /// Called once after the window, GPU context and renderer exist. Fill
    /// the scene and load sounds here.
    fn init(ctx: &mut EngineContext) -> anyhow::Result<Self>;

    /// Advance the simulation by one fixed step of `dt` seconds.
    ///
    /// Default implementation does nothing.
    #[allow(unused_variables)]
    fn on_physics(&mut self, ctx: &mut EngineContext, dt: f32) -> anyhow::Result<()> {
        Ok(())
    }

    /// Update scene and camera before a frame is drawn.
    ///
    /// `dt` is the time since the previous render in seconds. Changes made to
    /// `ctx.scene` and `ctx.camera` are uploaded right after this returns.
    fn on_render(&mut self, ctx: &mut EngineContext, dt: f32) -> anyhow::Result<()>;

    /// Handle window events.
    ///
    /// Called for each window event. Return `true` if the event was
    /// handled and should not be processed further.
    ///
    /// Default implementation does nothing and returns `false`.
    #[allow(unused_variables)]
    fn on_event(&mut self, ctx: &mut EngineContext, event: &WindowEvent) -> bool {
        false
    }

    /// Cleanup before shutdown. The GPU is idle when this is called.
    ///
    /// Default implementation does nothing.
    #[allow(unused_variables)]
    fn cleanup(&mut self, ctx: &mut EngineContext) {}
}
