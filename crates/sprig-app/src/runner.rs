//! Application runner and event loop.

use std::sync::Arc;
use std::time::Instant;

use sprig_platform::{create_window, WindowConfig, WindowStateTracker};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

use crate::app::SpriteApp;
use crate::config::AppConfig;
use crate::context::EngineContext;
use crate::frame_loop::{FrameCallbacks, FrameLoop};

/// Run a `SpriteApp` with the given configuration.
///
/// Initializes logging, creates the window, GPU context and renderer, and
/// runs the event loop until the window closes. An initialization or
/// render failure is logged, ends the loop and is returned.
pub fn run_app<A: SpriteApp + 'static>(config: AppConfig) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("{} starting...", config.title);

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut runner = AppRunner::<A> {
        config,
        state: None,
        failure: None,
    };

    event_loop.run_app(&mut runner)?;

    match runner.failure.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Internal application runner that implements winit's `ApplicationHandler`.
struct AppRunner<A: SpriteApp> {
    config: AppConfig,
    state: Option<AppState<A>>,
    failure: Option<anyhow::Error>,
}

/// Internal application state.
struct AppState<A: SpriteApp> {
    app: A,
    ctx: EngineContext,
    frame_loop: FrameLoop,
    tracker: WindowStateTracker,
}

/// Routes frame-loop callbacks into the application.
struct AppFrame<'a, A: SpriteApp> {
    app: &'a mut A,
    ctx: &'a mut EngineContext,
}

impl<A: SpriteApp> FrameCallbacks for AppFrame<'_, A> {
    type Error = anyhow::Error;

    fn on_physics(&mut self, dt: f32) -> anyhow::Result<()> {
        self.app.on_physics(self.ctx, dt)
    }

    fn on_render(&mut self, dt: f32) -> anyhow::Result<()> {
        self.app.on_render(self.ctx, dt)?;
        self.ctx.draw()?;
        Ok(())
    }
}

impl<A: SpriteApp + 'static> ApplicationHandler for AppRunner<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        info!("Creating application state...");

        match self.create_state(event_loop) {
            Ok(state) => {
                self.state = Some(state);
                info!("Application ready!");
            }
            Err(e) => self.fail(event_loop, e.context("Failed to initialize application")),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(state) = &mut self.state else {
            return;
        };

        // Let the app handle the event first
        if state.app.on_event(&mut state.ctx, &event) {
            return;
        }

        state.ctx.keyboard.process_window_event(&event);
        state.ctx.gamepad.process_window_event(&event);

        let maximized = state.ctx.window.is_maximized();
        for platform_event in state.tracker.translate(&event, maximized) {
            state.frame_loop.handle_event(platform_event);
        }
        if state.frame_loop.take_framebuffer_resized() {
            state.ctx.notify_resized(state.frame_loop.viewport());
        }

        if state.frame_loop.should_quit() {
            info!("Close requested");
            self.shutdown(event_loop);
            return;
        }

        if matches!(event, WindowEvent::RedrawRequested) {
            if let Err(e) = state.tick() {
                self.fail(event_loop, e.context("Frame failed"));
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(state) = &mut self.state else {
            return;
        };

        state.ctx.gamepad.poll();

        if state.frame_loop.is_minimized() {
            event_loop.set_control_flow(ControlFlow::Wait);
            return;
        }

        match state.frame_loop.until_next_render(Instant::now()) {
            Some(wait) if !wait.is_zero() => {
                event_loop.set_control_flow(ControlFlow::WaitUntil(Instant::now() + wait));
            }
            _ => {
                event_loop.set_control_flow(ControlFlow::Poll);
                state.ctx.window.request_redraw();
            }
        }
    }

    fn new_events(&mut self, _event_loop: &ActiveEventLoop, cause: winit::event::StartCause) {
        if let winit::event::StartCause::ResumeTimeReached { .. } = cause {
            if let Some(state) = &self.state {
                state.ctx.window.request_redraw();
            }
        }
    }
}

impl<A: SpriteApp + 'static> AppRunner<A> {
    fn create_state(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<AppState<A>> {
        let window_config = WindowConfig {
            title: self.config.title.clone(),
            width: self.config.width,
            height: self.config.height,
            resizable: true,
        };
        let window = Arc::new(create_window(event_loop, &window_config)?);

        let mut ctx = EngineContext::new(window, &self.config)?;
        let app = A::init(&mut ctx)?;

        Ok(AppState {
            app,
            ctx,
            frame_loop: FrameLoop::from_config(&self.config),
            tracker: WindowStateTracker::new(),
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, e: anyhow::Error) {
        error!("{e:#}");
        self.shutdown(event_loop);
        self.failure = Some(e);
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(mut state) = self.state.take() {
            state.cleanup();
        }
        event_loop.exit();
    }
}

impl<A: SpriteApp> AppState<A> {
    fn tick(&mut self) -> anyhow::Result<()> {
        let mut frame = AppFrame {
            app: &mut self.app,
            ctx: &mut self.ctx,
        };
        let report = self.frame_loop.tick(Instant::now(), &mut frame)?;
        if report.rendered {
            self.ctx.keyboard.end_frame();
            self.ctx.gamepad.end_frame();
        }
        Ok(())
    }

    fn cleanup(&mut self) {
        info!("Starting cleanup...");
        if let Err(e) = self.ctx.gpu.wait_idle() {
            error!("Failed to wait idle: {e}");
        }

        // Let the app cleanup first
        self.app.cleanup(&mut self.ctx);
        self.ctx.gamepad.shutdown();

        info!("Cleanup complete after {} frames", self.ctx.frame_count);
    }
}
