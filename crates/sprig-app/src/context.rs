//! Engine context.

use std::sync::Arc;

use sprig_audio::AudioSystem;
use sprig_gpu::{GpuContext, GpuContextBuilder};
use sprig_input::{Gamepads, KeyboardState};
use sprig_platform::drawable_size;
use sprig_render::{FrameStatus, RendererConfig, SpriteCamera, SpriteRenderer, SpriteScene};
use tracing::{debug, error, info};
use winit::window::Window;

use crate::config::AppConfig;

/// Everything the engine owns, handed to the application by reference.
///
/// Fields drop in declaration order after [`Drop::drop`] has torn the
/// renderer down, so the device goes before the audio output and the
/// window goes last.
pub struct EngineContext {
    renderer: SpriteRenderer,
    /// GPU context with device and queues.
    pub gpu: GpuContext,
    /// Sprite instances and the uniform payload.
    pub scene: SpriteScene,
    /// Camera feeding the uniform payload.
    pub camera: SpriteCamera,
    /// Keyboard state, fed by the runner.
    pub keyboard: KeyboardState,
    /// Gamepad state, polled by the runner.
    pub gamepad: Gamepads,
    /// Sound output.
    pub audio: AudioSystem,
    /// Total frames presented.
    pub frame_count: u64,
    /// The window handle.
    pub window: Arc<Window>,
}

impl EngineContext {
    /// Bring up the GPU for `window` and build the sprite renderer.
    pub(crate) fn new(window: Arc<Window>, config: &AppConfig) -> anyhow::Result<Self> {
        // SAFETY: the window is stored in the context and dropped after the GPU.
        let gpu = unsafe {
            GpuContextBuilder::new()
                .app_name(&config.title)
                .engine_name(&config.engine_name)
                .app_version(1, 0, 0)
                .validation(config.validation)
                .device_index(config.device_index)
                .build(window.as_ref())
        }?;

        let scene = SpriteScene::new(config.frames_in_flight())?;
        let renderer_config = RendererConfig {
            frames_in_flight: config.frames_in_flight(),
            aspect_ratio: config.aspect_ratio,
            ..RendererConfig::default()
        };
        let (width, height) = drawable_size(&window);
        let renderer = SpriteRenderer::new(&gpu, &renderer_config, width, height, &scene)?;

        let mut camera = SpriteCamera::default();
        camera.set_aspect(config.aspect_ratio);

        let mut gamepad = Gamepads::new_or_disabled();
        if gamepad.open_first().is_none() && gamepad.is_enabled() {
            info!("No controller connected");
        }

        Ok(Self {
            renderer,
            gpu,
            scene,
            camera,
            keyboard: KeyboardState::new(),
            gamepad,
            audio: AudioSystem::new_or_muted(),
            frame_count: 0,
            window,
        })
    }

    pub fn renderer(&self) -> &SpriteRenderer {
        &self.renderer
    }

    /// Current drawable size in pixels.
    pub fn drawable_size(&self) -> (u32, u32) {
        drawable_size(&self.window)
    }

    pub(crate) fn notify_resized(&mut self, viewport: sprig_core::AspectViewport) {
        self.renderer.notify_resized(viewport);
    }

    /// Push the camera into the scene and draw one frame.
    pub(crate) fn draw(&mut self) -> anyhow::Result<FrameStatus> {
        self.scene.set_proj_view(self.camera.proj_view());
        let (width, height) = drawable_size(&self.window);
        let status = match self
            .renderer
            .draw_frame(&mut self.gpu, &mut self.scene, width, height)
        {
            Ok(status) => status,
            Err(e) => {
                if e.is_device_lost() {
                    error!("GPU device lost after {} frames", self.frame_count);
                }
                return Err(e.into());
            }
        };
        match status {
            FrameStatus::Presented(report) => {
                self.frame_count += 1;
                if !report.is_empty() {
                    debug!(?report, frame = self.frame_count, "uploaded scene changes");
                }
            }
            FrameStatus::Recreated => {
                let extent = self.renderer.extent();
                info!("Swapchain rebuilt at {}x{}", extent.width, extent.height);
            }
            FrameStatus::Suspended => {}
        }
        Ok(status)
    }
}

impl Drop for EngineContext {
    fn drop(&mut self) {
        // SAFETY: called once, while the GPU context is still alive.
        unsafe { self.renderer.destroy(&self.gpu) };
        self.audio.stop_all();
    }
}
