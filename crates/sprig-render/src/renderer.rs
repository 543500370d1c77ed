//! Sprite renderer: owns the swapchain and every per-frame resource and
//! submits one instanced draw per frame.

use std::path::PathBuf;

use ash::vk;
use sprig_core::types::{QUAD_INDICES, QUAD_VERTICES};
use sprig_core::limits::MAX_FRAMES_IN_FLIGHT;
use sprig_core::{assets, AspectViewport, SpriteInstance};
use sprig_gpu::{
    AcquireOutcome, CommandPool, FrameSyncManager, Framebuffers, GpuContext, GpuError, Result,
    Swapchain, VkResultExt,
};
use tracing::{debug, info, warn};

use crate::camera::ProjView;
use crate::frame::FrameResources;
use crate::geometry::GeometryBuffers;
use crate::scene::{FrameUploader, SpriteScene, SyncReport};
use crate::sprite_pipeline::SpritePipeline;
use crate::texture::Texture;
use crate::upload::Uploader;

/// Renderer construction parameters.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    pub frames_in_flight: usize,
    pub aspect_ratio: f32,
    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
    pub texture: PathBuf,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: 2,
            aspect_ratio: 1.0,
            vertex_shader: assets::SPRITE_VERT_SHADER.into(),
            fragment_shader: assets::SPRITE_FRAG_SHADER.into(),
            texture: assets::ATLAS_TEXTURE.into(),
        }
    }
}

/// Result of one [`SpriteRenderer::draw_frame`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// The frame was submitted and presented.
    Presented(SyncReport),
    /// The swapchain was rebuilt instead of drawing.
    Recreated,
    /// Nothing was drawn because the drawable has no area.
    Suspended,
}

/// What a pending swapchain rebuild should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildDecision {
    /// Build a new chain at the drawable size.
    Recreate,
    /// Leave the current chain alone and draw nothing.
    Suspend,
}

/// Rebuild only when both the drawable and the surface's largest image have
/// area. Minimized windows report zero for one or both.
pub fn rebuild_decision(drawable: vk::Extent2D, surface_max: vk::Extent2D) -> RebuildDecision {
    let has_area = |e: vk::Extent2D| e.width > 0 && e.height > 0;
    if has_area(drawable) && has_area(surface_max) {
        RebuildDecision::Recreate
    } else {
        RebuildDecision::Suspend
    }
}

/// Frame count for the per-frame command buffers and sync objects.
pub fn frames_in_flight_count(frames: usize) -> Result<u32> {
    if frames == 0 {
        return Err(GpuError::InvalidState("at least one frame in flight is required".into()));
    }
    if frames > MAX_FRAMES_IN_FLIGHT {
        return Err(GpuError::CapacityExceeded {
            what: "frames in flight",
            capacity: MAX_FRAMES_IN_FLIGHT,
            requested: frames,
        });
    }
    Ok(frames as u32)
}

/// Convert an aspect rectangle into the dynamic viewport and scissor.
pub fn viewport_and_scissor(rect: AspectViewport) -> (vk::Viewport, vk::Rect2D) {
    let viewport = vk::Viewport {
        x: rect.x as f32,
        y: rect.y as f32,
        width: rect.width as f32,
        height: rect.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    };
    let scissor = vk::Rect2D {
        offset: vk::Offset2D {
            x: rect.x as i32,
            y: rect.y as i32,
        },
        extent: vk::Extent2D {
            width: rect.width,
            height: rect.height,
        },
    };
    (viewport, scissor)
}

/// Swapchain, pipeline, geometry, texture and frame-in-flight state.
pub struct SpriteRenderer {
    swapchain: Swapchain,
    pipeline: SpritePipeline,
    framebuffers: Framebuffers,
    command_pool: CommandPool,
    command_buffers: Vec<vk::CommandBuffer>,
    sync: FrameSyncManager,
    geometry: GeometryBuffers,
    texture: Texture,
    frames: FrameResources,
    aspect_ratio: f32,
    viewport: AspectViewport,
    framebuffer_resized: bool,
}

impl SpriteRenderer {
    /// Build the swapchain and every resource the sprite draw needs.
    ///
    /// `width` x `height` is the drawable size in pixels.
    pub fn new(
        ctx: &GpuContext,
        config: &RendererConfig,
        width: u32,
        height: u32,
        scene: &SpriteScene,
    ) -> Result<Self> {
        frames_in_flight_count(config.frames_in_flight)?;
        let device = ctx.device();

        // SAFETY: the context owns a live device, surface and loader.
        let mut swapchain = unsafe {
            Swapchain::new(
                device,
                ctx.swapchain_loader(),
                ctx.surface().handle(),
                ctx.swapchain_support(),
                ctx.queue_families(),
                width,
                height,
                None,
            )
        }?;

        let pipeline = match unsafe {
            SpritePipeline::new(
                device,
                swapchain.format.format,
                &config.vertex_shader,
                &config.fragment_shader,
            )
        } {
            Ok(pipeline) => pipeline,
            Err(e) => {
                unsafe { swapchain.destroy(device, ctx.swapchain_loader()) };
                return Err(e);
            }
        };

        let mut renderer = Builder {
            ctx,
            swapchain: Some(swapchain),
            pipeline: Some(pipeline),
            framebuffers: None,
            command_pool: None,
            sync: None,
            geometry: None,
            texture: None,
        };
        renderer.finish(config, scene)
    }

    /// Record a new drawable size; the swapchain is rebuilt before the next
    /// draw.
    pub fn notify_resized(&mut self, viewport: AspectViewport) {
        self.viewport = viewport;
        self.framebuffer_resized = true;
    }

    pub fn viewport(&self) -> AspectViewport {
        self.viewport
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent
    }

    pub fn frames_in_flight(&self) -> usize {
        self.sync.frames_in_flight()
    }

    pub fn current_frame(&self) -> usize {
        self.sync.current_frame()
    }

    /// Upload what `scene` changed and draw one frame.
    ///
    /// `width` x `height` is the current drawable size, used when the
    /// swapchain has to be rebuilt.
    pub fn draw_frame(
        &mut self,
        ctx: &mut GpuContext,
        scene: &mut SpriteScene,
        width: u32,
        height: u32,
    ) -> Result<FrameStatus> {
        if self.framebuffer_resized {
            return self.recreate_or_suspend(ctx, width, height);
        }

        let frame = self.sync.current_frame();
        let frame_sync = *self.sync.current();

        // SAFETY: all handles belong to `ctx`.
        unsafe { frame_sync.wait(ctx.device()) }?;

        let acquired = unsafe {
            self.swapchain
                .acquire_next_image(ctx.swapchain_loader(), frame_sync.image_available, u64::MAX)
        }?;
        let image_index = match acquired {
            AcquireOutcome::Image { index, .. } => index,
            AcquireOutcome::OutOfDate => {
                debug!("Swapchain out of date on acquire");
                return self.recreate_or_suspend(ctx, width, height);
            }
        };

        let report = {
            let mut sink = GpuFrameSink {
                uploader: Uploader::new(ctx, &self.command_pool),
                geometry: &mut self.geometry,
                frames: &mut self.frames,
            };
            scene.sync(frame, &mut sink)?
        };

        // Reset only once work is guaranteed to be submitted.
        unsafe { frame_sync.reset(ctx.device()) }?;

        let cmd = self.command_buffers[frame];
        unsafe { self.record(ctx.device(), cmd, frame, image_index) }?;

        let render_finished = self
            .sync
            .render_finished(image_index)
            .ok_or_else(|| GpuError::InvalidState(format!("no semaphore for image {image_index}")))?;

        let wait_semaphores = [frame_sync.image_available];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [render_finished];
        let command_buffers = [cmd];
        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            ctx.device()
                .queue_submit(ctx.graphics_queue(), &[submit_info], frame_sync.in_flight)
        }
        .during("vkQueueSubmit")?;

        let needs_recreate = unsafe {
            self.swapchain.present(
                ctx.swapchain_loader(),
                ctx.present_queue(),
                image_index,
                &signal_semaphores,
            )
        }?;

        self.sync.advance();

        if needs_recreate {
            debug!("Swapchain suboptimal or out of date on present");
            self.framebuffer_resized = true;
        }

        Ok(FrameStatus::Presented(report))
    }

    unsafe fn record(
        &self,
        device: &ash::Device,
        cmd: vk::CommandBuffer,
        frame: usize,
        image_index: u32,
    ) -> Result<()> {
        let framebuffer = self
            .framebuffers
            .get(image_index as usize)
            .ok_or_else(|| GpuError::InvalidState(format!("no framebuffer for image {image_index}")))?;
        let descriptor_set = self
            .frames
            .descriptor_set(frame)
            .ok_or_else(|| GpuError::InvalidState(format!("no descriptor set for frame {frame}")))?;

        let clear_values = [vk::ClearValue {
            color: vk::ClearColorValue {
                float32: [0.0, 0.0, 0.0, 1.0],
            },
        }];
        let render_pass_info = vk::RenderPassBeginInfo::default()
            .render_pass(self.pipeline.render_pass)
            .framebuffer(framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: self.swapchain.extent,
            })
            .clear_values(&clear_values);

        let (viewport, scissor) = viewport_and_scissor(self.clamped_viewport());

        unsafe {
            device
                .reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())
                .during("vkResetCommandBuffer")?;
            let begin_info = vk::CommandBufferBeginInfo::default();
            device
                .begin_command_buffer(cmd, &begin_info)
                .during("vkBeginCommandBuffer")?;

            device.cmd_begin_render_pass(cmd, &render_pass_info, vk::SubpassContents::INLINE);
            device.cmd_bind_pipeline(
                cmd,
                vk::PipelineBindPoint::GRAPHICS,
                self.pipeline.pipeline.pipeline,
            );
            device.cmd_set_viewport(cmd, 0, &[viewport]);
            device.cmd_set_scissor(cmd, 0, &[scissor]);
            device.cmd_bind_vertex_buffers(cmd, 0, &self.geometry.vertex_buffers(), &[0, 0]);
            device.cmd_bind_index_buffer(cmd, self.geometry.index.buffer, 0, vk::IndexType::UINT16);
            device.cmd_bind_descriptor_sets(
                cmd,
                vk::PipelineBindPoint::GRAPHICS,
                self.pipeline.pipeline.layout,
                0,
                &[descriptor_set],
                &[],
            );
            device.cmd_draw_indexed(
                cmd,
                self.geometry.index_count(),
                self.geometry.instance_count(),
                0,
                0,
                0,
            );
            device.cmd_end_render_pass(cmd);

            device.end_command_buffer(cmd).during("vkEndCommandBuffer")
        }
    }

    /// Aspect rectangle limited to the framebuffer, refit if it no longer
    /// fits after a clamp by the surface.
    fn clamped_viewport(&self) -> AspectViewport {
        let extent = self.swapchain.extent;
        let rect = self.viewport;
        if rect.is_empty() || rect.x + rect.width > extent.width || rect.y + rect.height > extent.height {
            AspectViewport::fit(extent.width, extent.height, self.aspect_ratio)
        } else {
            rect
        }
    }

    fn recreate_or_suspend(&mut self, ctx: &mut GpuContext, width: u32, height: u32) -> Result<FrameStatus> {
        if self.recreate_swapchain(ctx, width, height)? {
            Ok(FrameStatus::Recreated)
        } else {
            Ok(FrameStatus::Suspended)
        }
    }

    /// Rebuild the swapchain for a `width` x `height` drawable.
    ///
    /// Returns `false` without touching anything when the drawable or the
    /// surface has no area.
    pub fn recreate_swapchain(&mut self, ctx: &mut GpuContext, width: u32, height: u32) -> Result<bool> {
        let drawable = vk::Extent2D { width, height };
        if rebuild_decision(drawable, drawable) == RebuildDecision::Suspend {
            return Ok(false);
        }

        ctx.wait_idle()?;
        ctx.refresh_swapchain_support()?;
        let max_extent = ctx.swapchain_support().capabilities.max_image_extent;
        if rebuild_decision(drawable, max_extent) == RebuildDecision::Suspend {
            return Ok(false);
        }

        let device = ctx.device();
        let loader = ctx.swapchain_loader();

        // SAFETY: the device is idle and the old chain belongs to this surface.
        let new_swapchain = unsafe {
            Swapchain::new(
                device,
                loader,
                ctx.surface().handle(),
                ctx.swapchain_support(),
                ctx.queue_families(),
                width,
                height,
                Some(self.swapchain.swapchain),
            )
        }?;

        let mut old_swapchain = std::mem::replace(&mut self.swapchain, new_swapchain);
        unsafe {
            self.framebuffers.destroy(device);
            old_swapchain.destroy(device, loader);
        }

        if self.swapchain.format.format != self.pipeline.format {
            info!(
                "Surface format changed {:?} -> {:?}, rebuilding pipeline",
                self.pipeline.format, self.swapchain.format.format
            );
            unsafe { self.pipeline.rebuild(device, self.swapchain.format.format) }?;
        }

        self.framebuffers = unsafe {
            Framebuffers::new(
                device,
                self.pipeline.render_pass,
                &self.swapchain.image_views,
                self.swapchain.extent,
            )
        }?;
        unsafe { self.sync.resize_images(device, self.swapchain.image_count()) }?;

        let extent = self.swapchain.extent;
        self.viewport = AspectViewport::fit(extent.width, extent.height, self.aspect_ratio);
        self.framebuffer_resized = false;
        Ok(true)
    }

    /// Destroy everything in reverse creation order.
    ///
    /// # Safety
    /// Must be called once, before `ctx` is dropped.
    pub unsafe fn destroy(&mut self, ctx: &GpuContext) {
        if let Err(e) = ctx.wait_idle() {
            warn!("Failed to wait idle before renderer shutdown: {e}");
        }
        let device = ctx.device();
        let mut allocator = ctx.allocator().lock();

        unsafe {
            self.sync.destroy(device);
            self.command_pool.destroy(device);
            self.frames.destroy(device, &mut allocator);
        }
        if let Err(e) = self.geometry.destroy(&mut allocator) {
            warn!("Failed to free geometry buffers: {e}");
        }
        if let Err(e) = unsafe { self.texture.destroy(device, &mut allocator) } {
            warn!("Failed to free texture: {e}");
        }
        unsafe {
            self.framebuffers.destroy(device);
            self.pipeline.destroy(device);
            self.swapchain.destroy(device, ctx.swapchain_loader());
        }
        info!("Sprite renderer destroyed");
    }
}

/// Routes scene uploads into the renderer's GPU buffers.
struct GpuFrameSink<'a> {
    uploader: Uploader<'a>,
    geometry: &'a mut GeometryBuffers,
    frames: &'a mut FrameResources,
}

impl FrameUploader for GpuFrameSink<'_> {
    type Error = GpuError;

    fn upload_instances(&mut self, instances: &[SpriteInstance]) -> Result<()> {
        self.geometry.update_instances(&self.uploader, instances)
    }

    fn upload_uniforms(&mut self, frame: usize, data: &ProjView) -> Result<()> {
        self.frames.update_uniform(frame, data)
    }
}

/// Partially built renderer; drops whatever was created if a later step
/// fails.
struct Builder<'a> {
    ctx: &'a GpuContext,
    swapchain: Option<Swapchain>,
    pipeline: Option<SpritePipeline>,
    framebuffers: Option<Framebuffers>,
    command_pool: Option<CommandPool>,
    sync: Option<FrameSyncManager>,
    geometry: Option<GeometryBuffers>,
    texture: Option<Texture>,
}

impl Builder<'_> {
    fn finish(&mut self, config: &RendererConfig, scene: &SpriteScene) -> Result<SpriteRenderer> {
        let ctx = self.ctx;
        let device = ctx.device();
        let (format, extent, views, image_count) = match &self.swapchain {
            Some(sc) => (sc.format.format, sc.extent, sc.image_views.clone(), sc.image_count()),
            None => return Err(GpuError::InvalidState("swapchain missing".into())),
        };
        let render_pass = match &self.pipeline {
            Some(p) => p.render_pass,
            None => return Err(GpuError::InvalidState("pipeline missing".into())),
        };

        self.framebuffers = Some(unsafe { Framebuffers::new(device, render_pass, &views, extent) }?);
        let command_pool =
            self.command_pool.insert(unsafe { CommandPool::new(device, ctx.queue_families().graphics) }?);
        let frame_count = frames_in_flight_count(config.frames_in_flight)?;
        let command_buffers = unsafe { command_pool.allocate_command_buffers(device, frame_count) }?;
        self.sync = Some(unsafe { FrameSyncManager::new(device, config.frames_in_flight, image_count) }?);

        let command_pool = self
            .command_pool
            .as_ref()
            .ok_or_else(|| GpuError::InvalidState("command pool missing".into()))?;
        let uploader = Uploader::new(ctx, command_pool);
        self.geometry = Some(GeometryBuffers::new(
            &uploader,
            &QUAD_VERTICES,
            &QUAD_INDICES,
            scene.instances(),
        )?);
        let texture = self
            .texture
            .insert(Texture::load(ctx, &uploader, &config.texture)?);

        let set_layout = self
            .pipeline
            .as_ref()
            .map(|p| p.set_layout)
            .ok_or_else(|| GpuError::InvalidState("pipeline missing".into()))?;
        let frames = FrameResources::new(ctx, config.frames_in_flight, set_layout, texture)?;

        info!(
            "Sprite renderer ready: {}x{}, {:?}, {} frames in flight",
            extent.width, extent.height, format, config.frames_in_flight
        );

        match self.take_all(frames, command_buffers, config.aspect_ratio) {
            Some(renderer) => Ok(renderer),
            None => Err(GpuError::InvalidState("renderer parts missing".into())),
        }
    }

    fn take_all(
        &mut self,
        frames: FrameResources,
        command_buffers: Vec<vk::CommandBuffer>,
        aspect_ratio: f32,
    ) -> Option<SpriteRenderer> {
        let swapchain = self.swapchain.take()?;
        let extent = swapchain.extent;
        Some(SpriteRenderer {
            pipeline: self.pipeline.take()?,
            framebuffers: self.framebuffers.take()?,
            command_pool: self.command_pool.take()?,
            command_buffers,
            sync: self.sync.take()?,
            geometry: self.geometry.take()?,
            texture: self.texture.take()?,
            frames,
            aspect_ratio,
            viewport: AspectViewport::fit(extent.width, extent.height, aspect_ratio),
            framebuffer_resized: false,
            swapchain,
        })
    }
}

impl Drop for Builder<'_> {
    fn drop(&mut self) {
        let ctx = self.ctx;
        let device = ctx.device();
        if let Err(e) = ctx.wait_idle() {
            warn!("Failed to wait idle while unwinding renderer setup: {e}");
        }
        // SAFETY: everything still held here was never handed out.
        unsafe {
            if let Some(mut texture) = self.texture.take() {
                if let Err(e) = texture.destroy(device, &mut ctx.allocator().lock()) {
                    warn!("Failed to free texture while unwinding renderer setup: {e}");
                }
            }
            if let Some(mut geometry) = self.geometry.take() {
                if let Err(e) = geometry.destroy(&mut ctx.allocator().lock()) {
                    warn!("Failed to free geometry while unwinding renderer setup: {e}");
                }
            }
            if let Some(mut sync) = self.sync.take() {
                sync.destroy(device);
            }
            if let Some(pool) = self.command_pool.take() {
                pool.destroy(device);
            }
            if let Some(mut framebuffers) = self.framebuffers.take() {
                framebuffers.destroy(device);
            }
            if let Some(pipeline) = self.pipeline.take() {
                pipeline.destroy(device);
            }
            if let Some(mut swapchain) = self.swapchain.take() {
                swapchain.destroy(device, ctx.swapchain_loader());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_and_scissor_cover_the_aspect_rect() {
        let rect = AspectViewport::fit(800, 600, 1.0);
        let (viewport, scissor) = viewport_and_scissor(rect);
        assert_eq!((viewport.x, viewport.y), (100.0, 0.0));
        assert_eq!((viewport.width, viewport.height), (600.0, 600.0));
        assert_eq!((viewport.min_depth, viewport.max_depth), (0.0, 1.0));
        assert_eq!(scissor.offset, vk::Offset2D { x: 100, y: 0 });
        assert_eq!(
            scissor.extent,
            vk::Extent2D {
                width: 600,
                height: 600
            }
        );
    }

    fn extent(width: u32, height: u32) -> vk::Extent2D {
        vk::Extent2D { width, height }
    }

    #[test]
    fn zero_area_suspends_instead_of_rebuilding() {
        let surface = extent(4096, 4096);
        assert_eq!(rebuild_decision(extent(0, 600), surface), RebuildDecision::Suspend);
        assert_eq!(rebuild_decision(extent(800, 0), surface), RebuildDecision::Suspend);
        assert_eq!(rebuild_decision(extent(0, 0), surface), RebuildDecision::Suspend);
        // Minimized on some platforms: the surface itself shrinks to nothing.
        assert_eq!(
            rebuild_decision(extent(800, 600), extent(0, 0)),
            RebuildDecision::Suspend
        );
        assert_eq!(
            rebuild_decision(extent(800, 600), surface),
            RebuildDecision::Recreate
        );
    }

    #[test]
    fn frame_count_must_fit_the_dirty_mask() {
        assert_eq!(frames_in_flight_count(2).unwrap(), 2);
        assert_eq!(frames_in_flight_count(MAX_FRAMES_IN_FLIGHT).unwrap(), 32);
        assert!(matches!(
            frames_in_flight_count(0),
            Err(GpuError::InvalidState(_))
        ));
        assert!(matches!(
            frames_in_flight_count(33),
            Err(GpuError::CapacityExceeded { requested: 33, .. })
        ));
    }

    #[test]
    fn default_config_points_at_bundled_assets() {
        let config = RendererConfig::default();
        assert_eq!(config.frames_in_flight, 2);
        assert!(config.vertex_shader.ends_with("sprite.vert.spv"));
        assert!(config.texture.ends_with("atlas.png"));
    }
}
