//! Staged host-to-device transfers.
//!
//! Every upload goes through a host-visible staging buffer that is filled,
//! copied into device-local memory by a one-off command buffer, waited on
//! and released.

use ash::vk;
use gpu_allocator::MemoryLocation;
use sprig_gpu::command::{begin_single_time_commands, end_single_time_commands};
use sprig_gpu::image::transition_image_layout;
use sprig_gpu::{CommandPool, GpuBuffer, GpuContext, GpuError, GpuImage, Result, VkResultExt};
use tracing::warn;

/// Host-writable memory a staged upload copies through.
pub trait StagingMemory {
    fn staging_bytes_mut(&mut self) -> Result<&mut [u8]>;
}

impl StagingMemory for GpuBuffer {
    fn staging_bytes_mut(&mut self) -> Result<&mut [u8]> {
        let size = self.size as usize;
        let bytes = self
            .allocation
            .as_mut()
            .and_then(|a| a.mapped_slice_mut())
            .ok_or_else(|| GpuError::InvalidState("staging buffer not mapped".into()))?;
        let len = size.min(bytes.len());
        Ok(&mut bytes[..len])
    }
}

impl StagingMemory for Vec<u8> {
    fn staging_bytes_mut(&mut self) -> Result<&mut [u8]> {
        Ok(self.as_mut_slice())
    }
}

/// Copy `data` to the start of `staging`.
pub fn stage_bytes<S: StagingMemory + ?Sized>(staging: &mut S, data: &[u8]) -> Result<()> {
    let dst = staging.staging_bytes_mut()?;
    if data.len() > dst.len() {
        return Err(GpuError::CapacityExceeded {
            what: "staging buffer",
            capacity: dst.len(),
            requested: data.len(),
        });
    }
    dst[..data.len()].copy_from_slice(data);
    Ok(())
}

/// Runs staged uploads on the graphics queue.
pub struct Uploader<'a> {
    ctx: &'a GpuContext,
    pool: &'a CommandPool,
}

impl<'a> Uploader<'a> {
    pub fn new(ctx: &'a GpuContext, pool: &'a CommandPool) -> Self {
        Self { ctx, pool }
    }

    /// Create a device-local buffer of `size` bytes and fill its start with
    /// `data`.
    pub fn create_buffer(
        &self,
        size: u64,
        data: &[u8],
        usage: vk::BufferUsageFlags,
        name: &str,
    ) -> Result<GpuBuffer> {
        let buffer = self.ctx.allocator().lock().create_buffer(
            size,
            usage | vk::BufferUsageFlags::TRANSFER_DST,
            MemoryLocation::GpuOnly,
            name,
        )?;

        if let Err(e) = self.update_buffer(&buffer, data) {
            self.free(buffer);
            return Err(e);
        }
        Ok(buffer)
    }

    /// Release a buffer made by this uploader, logging a failed free.
    pub fn free(&self, mut buffer: GpuBuffer) {
        if let Err(e) = self.ctx.allocator().lock().free_buffer(&mut buffer) {
            warn!("Failed to free buffer: {e}");
        }
    }

    /// Overwrite the start of a device-local buffer with `data`.
    pub fn update_buffer(&self, dst: &GpuBuffer, data: &[u8]) -> Result<()> {
        if data.len() as u64 > dst.size {
            return Err(GpuError::CapacityExceeded {
                what: "device buffer",
                capacity: dst.size as usize,
                requested: data.len(),
            });
        }
        if data.is_empty() {
            return Ok(());
        }

        let size = data.len() as u64;
        self.with_staging(data, |device, cmd, staging| {
            let region = vk::BufferCopy {
                src_offset: 0,
                dst_offset: 0,
                size,
            };
            unsafe { device.cmd_copy_buffer(cmd, staging, dst.buffer, &[region]) };
            Ok(())
        })
    }

    /// Create a sampled RGBA8 sRGB image and upload `pixels` into it, leaving
    /// it in `SHADER_READ_ONLY_OPTIMAL`.
    pub fn create_texture_image(
        &self,
        width: u32,
        height: u32,
        pixels: &[u8],
        name: &str,
    ) -> Result<GpuImage> {
        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(vk::Format::R8G8B8A8_SRGB)
            .extent(vk::Extent3D {
                width,
                height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let mut image =
            self.ctx
                .allocator()
                .lock()
                .create_image(&image_info, MemoryLocation::GpuOnly, name)?;

        let result = self.with_staging(pixels, |device, cmd, staging| unsafe {
            transition_image_layout(
                device,
                cmd,
                image.image,
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            )?;

            let region = vk::BufferImageCopy::default()
                .buffer_offset(0)
                .buffer_row_length(0)
                .buffer_image_height(0)
                .image_subresource(
                    vk::ImageSubresourceLayers::default()
                        .aspect_mask(vk::ImageAspectFlags::COLOR)
                        .mip_level(0)
                        .base_array_layer(0)
                        .layer_count(1),
                )
                .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
                .image_extent(image_info.extent);
            device.cmd_copy_buffer_to_image(
                cmd,
                staging,
                image.image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );

            transition_image_layout(
                device,
                cmd,
                image.image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            )
        });

        match result {
            Ok(()) => Ok(image),
            Err(e) => {
                if let Err(free_err) = self.ctx.allocator().lock().free_image(&mut image) {
                    warn!("Failed to free texture image: {free_err}");
                }
                Err(e)
            }
        }
    }

    /// Stage `data`, record `record` into a one-off command buffer, submit,
    /// wait and free the staging buffer.
    fn with_staging<F>(&self, data: &[u8], record: F) -> Result<()>
    where
        F: FnOnce(&ash::Device, vk::CommandBuffer, vk::Buffer) -> Result<()>,
    {
        let mut staging = self.ctx.allocator().lock().create_buffer(
            data.len() as u64,
            vk::BufferUsageFlags::TRANSFER_SRC,
            MemoryLocation::CpuToGpu,
            "staging",
        )?;

        let result = stage_bytes(&mut staging, data).and_then(|()| self.submit(&staging, record));

        self.ctx.allocator().lock().free_buffer(&mut staging)?;
        result
    }

    fn submit<F>(&self, staging: &GpuBuffer, record: F) -> Result<()>
    where
        F: FnOnce(&ash::Device, vk::CommandBuffer, vk::Buffer) -> Result<()>,
    {
        let device = self.ctx.device();
        let queue = self.ctx.graphics_queue();

        // Earlier frames may still read the destination.
        unsafe { device.queue_wait_idle(queue) }.during("vkQueueWaitIdle")?;

        let cmd = unsafe { begin_single_time_commands(device, self.pool) }?;
        if let Err(e) = record(device, cmd, staging.buffer) {
            unsafe { device.free_command_buffers(self.pool.handle(), &[cmd]) };
            return Err(e);
        }
        unsafe { end_single_time_commands(device, self.pool, queue, cmd) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staged_bytes_round_trip() {
        let source: Vec<u8> = (0..=255).cycle().take(1000).collect();
        let mut staging = vec![0u8; source.len()];
        stage_bytes(&mut staging, &source).unwrap();
        assert_eq!(staging, source);
    }

    #[test]
    fn staged_instances_round_trip() {
        use glam::Vec3;
        use sprig_core::SpriteInstance;

        let instances = [
            SpriteInstance::new(Vec3::ZERO, Vec3::new(3.29, 2.15, 1.0), 0),
            SpriteInstance::new(Vec3::new(0.1, -0.2, 0.0), Vec3::new(0.375, 0.5625, 1.0), 4),
        ];
        let bytes: &[u8] = bytemuck::cast_slice(&instances);
        let mut staging = vec![0u8; bytes.len()];
        stage_bytes(&mut staging, bytes).unwrap();

        let read_back: &[SpriteInstance] = bytemuck::cast_slice(&staging);
        assert_eq!(read_back, &instances);
    }

    #[test]
    fn staging_smaller_than_source_is_rejected() {
        let mut staging = vec![0u8; 4];
        let err = stage_bytes(&mut staging, &[1, 2, 3, 4, 5]).unwrap_err();
        assert!(matches!(
            err,
            GpuError::CapacityExceeded {
                capacity: 4,
                requested: 5,
                ..
            }
        ));
        assert_eq!(staging, vec![0; 4]);
    }

    #[test]
    fn partial_fill_leaves_tail() {
        let mut staging = vec![9u8; 6];
        stage_bytes(&mut staging, &[1, 2]).unwrap();
        assert_eq!(staging, vec![1, 2, 9, 9, 9, 9]);
    }
}
