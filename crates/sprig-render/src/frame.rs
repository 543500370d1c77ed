//! Per-frame-in-flight uniform buffers and descriptor sets.

use ash::vk;
use gpu_allocator::MemoryLocation;
use sprig_gpu::{
    write_sprite_set, GpuAllocator, GpuBuffer, GpuContext, GpuError, Result, SpriteDescriptorPool,
};

use crate::camera::ProjView;
use crate::texture::Texture;

/// Mapped uniform buffers and descriptor sets, one of each per frame.
pub struct FrameResources {
    uniform_buffers: Vec<GpuBuffer>,
    descriptor_pool: SpriteDescriptorPool,
    descriptor_sets: Vec<vk::DescriptorSet>,
}

impl FrameResources {
    /// Create `frames` uniform buffers and descriptor sets pointing at them
    /// and at `texture`.
    pub fn new(
        ctx: &GpuContext,
        frames: usize,
        set_layout: vk::DescriptorSetLayout,
        texture: &Texture,
    ) -> Result<Self> {
        let device = ctx.device();
        let uniform_size = std::mem::size_of::<ProjView>() as u64;

        let mut uniform_buffers = Vec::with_capacity(frames);
        for frame in 0..frames {
            let created = ctx.allocator().lock().create_buffer(
                uniform_size,
                vk::BufferUsageFlags::UNIFORM_BUFFER,
                MemoryLocation::CpuToGpu,
                &format!("proj_view_{frame}"),
            );
            match created {
                Ok(buffer) => uniform_buffers.push(buffer),
                Err(e) => {
                    free_all(&mut ctx.allocator().lock(), &mut uniform_buffers);
                    return Err(e);
                }
            }
        }

        let descriptor_pool = match unsafe { SpriteDescriptorPool::new(device, frames as u32) } {
            Ok(pool) => pool,
            Err(e) => {
                free_all(&mut ctx.allocator().lock(), &mut uniform_buffers);
                return Err(e);
            }
        };

        let descriptor_sets = match unsafe { descriptor_pool.allocate(device, set_layout) } {
            Ok(sets) => sets,
            Err(e) => {
                unsafe { descriptor_pool.destroy(device) };
                free_all(&mut ctx.allocator().lock(), &mut uniform_buffers);
                return Err(e);
            }
        };

        for (set, buffer) in descriptor_sets.iter().zip(&uniform_buffers) {
            unsafe {
                write_sprite_set(
                    device,
                    *set,
                    buffer.buffer,
                    uniform_size,
                    texture.view,
                    texture.sampler,
                );
            }
        }

        Ok(Self {
            uniform_buffers,
            descriptor_pool,
            descriptor_sets,
        })
    }

    /// Write `data` into the mapped uniform buffer of `frame`.
    pub fn update_uniform(&mut self, frame: usize, data: &ProjView) -> Result<()> {
        let count = self.uniform_buffers.len();
        self.uniform_buffers
            .get_mut(frame)
            .ok_or_else(|| GpuError::InvalidState(format!("frame {frame} of {count}")))?
            .write(std::slice::from_ref(data))
    }

    pub fn descriptor_set(&self, frame: usize) -> Option<vk::DescriptorSet> {
        self.descriptor_sets.get(frame).copied()
    }

    pub fn frames(&self) -> usize {
        self.uniform_buffers.len()
    }

    /// Destroy the pool and free the uniform buffers.
    ///
    /// # Safety
    /// The device must be valid and no frame may still be in flight.
    pub unsafe fn destroy(&mut self, device: &ash::Device, allocator: &mut GpuAllocator) {
        unsafe { self.descriptor_pool.destroy(device) };
        self.descriptor_sets.clear();
        free_all(allocator, &mut self.uniform_buffers);
    }
}

fn free_all(allocator: &mut GpuAllocator, buffers: &mut Vec<GpuBuffer>) {
    for mut buffer in buffers.drain(..) {
        if let Err(e) = allocator.free_buffer(&mut buffer) {
            tracing::warn!("Failed to free uniform buffer: {e}");
        }
    }
}
