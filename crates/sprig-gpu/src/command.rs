//! Command pool and one-off command submission.

use crate::error::{Result, VkResultExt};
use ash::vk;

/// Command pool for allocating command buffers.
pub struct CommandPool {
    pool: vk::CommandPool,
    queue_family: u32,
}

impl CommandPool {
    /// Create a pool whose buffers can be reset individually.
    ///
    /// # Safety
    /// The device must be valid and the queue family must exist.
    pub unsafe fn new(device: &ash::Device, queue_family: u32) -> Result<Self> {
        let create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(queue_family)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

        let pool = unsafe { device.create_command_pool(&create_info, None) }
            .during("vkCreateCommandPool")?;

        Ok(Self { pool, queue_family })
    }

    /// Get the raw pool handle.
    pub fn handle(&self) -> vk::CommandPool {
        self.pool
    }

    /// Get the queue family index.
    pub fn queue_family(&self) -> u32 {
        self.queue_family
    }

    /// Allocate `count` primary command buffers.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn allocate_command_buffers(
        &self,
        device: &ash::Device,
        count: u32,
    ) -> Result<Vec<vk::CommandBuffer>> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        unsafe { device.allocate_command_buffers(&alloc_info) }.during("vkAllocateCommandBuffers")
    }

    /// Destroy the command pool.
    ///
    /// # Safety
    /// The device must be valid and the pool must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        unsafe { device.destroy_command_pool(self.pool, None) };
    }
}

/// Allocate a primary buffer and begin it for a single submission.
///
/// # Safety
/// The device and pool must be valid.
pub unsafe fn begin_single_time_commands(
    device: &ash::Device,
    pool: &CommandPool,
) -> Result<vk::CommandBuffer> {
    let cmd = unsafe { pool.allocate_command_buffers(device, 1) }?[0];
    let begin_info =
        vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
    if let Err(result) = unsafe { device.begin_command_buffer(cmd, &begin_info) } {
        unsafe { device.free_command_buffers(pool.handle(), &[cmd]) };
        return Err(crate::GpuError::Vulkan {
            op: "vkBeginCommandBuffer",
            result,
        });
    }
    Ok(cmd)
}

/// End `cmd`, submit it, block until the queue is idle and free it.
///
/// # Safety
/// All handles must be valid and `cmd` must come from
/// [`begin_single_time_commands`] on `pool`.
pub unsafe fn end_single_time_commands(
    device: &ash::Device,
    pool: &CommandPool,
    queue: vk::Queue,
    cmd: vk::CommandBuffer,
) -> Result<()> {
    let result = unsafe { submit_and_wait(device, queue, cmd) };
    unsafe { device.free_command_buffers(pool.handle(), &[cmd]) };
    result
}

unsafe fn submit_and_wait(device: &ash::Device, queue: vk::Queue, cmd: vk::CommandBuffer) -> Result<()> {
    unsafe {
        device.end_command_buffer(cmd).during("vkEndCommandBuffer")?;
        let cmd_buffers = [cmd];
        let submit_info = vk::SubmitInfo::default().command_buffers(&cmd_buffers);
        device
            .queue_submit(queue, &[submit_info], vk::Fence::null())
            .during("vkQueueSubmit")?;
        device.queue_wait_idle(queue).during("vkQueueWaitIdle")
    }
}
