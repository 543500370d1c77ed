//! Synchronization primitives.

use crate::error::{Result, VkResultExt};
use ash::vk;

/// Create a semaphore.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_semaphore(device: &ash::Device) -> Result<vk::Semaphore> {
    let create_info = vk::SemaphoreCreateInfo::default();
    unsafe { device.create_semaphore(&create_info, None) }.during("vkCreateSemaphore")
}

/// Create a fence.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_fence(device: &ash::Device, signaled: bool) -> Result<vk::Fence> {
    let flags = if signaled {
        vk::FenceCreateFlags::SIGNALED
    } else {
        vk::FenceCreateFlags::empty()
    };

    let create_info = vk::FenceCreateInfo::default().flags(flags);
    unsafe { device.create_fence(&create_info, None) }.during("vkCreateFence")
}

/// Per-frame-in-flight synchronization.
#[derive(Debug, Clone, Copy)]
pub struct FrameSync {
    /// Signaled when the acquired image is ready to be rendered to.
    pub image_available: vk::Semaphore,
    /// Signaled when the GPU has finished this frame's submission.
    pub in_flight: vk::Fence,
}

impl FrameSync {
    /// # Safety
    /// The device must be valid.
    pub unsafe fn new(device: &ash::Device) -> Result<Self> {
        unsafe {
            Ok(Self {
                image_available: create_semaphore(device)?,
                in_flight: create_fence(device, true)?,
            })
        }
    }

    /// Block until the GPU is done with this frame.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn wait(&self, device: &ash::Device) -> Result<()> {
        unsafe { device.wait_for_fences(&[self.in_flight], true, u64::MAX) }
            .during("vkWaitForFences")
    }

    /// Reset the fence before resubmitting.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn reset(&self, device: &ash::Device) -> Result<()> {
        unsafe { device.reset_fences(&[self.in_flight]) }.during("vkResetFences")
    }

    /// # Safety
    /// The device must be valid and resources must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        unsafe {
            device.destroy_semaphore(self.image_available, None);
            device.destroy_fence(self.in_flight, None);
        }
    }
}

/// Synchronization for every frame in flight plus one render-finished
/// semaphore per swapchain image.
///
/// Presentation of an image may still be reading its semaphore when the next
/// frame starts, so those are keyed by image rather than by frame.
pub struct FrameSyncManager {
    frame_syncs: Vec<FrameSync>,
    render_finished: Vec<vk::Semaphore>,
    current_frame: usize,
}

impl FrameSyncManager {
    /// # Safety
    /// The device must be valid.
    pub unsafe fn new(
        device: &ash::Device,
        frames_in_flight: usize,
        swapchain_images: usize,
    ) -> Result<Self> {
        let mut manager = Self {
            frame_syncs: Vec::with_capacity(frames_in_flight),
            render_finished: Vec::new(),
            current_frame: 0,
        };
        for _ in 0..frames_in_flight {
            match unsafe { FrameSync::new(device) } {
                Ok(sync) => manager.frame_syncs.push(sync),
                Err(e) => {
                    unsafe { manager.destroy(device) };
                    return Err(e);
                }
            }
        }
        if let Err(e) = unsafe { manager.resize_images(device, swapchain_images) } {
            unsafe { manager.destroy(device) };
            return Err(e);
        }
        Ok(manager)
    }

    /// Rebuild the per-image semaphores for a recreated swapchain.
    ///
    /// # Safety
    /// The device must be idle.
    pub unsafe fn resize_images(&mut self, device: &ash::Device, swapchain_images: usize) -> Result<()> {
        for semaphore in self.render_finished.drain(..) {
            unsafe { device.destroy_semaphore(semaphore, None) };
        }
        for _ in 0..swapchain_images {
            let semaphore = unsafe { create_semaphore(device) }?;
            self.render_finished.push(semaphore);
        }
        Ok(())
    }

    /// Get the current frame's sync resources.
    pub fn current(&self) -> &FrameSync {
        &self.frame_syncs[self.current_frame]
    }

    /// Semaphore signaled when rendering to `image_index` completes.
    pub fn render_finished(&self, image_index: u32) -> Option<vk::Semaphore> {
        self.render_finished.get(image_index as usize).copied()
    }

    /// Advance to the next frame.
    pub fn advance(&mut self) {
        self.current_frame = next_frame(self.current_frame, self.frame_syncs.len());
    }

    /// Get the current frame index.
    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    pub fn frames_in_flight(&self) -> usize {
        self.frame_syncs.len()
    }

    /// Destroy all resources.
    ///
    /// # Safety
    /// The device must be valid and all resources must not be in use.
    pub unsafe fn destroy(&mut self, device: &ash::Device) {
        for sync in self.frame_syncs.drain(..) {
            unsafe { sync.destroy(device) };
        }
        for semaphore in self.render_finished.drain(..) {
            unsafe { device.destroy_semaphore(semaphore, None) };
        }
    }
}

/// Frame index after `current`, wrapping at `frames_in_flight`.
pub fn next_frame(current: usize, frames_in_flight: usize) -> usize {
    if frames_in_flight == 0 {
        0
    } else {
        (current + 1) % frames_in_flight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_index_rotates() {
        let mut frame = 0;
        let seen: Vec<usize> = (0..5)
            .map(|_| {
                frame = next_frame(frame, 2);
                frame
            })
            .collect();
        assert_eq!(seen, vec![1, 0, 1, 0, 1]);
    }

    #[test]
    fn single_frame_stays_put() {
        assert_eq!(next_frame(0, 1), 0);
        assert_eq!(next_frame(0, 0), 0);
    }
}
