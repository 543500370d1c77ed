//! Swapchain management.

use crate::device::{QueueFamilyBinding, SwapchainSupport};
use crate::error::{GpuError, Result, VkResultExt};
use ash::vk;
use sprig_core::limits::SWAPCHAIN_IMAGES_CAP;
use sprig_core::BoundedList;
use tracing::info;

/// The only surface format the engine renders to.
pub const PREFERRED_SURFACE_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_SRGB,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

/// Outcome of acquiring a swapchain image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// An image is ready; `suboptimal` asks for a recreate after this frame.
    Image { index: u32, suboptimal: bool },
    /// The chain no longer matches the surface and nothing was acquired.
    OutOfDate,
}

/// Swapchain wrapper.
pub struct Swapchain {
    pub swapchain: vk::SwapchainKHR,
    pub images: BoundedList<vk::Image>,
    pub image_views: Vec<vk::ImageView>,
    pub format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
}

impl Swapchain {
    /// Create a swapchain, passing `old_swapchain` along when resizing.
    ///
    /// # Safety
    /// All handles must be valid and `old_swapchain`, if any, must belong to
    /// `surface`.
    #[allow(clippy::too_many_arguments)]
    pub unsafe fn new(
        device: &ash::Device,
        swapchain_loader: &ash::khr::swapchain::Device,
        surface: vk::SurfaceKHR,
        support: &SwapchainSupport,
        families: QueueFamilyBinding,
        width: u32,
        height: u32,
        old_swapchain: Option<vk::SwapchainKHR>,
    ) -> Result<Self> {
        let format = select_surface_format(&support.formats)?;
        let present_mode = select_present_mode(&support.present_modes);
        let image_count = image_count(&support.capabilities);
        let extent = calculate_extent(&support.capabilities, width, height);

        let family_indices = [families.graphics, families.present];
        let sharing_mode = if families.is_shared() {
            vk::SharingMode::EXCLUSIVE
        } else {
            vk::SharingMode::CONCURRENT
        };
        let shared_families: &[u32] = if families.is_shared() {
            &[]
        } else {
            &family_indices
        };

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(image_count)
            .image_format(format.format)
            .image_color_space(format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(sharing_mode)
            .queue_family_indices(shared_families)
            .pre_transform(support.capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain.unwrap_or(vk::SwapchainKHR::null()));

        let swapchain = unsafe { swapchain_loader.create_swapchain(&create_info, None) }
            .during("vkCreateSwapchainKHR")?;

        let images = unsafe { swapchain_loader.get_swapchain_images(swapchain) }
            .during("vkGetSwapchainImagesKHR")
            .and_then(|raw| {
                BoundedList::from_iter_checked("swapchain images", SWAPCHAIN_IMAGES_CAP, raw)
                    .map_err(GpuError::from)
            });
        let images = match images {
            Ok(images) => images,
            Err(e) => {
                unsafe { swapchain_loader.destroy_swapchain(swapchain, None) };
                return Err(e);
            }
        };

        info!(
            "{} swapchain: {}x{}, {} images, {:?}",
            if old_swapchain.is_some() { "recreated" } else { "created" },
            extent.width,
            extent.height,
            images.len(),
            present_mode
        );

        let mut chain = Self {
            swapchain,
            images,
            image_views: Vec::new(),
            format,
            present_mode,
            extent,
        };
        if let Err(e) = unsafe { chain.create_image_views(device) } {
            unsafe { chain.destroy(device, swapchain_loader) };
            return Err(e);
        }
        Ok(chain)
    }

    /// Create a 2D color view with identity swizzle for every image.
    ///
    /// # Safety
    /// The device must be valid.
    unsafe fn create_image_views(&mut self, device: &ash::Device) -> Result<()> {
        for &image in &self.images {
            let view_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(self.format.format)
                .components(vk::ComponentMapping::default())
                .subresource_range(
                    vk::ImageSubresourceRange::default()
                        .aspect_mask(vk::ImageAspectFlags::COLOR)
                        .base_mip_level(0)
                        .level_count(1)
                        .base_array_layer(0)
                        .layer_count(1),
                );

            let view = unsafe { device.create_image_view(&view_info, None) }
                .during("vkCreateImageView")?;
            self.image_views.push(view);
        }
        Ok(())
    }

    /// Number of images in the chain.
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Acquire the next image.
    ///
    /// # Safety
    /// All handles must be valid.
    pub unsafe fn acquire_next_image(
        &self,
        swapchain_loader: &ash::khr::swapchain::Device,
        semaphore: vk::Semaphore,
        timeout_ns: u64,
    ) -> Result<AcquireOutcome> {
        let result = unsafe {
            swapchain_loader.acquire_next_image(
                self.swapchain,
                timeout_ns,
                semaphore,
                vk::Fence::null(),
            )
        };

        match result {
            Ok((index, suboptimal)) => Ok(AcquireOutcome::Image { index, suboptimal }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::OutOfDate),
            Err(result) => Err(GpuError::Vulkan {
                op: "vkAcquireNextImageKHR",
                result,
            }),
        }
    }

    /// Present an image. Returns `true` when the chain should be recreated.
    ///
    /// # Safety
    /// All handles must be valid.
    pub unsafe fn present(
        &self,
        swapchain_loader: &ash::khr::swapchain::Device,
        queue: vk::Queue,
        image_index: u32,
        wait_semaphores: &[vk::Semaphore],
    ) -> Result<bool> {
        let swapchains = [self.swapchain];
        let image_indices = [image_index];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        match unsafe { swapchain_loader.queue_present(queue, &present_info) } {
            Ok(suboptimal) => Ok(suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(true),
            Err(result) => Err(GpuError::Vulkan {
                op: "vkQueuePresentKHR",
                result,
            }),
        }
    }

    /// Destroy the image views and the swapchain.
    ///
    /// # Safety
    /// All handles must be valid and the swapchain must not be in use.
    pub unsafe fn destroy(
        &mut self,
        device: &ash::Device,
        swapchain_loader: &ash::khr::swapchain::Device,
    ) {
        for view in self.image_views.drain(..) {
            unsafe { device.destroy_image_view(view, None) };
        }
        unsafe { swapchain_loader.destroy_swapchain(self.swapchain, None) };
        self.swapchain = vk::SwapchainKHR::null();
    }
}

/// Pick B8G8R8A8_SRGB / SRGB_NONLINEAR or fail.
pub fn select_surface_format(available: &[vk::SurfaceFormatKHR]) -> Result<vk::SurfaceFormatKHR> {
    available
        .iter()
        .copied()
        .find(|f| {
            f.format == PREFERRED_SURFACE_FORMAT.format
                && f.color_space == PREFERRED_SURFACE_FORMAT.color_space
        })
        .ok_or(GpuError::UnsupportedSurfaceFormat)
}

/// Prefer MAILBOX, fall back to FIFO which every driver supports.
pub fn select_present_mode(available: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if available.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// `clamp(min + 1, min, max)`, where a `max` of zero means unbounded.
pub fn image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let min = capabilities.min_image_count;
    let desired = min.saturating_add(1);
    if capabilities.max_image_count == 0 {
        desired
    } else {
        desired.clamp(min, capabilities.max_image_count.max(min))
    }
}

/// Calculate swapchain extent.
pub fn calculate_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    desired_width: u32,
    desired_height: u32,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: desired_width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: desired_height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(min: u32, max: u32) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min,
            max_image_count: max,
            ..Default::default()
        }
    }

    #[test]
    fn image_count_stays_within_bounds() {
        for min in 1..6 {
            for max in min..8 {
                let count = image_count(&caps(min, max));
                assert!(min <= count && count <= max, "min={min} max={max}");
                if min < max {
                    assert_eq!(count, min + 1);
                }
            }
        }
    }

    #[test]
    fn image_count_clamps_to_max() {
        assert_eq!(image_count(&caps(3, 3)), 3);
    }

    #[test]
    fn image_count_unbounded_max() {
        assert_eq!(image_count(&caps(2, 0)), 3);
    }

    #[test]
    fn srgb_format_selected_when_present() {
        let formats = [
            vk::SurfaceFormatKHR {
                format: vk::Format::R8G8B8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            PREFERRED_SURFACE_FORMAT,
        ];
        let chosen = select_surface_format(&formats).unwrap();
        assert_eq!(chosen.format, vk::Format::B8G8R8A8_SRGB);
        assert_eq!(chosen.color_space, vk::ColorSpaceKHR::SRGB_NONLINEAR);
    }

    #[test]
    fn srgb_format_missing_fails() {
        let formats = [vk::SurfaceFormatKHR {
            format: vk::Format::B8G8R8A8_UNORM,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }];
        assert!(matches!(
            select_surface_format(&formats),
            Err(GpuError::UnsupportedSurfaceFormat)
        ));
        assert!(select_surface_format(&[]).is_err());
    }

    #[test]
    fn mailbox_preferred() {
        let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX];
        assert_eq!(select_present_mode(&modes), vk::PresentModeKHR::MAILBOX);
    }

    #[test]
    fn fifo_fallback() {
        let modes = [vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::FIFO];
        assert_eq!(select_present_mode(&modes), vk::PresentModeKHR::FIFO);
        assert_eq!(select_present_mode(&[]), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn extent_follows_surface_when_fixed() {
        let mut c = caps(2, 3);
        c.current_extent = vk::Extent2D {
            width: 640,
            height: 480,
        };
        let extent = calculate_extent(&c, 800, 800);
        assert_eq!((extent.width, extent.height), (640, 480));
    }

    #[test]
    fn extent_clamped_when_surface_defers() {
        let mut c = caps(2, 3);
        c.current_extent = vk::Extent2D {
            width: u32::MAX,
            height: u32::MAX,
        };
        c.min_image_extent = vk::Extent2D {
            width: 1,
            height: 1,
        };
        c.max_image_extent = vk::Extent2D {
            width: 1024,
            height: 512,
        };
        let extent = calculate_extent(&c, 800, 800);
        assert_eq!((extent.width, extent.height), (800, 512));
    }
}
