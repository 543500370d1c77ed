//! Binding a native window's drawable surface to the instance.

use crate::error::{GpuError, Result, VkResultExt};
use crate::instance::DriverContext;
use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle};
use std::ffi::CStr;

/// Instance extensions the window system needs to present.
pub fn window_required_extensions(display: RawDisplayHandle) -> Result<Vec<&'static CStr>> {
    let raw = ash_window::enumerate_required_extensions(display)
        .during("vkEnumerateRequiredSurfaceExtensions")?;
    Ok(raw
        .iter()
        // SAFETY: ash-window returns pointers to static NUL-terminated names.
        .map(|&ptr| unsafe { CStr::from_ptr(ptr) })
        .collect())
}

/// A presentable surface bound to the instance.
pub struct SurfaceBinding {
    surface: vk::SurfaceKHR,
    loader: ash::khr::surface::Instance,
}

impl SurfaceBinding {
    /// Create a surface for `window`.
    ///
    /// # Safety
    /// The window must outlive the returned binding.
    pub unsafe fn bind<W>(driver: &DriverContext, window: &W) -> Result<Self>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let instance = driver.instance()?;
        let display = window
            .display_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("display handle: {e}")))?;
        let window_handle = window
            .window_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("window handle: {e}")))?;

        let surface = unsafe {
            ash_window::create_surface(
                driver.entry(),
                instance,
                display.as_raw(),
                window_handle.as_raw(),
                None,
            )
        }
        .map_err(|e| GpuError::SurfaceCreation(e.to_string()))?;

        let loader = ash::khr::surface::Instance::new(driver.entry(), instance);
        tracing::debug!("surface bound");

        Ok(Self { surface, loader })
    }

    /// The raw surface handle.
    pub fn handle(&self) -> vk::SurfaceKHR {
        self.surface
    }

    /// The surface extension loader.
    pub fn loader(&self) -> &ash::khr::surface::Instance {
        &self.loader
    }

    /// Whether `queue_family` on `device` can present to this surface.
    pub fn supports_present(&self, device: vk::PhysicalDevice, queue_family: u32) -> Result<bool> {
        // SAFETY: device and surface belong to the same instance.
        unsafe {
            self.loader
                .get_physical_device_surface_support(device, queue_family, self.surface)
        }
        .during("vkGetPhysicalDeviceSurfaceSupportKHR")
    }

    /// Destroy the surface.
    ///
    /// # Safety
    /// No swapchain may still reference the surface.
    pub unsafe fn destroy(&self) {
        unsafe { self.loader.destroy_surface(self.surface, None) };
    }
}
