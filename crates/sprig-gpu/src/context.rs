//! GPU context: instance, surface, physical and logical device.

use crate::device::{
    assert_swapchain_supported, create_logical_device, find_queue_families, QueueFamilyBinding,
    SwapchainSupport,
};
use crate::error::{GpuError, Result, VkResultExt};
use crate::instance::DriverContext;
use crate::memory::GpuAllocator;
use crate::platform::PlatformProfile;
use crate::surface::{window_required_extensions, SurfaceBinding};
use ash::vk;
use parking_lot::Mutex;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use sprig_core::BoundedList;
use std::ffi::CString;
use std::sync::Arc;

/// Everything bound to one window's device: driver, surface, logical device,
/// queues and allocator.
pub struct GpuContext {
    pub(crate) driver: DriverContext,
    pub(crate) surface: SurfaceBinding,
    pub(crate) physical_device: vk::PhysicalDevice,
    pub(crate) device: Arc<ash::Device>,
    pub(crate) swapchain_loader: ash::khr::swapchain::Device,
    pub(crate) allocator: Mutex<GpuAllocator>,
    pub(crate) queue_families: QueueFamilyBinding,
    pub(crate) graphics_queue: vk::Queue,
    pub(crate) present_queue: vk::Queue,
    pub(crate) swapchain_support: SwapchainSupport,
    pub(crate) device_extensions: BoundedList<CString>,
    pub(crate) max_sampler_anisotropy: Option<f32>,
}

impl GpuContext {
    /// Get the Vulkan device handle.
    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    /// Get the Vulkan instance handle.
    pub fn instance(&self) -> Result<&ash::Instance> {
        self.driver.instance()
    }

    /// The driver connection.
    pub fn driver(&self) -> &DriverContext {
        &self.driver
    }

    /// Get the physical device handle.
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// The bound window surface.
    pub fn surface(&self) -> &SurfaceBinding {
        &self.surface
    }

    /// Swapchain extension loader.
    pub fn swapchain_loader(&self) -> &ash::khr::swapchain::Device {
        &self.swapchain_loader
    }

    /// Queue families used for graphics and presentation.
    pub fn queue_families(&self) -> QueueFamilyBinding {
        self.queue_families
    }

    /// Get the graphics queue.
    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    /// Get the present queue.
    pub fn present_queue(&self) -> vk::Queue {
        self.present_queue
    }

    /// Get access to the GPU allocator.
    pub fn allocator(&self) -> &Mutex<GpuAllocator> {
        &self.allocator
    }

    /// Cached surface capabilities, formats and present modes.
    pub fn swapchain_support(&self) -> &SwapchainSupport {
        &self.swapchain_support
    }

    /// Re-read surface capabilities after the drawable changed.
    pub fn refresh_swapchain_support(&mut self) -> Result<()> {
        self.swapchain_support
            .refresh_capabilities(&self.surface, self.physical_device)
    }

    /// Device extensions the logical device was created with.
    pub fn device_extensions(&self) -> &BoundedList<CString> {
        &self.device_extensions
    }

    /// Maximum sampler anisotropy, if the feature is enabled.
    pub fn max_sampler_anisotropy(&self) -> Option<f32> {
        self.max_sampler_anisotropy
    }

    /// Wait for device to be idle.
    pub fn wait_idle(&self) -> Result<()> {
        unsafe { self.device.device_wait_idle() }.during("vkDeviceWaitIdle")
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();

            // Frees every VkDeviceMemory, so it must precede the device.
            self.allocator.lock().shutdown();

            self.device.destroy_device(None);
            self.surface.destroy();
            self.driver.destroy();
        }
    }
}

/// Builder for creating a GPU context.
pub struct GpuContextBuilder {
    app_name: String,
    engine_name: String,
    app_version: u32,
    enable_validation: bool,
    device_index: usize,
    profile: PlatformProfile,
}

impl Default for GpuContextBuilder {
    fn default() -> Self {
        Self {
            app_name: "Sprig".to_string(),
            engine_name: "Sprig".to_string(),
            app_version: vk::make_api_version(0, 0, 1, 0),
            enable_validation: cfg!(debug_assertions),
            device_index: 0,
            profile: PlatformProfile::detect(),
        }
    }
}

impl GpuContextBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application name.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    /// Set the engine name reported to the driver.
    pub fn engine_name(mut self, name: impl Into<String>) -> Self {
        self.engine_name = name.into();
        self
    }

    /// Set the application version as `major.minor.patch`.
    pub fn app_version(mut self, major: u32, minor: u32, patch: u32) -> Self {
        self.app_version = vk::make_api_version(0, major, minor, patch);
        self
    }

    /// Enable or disable validation layers.
    pub fn validation(mut self, enable: bool) -> Self {
        self.enable_validation = enable;
        self
    }

    /// Use the physical device at this enumeration index.
    pub fn device_index(mut self, index: usize) -> Self {
        self.device_index = index;
        self
    }

    /// Override the detected platform profile.
    pub fn platform(mut self, profile: PlatformProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Bring up the driver, bind `window` and create the logical device.
    ///
    /// # Safety
    /// `window` must outlive the returned context.
    pub unsafe fn build<W>(self, window: &W) -> Result<GpuContext>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let display = window
            .display_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("display handle: {e}")))?;

        let mut driver = DriverContext::init(self.profile)?;
        driver.require_extensions(window_required_extensions(display.as_raw())?)?;
        driver.assert_validation_layers_supported(self.enable_validation)?;
        driver.assert_driver_extensions_supported()?;
        driver.create_instance(&self.app_name, &self.engine_name, self.app_version)?;

        match unsafe { self.bind_device(&driver, window) } {
            Ok((surface, parts)) => Ok(parts.into_context(driver, surface)),
            Err(e) => {
                unsafe { driver.destroy() };
                Err(e)
            }
        }
    }

    unsafe fn bind_device<W>(
        &self,
        driver: &DriverContext,
        window: &W,
    ) -> Result<(SurfaceBinding, DeviceParts)>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let physical_device = driver.select_physical_device(self.device_index)?;
        let surface = unsafe { SurfaceBinding::bind(driver, window) }?;

        match unsafe { Self::create_device(driver, physical_device, &surface) } {
            Ok(parts) => Ok((surface, parts)),
            Err(e) => {
                unsafe { surface.destroy() };
                Err(e)
            }
        }
    }

    unsafe fn create_device(
        driver: &DriverContext,
        physical_device: vk::PhysicalDevice,
        surface: &SurfaceBinding,
    ) -> Result<DeviceParts> {
        let instance = driver.instance()?;
        let (device_extensions, swapchain_support) =
            assert_swapchain_supported(instance, physical_device, surface)?;
        let queue_families = find_queue_families(instance, physical_device, surface)?;

        let (features, properties) = unsafe {
            (
                instance.get_physical_device_features(physical_device),
                instance.get_physical_device_properties(physical_device),
            )
        };
        let anisotropy = features.sampler_anisotropy == vk::TRUE;
        let max_sampler_anisotropy =
            anisotropy.then_some(properties.limits.max_sampler_anisotropy);

        let (device, graphics_queue, present_queue) = unsafe {
            create_logical_device(
                instance,
                physical_device,
                queue_families,
                &device_extensions,
                driver.required_layers(),
                anisotropy,
            )
        }?;
        let device = Arc::new(device);

        let allocator =
            match unsafe { GpuAllocator::new(instance, device.clone(), physical_device) } {
                Ok(allocator) => allocator,
                Err(e) => {
                    unsafe { device.destroy_device(None) };
                    return Err(e);
                }
            };

        let swapchain_loader = ash::khr::swapchain::Device::new(instance, &device);

        Ok(DeviceParts {
            physical_device,
            device,
            swapchain_loader,
            allocator,
            queue_families,
            graphics_queue,
            present_queue,
            swapchain_support,
            device_extensions,
            max_sampler_anisotropy,
        })
    }
}

struct DeviceParts {
    physical_device: vk::PhysicalDevice,
    device: Arc<ash::Device>,
    swapchain_loader: ash::khr::swapchain::Device,
    allocator: GpuAllocator,
    queue_families: QueueFamilyBinding,
    graphics_queue: vk::Queue,
    present_queue: vk::Queue,
    swapchain_support: SwapchainSupport,
    device_extensions: BoundedList<CString>,
    max_sampler_anisotropy: Option<f32>,
}

impl DeviceParts {
    fn into_context(self, driver: DriverContext, surface: SurfaceBinding) -> GpuContext {
        GpuContext {
            driver,
            surface,
            physical_device: self.physical_device,
            device: self.device,
            swapchain_loader: self.swapchain_loader,
            allocator: Mutex::new(self.allocator),
            queue_families: self.queue_families,
            graphics_queue: self.graphics_queue,
            present_queue: self.present_queue,
            swapchain_support: self.swapchain_support,
            device_extensions: self.device_extensions,
            max_sampler_anisotropy: self.max_sampler_anisotropy,
        }
    }
}
