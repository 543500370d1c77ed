//! Physical device support checks, queue family selection and logical device
//! creation.

use crate::error::{GpuError, Result, VkResultExt};
use crate::instance::{driver_name, missing_names};
use crate::surface::SurfaceBinding;
use ash::vk;
use sprig_core::limits::{
    REQUIRED_DEVICE_EXTENSIONS_CAP, SWAPCHAIN_FORMATS_CAP, SWAPCHAIN_PRESENT_MODES_CAP,
};
use sprig_core::BoundedList;
use std::ffi::{c_char, CStr, CString};
use tracing::{debug, info};

/// Drivers that advertise this extension require it to be enabled.
pub const PORTABILITY_SUBSET: &CStr = ash::khr::portability_subset::NAME;

/// Surface properties cached from the selected physical device.
#[derive(Debug, Clone)]
pub struct SwapchainSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: BoundedList<vk::SurfaceFormatKHR>,
    pub present_modes: BoundedList<vk::PresentModeKHR>,
}

impl SwapchainSupport {
    /// Query capabilities, formats and present modes for `device`.
    pub fn query(surface: &SurfaceBinding, device: vk::PhysicalDevice) -> Result<Self> {
        let loader = surface.loader();
        let handle = surface.handle();

        // SAFETY: device and surface belong to the same instance.
        let (capabilities, formats, present_modes) = unsafe {
            (
                loader
                    .get_physical_device_surface_capabilities(device, handle)
                    .during("vkGetPhysicalDeviceSurfaceCapabilitiesKHR")?,
                loader
                    .get_physical_device_surface_formats(device, handle)
                    .during("vkGetPhysicalDeviceSurfaceFormatsKHR")?,
                loader
                    .get_physical_device_surface_present_modes(device, handle)
                    .during("vkGetPhysicalDeviceSurfacePresentModesKHR")?,
            )
        };

        debug!("physical device surface formats count: {}", formats.len());
        debug!(
            "physical device surface present modes count: {}",
            present_modes.len()
        );

        Ok(Self {
            capabilities,
            formats: BoundedList::from_iter_checked(
                "surface formats",
                SWAPCHAIN_FORMATS_CAP,
                formats,
            )?,
            present_modes: BoundedList::from_iter_checked(
                "present modes",
                SWAPCHAIN_PRESENT_MODES_CAP,
                present_modes,
            )?,
        })
    }

    /// Re-read only the capabilities, which change with the drawable size.
    pub fn refresh_capabilities(
        &mut self,
        surface: &SurfaceBinding,
        device: vk::PhysicalDevice,
    ) -> Result<()> {
        // SAFETY: device and surface belong to the same instance.
        self.capabilities = unsafe {
            surface
                .loader()
                .get_physical_device_surface_capabilities(device, surface.handle())
        }
        .during("vkGetPhysicalDeviceSurfaceCapabilitiesKHR")?;
        Ok(())
    }
}

/// Build the device extension list: swapchain, plus the portability subset
/// when the device advertises it.
pub fn required_device_extensions<A: AsRef<CStr>>(
    available: &[A],
) -> Result<BoundedList<CString>> {
    let mut required = BoundedList::new(
        "required device extensions",
        REQUIRED_DEVICE_EXTENSIONS_CAP,
    );
    required.push(ash::khr::swapchain::NAME.to_owned())?;
    if available.iter().any(|a| a.as_ref() == PORTABILITY_SUBSET) {
        required.push(PORTABILITY_SUBSET.to_owned())?;
    }
    Ok(required)
}

/// Verify the device can drive a swapchain on `surface` and cache its
/// surface properties.
///
/// Returns the device extension list to enable.
pub fn assert_swapchain_supported(
    instance: &ash::Instance,
    device: vk::PhysicalDevice,
    surface: &SurfaceBinding,
) -> Result<(BoundedList<CString>, SwapchainSupport)> {
    // SAFETY: `device` was enumerated from `instance`.
    let properties = unsafe { instance.enumerate_device_extension_properties(device) }
        .during("vkEnumerateDeviceExtensionProperties")?;
    let available: Vec<CString> = properties
        .iter()
        .map(|p| driver_name(&p.extension_name))
        .collect();
    info!("physical device extensions count: {}", available.len());

    let required = required_device_extensions(&available)?;
    let missing = missing_names(&required, &available);

    info!("required device extensions:");
    for name in &required {
        let name = name.to_string_lossy();
        let found = !missing.iter().any(|m| *m == name);
        info!("  {name}{}", if found { " (required)" } else { " (missing)" });
    }

    if !missing.is_empty() {
        return Err(GpuError::MissingExtensions {
            scope: "device",
            names: missing,
        });
    }

    let support = SwapchainSupport::query(surface, device)?;
    Ok((required, support))
}

/// Queue families chosen for graphics submission and presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilyBinding {
    pub graphics: u32,
    pub present: u32,
}

impl QueueFamilyBinding {
    /// One family serves both graphics and present.
    #[must_use]
    pub const fn is_shared(&self) -> bool {
        self.graphics == self.present
    }

    /// Distinct family indices, graphics first.
    #[must_use]
    pub fn unique_families(&self) -> Vec<u32> {
        if self.is_shared() {
            vec![self.graphics]
        } else {
            vec![self.graphics, self.present]
        }
    }
}

/// Choose queue families from per-family `(graphics, present)` support.
///
/// The first family offering both wins. Otherwise the first graphics family
/// and the first present family are used.
pub fn select_queue_families(families: &[(bool, bool)]) -> Result<QueueFamilyBinding> {
    if let Some(shared) = families.iter().position(|&(g, p)| g && p) {
        let index = shared as u32;
        return Ok(QueueFamilyBinding {
            graphics: index,
            present: index,
        });
    }

    let graphics = families
        .iter()
        .position(|&(g, _)| g)
        .ok_or(GpuError::NoGraphicsQueue)?;
    let present = families
        .iter()
        .position(|&(_, p)| p)
        .ok_or(GpuError::NoPresentQueue)?;

    Ok(QueueFamilyBinding {
        graphics: graphics as u32,
        present: present as u32,
    })
}

/// Enumerate and log the queue families of `device`, then select from them.
pub fn find_queue_families(
    instance: &ash::Instance,
    device: vk::PhysicalDevice,
    surface: &SurfaceBinding,
) -> Result<QueueFamilyBinding> {
    // SAFETY: `device` was enumerated from `instance`.
    let families = unsafe { instance.get_physical_device_queue_family_properties(device) };

    debug!("device queue families:");
    let mut support = Vec::with_capacity(families.len());
    for (i, family) in families.iter().enumerate() {
        let flags = family.queue_flags;
        let graphics = flags.contains(vk::QueueFlags::GRAPHICS);
        let present = surface.supports_present(device, i as u32)?;
        info!(
            "  {i}: flags:{}{}{}{}{}{}",
            if present { " PRESENT" } else { "" },
            if graphics { " GRAPHICS" } else { "" },
            if flags.contains(vk::QueueFlags::COMPUTE) { " COMPUTE" } else { "" },
            if flags.contains(vk::QueueFlags::TRANSFER) { " TRANSFER" } else { "" },
            if flags.contains(vk::QueueFlags::SPARSE_BINDING) { " SPARSE" } else { "" },
            if flags.contains(vk::QueueFlags::PROTECTED) { " PROTECT" } else { "" },
        );
        support.push((graphics, present));
    }

    let binding = select_queue_families(&support)?;
    if binding.is_shared() {
        info!(
            "will choose queue {} because it has both GRAPHICS and PRESENT families",
            binding.graphics
        );
    } else {
        info!(
            "will choose queue {} because it has GRAPHICS family",
            binding.graphics
        );
        info!(
            "will choose queue {} because it has PRESENT family",
            binding.present
        );
    }
    Ok(binding)
}

/// Create the logical device with one queue per unique family and fetch the
/// graphics and present queues.
///
/// Only sampler anisotropy is enabled, and only when `anisotropy` is set.
///
/// # Safety
/// `physical_device` must have been enumerated from `instance`.
pub unsafe fn create_logical_device(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    families: QueueFamilyBinding,
    extensions: &[CString],
    layers: &[CString],
    anisotropy: bool,
) -> Result<(ash::Device, vk::Queue, vk::Queue)> {
    let queue_priority = 1.0_f32;
    let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = families
        .unique_families()
        .into_iter()
        .map(|family| {
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(family)
                .queue_priorities(std::slice::from_ref(&queue_priority))
        })
        .collect();

    let extension_names: Vec<*const c_char> = extensions.iter().map(|e| e.as_ptr()).collect();
    let layer_names: Vec<*const c_char> = layers.iter().map(|l| l.as_ptr()).collect();

    let features = vk::PhysicalDeviceFeatures::default().sampler_anisotropy(anisotropy);

    // Device layers are ignored by current loaders but older ones still read them.
    #[allow(deprecated)]
    let create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_create_infos)
        .enabled_extension_names(&extension_names)
        .enabled_layer_names(&layer_names)
        .enabled_features(&features);

    let device = unsafe { instance.create_device(physical_device, &create_info, None) }
        .during("vkCreateDevice")?;

    let (graphics_queue, present_queue) = unsafe {
        (
            device.get_device_queue(families.graphics, 0),
            device.get_device_queue(families.present, 0),
        )
    };

    Ok((device, graphics_queue, present_queue))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_family_is_preferred() {
        let families = [(true, false), (false, true), (true, true)];
        let binding = select_queue_families(&families).unwrap();
        assert_eq!(binding, QueueFamilyBinding { graphics: 2, present: 2 });
        assert!(binding.is_shared());
        assert_eq!(binding.unique_families(), vec![2]);
    }

    #[test]
    fn first_combined_family_wins() {
        let families = [(false, false), (true, true), (true, true)];
        let binding = select_queue_families(&families).unwrap();
        assert_eq!(binding.graphics, 1);
        assert_eq!(binding.present, 1);
    }

    #[test]
    fn split_families_take_first_of_each() {
        let families = [(false, false), (true, false), (false, true), (true, false), (false, true)];
        let binding = select_queue_families(&families).unwrap();
        assert_eq!(binding, QueueFamilyBinding { graphics: 1, present: 2 });
        assert!(!binding.is_shared());
        assert_eq!(binding.unique_families(), vec![1, 2]);
    }

    #[test]
    fn missing_graphics_fails() {
        let families = [(false, true), (false, true)];
        assert!(matches!(
            select_queue_families(&families),
            Err(GpuError::NoGraphicsQueue)
        ));
    }

    #[test]
    fn missing_present_fails() {
        let families = [(true, false)];
        assert!(matches!(
            select_queue_families(&families),
            Err(GpuError::NoPresentQueue)
        ));
        assert!(matches!(select_queue_families(&[]), Err(GpuError::NoGraphicsQueue)));
    }

    #[test]
    fn swapchain_extension_always_required() {
        let available = [c"VK_KHR_swapchain".to_owned()];
        let required = required_device_extensions(&available).unwrap();
        assert_eq!(required.as_slice(), &[ash::khr::swapchain::NAME.to_owned()]);
    }

    #[test]
    fn advertised_portability_subset_is_requested() {
        let available = [
            c"VK_KHR_swapchain".to_owned(),
            PORTABILITY_SUBSET.to_owned(),
        ];
        let required = required_device_extensions(&available).unwrap();
        assert_eq!(required.len(), 2);
        assert!(required.contains(&PORTABILITY_SUBSET.to_owned()));
        assert!(missing_names(&required, &available).is_empty());
    }
}
