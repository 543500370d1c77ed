//! Driver connection: loader, validation layers, instance extensions and the
//! instance itself.

use crate::error::{GpuError, Result, VkResultExt};
use crate::platform::PlatformProfile;
use ash::vk;
use sprig_core::limits::{REQUIRED_DRIVER_EXTENSIONS_CAP, REQUIRED_VALIDATION_LAYERS_CAP};
use sprig_core::BoundedList;
use std::ffi::{c_char, CStr, CString};
use tracing::{info, warn};

/// The standard Khronos validation layer.
pub const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Names from `required` that do not appear in `available`.
///
/// Matching is exact and case-sensitive.
#[must_use]
pub fn missing_names<R, A>(required: &[R], available: &[A]) -> Vec<String>
where
    R: AsRef<CStr>,
    A: AsRef<CStr>,
{
    required
        .iter()
        .filter(|name| !available.iter().any(|a| a.as_ref() == name.as_ref()))
        .map(|name| name.as_ref().to_string_lossy().into_owned())
        .collect()
}

/// Pick the device at `index` from an enumeration of `count` devices.
pub fn pick_device_index(index: usize, count: usize) -> Result<usize> {
    if index < count {
        Ok(index)
    } else {
        Err(GpuError::DeviceIndexOutOfRange { index, count })
    }
}

/// Copy a NUL-terminated driver string into an owned `CString`.
pub(crate) fn driver_name(raw: &[c_char]) -> CString {
    // SAFETY: the driver guarantees fixed-size name arrays are NUL-terminated.
    unsafe { CStr::from_ptr(raw.as_ptr()) }.to_owned()
}

/// The loaded driver, the names it must support and, once created, the
/// instance.
pub struct DriverContext {
    entry: ash::Entry,
    instance: Option<ash::Instance>,
    profile: PlatformProfile,
    required_layers: BoundedList<CString>,
    required_extensions: BoundedList<CString>,
    available_layers: Vec<CString>,
    available_extensions: Vec<CString>,
}

impl DriverContext {
    /// Load the driver's function table and start with empty requirement
    /// lists plus whatever the platform profile needs.
    pub fn init(profile: PlatformProfile) -> Result<Self> {
        // SAFETY: the loader is kept alive inside the returned context.
        let entry = unsafe { ash::Entry::load() }
            .map_err(|e| GpuError::LoaderUnavailable(e.to_string()))?;

        let mut driver = Self {
            entry,
            instance: None,
            profile,
            required_layers: BoundedList::new(
                "required validation layers",
                REQUIRED_VALIDATION_LAYERS_CAP,
            ),
            required_extensions: BoundedList::new(
                "required driver extensions",
                REQUIRED_DRIVER_EXTENSIONS_CAP,
            ),
            available_layers: Vec::new(),
            available_extensions: Vec::new(),
        };
        driver.require_extensions(profile.instance_extensions())?;
        Ok(driver)
    }

    /// Add instance extensions to the required list, skipping duplicates.
    pub fn require_extensions<'a, I>(&mut self, names: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a CStr>,
    {
        for name in names {
            self.required_extensions.push_unique(name.to_owned())?;
        }
        Ok(())
    }

    /// Verify every required validation layer is installed.
    ///
    /// With `enable_validation` the Khronos validation layer is added to the
    /// list first. An empty list passes without a check.
    pub fn assert_validation_layers_supported(&mut self, enable_validation: bool) -> Result<()> {
        if enable_validation {
            self.required_layers.push_unique(VALIDATION_LAYER.to_owned())?;
        }

        // SAFETY: the entry is loaded.
        let properties = unsafe { self.entry.enumerate_instance_layer_properties() }
            .during("vkEnumerateInstanceLayerProperties")?;
        self.available_layers = properties
            .iter()
            .map(|p| driver_name(&p.layer_name))
            .collect();

        info!("driver layers count: {}", self.available_layers.len());
        for layer in &self.available_layers {
            let required = self.required_layers.contains(layer);
            info!(
                "  {}{}",
                layer.to_string_lossy(),
                if required { " (required)" } else { "" }
            );
        }

        if self.required_layers.is_empty() {
            return Ok(());
        }

        let missing = missing_names(&self.required_layers, &self.available_layers);
        if missing.is_empty() {
            Ok(())
        } else {
            for name in &missing {
                warn!("  {name} (missing)");
            }
            Err(GpuError::MissingLayers(missing))
        }
    }

    /// Verify every required instance extension is advertised.
    pub fn assert_driver_extensions_supported(&mut self) -> Result<()> {
        // SAFETY: the entry is loaded.
        let properties = unsafe { self.entry.enumerate_instance_extension_properties(None) }
            .during("vkEnumerateInstanceExtensionProperties")?;
        self.available_extensions = properties
            .iter()
            .map(|p| driver_name(&p.extension_name))
            .collect();

        info!("driver extensions count: {}", self.available_extensions.len());
        for ext in &self.available_extensions {
            let required = self.required_extensions.contains(ext);
            info!(
                "  {}{}",
                ext.to_string_lossy(),
                if required { " (required)" } else { "" }
            );
        }

        let missing = missing_names(&self.required_extensions, &self.available_extensions);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(GpuError::MissingExtensions {
                scope: "driver",
                names: missing,
            })
        }
    }

    /// Create the instance with the validated layer and extension lists.
    ///
    /// `version` is packed with [`vk::make_api_version`].
    pub fn create_instance(&mut self, app_name: &str, engine_name: &str, version: u32) -> Result<()> {
        if self.instance.is_some() {
            return Err(GpuError::InvalidState("instance already created".into()));
        }

        let app_name = CString::new(app_name)
            .map_err(|e| GpuError::InvalidState(format!("application name: {e}")))?;
        let engine_name = CString::new(engine_name)
            .map_err(|e| GpuError::InvalidState(format!("engine name: {e}")))?;

        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(version)
            .engine_name(&engine_name)
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(vk::API_VERSION_1_3);

        let layer_names: Vec<*const c_char> =
            self.required_layers.iter().map(|l| l.as_ptr()).collect();
        let extension_names: Vec<*const c_char> =
            self.required_extensions.iter().map(|e| e.as_ptr()).collect();

        let create_info = vk::InstanceCreateInfo::default()
            .flags(self.profile.instance_flags())
            .application_info(&app_info)
            .enabled_layer_names(&layer_names)
            .enabled_extension_names(&extension_names);

        // SAFETY: every pointer in `create_info` outlives this call.
        let instance = unsafe { self.entry.create_instance(&create_info, None) }
            .during("vkCreateInstance")?;
        self.instance = Some(instance);
        Ok(())
    }

    /// Enumerate physical devices, log them and return the one at `index`.
    ///
    /// Selection is strictly by enumeration order.
    pub fn select_physical_device(&self, index: usize) -> Result<vk::PhysicalDevice> {
        let instance = self.instance()?;
        // SAFETY: the instance is valid until `destroy`.
        let devices = unsafe { instance.enumerate_physical_devices() }
            .during("vkEnumeratePhysicalDevices")?;

        info!("device count: {}", devices.len());
        for (i, &device) in devices.iter().enumerate() {
            // SAFETY: `device` came from this instance.
            let (properties, features) = unsafe {
                (
                    instance.get_physical_device_properties(device),
                    instance.get_physical_device_features(device),
                )
            };
            let discrete = properties.device_type == vk::PhysicalDeviceType::DISCRETE_GPU;
            let geometry = features.geometry_shader == vk::TRUE;
            info!(
                "  {i}: {}{}{}{}",
                driver_name(&properties.device_name).to_string_lossy(),
                if i == index { " (selected)" } else { "" },
                if discrete { " DISCRETE" } else { "" },
                if geometry { " GEOMETRY_SHADER" } else { "" },
            );
        }

        let picked = pick_device_index(index, devices.len())?;
        Ok(devices[picked])
    }

    /// The loaded entry points.
    pub fn entry(&self) -> &ash::Entry {
        &self.entry
    }

    /// The instance, once created.
    pub fn instance(&self) -> Result<&ash::Instance> {
        self.instance
            .as_ref()
            .ok_or_else(|| GpuError::InvalidState("instance not created".into()))
    }

    /// Validation layers the instance was (or will be) created with.
    pub fn required_layers(&self) -> &BoundedList<CString> {
        &self.required_layers
    }

    /// Instance extensions the instance was (or will be) created with.
    pub fn required_extensions(&self) -> &BoundedList<CString> {
        &self.required_extensions
    }

    /// Destroy the instance.
    ///
    /// # Safety
    /// Every object created from the instance must already be destroyed.
    pub unsafe fn destroy(&mut self) {
        if let Some(instance) = self.instance.take() {
            unsafe { instance.destroy_instance(None) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&CStr]) -> Vec<CString> {
        list.iter().map(|n| (*n).to_owned()).collect()
    }

    #[test]
    fn subset_has_nothing_missing() {
        let available = names(&[c"VK_KHR_surface", c"VK_KHR_xlib_surface", c"VK_EXT_debug_utils"]);
        let required = names(&[c"VK_KHR_surface", c"VK_KHR_xlib_surface"]);
        assert!(missing_names(&required, &available).is_empty());
    }

    #[test]
    fn absent_name_is_reported() {
        let available = names(&[c"VK_KHR_surface"]);
        let required = names(&[c"VK_KHR_surface", c"VK_KHR_wayland_surface"]);
        assert_eq!(
            missing_names(&required, &available),
            vec!["VK_KHR_wayland_surface".to_string()]
        );
    }

    #[test]
    fn matching_is_case_sensitive() {
        let available = names(&[c"vk_layer_khronos_validation"]);
        let required = names(&[VALIDATION_LAYER]);
        assert_eq!(missing_names(&required, &available).len(), 1);
    }

    #[test]
    fn empty_requirements_always_pass() {
        let required: Vec<CString> = Vec::new();
        let available: Vec<CString> = Vec::new();
        assert!(missing_names(&required, &available).is_empty());
    }

    #[test]
    fn device_index_in_range() {
        for i in 0..3 {
            assert_eq!(pick_device_index(i, 3).unwrap(), i);
        }
    }

    #[test]
    fn device_index_out_of_range() {
        assert!(matches!(
            pick_device_index(3, 3),
            Err(GpuError::DeviceIndexOutOfRange { index: 3, count: 3 })
        ));
        assert!(pick_device_index(0, 0).is_err());
    }

    #[test]
    fn driver_name_stops_at_nul() {
        let mut raw = [0 as c_char; 16];
        for (dst, src) in raw.iter_mut().zip(b"GPU 0") {
            *dst = *src as c_char;
        }
        assert_eq!(driver_name(&raw).as_c_str(), c"GPU 0");
    }
}
