//! GPU error types.

use ash::vk;
use thiserror::Error;

/// GPU-related errors.
#[derive(Error, Debug)]
pub enum GpuError {
    /// A driver call returned a failure status.
    #[error("{op} failed: {result}")]
    Vulkan {
        op: &'static str,
        result: vk::Result,
    },

    /// The Vulkan loader library could not be found or loaded.
    #[error("Vulkan loader unavailable: {0}")]
    LoaderUnavailable(String),

    /// One or more requested validation layers are not installed.
    #[error("Missing validation layers: {}", .0.join(", "))]
    MissingLayers(Vec<String>),

    /// One or more required extensions are not advertised.
    #[error("Missing {scope} extensions: {}", .names.join(", "))]
    MissingExtensions {
        scope: &'static str,
        names: Vec<String>,
    },

    /// The requested physical device index does not exist.
    #[error("Physical device index {index} out of range ({count} available)")]
    DeviceIndexOutOfRange { index: usize, count: usize },

    /// No queue family supports graphics submission.
    #[error("No queue family supports graphics")]
    NoGraphicsQueue,

    /// No queue family can present to the surface.
    #[error("No queue family supports presentation")]
    NoPresentQueue,

    /// The surface does not offer B8G8R8A8_SRGB with SRGB_NONLINEAR.
    #[error("Surface does not support B8G8R8A8_SRGB / SRGB_NONLINEAR")]
    UnsupportedSurfaceFormat,

    /// A bounded list was asked to hold more than its capacity.
    #[error("{what} exceeds capacity: {requested} requested, {capacity} allowed")]
    CapacityExceeded {
        what: &'static str,
        capacity: usize,
        requested: usize,
    },

    /// No memory type matches the requested type bits and properties.
    #[error("No memory type matches bits {type_bits:#b} with {properties:?}")]
    NoSuitableMemoryType {
        type_bits: u32,
        properties: vk::MemoryPropertyFlags,
    },

    /// A shader binary is larger than the engine accepts.
    #[error("Shader {path} is {size} bytes, limit is {capacity}")]
    ShaderTooLarge {
        path: String,
        size: u64,
        capacity: u64,
    },

    /// A shader binary could not be read or is not valid SPIR-V.
    #[error("Failed to read shader {path}: {source}")]
    ShaderRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Texture data has the wrong size or layout.
    #[error("Invalid texture: {0}")]
    InvalidTexture(String),

    /// The requested image layout transition has no barrier mapping.
    #[error("Unsupported layout transition {from:?} -> {to:?}")]
    UnsupportedLayoutTransition {
        from: vk::ImageLayout,
        to: vk::ImageLayout,
    },

    /// Memory allocation failed.
    #[error("Memory allocation failed: {0}")]
    AllocationFailed(String),

    /// Surface creation failed.
    #[error("Surface creation failed: {0}")]
    SurfaceCreation(String),

    /// Invalid state.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl GpuError {
    /// Returns the native status code if this error came from a driver call.
    #[must_use]
    pub const fn vk_result(&self) -> Option<vk::Result> {
        match self {
            Self::Vulkan { result, .. } => Some(*result),
            _ => None,
        }
    }

    /// Returns `true` if the driver reported the device as lost.
    #[must_use]
    pub fn is_device_lost(&self) -> bool {
        self.vk_result() == Some(vk::Result::ERROR_DEVICE_LOST)
    }
}

impl From<sprig_core::Error> for GpuError {
    fn from(err: sprig_core::Error) -> Self {
        match err {
            sprig_core::Error::CapacityExceeded {
                what,
                capacity,
                requested,
            } => Self::CapacityExceeded {
                what,
                capacity,
                requested,
            },
            other => Self::InvalidState(other.to_string()),
        }
    }
}

/// Attach the failing operation name to a raw driver status.
pub trait VkResultExt<T> {
    fn during(self, op: &'static str) -> Result<T>;
}

impl<T> VkResultExt<T> for std::result::Result<T, vk::Result> {
    #[inline]
    fn during(self, op: &'static str) -> Result<T> {
        self.map_err(|result| GpuError::Vulkan { op, result })
    }
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, GpuError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn during_names_the_operation() {
        let raw: std::result::Result<(), vk::Result> = Err(vk::Result::ERROR_INITIALIZATION_FAILED);
        let err = raw.during("vkCreateInstance").unwrap_err();
        assert!(matches!(
            err,
            GpuError::Vulkan {
                op: "vkCreateInstance",
                result: vk::Result::ERROR_INITIALIZATION_FAILED
            }
        ));
        assert!(err.to_string().starts_with("vkCreateInstance failed"));
    }

    #[test]
    fn device_lost_is_detected() {
        let err = GpuError::Vulkan {
            op: "vkQueueSubmit",
            result: vk::Result::ERROR_DEVICE_LOST,
        };
        assert!(err.is_device_lost());
        assert!(!GpuError::NoPresentQueue.is_device_lost());
    }

    #[test]
    fn core_capacity_error_converts() {
        let err: GpuError = sprig_core::Error::CapacityExceeded {
            what: "formats",
            capacity: 2,
            requested: 3,
        }
        .into();
        assert!(matches!(
            err,
            GpuError::CapacityExceeded {
                what: "formats",
                capacity: 2,
                requested: 3
            }
        ));
    }

    #[test]
    fn missing_layers_lists_names() {
        let err = GpuError::MissingLayers(vec!["A".into(), "B".into()]);
        assert_eq!(err.to_string(), "Missing validation layers: A, B");
    }
}
