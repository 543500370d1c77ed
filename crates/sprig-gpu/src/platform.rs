//! Runtime platform quirks that shape instance creation.

use ash::vk;
use std::ffi::CStr;

/// Host platform traits detected once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlatformProfile {
    /// The loader only lists portability drivers (MoltenVK) when asked to.
    pub portability_enumeration: bool,
}

impl PlatformProfile {
    /// Detect the profile of the running host.
    #[must_use]
    pub fn detect() -> Self {
        Self::for_os(std::env::consts::OS)
    }

    /// Profile for a target OS name as reported by `std::env::consts::OS`.
    #[must_use]
    pub fn for_os(os: &str) -> Self {
        Self {
            portability_enumeration: os == "macos" || os == "ios",
        }
    }

    /// Instance extensions this platform needs beyond the window system's.
    #[must_use]
    pub fn instance_extensions(&self) -> Vec<&'static CStr> {
        let mut extensions = Vec::new();
        if self.portability_enumeration {
            extensions.push(ash::khr::portability_enumeration::NAME);
        }
        extensions
    }

    /// Instance creation flags this platform needs.
    #[must_use]
    pub fn instance_flags(&self) -> vk::InstanceCreateFlags {
        if self.portability_enumeration {
            vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR
        } else {
            vk::InstanceCreateFlags::empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macos_requests_portability() {
        let profile = PlatformProfile::for_os("macos");
        assert!(profile.portability_enumeration);
        assert_eq!(
            profile.instance_extensions(),
            vec![ash::khr::portability_enumeration::NAME]
        );
        assert_eq!(
            profile.instance_flags(),
            vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR
        );
    }

    #[test]
    fn linux_needs_nothing_extra() {
        let profile = PlatformProfile::for_os("linux");
        assert!(profile.instance_extensions().is_empty());
        assert!(profile.instance_flags().is_empty());
    }
}
