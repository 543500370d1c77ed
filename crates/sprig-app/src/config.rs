//! Application configuration.

use std::time::Duration;

use sprig_core::limits::MAX_FRAMES_IN_FLIGHT;

/// Width / height of a square viewport.
pub const ASPECT_SQUARE: f32 = 1.0;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Window title, also the application name reported to the driver.
    pub title: String,
    /// Engine name reported to the driver.
    pub engine_name: String,
    /// Initial window width in pixels.
    pub width: u32,
    /// Initial window height in pixels.
    pub height: u32,
    /// Fixed physics steps per second.
    pub physics_fps: u32,
    /// Render callbacks per second (None for unlimited).
    pub target_fps: Option<u32>,
    /// Width / height of the presented viewport.
    pub aspect_ratio: f32,
    /// Enumeration index of the physical device to use.
    pub device_index: usize,
    /// Enable Vulkan validation layers (default: debug builds only).
    pub validation: bool,
    /// Frames the CPU may prepare ahead of the GPU, kept in `1..=32`
    /// through [`AppConfig::with_frames_in_flight`].
    frames_in_flight: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Survival".to_string(),
            engine_name: "MS2024".to_string(),
            width: 800,
            height: 800,
            physics_fps: 50,
            target_fps: Some(60),
            aspect_ratio: ASPECT_SQUARE,
            device_index: 0,
            validation: cfg!(debug_assertions),
            frames_in_flight: 2,
        }
    }
}

impl AppConfig {
    /// Create a new config with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Set the window dimensions.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_engine_name(mut self, name: impl Into<String>) -> Self {
        self.engine_name = name.into();
        self
    }

    /// Set the fixed physics rate.
    pub fn with_physics_fps(mut self, fps: u32) -> Self {
        self.physics_fps = fps.max(1);
        self
    }

    /// Set the target render rate.
    pub fn with_target_fps(mut self, fps: u32) -> Self {
        self.target_fps = (fps > 0).then_some(fps);
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: f32) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    pub fn with_device_index(mut self, index: usize) -> Self {
        self.device_index = index;
        self
    }

    /// Enable or disable validation layers.
    pub fn with_validation(mut self, validation: bool) -> Self {
        self.validation = validation;
        self
    }

    /// Set the number of frames in flight, clamped to `1..=32`.
    pub fn with_frames_in_flight(mut self, frames: usize) -> Self {
        self.frames_in_flight = frames.clamp(1, MAX_FRAMES_IN_FLIGHT);
        self
    }

    /// Frames the CPU may prepare ahead of the GPU.
    pub fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    /// Duration of one physics step.
    pub fn physics_step(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / u64::from(self.physics_fps.max(1)))
    }

    /// Minimum time between render callbacks.
    pub fn render_interval(&self) -> Option<Duration> {
        self.target_fps
            .map(|fps| Duration::from_nanos(1_000_000_000 / u64::from(fps)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_demo() {
        let config = AppConfig::default();
        assert_eq!(config.title, "Survival");
        assert_eq!(config.engine_name, "MS2024");
        assert_eq!((config.width, config.height), (800, 800));
        assert_eq!(config.physics_fps, 50);
        assert_eq!(config.target_fps, Some(60));
        assert_eq!(config.frames_in_flight(), 2);
        assert_eq!(config.physics_step(), Duration::from_millis(20));
    }

    #[test]
    fn builder_clamps() {
        let config = AppConfig::new("Test")
            .with_frames_in_flight(100)
            .with_target_fps(0)
            .with_physics_fps(0);
        assert_eq!(config.frames_in_flight(), MAX_FRAMES_IN_FLIGHT);
        assert_eq!(config.target_fps, None);
        assert_eq!(config.render_interval(), None);
        assert_eq!(config.physics_fps, 1);
    }

    #[test]
    fn zero_frames_in_flight_becomes_one() {
        let config = AppConfig::default().with_frames_in_flight(0);
        assert_eq!(config.frames_in_flight(), 1);
        assert!(sprig_core::FrameDirtyFlags::new(config.frames_in_flight()).is_ok());
    }
}
