//! Platform layer for the Sprig engine.
//!
//! Creates the window via winit, reports the drawable size and turns
//! window-system notifications into [`PlatformEvent`]s.

pub mod events;

pub use events::{PlatformEvent, WindowStateTracker};

use thiserror::Error;
use tracing::info;
use winit::dpi::PhysicalSize;
use winit::event_loop::ActiveEventLoop;
use winit::window::Window;

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Window creation failed: {0}")]
    WindowCreation(String),
}

pub type Result<T> = std::result::Result<T, PlatformError>;

/// Window configuration.
#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Survival".to_string(),
            width: 800,
            height: 800,
            resizable: true,
        }
    }
}

/// Open a window sized in physical pixels.
pub fn create_window(event_loop: &ActiveEventLoop, config: &WindowConfig) -> Result<Window> {
    let attrs = Window::default_attributes()
        .with_title(&config.title)
        .with_inner_size(PhysicalSize::new(config.width, config.height))
        .with_resizable(config.resizable);

    let window = event_loop
        .create_window(attrs)
        .map_err(|e| PlatformError::WindowCreation(e.to_string()))?;

    let (width, height) = drawable_size(&window);
    info!("Window \"{}\" created, drawable {width}x{height}", config.title);
    Ok(window)
}

/// Drawable area in pixels. May exceed the logical size on high-density
/// displays.
pub fn drawable_size(window: &Window) -> (u32, u32) {
    let size = window.inner_size();
    (size.width, size.height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_window_is_square() {
        let config = WindowConfig::default();
        assert_eq!(config.title, "Survival");
        assert_eq!((config.width, config.height), (800, 800));
        assert!(config.resizable);
    }
}
