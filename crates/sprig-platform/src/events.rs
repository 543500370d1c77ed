//! Window-state events.
//!
//! winit reports minimize as a zero-sized resize (or occlusion on some
//! platforms) and has no explicit restore or maximize notification.
//! [`WindowStateTracker`] rebuilds those transitions from the raw stream.

use winit::event::WindowEvent;

/// Window-system notification relevant to the frame loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformEvent {
    /// The drawable changed size. Never zero-sized.
    SizeChanged { width: u32, height: u32 },
    Minimized,
    Restored,
    Maximized,
    Quit,
}

/// Tracks minimized and maximized state across window events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowStateTracker {
    minimized: bool,
    maximized: bool,
}

impl WindowStateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    pub fn is_maximized(&self) -> bool {
        self.maximized
    }

    /// Translate a winit event. `maximized` is the window's current
    /// maximized state.
    pub fn translate(&mut self, event: &WindowEvent, maximized: bool) -> Vec<PlatformEvent> {
        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => vec![PlatformEvent::Quit],
            WindowEvent::Resized(size) => self.resized(size.width, size.height, maximized),
            WindowEvent::Occluded(true) => self.minimize().into_iter().collect(),
            WindowEvent::Occluded(false) => self.restore().into_iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Handle a resize to `width` x `height`.
    pub fn resized(&mut self, width: u32, height: u32, maximized: bool) -> Vec<PlatformEvent> {
        if width == 0 || height == 0 {
            return self.minimize().into_iter().collect();
        }

        let mut events = Vec::with_capacity(3);
        if let Some(event) = self.restore() {
            events.push(event);
        }
        if maximized && !self.maximized {
            self.maximized = true;
            events.push(PlatformEvent::Maximized);
        } else if !maximized && self.maximized {
            self.maximized = false;
            if !events.contains(&PlatformEvent::Restored) {
                events.push(PlatformEvent::Restored);
            }
        }
        events.push(PlatformEvent::SizeChanged { width, height });
        events
    }

    fn minimize(&mut self) -> Option<PlatformEvent> {
        if self.minimized {
            return None;
        }
        self.minimized = true;
        Some(PlatformEvent::Minimized)
    }

    fn restore(&mut self) -> Option<PlatformEvent> {
        if !self.minimized {
            return None;
        }
        self.minimized = false;
        Some(PlatformEvent::Restored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_size_minimizes_once() {
        let mut tracker = WindowStateTracker::new();
        assert_eq!(tracker.resized(0, 0, false), vec![PlatformEvent::Minimized]);
        assert!(tracker.resized(0, 0, false).is_empty());
        assert!(tracker.is_minimized());
    }

    #[test]
    fn first_real_size_after_minimize_restores() {
        let mut tracker = WindowStateTracker::new();
        tracker.resized(0, 0, false);
        assert_eq!(
            tracker.resized(800, 800, false),
            vec![
                PlatformEvent::Restored,
                PlatformEvent::SizeChanged {
                    width: 800,
                    height: 800
                }
            ]
        );
        assert!(!tracker.is_minimized());
    }

    #[test]
    fn maximize_and_unmaximize() {
        let mut tracker = WindowStateTracker::new();
        assert_eq!(
            tracker.resized(1920, 1080, true),
            vec![
                PlatformEvent::Maximized,
                PlatformEvent::SizeChanged {
                    width: 1920,
                    height: 1080
                }
            ]
        );
        assert!(tracker.is_maximized());
        assert_eq!(
            tracker.resized(800, 800, false),
            vec![
                PlatformEvent::Restored,
                PlatformEvent::SizeChanged {
                    width: 800,
                    height: 800
                }
            ]
        );
        assert!(!tracker.is_maximized());
    }

    #[test]
    fn plain_resize_only_reports_size() {
        let mut tracker = WindowStateTracker::new();
        assert_eq!(
            tracker.resized(1024, 600, false),
            vec![PlatformEvent::SizeChanged {
                width: 1024,
                height: 600
            }]
        );
    }

    #[test]
    fn close_requests_quit() {
        let mut tracker = WindowStateTracker::new();
        assert_eq!(
            tracker.translate(&WindowEvent::CloseRequested, false),
            vec![PlatformEvent::Quit]
        );
    }

    #[test]
    fn occlusion_maps_to_minimize_and_restore() {
        let mut tracker = WindowStateTracker::new();
        assert_eq!(
            tracker.translate(&WindowEvent::Occluded(true), false),
            vec![PlatformEvent::Minimized]
        );
        assert_eq!(
            tracker.translate(&WindowEvent::Occluded(false), false),
            vec![PlatformEvent::Restored]
        );
    }
}
