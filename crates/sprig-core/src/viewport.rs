//! Aspect-ratio preserving viewport.

/// A viewport rectangle centered inside a window that keeps a fixed aspect
/// ratio, letterboxing or pillarboxing the remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AspectViewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl AspectViewport {
    /// Fit a rectangle of ratio `aspect` (width / height) into a window of
    /// `window_width` x `window_height` pixels.
    ///
    /// `w = min(W, H * a)`, `h = min(H, W / a)`, centered on both axes.
    #[must_use]
    pub fn fit(window_width: u32, window_height: u32, aspect: f32) -> Self {
        let w = window_width as f32;
        let h = window_height as f32;
        let width = w.min(h * aspect) as u32;
        let height = h.min(w / aspect) as u32;

        Self {
            x: (window_width - width) / 2,
            y: (window_height - height) / 2,
            width,
            height,
        }
    }

    /// Returns `true` if the rectangle has no area.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_window_pillarboxes() {
        let vp = AspectViewport::fit(800, 600, 1.0);
        assert_eq!(
            vp,
            AspectViewport {
                x: 100,
                y: 0,
                width: 600,
                height: 600
            }
        );
    }

    #[test]
    fn matching_window_fills() {
        let vp = AspectViewport::fit(800, 800, 1.0);
        assert_eq!(
            vp,
            AspectViewport {
                x: 0,
                y: 0,
                width: 800,
                height: 800
            }
        );
    }

    #[test]
    fn tall_window_letterboxes() {
        let vp = AspectViewport::fit(600, 1000, 1.0);
        assert_eq!((vp.x, vp.y, vp.width, vp.height), (0, 200, 600, 600));
    }

    #[test]
    fn widescreen_ratio() {
        let vp = AspectViewport::fit(1920, 1200, 16.0 / 9.0);
        assert_eq!(vp.width, 1920);
        assert_eq!(vp.height, 1080);
        assert_eq!(vp.y, 60);
        assert_eq!(vp.x, 0);
    }

    #[test]
    fn zero_window_is_empty() {
        assert!(AspectViewport::fit(0, 0, 1.0).is_empty());
    }
}
