//! The bounds of the drawable area.

use crate::geometry::{make_point, Point};

/// The rectangular drawable region. Its origin is always `(0, 0)`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[non_exhaustive]
pub struct Viewport {
    /// Width in pixels
    pub width: usize,
    /// Height in pixels
    pub height: usize,
    /// The top-left corner
    pub min_point: Point,
    /// The bottom-right corner, the reflection boundary for both axes
    pub max_point: Point,
}

impl Default for Viewport {
    #[inline]
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl Viewport {
    /// Instantiate
    #[inline]
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        let mut viewport = Self {
            width,
            height,
            min_point: Point::ZERO,
            max_point: Point::ZERO,
        };
        viewport.recompute_corners();
        viewport
    }

    /// Track new bounds. Returns whether anything actually changed.
    #[inline]
    pub fn set_bounds(&mut self, width: usize, height: usize) -> bool {
        if self.width == width && self.height == height {
            return false;
        }

        self.width = width;
        self.height = height;
        self.recompute_corners();
        true
    }

    /// Whether there is any area to draw on.
    #[inline]
    #[must_use]
    pub const fn is_drawable(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Work out the corner points from the dimensions.
    #[expect(
        clippy::as_conversions,
        clippy::cast_precision_loss,
        reason = "Viewports are nowhere near big enough to lose precision"
    )]
    fn recompute_corners(&mut self) {
        self.min_point = make_point(0.0, 0.0);
        self.max_point = make_point(self.width as f32, self.height as f32);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn corners_follow_bounds() {
        let mut viewport = Viewport::new(100, 50);
        assert_eq!(viewport.min_point, make_point(0.0, 0.0));
        assert_eq!(viewport.max_point, make_point(100.0, 50.0));

        assert!(viewport.set_bounds(80, 60));
        assert_eq!(viewport.max_point, make_point(80.0, 60.0));
    }

    #[test]
    fn unchanged_bounds_are_not_a_change() {
        let mut viewport = Viewport::new(100, 50);
        assert!(!viewport.set_bounds(100, 50));
    }

    #[test]
    fn empty_viewports_are_not_drawable() {
        assert!(!Viewport::default().is_drawable());
        assert!(!Viewport::new(10, 0).is_drawable());
        assert!(Viewport::new(1, 1).is_drawable());
    }
}
