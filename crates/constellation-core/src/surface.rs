//! The only way the simulation gets anything onto a screen.

use crate::colour::Colour;
use crate::geometry::Point;

/// Something that can be painted on. Implementations must keep whatever was painted until it is
/// painted over: the simulation relies on an uncleared surface to leave trails behind moving
/// particles.
///
/// Nothing here ever reads pixels back.
pub trait DrawingSurface {
    /// Fill the rectangle starting at `origin` that is `extent` wide and high.
    fn fill_rect(&mut self, origin: Point, extent: Point, colour: Colour);

    /// Fill a disc. A zero radius should still leave a single dot.
    fn fill_circle(&mut self, center: Point, radius: f32, colour: Colour);

    /// Draw a one pixel wide line segment.
    fn stroke_line(&mut self, from: Point, to: Point, colour: Colour);

    /// Change the size of the surface.
    fn resize(&mut self, width: usize, height: usize);
}
