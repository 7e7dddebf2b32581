//! A persistent grid of pixels that the simulation paints on. It's never cleared, so it works
//! like a real canvas: anything painted stays until something else is painted over it.

use color_eyre::eyre::Result;
use constellation_core::{Colour, DrawingSurface, Point};
use palette::Mix as _;

/// Pixels that are always opaque. Painting with a translucent colour blends it over whatever is
/// already there.
#[derive(Debug, Clone)]
pub(crate) struct Canvas {
    /// Width in pixels
    width: usize,
    /// Height in pixels
    height: usize,
    /// Rows of pixels, top to bottom
    pixels: Vec<Colour>,
}

impl Canvas {
    /// Instantiate, filled with black.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![constellation_core::colour::BLACK; width * height],
        }
    }

    /// Width in pixels
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels
    pub const fn height(&self) -> usize {
        self.height
    }

    /// The colour of a single pixel.
    pub fn pixel(&self, x: usize, y: usize) -> Option<Colour> {
        if x >= self.width {
            return None;
        }
        self.pixels.get(y * self.width + x).copied()
    }

    /// Convert signed pixel coordinates into an index, as long as they're on the canvas.
    fn index(&self, x: i64, y: i64) -> Option<usize> {
        let column = usize::try_from(x).ok()?;
        let row = usize::try_from(y).ok()?;
        if column >= self.width || row >= self.height {
            return None;
        }
        Some(row * self.width + column)
    }

    /// Paint a single pixel. Anything off the canvas is silently ignored.
    fn paint(&mut self, x: i64, y: i64, colour: Colour) {
        let Some(index) = self.index(x, y) else {
            return;
        };
        if let Some(pixel) = self.pixels.get_mut(index) {
            *pixel = Self::blend(*pixel, colour);
        }
    }

    /// Source-over compositing onto an opaque pixel.
    fn blend(below: Colour, above: Colour) -> Colour {
        let alpha = above.3.clamp(0.0, 1.0);
        let below_rgb = palette::Srgb::new(below.0, below.1, below.2);
        let above_rgb = palette::Srgb::new(above.0, above.1, above.2);
        let mixed = below_rgb.mix(above_rgb, alpha);
        (mixed.red, mixed.green, mixed.blue, 1.0)
    }

    /// Snap a coordinate to the pixel grid.
    #[expect(
        clippy::as_conversions,
        clippy::cast_possible_truncation,
        reason = "Coordinates are always well within the range of an `i64`"
    )]
    fn to_pixel(value: f32) -> i64 {
        value.floor() as i64
    }

    /// One past the last pixel coordinate along an axis of the given length.
    fn pixel_limit(length: usize) -> i64 {
        i64::try_from(length).unwrap_or(i64::MAX)
    }

    /// Render the canvas to a terminal surface. Each cell holds 2 pixels, one above the other.
    pub fn to_surface(&self, id: &str, layer: i16) -> Result<crate::surface::Surface> {
        let rows = self.height().div_ceil(2);
        let mut surface = crate::surface::Surface::new(id.to_owned(), self.width(), rows, layer);

        for row in 0..rows {
            for col in 0..self.width() {
                let upper = self
                    .pixel(col, row * 2)
                    .unwrap_or(constellation_core::colour::BLACK);
                let lower = self.pixel(col, row * 2 + 1).unwrap_or(upper);
                surface.add_pixel_pair(col, row, upper, lower)?;
            }
        }

        Ok(surface)
    }
}

impl DrawingSurface for Canvas {
    fn fill_rect(&mut self, origin: Point, extent: Point, colour: Colour) {
        let end = origin + extent;
        let top = Self::to_pixel(origin.y.min(end.y)).max(0);
        let bottom = Self::to_pixel(origin.y.max(end.y).ceil()).min(Self::pixel_limit(self.height));
        let left = Self::to_pixel(origin.x.min(end.x)).max(0);
        let right = Self::to_pixel(origin.x.max(end.x).ceil()).min(Self::pixel_limit(self.width));

        for y in top..bottom {
            for x in left..right {
                self.paint(x, y, colour);
            }
        }
    }

    /// Every pixel whose centre is inside the circle gets painted.
    fn fill_circle(&mut self, center: Point, radius: f32, colour: Colour) {
        if radius <= 0.0 {
            self.paint(Self::to_pixel(center.x), Self::to_pixel(center.y), colour);
            return;
        }

        let radius_squared = radius * radius;
        let top = Self::to_pixel(center.y - radius).max(0);
        let bottom = Self::to_pixel(center.y + radius)
            .saturating_add(1)
            .min(Self::pixel_limit(self.height));
        let left = Self::to_pixel(center.x - radius).max(0);
        let right = Self::to_pixel(center.x + radius)
            .saturating_add(1)
            .min(Self::pixel_limit(self.width));
        for y in top..bottom {
            for x in left..right {
                #[expect(
                    clippy::as_conversions,
                    clippy::cast_precision_loss,
                    reason = "Pixel coordinates are small"
                )]
                let pixel_center = Point::new(x as f32 + 0.5, y as f32 + 0.5);
                if pixel_center.distance_squared(center) <= radius_squared {
                    self.paint(x, y, colour);
                }
            }
        }
    }

    /// Bresenham's line algorithm.
    fn stroke_line(&mut self, from: Point, to: Point, colour: Colour) {
        let mut x = Self::to_pixel(from.x);
        let mut y = Self::to_pixel(from.y);
        let end_x = Self::to_pixel(to.x);
        let end_y = Self::to_pixel(to.y);

        let delta_x = (end_x - x).abs();
        let step_x = if x < end_x { 1 } else { -1 };
        let delta_y = -(end_y - y).abs();
        let step_y = if y < end_y { 1 } else { -1 };
        let mut error = delta_x + delta_y;

        loop {
            self.paint(x, y, colour);
            if x == end_x && y == end_y {
                break;
            }

            let doubled = 2 * error;
            if doubled >= delta_y {
                error += delta_y;
                x += step_x;
            }
            if doubled <= delta_x {
                error += delta_x;
                y += step_y;
            }
        }
    }

    fn resize(&mut self, width: usize, height: usize) {
        *self = Self::new(width, height);
    }
}

#[cfg(test)]
#[expect(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    reason = "Tests aren't so strict"
)]
mod test {
    use constellation_core::colour::{BLACK, WHITE};
    use constellation_core::geometry::make_point;

    use super::*;

    const RED: Colour = (1.0, 0.0, 0.0, 1.0);

    fn painted(canvas: &Canvas) -> Vec<(usize, usize)> {
        let mut coords = Vec::new();
        for y in 0..canvas.height() {
            for x in 0..canvas.width() {
                if canvas.pixel(x, y) != Some(BLACK) {
                    coords.push((x, y));
                }
            }
        }
        coords
    }

    fn assert_close(actual: Colour, expected: Colour) {
        assert!(
            (actual.0 - expected.0).abs() < 0.001
                && (actual.1 - expected.1).abs() < 0.001
                && (actual.2 - expected.2).abs() < 0.001
                && (actual.3 - expected.3).abs() < 0.001,
            "{actual:?} != {expected:?}"
        );
    }

    #[test]
    fn starts_black() {
        let canvas = Canvas::new(3, 2);
        assert!(painted(&canvas).is_empty());
        assert_eq!(canvas.pixel(3, 0), None);
        assert_eq!(canvas.pixel(0, 2), None);
    }

    #[test]
    fn rects_are_clipped() {
        let mut canvas = Canvas::new(4, 4);
        canvas.fill_rect(make_point(-2.0, 2.0), make_point(4.0, 10.0), RED);
        assert_eq!(painted(&canvas), vec![(0, 2), (1, 2), (0, 3), (1, 3)]);
    }

    #[test]
    fn zero_radius_circle_is_a_single_pixel() {
        let mut canvas = Canvas::new(4, 4);
        canvas.fill_circle(make_point(2.0, 1.0), 0.0, RED);
        assert_eq!(painted(&canvas), vec![(2, 1)]);
    }

    #[test]
    fn circles_fill_pixels_with_centres_inside() {
        let mut canvas = Canvas::new(6, 6);
        canvas.fill_circle(make_point(2.0, 2.0), 1.0, RED);
        assert_eq!(painted(&canvas), vec![(1, 1), (2, 1), (1, 2), (2, 2)]);
    }

    #[test]
    fn circles_poking_off_the_canvas_are_clipped() {
        let mut canvas = Canvas::new(4, 4);
        canvas.fill_circle(make_point(0.0, 0.0), 2.0, RED);
        assert_eq!(painted(&canvas), vec![(0, 0), (1, 0), (0, 1)]);
    }

    #[test]
    fn huge_circles_only_visit_the_canvas() {
        let mut canvas = Canvas::new(4, 4);
        let started = std::time::Instant::now();
        canvas.fill_circle(make_point(2.0, 2.0), 10_000.0, RED);
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
        assert_eq!(painted(&canvas).len(), 16);
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(canvas.pixel(x, y), Some(RED));
            }
        }
    }

    #[test]
    fn circles_entirely_off_the_canvas_paint_nothing() {
        let mut canvas = Canvas::new(4, 4);
        canvas.fill_circle(make_point(-50.0, 100.0), 3.0, RED);
        assert!(painted(&canvas).is_empty());
    }

    #[test]
    fn horizontal_line() {
        let mut canvas = Canvas::new(5, 2);
        canvas.stroke_line(make_point(0.0, 1.0), make_point(3.0, 1.0), RED);
        assert_eq!(painted(&canvas), vec![(0, 1), (1, 1), (2, 1), (3, 1)]);
    }

    #[test]
    fn diagonal_line_in_either_direction() {
        let mut forwards = Canvas::new(4, 4);
        forwards.stroke_line(make_point(0.0, 0.0), make_point(3.0, 3.0), RED);
        let mut backwards = Canvas::new(4, 4);
        backwards.stroke_line(make_point(3.0, 3.0), make_point(0.0, 0.0), RED);

        let expected = vec![(0, 0), (1, 1), (2, 2), (3, 3)];
        assert_eq!(painted(&forwards), expected);
        assert_eq!(painted(&backwards), expected);
    }

    #[test]
    fn lines_leaving_the_canvas_are_clipped() {
        let mut canvas = Canvas::new(3, 1);
        canvas.stroke_line(make_point(-5.0, 0.0), make_point(10.0, 0.0), RED);
        assert_eq!(painted(&canvas), vec![(0, 0), (1, 0), (2, 0)]);
    }

    #[test]
    fn translucent_paint_compounds() {
        let mut canvas = Canvas::new(1, 1);
        let half_white = (1.0, 1.0, 1.0, 0.5);

        canvas.fill_circle(make_point(0.0, 0.0), 0.0, half_white);
        assert_close(canvas.pixel(0, 0).unwrap(), (0.5, 0.5, 0.5, 1.0));

        canvas.fill_circle(make_point(0.0, 0.0), 0.0, half_white);
        assert_close(canvas.pixel(0, 0).unwrap(), (0.75, 0.75, 0.75, 1.0));
    }

    #[test]
    fn opaque_paint_replaces() {
        let mut canvas = Canvas::new(1, 1);
        canvas.fill_rect(make_point(0.0, 0.0), make_point(1.0, 1.0), WHITE);
        canvas.fill_rect(make_point(0.0, 0.0), make_point(1.0, 1.0), RED);
        assert_close(canvas.pixel(0, 0).unwrap(), RED);
    }

    #[test]
    fn resizing_starts_afresh() {
        let mut canvas = Canvas::new(2, 2);
        canvas.fill_rect(make_point(0.0, 0.0), make_point(2.0, 2.0), RED);
        canvas.resize(3, 4);
        assert_eq!(canvas.width(), 3);
        assert_eq!(canvas.height(), 4);
        assert!(painted(&canvas).is_empty());
    }

    #[test]
    fn converts_to_half_blocks() {
        let mut canvas = Canvas::new(2, 4);
        canvas.fill_circle(make_point(1.0, 2.0), 0.0, RED);
        canvas.fill_circle(make_point(1.0, 3.0), 0.0, WHITE);

        let mut surface = canvas.to_surface("canvas", 0).unwrap();
        assert_eq!(surface.width, 2);
        assert_eq!(surface.height, 2);

        let cells = surface.surface.screen_cells();
        let cell = &cells[1][1];
        assert_eq!(cell.str(), "▀");
        assert_eq!(
            cell.attrs().foreground(),
            crate::surface::Surface::make_colour_attribute(RED)
        );
        assert_eq!(
            cell.attrs().background(),
            crate::surface::Surface::make_colour_attribute(WHITE)
        );
        assert_eq!(
            cells[0][0].attrs().foreground(),
            crate::surface::Surface::make_colour_attribute(BLACK)
        );
    }

    #[test]
    fn simulation_trails_are_never_cleared() {
        let mut config = constellation_core::SimulationConfig::default();
        config.viewport = constellation_core::Viewport::new(80, 40);
        config.seed = Some(3);
        let mut simulation = constellation_core::SimulationState::new(config).unwrap();
        let mut canvas = Canvas::new(80, 40);
        simulation.reset(&mut canvas);

        simulation.tick(&mut canvas);
        let after_first_tick = painted(&canvas);
        assert!(!after_first_tick.is_empty());

        simulation.tick(&mut canvas);
        let after_second_tick = painted(&canvas);
        for coord in after_first_tick {
            assert!(after_second_tick.contains(&coord), "{coord:?} was cleared");
        }
    }
}
