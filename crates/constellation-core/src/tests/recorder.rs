//! A drawing surface that just remembers what it was asked to draw.

use crate::colour::Colour;
use crate::geometry::Point;
use crate::surface::DrawingSurface;

/// One call made on a surface.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Rect {
        origin: Point,
        extent: Point,
        colour: Colour,
    },
    Circle {
        center: Point,
        radius: f32,
        colour: Colour,
    },
    Line {
        from: Point,
        to: Point,
        colour: Colour,
    },
    Resize {
        width: usize,
        height: usize,
    },
}

#[derive(Debug, Default)]
pub struct Recorder {
    pub calls: Vec<DrawCall>,
}

impl Recorder {
    pub fn rects(&self) -> Vec<&DrawCall> {
        self.calls
            .iter()
            .filter(|call| matches!(call, DrawCall::Rect { .. }))
            .collect()
    }

    pub fn circles(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, DrawCall::Circle { .. }))
            .count()
    }

    pub fn lines(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, DrawCall::Line { .. }))
            .count()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl DrawingSurface for Recorder {
    fn fill_rect(&mut self, origin: Point, extent: Point, colour: Colour) {
        self.calls.push(DrawCall::Rect {
            origin,
            extent,
            colour,
        });
    }

    fn fill_circle(&mut self, center: Point, radius: f32, colour: Colour) {
        self.calls.push(DrawCall::Circle {
            center,
            radius,
            colour,
        });
    }

    fn stroke_line(&mut self, from: Point, to: Point, colour: Colour) {
        self.calls.push(DrawCall::Line { from, to, colour });
    }

    fn resize(&mut self, width: usize, height: usize) {
        self.calls.push(DrawCall::Resize { width, height });
    }
}
