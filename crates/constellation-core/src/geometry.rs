//! Points and distances.

/// A position, or an extent, in viewport pixels.
pub type Point = glam::Vec2;

/// Make a point from its coordinates.
#[inline]
#[must_use]
pub const fn make_point(x: f32, y: f32) -> Point {
    Point::new(x, y)
}

/// Euclidean distance between 2 points.
#[inline]
#[must_use]
pub fn distance(point1: Point, point2: Point) -> f32 {
    point1.distance(point2)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pythagorean_distance() {
        let distance = distance(make_point(0.0, 0.0), make_point(3.0, 4.0));
        assert!((distance - 5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn distance_is_symmetric() {
        let point1 = make_point(12.5, -3.0);
        let point2 = make_point(-7.0, 20.25);
        assert!((distance(point1, point2) - distance(point2, point1)).abs() < f32::EPSILON);
    }

    #[test]
    fn distance_to_self_is_exactly_zero() {
        let point = make_point(94.0, 1.96);
        assert!(distance(point, point) == 0.0);
    }
}
