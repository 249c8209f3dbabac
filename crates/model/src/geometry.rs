//! Pixel-space geometry primitives.

use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

/// A 2D point (or vector), in pixels unless stated otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const ZERO: Point2D = Point2D { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point2D) -> f64 {
        (*other - *self).length()
    }

    /// Vector length.
    pub fn length(&self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn dot(&self, other: &Point2D) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// 2D cross product (z component of the 3D cross product).
    pub fn cross(&self, other: &Point2D) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// Unit vector in the same direction, or `None` for a (near) zero vector.
    pub fn normalized(&self) -> Option<Point2D> {
        let len = self.length();
        if len < 1e-9 || !len.is_finite() {
            return None;
        }
        Some(Point2D::new(self.x / len, self.y / len))
    }

    /// This vector rotated by +90°.
    pub fn perpendicular(&self) -> Point2D {
        Point2D::new(-self.y, self.x)
    }

    pub fn midpoint(a: &Point2D, b: &Point2D) -> Point2D {
        Point2D::new((a.x + b.x) * 0.5, (a.y + b.y) * 0.5)
    }

    /// Linear interpolation between two points, `t` clamped to `[0, 1]`.
    pub fn lerp(a: &Point2D, b: &Point2D, t: f64) -> Point2D {
        let t = t.clamp(0.0, 1.0);
        Point2D {
            x: a.x + (b.x - a.x) * t,
            y: a.y + (b.y - a.y) * t,
        }
    }
}

impl Add for Point2D {
    type Output = Point2D;

    fn add(self, rhs: Point2D) -> Point2D {
        Point2D::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point2D {
    type Output = Point2D;

    fn sub(self, rhs: Point2D) -> Point2D {
        Point2D::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point2D {
    type Output = Point2D;

    fn mul(self, rhs: f64) -> Point2D {
        Point2D::new(self.x * rhs, self.y * rhs)
    }
}

/// A line segment between two pixel points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineSegment {
    pub p1: Point2D,
    pub p2: Point2D,
}

impl LineSegment {
    pub fn new(p1: Point2D, p2: Point2D) -> Self {
        Self { p1, p2 }
    }

    /// Segment centered at `center`, extending `half_length` along `direction`
    /// (expected to be a unit vector) on both sides.
    pub fn centered(center: Point2D, direction: Point2D, half_length: f64) -> Self {
        Self {
            p1: center - direction * half_length,
            p2: center + direction * half_length,
        }
    }

    pub fn vector(&self) -> Point2D {
        self.p2 - self.p1
    }

    pub fn length(&self) -> f64 {
        self.vector().length()
    }

    pub fn midpoint(&self) -> Point2D {
        Point2D::midpoint(&self.p1, &self.p2)
    }

    /// Perpendicular distance from `point` to the infinite line through the
    /// segment. `None` when the segment has zero length.
    pub fn distance_to_line(&self, point: &Point2D) -> Option<f64> {
        let d = self.vector();
        let len = d.length();
        if len < 1e-9 {
            return None;
        }
        Some(d.cross(&(*point - self.p1)).abs() / len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point2d_distance() {
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::new(3.0, 4.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalized_rejects_zero_vector() {
        assert!(Point2D::ZERO.normalized().is_none());
        let unit = Point2D::new(0.0, -8.0).normalized().unwrap();
        assert_eq!(unit, Point2D::new(0.0, -1.0));
    }

    #[test]
    fn test_cross_sign() {
        let x = Point2D::new(1.0, 0.0);
        let y = Point2D::new(0.0, 1.0);
        assert_eq!(x.cross(&y), 1.0);
        assert_eq!(y.cross(&x), -1.0);
        assert_eq!(x.perpendicular(), y);
    }

    #[test]
    fn test_lerp_clamps() {
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::new(10.0, 20.0);
        assert_eq!(Point2D::lerp(&a, &b, 0.5), Point2D::new(5.0, 10.0));
        assert_eq!(Point2D::lerp(&a, &b, 2.0), b);
    }

    #[test]
    fn test_segment_distance_to_line() {
        let seg = LineSegment::new(Point2D::new(0.0, 0.0), Point2D::new(100.0, 0.0));
        assert!((seg.distance_to_line(&Point2D::new(50.0, 12.0)).unwrap() - 12.0).abs() < 1e-9);
        // Outside the segment's extent still measures to the infinite line
        assert!((seg.distance_to_line(&Point2D::new(250.0, -3.0)).unwrap() - 3.0).abs() < 1e-9);

        let degenerate = LineSegment::new(Point2D::new(1.0, 1.0), Point2D::new(1.0, 1.0));
        assert!(degenerate.distance_to_line(&Point2D::ZERO).is_none());
    }

    #[test]
    fn test_centered_segment() {
        let seg = LineSegment::centered(Point2D::new(10.0, 10.0), Point2D::new(0.0, 1.0), 5.0);
        assert_eq!(seg.p1, Point2D::new(10.0, 5.0));
        assert_eq!(seg.p2, Point2D::new(10.0, 15.0));
        assert_eq!(seg.midpoint(), Point2D::new(10.0, 10.0));
    }
}
