//! 3-D points in normalized detector space
//!
//! Detector points arrive as named-field records while fused hand centers
//! travel as plain triples, so `Point3` converts from and into both.

use std::ops::{Add, Mul, Sub};

/// 3D point (normalized image coordinates, z relative depth)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    pub const ZERO: Point3 = Point3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::ZERO
    }

    /// Linear interpolation
    pub fn lerp(&self, other: &Point3, t: f32) -> Point3 {
        Point3 {
            x: lerp(self.x, other.x, t),
            y: lerp(self.y, other.y, t),
            z: lerp(self.z, other.z, t),
        }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point3) -> f32 {
        (*self - *other).length()
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn midpoint(&self, other: &Point3) -> Point3 {
        self.lerp(other, 0.5)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

/// Scalar linear interpolation
///
/// Exact at both endpoints and never outside `[a, b]` for `t` in `[0, 1]`.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    let v = (1.0 - t) * a + t * b;
    // rounding can land one ulp outside the endpoints
    v.max(a.min(b)).min(a.max(b))
}

impl Add for Point3 {
    type Output = Point3;

    fn add(self, rhs: Point3) -> Point3 {
        Point3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Point3 {
    type Output = Point3;

    fn sub(self, rhs: Point3) -> Point3 {
        Point3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Point3 {
    type Output = Point3;

    fn mul(self, rhs: f32) -> Point3 {
        Point3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl From<[f32; 3]> for Point3 {
    fn from(v: [f32; 3]) -> Self {
        Point3::new(v[0], v[1], v[2])
    }
}

impl From<(f32, f32, f32)> for Point3 {
    fn from(v: (f32, f32, f32)) -> Self {
        Point3::new(v.0, v.1, v.2)
    }
}

impl From<Point3> for [f32; 3] {
    fn from(p: Point3) -> Self {
        p.to_array()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_lerp() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(10.0, 10.0, 10.0);

        let mid = a.lerp(&b, 0.5);
        assert!((mid.x - 5.0).abs() < 0.01);
        assert!((mid.y - 5.0).abs() < 0.01);
        assert!((mid.z - 5.0).abs() < 0.01);
    }

    #[test]
    fn test_lerp_endpoints_exact() {
        assert_eq!(lerp(0.3, 0.9, 0.0), 0.3);
        assert_eq!(lerp(0.3, 0.9, 1.0), 0.9);
        assert_eq!(lerp(0.7, 0.7, 0.37), 0.7);
    }

    #[test]
    fn test_distance() {
        let a = Point3::new(1.0, 2.0, 2.0);
        assert!((a.distance(&Point3::ZERO) - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_conversions() {
        let p: Point3 = [0.1, 0.2, 0.3].into();
        let q: Point3 = (0.1, 0.2, 0.3).into();
        assert_eq!(p, q);
        let arr: [f32; 3] = p.into();
        assert_eq!(arr, [0.1, 0.2, 0.3]);
    }
}
