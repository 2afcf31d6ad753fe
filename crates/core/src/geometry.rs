//! 2D geometry primitives shared by entities, the predictor, and scoring.

use glam::Vec2;

/// Build a vector from polar coordinates: `r * (cos(theta), sin(theta))`.
#[inline]
pub fn from_polar(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// The angle of `v` relative to the positive x-axis, in `(-pi, pi]`.
#[inline]
pub fn angle(v: Vec2) -> f32 {
    v.y.atan2(v.x)
}

/// Squared Euclidean distance between two points.
#[inline]
pub fn qdist(a: Vec2, b: Vec2) -> f32 {
    (a - b).length_squared()
}

/// Rescale `v` to length `len`, or return the zero vector if `v` is zero.
#[inline]
pub fn with_length(v: Vec2, len: f32) -> Vec2 {
    let l = v.length();
    if l <= f32::EPSILON {
        Vec2::ZERO
    } else {
        v * (len / l)
    }
}

/// Rescale `v` to unit length, or return the zero vector if `v` is zero.
#[inline]
pub fn unit(v: Vec2) -> Vec2 {
    with_length(v, 1.0)
}

/// An axis-aligned circle: a position plus a radius.
pub trait Circle {
    fn center(&self) -> Vec2;
    fn radius(&self) -> f32;
}

/// Anything with a scalar mass, used by the predicates in [`crate::entities`].
pub trait HasMass {
    fn mass(&self) -> f32;
}

/// Clamp a point to `[r, w - r] x [r, h - r]`, i.e. a circle of radius `r`
/// stays fully inside the `w x h` arena.
#[inline]
pub fn clamp_to_arena(p: Vec2, r: f32, w: f32, h: f32) -> Vec2 {
    Vec2::new(p.x.clamp(r, (w - r).max(r)), p.y.clamp(r, (h - r).max(r)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_polar_matches_trig() {
        let v = from_polar(2.0, std::f32::consts::FRAC_PI_2);
        assert!((v.x).abs() < 1e-5);
        assert!((v.y - 2.0).abs() < 1e-5);
    }

    #[test]
    fn with_length_zero_vector_stays_zero() {
        assert_eq!(with_length(Vec2::ZERO, 5.0), Vec2::ZERO);
    }

    #[test]
    fn with_length_rescales() {
        let v = with_length(Vec2::new(3.0, 4.0), 10.0);
        assert!((v.length() - 10.0).abs() < 1e-4);
    }

    #[test]
    fn unit_is_with_length_one() {
        let v = unit(Vec2::new(0.0, 5.0));
        assert_eq!(v, Vec2::new(0.0, 1.0));
    }

    #[test]
    fn qdist_matches_squared_length() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(3.0, 4.0);
        assert!((qdist(a, b) - 25.0).abs() < 1e-4);
    }

    #[test]
    fn clamp_to_arena_keeps_circle_inside() {
        let p = clamp_to_arena(Vec2::new(-5.0, 1000.0), 10.0, 100.0, 100.0);
        assert_eq!(p, Vec2::new(10.0, 90.0));
    }
}
