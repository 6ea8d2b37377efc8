use glam::{Vec3, Vec3A};

/// Smallest direction component magnitude used when computing the inverse direction.
const DIRECTION_EPSILON: f32 = 1e-15;

/// Ray representation designed for quick intersection against axis aligned bounding boxes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3A,
    /// Normalized direction of the ray.
    pub direction: Vec3A,
    /// Componentwise reciprocal of `direction`, clamped away from zero.
    pub inverse_direction: Vec3A,
}

impl Ray {
    /// Creates a ray, normalizing `direction`.
    ///
    /// A zero-length or NaN direction produces NaN components, which every intersection test treats as a miss.
    #[inline]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        let direction = Vec3A::from(direction);
        Self::from_normalized(origin.into(), direction * direction.length_recip())
    }

    #[inline]
    pub(crate) fn from_normalized(origin: Vec3A, direction: Vec3A) -> Self {
        // Near zero components are clamped to a nonzero but extremely small magnitude. Any interval computed with
        // such an inverse is enormous, and a parallel ray can never produce it as a result.
        let inverse_direction = Vec3A::new(
            clamped_reciprocal(direction.x),
            clamped_reciprocal(direction.y),
            clamped_reciprocal(direction.z),
        );
        Self {
            origin,
            direction,
            inverse_direction,
        }
    }

    /// Point along the ray at `distance` from its origin.
    #[inline]
    pub fn at(&self, distance: f32) -> Vec3 {
        (self.origin + self.direction * distance).into()
    }

    /// Whether the direction points towards negative values along `axis`.
    #[inline]
    pub fn is_negative(&self, axis: usize) -> bool {
        self.direction[axis] < 0.0
    }
}

#[inline]
fn clamped_reciprocal(value: f32) -> f32 {
    if value.is_nan() {
        return f32::NAN;
    }
    (1.0 / value.abs().max(DIRECTION_EPSILON)).copysign(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_is_normalized() {
        let ray = Ray::new(Vec3::ONE, Vec3::new(0.0, 3.0, 4.0));
        assert!((ray.direction.length() - 1.0).abs() < 1e-6);
        assert!((ray.at(5.0) - Vec3::new(1.0, 4.0, 5.0)).length() < 1e-5);
    }

    #[test]
    fn inverse_direction_is_clamped() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        assert_eq!(ray.inverse_direction.x, 1.0);
        assert!(ray.inverse_direction.y.is_finite() && ray.inverse_direction.y > 0.0);

        let ray = Ray::new(Vec3::ZERO, Vec3::new(-1.0, -0.0, 0.0));
        assert!(ray.inverse_direction.y.is_finite() && ray.inverse_direction.y < 0.0);
        assert!(ray.is_negative(0));
        assert!(!ray.is_negative(2));
    }

    #[test]
    fn degenerate_direction_becomes_nan() {
        let ray = Ray::new(Vec3::ZERO, Vec3::ZERO);
        assert!(ray.direction.is_nan());
        assert!(ray.inverse_direction.is_nan());
    }
}
