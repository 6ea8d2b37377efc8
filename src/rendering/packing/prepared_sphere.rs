use glam::{Vec2, Vec3};
use std::f32::consts::{PI, TAU};

use crate::error::SceneError;
use crate::utilities::{AxisAlignedBoundingBox, Ray};

/// A sphere ready for ray tests.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PreparedSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl PreparedSphere {
    pub fn new(center: Vec3, radius: f32) -> Result<Self, SceneError> {
        if !(radius > 0.0 && radius.is_finite()) {
            return Err(SceneError::InvalidRadius { radius });
        }
        Ok(Self { center, radius })
    }

    pub fn aabb(&self) -> AxisAlignedBoundingBox {
        let extend = Vec3::splat(self.radius);
        AxisAlignedBoundingBox::new(self.center - extend, self.center + extend)
    }

    /// Tests a ray against the surface of the sphere.
    ///
    /// Returns the distance to the first surface crossing in front of the origin, which is the exit point when the
    /// origin is inside, and the spherical coordinates of that point.
    #[inline]
    pub fn intersect(&self, ray: &Ray) -> Option<(f32, Vec2)> {
        self.intersect_beyond(ray, 0.0)
    }

    /// Like `intersect`, but only reports surface crossings at `minimum` or further along the ray.
    ///
    /// A ray leaving the surface passes a `minimum` above zero to skip the crossing at its own origin.
    #[inline]
    pub fn intersect_beyond(&self, ray: &Ray, minimum: f32) -> Option<(f32, Vec2)> {
        let direction = Vec3::from(ray.direction);

        // Move the origin up to the earliest possible impact time to keep the quadratic well conditioned.
        let mut offset = Vec3::from(ray.origin) - self.center;
        let t_offset = (-offset.dot(direction) - self.radius).max(0.0);
        offset += direction * t_offset;
        let b = offset.dot(direction);
        let c = offset.dot(offset) - self.radius * self.radius;

        if b > 0.0 && c > 0.0 {
            // Outside and pointing away.
            return None;
        }
        let discriminant = b * b - c;
        if !(discriminant >= 0.0) {
            return None;
        }

        let root = discriminant.sqrt();
        let near = -b - root + t_offset;
        let distance = if near >= minimum { near } else { -b + root + t_offset };
        if !(distance >= minimum) {
            return None;
        }

        let local = (offset + direction * (distance - t_offset)) / self.radius;
        Some((distance, Self::coordinates(local)))
    }

    /// Spherical coordinates of a point on the unit sphere, both within `[0, 1]`.
    #[inline]
    fn coordinates(local: Vec3) -> Vec2 {
        Vec2::new(
            local.x.atan2(local.z) / TAU + 0.5,
            local.y.clamp(-1.0, 1.0).acos() / PI,
        )
    }

    /// Outward unit normal at spherical coordinates `uv`.
    #[inline]
    pub fn normal(&self, uv: Vec2) -> Vec3 {
        let phi = (uv.x - 0.5) * TAU;
        let (sin_theta, cos_theta) = (uv.y * PI).sin_cos();
        Vec3::new(sin_theta * phi.sin(), cos_theta, sin_theta * phi.cos())
    }

    /// Point on the surface at spherical coordinates `uv`.
    #[inline]
    pub fn point(&self, uv: Vec2) -> Vec3 {
        self.center + self.normal(uv) * self.radius
    }
}
