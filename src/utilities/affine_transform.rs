use glam::{Affine3A, Vec3};

use super::bounding_box::AxisAlignedBoundingBox;
use super::ray::Ray;
use crate::error::SceneError;

/// Relative tolerance when checking that a transform's basis is orthogonal with equal lengths.
const SCALE_TOLERANCE: f32 = 1e-4;

/// A transformation composed of a rotation, a uniform scale and a translation, stored in both directions.
///
/// Distances along a ray scale by a single factor when crossing between the two spaces, which is what lets a traversal
/// carry its running best distance into an instance and back out.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UniformTransform {
    /// Parent space to local space.
    forward: Affine3A,
    /// Local space to parent space.
    inverse: Affine3A,
    forward_scale: f32,
    inverse_scale: f32,
}

impl UniformTransform {
    /// Gets the identity transform.
    pub const IDENTITY: Self = Self {
        forward: Affine3A::IDENTITY,
        inverse: Affine3A::IDENTITY,
        forward_scale: 1.0,
        inverse_scale: 1.0,
    };

    /// Constructs a transform from the placement of a local space inside its parent space (local to parent).
    ///
    /// Rejects shears, non-uniform scales and transforms that cannot be inverted.
    pub fn new(placement: Affine3A) -> Result<Self, SceneError> {
        let scale = uniform_scale(&placement)?;
        let forward = placement.inverse();
        if !forward.is_finite() {
            return Err(SceneError::DegenerateTransform);
        }
        Ok(Self {
            forward,
            inverse: placement,
            forward_scale: 1.0 / scale,
            inverse_scale: scale,
        })
    }

    /// Parent space to local space.
    #[inline]
    pub fn forward(&self) -> &Affine3A {
        &self.forward
    }

    /// Local space to parent space.
    #[inline]
    pub fn inverse(&self) -> &Affine3A {
        &self.inverse
    }

    /// Factor converting a parent space distance into a local space distance.
    #[inline]
    pub fn forward_scale(&self) -> f32 {
        self.forward_scale
    }

    /// Factor converting a local space distance into a parent space distance.
    #[inline]
    pub fn inverse_scale(&self) -> f32 {
        self.inverse_scale
    }

    /// Moves a parent space ray into local space. The result keeps a unit direction.
    #[inline]
    pub fn ray_to_local(&self, ray: &Ray) -> Ray {
        let origin = self.forward.transform_point3a(ray.origin);
        let direction = self.forward.transform_vector3a(ray.direction) * self.inverse_scale;
        Ray::from_normalized(origin, direction)
    }

    /// Bounds a local space box in parent space.
    #[inline]
    pub fn aabb_to_parent(&self, aabb: &AxisAlignedBoundingBox) -> AxisAlignedBoundingBox {
        aabb.transform(&self.inverse)
    }
}

/// Extracts the uniform scale of a transform, failing if its basis is not a scaled rotation.
fn uniform_scale(transform: &Affine3A) -> Result<f32, SceneError> {
    if !transform.is_finite() {
        return Err(SceneError::DegenerateTransform);
    }

    let matrix = transform.matrix3;
    let columns = [matrix.x_axis, matrix.y_axis, matrix.z_axis];
    let squared = columns.map(|column| column.length_squared());
    let mean = (squared[0] + squared[1] + squared[2]) / 3.0;
    if !(mean > f32::MIN_POSITIVE) {
        return Err(SceneError::DegenerateTransform);
    }

    for i in 0..3 {
        for j in i..3 {
            let expected = if i == j { mean } else { 0.0 };
            if (columns[i].dot(columns[j]) - expected).abs() > SCALE_TOLERANCE * mean {
                return Err(SceneError::NonUniformScale {
                    scale: Vec3::new(squared[0].sqrt(), squared[1].sqrt(), squared[2].sqrt()),
                });
            }
        }
    }

    Ok(mean.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn scale_factors_are_reciprocal() {
        let placement = Affine3A::from_scale_rotation_translation(
            Vec3::splat(2.5),
            Quat::from_rotation_y(0.7),
            Vec3::new(1.0, -2.0, 3.0),
        );
        let transform = UniformTransform::new(placement).unwrap();
        assert!((transform.inverse_scale() - 2.5).abs() < 1e-5);
        assert!((transform.forward_scale() * transform.inverse_scale() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn local_ray_distances_scale_uniformly() {
        let placement = Affine3A::from_scale_rotation_translation(
            Vec3::splat(4.0),
            Quat::from_rotation_x(0.3),
            Vec3::new(0.0, 5.0, 0.0),
        );
        let transform = UniformTransform::new(placement).unwrap();
        let ray = Ray::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.2, 0.4, -1.0));
        let local = transform.ray_to_local(&ray);
        assert!((local.direction.length() - 1.0).abs() < 1e-5);

        let parent_distance = 8.0;
        let local_point = local.at(parent_distance * transform.forward_scale());
        let parent_point = transform.inverse().transform_point3(local_point);
        assert!((parent_point - ray.at(parent_distance)).length() < 1e-4);
    }

    #[test]
    fn non_uniform_scale_is_rejected() {
        let placement = Affine3A::from_scale(Vec3::new(1.0, 2.0, 1.0));
        assert!(matches!(
            UniformTransform::new(placement),
            Err(SceneError::NonUniformScale { .. })
        ));

        let shear = Affine3A::from_cols_array(&[1.0, 0.0, 0.0, 0.5, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0]);
        assert!(matches!(UniformTransform::new(shear), Err(SceneError::NonUniformScale { .. })));
    }

    #[test]
    fn degenerate_transform_is_rejected() {
        let placement = Affine3A::from_scale(Vec3::ZERO);
        assert_eq!(UniformTransform::new(placement), Err(SceneError::DegenerateTransform));

        let placement = Affine3A::from_translation(Vec3::new(f32::NAN, 0.0, 0.0));
        assert_eq!(UniformTransform::new(placement), Err(SceneError::DegenerateTransform));
    }

    #[test]
    fn parent_bounds_enclose_transformed_corners() {
        let placement = Affine3A::from_rotation_translation(Quat::from_rotation_z(0.5), Vec3::X * 3.0);
        let transform = UniformTransform::new(placement).unwrap();
        let local = AxisAlignedBoundingBox::new(Vec3::ZERO, Vec3::ONE);
        let parent = transform.aabb_to_parent(&local);
        for corner in local.corners() {
            assert!(parent.contains(placement.transform_point3(corner)));
        }
    }
}
