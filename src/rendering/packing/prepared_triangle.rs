use glam::{Vec2, Vec3};

use crate::utilities::{AxisAlignedBoundingBox, Ray};

/// A triangle stored in the form its ray test consumes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PreparedTriangle {
    pub vertex0: Vec3,
    /// `vertex1 - vertex0`.
    pub edge1: Vec3,
    /// `vertex2 - vertex0`.
    pub edge2: Vec3,
    /// Unit normal following the winding `vertex0, vertex1, vertex2`.
    pub normal: Vec3,
}

impl PreparedTriangle {
    pub fn new(vertex0: Vec3, vertex1: Vec3, vertex2: Vec3) -> Self {
        let edge1 = vertex1 - vertex0;
        let edge2 = vertex2 - vertex0;
        Self {
            vertex0,
            edge1,
            edge2,
            normal: edge1.cross(edge2).normalize_or_zero(),
        }
    }

    pub fn aabb(&self) -> AxisAlignedBoundingBox {
        AxisAlignedBoundingBox::from_points(&[self.vertex0, self.vertex0 + self.edge1, self.vertex0 + self.edge2])
    }

    /// Tests a ray against both faces of the triangle.
    ///
    /// Returns the hit distance and the barycentric weights of `vertex1` and `vertex2`. Edges and vertices count as
    /// inside. Parallel rays, degenerate triangles and NaN inputs miss.
    #[inline]
    pub fn intersect(&self, ray: &Ray) -> Option<(f32, Vec2)> {
        let origin = Vec3::from(ray.origin);
        let direction = Vec3::from(ray.direction);

        let normal = self.edge2.cross(self.edge1);
        let mut dn = -direction.dot(normal);
        let offset = origin - self.vertex0;
        let mut t = offset.dot(normal);
        let offset_cross_direction = offset.cross(direction);
        let mut v = -self.edge2.dot(offset_cross_direction);
        let mut w = self.edge1.dot(offset_cross_direction);

        // Hits on the back face mirror every term.
        if dn < 0.0 {
            dn = -dn;
            t = -t;
            v = -v;
            w = -w;
        }
        if !(dn > 0.0) || t < 0.0 || v < 0.0 || w < 0.0 || v + w > dn {
            return None;
        }

        let inverse = 1.0 / dn;
        Some((t * inverse, Vec2::new(v, w) * inverse))
    }

    /// Point on the triangle at barycentric coordinates `uv`.
    #[inline]
    pub fn point(&self, uv: Vec2) -> Vec3 {
        self.vertex0 + self.edge1 * uv.x + self.edge2 * uv.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> PreparedTriangle {
        PreparedTriangle::new(Vec3::new(0.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 1.0), Vec3::new(0.0, 1.0, 1.0))
    }

    #[test]
    fn vertex_hit_is_inclusive() {
        let (distance, uv) = triangle().intersect(&Ray::new(Vec3::ZERO, Vec3::Z)).unwrap();
        assert_eq!(distance, 1.0);
        assert_eq!(uv, Vec2::ZERO);
    }

    #[test]
    fn rays_pointing_away_miss() {
        assert_eq!(triangle().intersect(&Ray::new(Vec3::ZERO, Vec3::NEG_Z)), None);
    }

    #[test]
    fn both_faces_hit_with_matching_coordinates() {
        let triangle = triangle();
        let front = triangle.intersect(&Ray::new(Vec3::new(0.2, 0.3, 0.0), Vec3::Z)).unwrap();
        let back = triangle.intersect(&Ray::new(Vec3::new(0.2, 0.3, 2.0), Vec3::NEG_Z)).unwrap();
        assert!((front.0 - 1.0).abs() < 1e-6 && (back.0 - 1.0).abs() < 1e-6);
        assert!(front.1.abs_diff_eq(Vec2::new(0.2, 0.3), 1e-6));
        assert!(back.1.abs_diff_eq(Vec2::new(0.2, 0.3), 1e-6));
        assert!(triangle.point(front.1).abs_diff_eq(Vec3::new(0.2, 0.3, 1.0), 1e-6));
        assert_eq!(triangle.normal, Vec3::Z);
    }

    #[test]
    fn outside_points_and_parallel_rays_miss() {
        let triangle = triangle();
        assert_eq!(triangle.intersect(&Ray::new(Vec3::new(0.6, 0.6, 0.0), Vec3::Z)), None);
        assert_eq!(triangle.intersect(&Ray::new(Vec3::new(0.0, 0.0, 1.0), Vec3::X)), None);
        assert_eq!(triangle.intersect(&Ray::new(Vec3::ZERO, Vec3::ZERO)), None);
    }

    #[test]
    fn bounds_cover_the_vertices() {
        let aabb = triangle().aabb();
        assert_eq!(aabb.min, Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 1.0, 1.0));
    }
}
