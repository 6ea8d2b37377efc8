use glam::{Affine3A, Vec3, Vec3A};
use std::hash::Hasher;

use super::ray::Ray;

/// Multiplier applied to the far distance of a slab test.
///
/// Rounding in the slab test can produce false misses along shared box faces. Inflating the far distance by a few ulps
/// turns those into false hits instead, which keeps traversal watertight. See Ize, "Robust BVH Ray Traversal" (2013).
pub const FAR_MULTIPLIER: f32 = 1.000_000_24;

/// Provides simple axis-aligned bounding box functionality.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisAlignedBoundingBox {
    /// Location with the lowest X, Y, and Z coordinates in the axis-aligned bounding box.
    pub min: Vec3,
    /// Location with the highest X, Y, and Z coordinates in the axis-aligned bounding box.
    pub max: Vec3,
}

impl AxisAlignedBoundingBox {
    /// A box that encloses nothing and is never hit. Used to fill the slots of absent children.
    pub const NONE: Self = Self {
        min: Vec3::NEG_INFINITY,
        max: Vec3::NEG_INFINITY,
    };

    /// Starting value for folding `encapsulate` over a set of boxes or points.
    /// This is the only box allowed to have `min > max`, so it is kept private.
    const INVERTED: Self = Self {
        min: Vec3::INFINITY,
        max: Vec3::NEG_INFINITY,
    };

    /// Constructs a bounding box from the specified minimum and maximum.
    #[inline]
    pub fn new(min: Vec3, max: Vec3) -> Self {
        assert!(
            !max.cmplt(min).any(),
            "Bounding box maximum {max} is below its minimum {min}."
        );
        Self { min, max }
    }

    /// Creates the smallest possible bounding box that contains a list of points.
    pub fn from_points(points: &[Vec3]) -> Self {
        assert!(!points.is_empty(), "Cannot construct a bounding box from an empty list.");
        points.iter().fold(Self::INVERTED, |current, &point| Self {
            min: current.min.min(point),
            max: current.max.max(point),
        })
    }

    /// Creates the smallest possible bounding box that contains a list of boxes.
    pub fn from_boxes(boxes: &[Self]) -> Self {
        assert!(!boxes.is_empty(), "Cannot construct a bounding box from an empty list.");
        boxes.iter().fold(Self::INVERTED, |current, other| current.encapsulate(other))
    }

    /// Center of the box.
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Half of the size of the box along each axis.
    #[inline]
    pub fn extend(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Half of the surface area of the box.
    ///
    /// Only proportional to the real surface area; used as a relative cost, never as a physical unit.
    #[inline]
    pub fn area(&self) -> f32 {
        let size = self.max - self.min;
        size.x * size.y + size.y * size.z + size.z * size.x
    }

    /// Index of the axis along which the box is the largest.
    #[inline]
    pub fn major_axis(&self) -> usize {
        let size = self.max - self.min;
        if size.x >= size.y && size.x >= size.z {
            0
        } else if size.y >= size.z {
            1
        } else {
            2
        }
    }

    /// Whether this box is the explicit `NONE` box.
    #[inline]
    pub fn is_none(&self) -> bool {
        self.min == Vec3::NEG_INFINITY && self.max == Vec3::NEG_INFINITY
    }

    /// Computes a bounding box which contains both this box and `other`.
    #[inline]
    pub fn encapsulate(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Whether `point` lies inside the box or on its boundary.
    #[inline]
    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// The eight corners of the box.
    pub fn corners(&self) -> [Vec3; 8] {
        let (min, max) = (self.min, self.max);
        [
            Vec3::new(min.x, min.y, min.z),
            Vec3::new(max.x, min.y, min.z),
            Vec3::new(min.x, max.y, min.z),
            Vec3::new(max.x, max.y, min.z),
            Vec3::new(min.x, min.y, max.z),
            Vec3::new(max.x, min.y, max.z),
            Vec3::new(min.x, max.y, max.z),
            Vec3::new(max.x, max.y, max.z),
        ]
    }

    /// Computes the bounding box of this box after it has been moved by `transform`.
    pub fn transform(&self, transform: &Affine3A) -> Self {
        let corners = self.corners().map(|corner| transform.transform_point3(corner));
        Self::from_points(&corners)
    }

    /// Intersects a ray with the box using the slab method.
    ///
    /// Returns the distance to the entry point, which is negative when the origin is inside the box,
    /// or positive infinity on a miss. Any NaN in the ray or the box resolves to a miss.
    #[inline]
    pub fn intersect(&self, ray: &Ray) -> f32 {
        let lengths0 = (Vec3A::from(self.min) - ray.origin) * ray.inverse_direction;
        let lengths1 = (Vec3A::from(self.max) - ray.origin) * ray.inverse_direction;

        if (lengths0.is_nan_mask() | lengths1.is_nan_mask()).any() {
            return f32::INFINITY;
        }

        let far = lengths0.max(lengths1).min_element() * FAR_MULTIPLIER;
        let near = lengths0.min(lengths1).max_element();

        if far >= near && far >= 0.0 {
            near
        } else {
            f32::INFINITY
        }
    }

    /// Feeds the exact bit patterns of the box into `state`.
    pub fn hash_bits<H: Hasher>(&self, state: &mut H) {
        for value in self.min.to_array().into_iter().chain(self.max.to_array()) {
            state.write_u32(value.to_bits());
        }
    }
}

impl Default for AxisAlignedBoundingBox {
    fn default() -> Self {
        Self::NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> AxisAlignedBoundingBox {
        AxisAlignedBoundingBox::new(Vec3::ZERO, Vec3::ONE)
    }

    #[test]
    fn origin_inside_reports_non_positive_distance() {
        let ray = Ray::new(Vec3::splat(0.5), Vec3::new(0.3, -0.2, 0.9));
        assert!(unit_box().intersect(&ray) <= 0.0);
    }

    #[test]
    fn entry_distance_from_outside() {
        let ray = Ray::new(Vec3::new(0.5, 0.5, -2.0), Vec3::Z);
        let distance = unit_box().intersect(&ray);
        assert!((distance - 2.0).abs() < 1e-5);
    }

    #[test]
    fn miss_returns_infinity() {
        let ray = Ray::new(Vec3::new(2.0, 2.0, -2.0), Vec3::Z);
        assert_eq!(unit_box().intersect(&ray), f32::INFINITY);

        let behind = Ray::new(Vec3::new(0.5, 0.5, 3.0), Vec3::Z);
        assert_eq!(unit_box().intersect(&behind), f32::INFINITY);
    }

    #[test]
    fn nan_never_hits() {
        let nan = f32::NAN;
        let rays = [
            Ray::new(Vec3::new(nan, 0.5, -2.0), Vec3::Z),
            Ray::new(Vec3::new(0.5, 0.5, -2.0), Vec3::new(0.0, nan, 1.0)),
            Ray::new(Vec3::new(0.5, 0.5, -2.0), Vec3::ZERO),
        ];
        for ray in &rays {
            assert_eq!(unit_box().intersect(ray), f32::INFINITY);
        }

        let ray = Ray::new(Vec3::new(0.5, 0.5, -2.0), Vec3::Z);
        let broken = AxisAlignedBoundingBox::new(Vec3::new(0.0, nan, 0.0), Vec3::ONE);
        assert_eq!(broken.intersect(&ray), f32::INFINITY);
        let broken = AxisAlignedBoundingBox::new(Vec3::ZERO, Vec3::new(1.0, 1.0, nan));
        assert_eq!(broken.intersect(&ray), f32::INFINITY);
    }

    #[test]
    fn none_box_is_never_hit() {
        let directions = [
            Vec3::ONE,
            -Vec3::ONE,
            Vec3::new(1.0, -1.0, 1.0),
            Vec3::new(-1.0, 1.0, -1.0),
        ];
        for direction in directions {
            let ray = Ray::new(Vec3::ZERO, direction);
            assert_eq!(AxisAlignedBoundingBox::NONE.intersect(&ray), f32::INFINITY);
        }
    }

    #[test]
    fn encapsulate_is_commutative_and_idempotent() {
        let a = AxisAlignedBoundingBox::new(Vec3::new(-1.0, 0.0, 2.0), Vec3::new(0.0, 3.0, 4.0));
        let b = AxisAlignedBoundingBox::new(Vec3::new(0.5, -2.0, 1.0), Vec3::new(1.0, 1.0, 1.5));
        assert_eq!(a.encapsulate(&b), b.encapsulate(&a));
        assert_eq!(a.encapsulate(&a), a);
        assert_eq!(AxisAlignedBoundingBox::from_boxes(&[a, b]), a.encapsulate(&b));
    }

    #[test]
    fn derived_values() {
        let bounds = AxisAlignedBoundingBox::new(Vec3::new(-1.0, 0.0, 0.0), Vec3::new(3.0, 1.0, 2.0));
        assert_eq!(bounds.center(), Vec3::new(1.0, 0.5, 1.0));
        assert_eq!(bounds.extend(), Vec3::new(2.0, 0.5, 1.0));
        assert_eq!(bounds.area(), 4.0 + 2.0 + 8.0);
        assert_eq!(bounds.major_axis(), 0);

        let points = [Vec3::new(1.0, 5.0, -1.0), Vec3::new(-2.0, 0.0, 3.0)];
        let bounds = AxisAlignedBoundingBox::from_points(&points);
        assert_eq!(bounds.min, Vec3::new(-2.0, 0.0, -1.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 5.0, 3.0));
        assert_eq!(bounds.major_axis(), 1);
    }

    #[test]
    #[should_panic(expected = "is below its minimum")]
    fn inverted_box_is_rejected() {
        let _ = AxisAlignedBoundingBox::new(Vec3::ONE, Vec3::ZERO);
    }
}
