use glam::{Vec3, Vec4};
use std::hash::Hasher;

use super::bounding_box::{AxisAlignedBoundingBox, FAR_MULTIPLIER};
use super::ray::Ray;

/// Four bounding boxes packed lane-wise so that a ray can be tested against all of them at once.
///
/// Each `Vec4` holds one coordinate of all four boxes; lane `i` belongs to box `i`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisAlignedBoundingBox4 {
    pub min_x: Vec4,
    pub min_y: Vec4,
    pub min_z: Vec4,
    pub max_x: Vec4,
    pub max_y: Vec4,
    pub max_z: Vec4,
}

impl AxisAlignedBoundingBox4 {
    /// Packs four boxes into lanes. Use `AxisAlignedBoundingBox::NONE` for absent slots.
    pub fn new(boxes: [AxisAlignedBoundingBox; 4]) -> Self {
        let lane = |select: fn(&AxisAlignedBoundingBox) -> f32| {
            Vec4::new(select(&boxes[0]), select(&boxes[1]), select(&boxes[2]), select(&boxes[3]))
        };
        Self {
            min_x: lane(|b| b.min.x),
            min_y: lane(|b| b.min.y),
            min_z: lane(|b| b.min.z),
            max_x: lane(|b| b.max.x),
            max_y: lane(|b| b.max.y),
            max_z: lane(|b| b.max.z),
        }
    }

    /// Unpacks the box in lane `index`.
    #[inline]
    pub fn get(&self, index: usize) -> AxisAlignedBoundingBox {
        debug_assert!(index < 4, "Lane index must be within 0 and 3.");
        AxisAlignedBoundingBox {
            min: Vec3::new(self.min_x[index], self.min_y[index], self.min_z[index]),
            max: Vec3::new(self.max_x[index], self.max_y[index], self.max_z[index]),
        }
    }

    /// Intersects a ray with all four boxes using the slab method.
    ///
    /// Lane `i` of the result follows the same contract as `AxisAlignedBoundingBox::intersect` for box `i`.
    #[inline]
    pub fn intersect(&self, ray: &Ray) -> Vec4 {
        let origin_x = Vec4::splat(ray.origin.x);
        let origin_y = Vec4::splat(ray.origin.y);
        let origin_z = Vec4::splat(ray.origin.z);
        let inverse_x = Vec4::splat(ray.inverse_direction.x);
        let inverse_y = Vec4::splat(ray.inverse_direction.y);
        let inverse_z = Vec4::splat(ray.inverse_direction.z);

        let lengths0_x = (self.min_x - origin_x) * inverse_x;
        let lengths0_y = (self.min_y - origin_y) * inverse_y;
        let lengths0_z = (self.min_z - origin_z) * inverse_z;
        let lengths1_x = (self.max_x - origin_x) * inverse_x;
        let lengths1_y = (self.max_y - origin_y) * inverse_y;
        let lengths1_z = (self.max_z - origin_z) * inverse_z;

        let nan = lengths0_x.is_nan_mask()
            | lengths0_y.is_nan_mask()
            | lengths0_z.is_nan_mask()
            | lengths1_x.is_nan_mask()
            | lengths1_y.is_nan_mask()
            | lengths1_z.is_nan_mask();

        let far = lengths0_x
            .max(lengths1_x)
            .min(lengths0_y.max(lengths1_y))
            .min(lengths0_z.max(lengths1_z))
            * FAR_MULTIPLIER;
        let near = lengths0_x
            .min(lengths1_x)
            .max(lengths0_y.min(lengths1_y))
            .max(lengths0_z.min(lengths1_z));

        let hit = far.cmpge(near) & far.cmpge(Vec4::ZERO) & !nan;
        Vec4::select(hit, near, Vec4::INFINITY)
    }

    /// Feeds the exact bit patterns of all lanes into `state`.
    pub fn hash_bits<H: Hasher>(&self, state: &mut H) {
        for lane in [self.min_x, self.min_y, self.min_z, self.max_x, self.max_y, self.max_z] {
            for value in lane.to_array() {
                state.write_u32(value.to_bits());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxes() -> [AxisAlignedBoundingBox; 4] {
        [
            AxisAlignedBoundingBox::new(Vec3::new(0.0, 0.0, 2.0), Vec3::new(1.0, 1.0, 3.0)),
            AxisAlignedBoundingBox::new(Vec3::new(5.0, 5.0, 5.0), Vec3::new(6.0, 6.0, 6.0)),
            AxisAlignedBoundingBox::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(2.0, 2.0, 2.0)),
            AxisAlignedBoundingBox::NONE,
        ]
    }

    #[test]
    fn lanes_round_trip() {
        let packed = AxisAlignedBoundingBox4::new(boxes());
        for (index, expected) in boxes().iter().enumerate() {
            assert_eq!(packed.get(index), *expected);
        }
    }

    #[test]
    fn matches_single_box_test() {
        let packed = AxisAlignedBoundingBox4::new(boxes());
        let rays = [
            Ray::new(Vec3::new(0.5, 0.5, -4.0), Vec3::Z),
            Ray::new(Vec3::new(0.5, 0.5, 10.0), -Vec3::Z),
            Ray::new(Vec3::new(-3.0, -3.0, -3.0), Vec3::ONE),
            Ray::new(Vec3::new(f32::NAN, 0.0, 0.0), Vec3::ONE),
        ];
        for ray in &rays {
            let distances = packed.intersect(ray).to_array();
            for (index, single) in boxes().iter().enumerate() {
                assert_eq!(distances[index], single.intersect(ray), "lane {index}");
            }
        }
    }
}
