use glam::{Vec2, Vec3};

use super::aggregation::{GeometryToken, Token};
use crate::utilities::Ray;

/// Hits closer than this to the ray origin on the geometry the ray just left are treated as floating point noise.
pub const DISTANCE_MIN: f32 = 6e-4;

/// A nearest-hit query. Traversal only ever shortens `distance`.
#[derive(Clone, Copy, Debug)]
pub struct TraceQuery {
    pub ray: Ray,
    /// Distance to the closest hit found so far, or the maximum distance to search.
    pub distance: f32,
    /// The closest geometry found so far; its `geometry` is `Token::Empty` while nothing was hit.
    pub token: GeometryToken,
    /// Surface parametrization of the closest hit.
    pub uv: Vec2,
    /// Geometry the ray was spawned from, typically the previous hit of a path.
    pub ignore: GeometryToken,
    /// Instance path currently being traversed.
    pub current: GeometryToken,
}

impl TraceQuery {
    /// Creates a query searching up to infinity.
    #[inline]
    pub fn new(ray: Ray) -> Self {
        Self::with_distance(ray, f32::INFINITY)
    }

    /// Creates a query only accepting hits closer than `distance`.
    #[inline]
    pub fn with_distance(ray: Ray, distance: f32) -> Self {
        Self {
            ray,
            distance,
            token: GeometryToken::default(),
            uv: Vec2::ZERO,
            ignore: GeometryToken::default(),
            current: GeometryToken::default(),
        }
    }

    /// Creates a query for a ray leaving the surface of `previous`.
    #[inline]
    pub fn spawn(ray: Ray, previous: GeometryToken) -> Self {
        Self {
            ignore: previous,
            ..Self::new(ray)
        }
    }

    /// Whether any geometry was hit.
    #[inline]
    pub fn hit(&self) -> bool {
        !self.token.geometry.is_empty()
    }

    /// World position of the closest hit.
    #[inline]
    pub fn point(&self) -> Vec3 {
        self.ray.at(self.distance)
    }

    /// Whether `geometry` inside the current instance path is the geometry this query was spawned from.
    #[inline]
    pub fn ignores(&self, geometry: Token) -> bool {
        self.ignore.matches(&self.current, geometry)
    }

    /// Offers a candidate hit on `geometry` inside the current instance path.
    ///
    /// The candidate is accepted only if it is closer than the current best and is not a grazing re-hit of the
    /// ignored geometry. Returns whether it was accepted.
    #[inline]
    pub fn record(&mut self, geometry: Token, distance: f32, uv: Vec2) -> bool {
        if !(distance < self.distance) {
            return false;
        }
        if distance < DISTANCE_MIN && self.ignores(geometry) {
            return false;
        }
        self.distance = distance;
        self.token = self.current.with_geometry(geometry);
        self.uv = uv;
        true
    }
}

/// A boolean visibility query between the ray origin and `travel` along the ray.
#[derive(Clone, Copy, Debug)]
pub struct OccludeQuery {
    pub ray: Ray,
    /// Distance along the ray beyond which hits are irrelevant.
    pub travel: f32,
    /// Geometry the ray was spawned from.
    pub ignore: GeometryToken,
    /// Instance path currently being traversed.
    pub current: GeometryToken,
}

impl OccludeQuery {
    #[inline]
    pub fn new(ray: Ray, travel: f32) -> Self {
        Self {
            ray,
            travel,
            ignore: GeometryToken::default(),
            current: GeometryToken::default(),
        }
    }

    /// Creates a query for a ray leaving the surface of `previous`.
    #[inline]
    pub fn spawn(ray: Ray, travel: f32, previous: GeometryToken) -> Self {
        Self {
            ignore: previous,
            ..Self::new(ray, travel)
        }
    }

    /// Whether `geometry` inside the current instance path is the geometry this query was spawned from.
    #[inline]
    pub fn ignores(&self, geometry: Token) -> bool {
        self.ignore.matches(&self.current, geometry)
    }

    /// Whether a hit on `geometry` at `distance` blocks the ray.
    #[inline]
    pub fn blocks(&self, geometry: Token, distance: f32) -> bool {
        distance < self.travel && !(distance < DISTANCE_MIN && self.ignores(geometry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ray() -> Ray {
        Ray::new(Vec3::ZERO, Vec3::Z)
    }

    #[test]
    fn record_only_improves() {
        let mut query = TraceQuery::new(ray());
        assert!(!query.hit());
        assert!(query.record(Token::triangle(1), 3.0, Vec2::new(0.2, 0.3)));
        assert!(!query.record(Token::triangle(2), 4.0, Vec2::ZERO));
        assert!(!query.record(Token::triangle(2), f32::NAN, Vec2::ZERO));
        assert!(query.hit());
        assert_eq!(query.distance, 3.0);
        assert_eq!(query.token.geometry, Token::triangle(1));
        assert_eq!(query.uv, Vec2::new(0.2, 0.3));
    }

    #[test]
    fn grazing_rehit_of_ignored_geometry_is_discarded() {
        let previous = GeometryToken::default().with_geometry(Token::sphere(0));
        let mut query = TraceQuery::spawn(ray(), previous);
        assert!(!query.record(Token::sphere(0), DISTANCE_MIN * 0.5, Vec2::ZERO));
        assert!(query.record(Token::sphere(1), DISTANCE_MIN * 0.5, Vec2::ZERO));

        let mut query = TraceQuery::spawn(ray(), previous);
        assert!(query.record(Token::sphere(0), 2.0, Vec2::ZERO));
    }

    #[test]
    fn occlusion_respects_travel_and_ignore() {
        let previous = GeometryToken::default().with_geometry(Token::triangle(7));
        let query = OccludeQuery::spawn(ray(), 5.0, previous);
        assert!(query.blocks(Token::triangle(1), 4.0));
        assert!(!query.blocks(Token::triangle(1), 5.0));
        assert!(!query.blocks(Token::triangle(7), DISTANCE_MIN * 0.1));
        assert!(query.blocks(Token::triangle(7), 1.0));
    }
}
