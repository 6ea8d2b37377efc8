use super::token::Token;

/// Maximum number of nested instances a single geometry can sit under.
pub const INSTANCE_DEPTH_LIMIT: usize = 8;

/// Identifies one geometry of a scene, qualified by the chain of instances leading to it from the root pack.
///
/// Two geometries with the same local token under different instances compare unequal, which is what self-intersection
/// suppression relies on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct GeometryToken {
    /// Instance tokens from the root pack downwards. Slots past `instance_count` are always `Token::Empty`.
    instances: [Token; INSTANCE_DEPTH_LIMIT],
    instance_count: u8,
    /// Token of the geometry inside the innermost pack.
    pub geometry: Token,
}

impl GeometryToken {
    /// Instance tokens from the root pack downwards.
    #[inline]
    pub fn instances(&self) -> &[Token] {
        &self.instances[..self.instance_count as usize]
    }

    /// Number of instances between the root pack and the geometry.
    #[inline]
    pub fn depth(&self) -> usize {
        self.instance_count as usize
    }

    /// Enters an instance.
    #[inline]
    pub fn push(&mut self, instance: Token) {
        debug_assert!(instance.is_instance(), "Only instance tokens form an instance path.");
        assert!(
            (self.instance_count as usize) < INSTANCE_DEPTH_LIMIT,
            "Instances are nested deeper than the supported {INSTANCE_DEPTH_LIMIT} levels."
        );
        self.instances[self.instance_count as usize] = instance;
        self.instance_count += 1;
    }

    /// Leaves the innermost instance.
    #[inline]
    pub fn pop(&mut self) {
        assert!(self.instance_count > 0, "Cannot leave an instance that was never entered.");
        self.instance_count -= 1;
        self.instances[self.instance_count as usize] = Token::Empty;
    }

    /// Copy of this instance path identifying `geometry` inside its innermost pack.
    #[inline]
    pub fn with_geometry(&self, geometry: Token) -> Self {
        Self { geometry, ..*self }
    }

    /// Whether this token identifies `geometry` reached through the instance path of `path`.
    #[inline]
    pub fn matches(&self, path: &Self, geometry: Token) -> bool {
        self.geometry == geometry && self.instances() == path.instances()
    }
}
