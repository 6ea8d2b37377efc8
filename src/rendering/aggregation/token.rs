/// Kind of leaf an aggregator can reference.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Triangle,
    Sphere,
    /// A nested object pack placed with its own transform.
    Instance,
}

/// Compact identifier for an entry of an aggregator.
///
/// Distinguishes internal nodes, leaf geometry of a given kind and instances without any allocation. Fits in eight
/// bytes so that two flattened binary nodes share a cache line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Token {
    /// Absent slot.
    #[default]
    Empty,
    /// Index of a node inside the aggregator that owns this token.
    Node(u32),
    /// Index of a leaf inside the per-kind array of the owning pack.
    Geometry(GeometryKind, u32),
}

/// Tokens of the four children of a quad node.
pub type Token4 = [Token; 4];

impl Token {
    #[inline]
    pub const fn node(index: u32) -> Self {
        Self::Node(index)
    }

    #[inline]
    pub const fn triangle(index: u32) -> Self {
        Self::Geometry(GeometryKind::Triangle, index)
    }

    #[inline]
    pub const fn sphere(index: u32) -> Self {
        Self::Geometry(GeometryKind::Sphere, index)
    }

    #[inline]
    pub const fn instance(index: u32) -> Self {
        Self::Geometry(GeometryKind::Instance, index)
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        matches!(self, Self::Empty)
    }

    #[inline]
    pub const fn is_node(self) -> bool {
        matches!(self, Self::Node(_))
    }

    #[inline]
    pub const fn is_geometry(self) -> bool {
        matches!(self, Self::Geometry(..))
    }

    #[inline]
    pub const fn is_instance(self) -> bool {
        matches!(self, Self::Geometry(GeometryKind::Instance, _))
    }

    /// Kind of leaf this token references, if it references one.
    #[inline]
    pub const fn kind(self) -> Option<GeometryKind> {
        match self {
            Self::Geometry(kind, _) => Some(kind),
            _ => None,
        }
    }

    /// Node or leaf index carried by the token.
    #[inline]
    pub const fn index(self) -> Option<u32> {
        match self {
            Self::Empty => None,
            Self::Node(index) | Self::Geometry(_, index) => Some(index),
        }
    }
}
