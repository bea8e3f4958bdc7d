//! Edge and corner addressing used to keep adjacent chunks seamless.
//!
//! Neighboring chunks duplicate the vertices on their shared edge. After an edit
//! the edited chunk's edge is copied into the neighbor's opposite edge:
//!
//! - North edge (row 0) becomes the last row of the chunk at `z - 1`
//! - South edge (last row) becomes row 0 of the chunk at `z + 1`
//! - West edge (column 0) becomes the last column of the chunk at `x - 1`
//! - East edge (last column) becomes column 0 of the chunk at `x + 1`

/// One side of a chunk
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EdgeDirection {
    North,  // row 0
    South,  // row resolution - 1
    West,   // column 0
    East,   // column resolution - 1
}

impl EdgeDirection {
    pub const ALL: [EdgeDirection; 4] = [
        EdgeDirection::North,
        EdgeDirection::South,
        EdgeDirection::West,
        EdgeDirection::East,
    ];

    pub fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::South => Self::North,
            Self::West => Self::East,
            Self::East => Self::West,
        }
    }

    /// Tile offset (dx, dz) of the neighbor across this edge.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::South => (0, 1),
            Self::West => (-1, 0),
            Self::East => (1, 0),
        }
    }
}

/// One corner vertex of a chunk
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Corner {
    NorthWest,
    NorthEast,
    SouthWest,
    SouthEast,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::NorthWest,
        Corner::NorthEast,
        Corner::SouthWest,
        Corner::SouthEast,
    ];

    /// The two edges meeting at this corner.
    pub fn sides(self) -> (EdgeDirection, EdgeDirection) {
        match self {
            Self::NorthWest => (EdgeDirection::North, EdgeDirection::West),
            Self::NorthEast => (EdgeDirection::North, EdgeDirection::East),
            Self::SouthWest => (EdgeDirection::South, EdgeDirection::West),
            Self::SouthEast => (EdgeDirection::South, EdgeDirection::East),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::NorthWest => Self::SouthEast,
            Self::NorthEast => Self::SouthWest,
            Self::SouthWest => Self::NorthEast,
            Self::SouthEast => Self::NorthWest,
        }
    }

    /// Tile offset (dx, dz) of the diagonal neighbor sharing this corner.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Self::NorthWest => (-1, -1),
            Self::NorthEast => (1, -1),
            Self::SouthWest => (-1, 1),
            Self::SouthEast => (1, 1),
        }
    }

    /// Grid position (column, row) of the corner for a given resolution.
    pub fn cell(self, resolution: usize) -> (usize, usize) {
        let last = resolution - 1;
        match self {
            Self::NorthWest => (0, 0),
            Self::NorthEast => (last, 0),
            Self::SouthWest => (0, last),
            Self::SouthEast => (last, last),
        }
    }
}

/// Heights along one chunk edge, ordered by increasing column (north/south
/// edges) or increasing row (west/east edges).
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkEdge {
    pub heights: Vec<f32>,
}

impl ChunkEdge {
    pub fn new(heights: Vec<f32>) -> Self {
        Self { heights }
    }

    pub fn len(&self) -> usize {
        self.heights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }
}
