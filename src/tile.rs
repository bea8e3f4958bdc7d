//! Integer tile coordinates for terrain chunks.
//!
//! Tile `(0, 0)` is centered on the world origin: its footprint spans
//! `[-tile_size / 2, tile_size / 2]` on both axes.

use std::fmt;

use crate::border::{Corner, EdgeDirection};

/// Largest tile index on either axis. Positions beyond it map to the edge tile,
/// which leaves headroom for window and neighbor offsets.
pub const MAX_TILE: i32 = 1 << 30;

/// Identifies one chunk of the ground plane
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    pub x: i32,
    pub z: i32,
}

impl TileCoord {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Tile owning a world-space point (half-tile offset so tile 0 is centered).
    /// Indices are clamped to `[-MAX_TILE, MAX_TILE]`.
    pub fn from_world(x: f32, z: f32, tile_size: f32) -> Self {
        let half = tile_size * 0.5;
        let index = |v: f32| (((v + half) / tile_size).floor() as i32).clamp(-MAX_TILE, MAX_TILE);
        Self { x: index(x), z: index(z) }
    }

    /// String key `"x:z"` used in logs and persisted keys.
    pub fn key(&self) -> String {
        format!("{}:{}", self.x, self.z)
    }

    pub fn offset(&self, dx: i32, dz: i32) -> Self {
        Self::new(self.x.saturating_add(dx), self.z.saturating_add(dz))
    }

    /// Tile sharing the given edge with this one.
    pub fn neighbor(&self, direction: EdgeDirection) -> Self {
        let (dx, dz) = direction.offset();
        self.offset(dx, dz)
    }

    /// Tile sharing only the given corner vertex with this one.
    pub fn diagonal(&self, corner: Corner) -> Self {
        let (dx, dz) = corner.offset();
        self.offset(dx, dz)
    }

    /// Chebyshev distance in tiles.
    pub fn distance(&self, other: TileCoord) -> i32 {
        let d = self.x.abs_diff(other.x).max(self.z.abs_diff(other.z));
        i32::try_from(d).unwrap_or(i32::MAX)
    }

    /// All tiles of the square window `[-radius, radius]²` around this tile, row by row.
    pub fn window(&self, radius: i32) -> Vec<TileCoord> {
        Self::range(self.offset(-radius, -radius), self.offset(radius, radius))
    }

    /// All tiles in the inclusive rectangle `min..=max`, row by row.
    pub fn range(min: TileCoord, max: TileCoord) -> Vec<TileCoord> {
        let mut tiles = Vec::new();
        for z in min.z..=max.z {
            for x in min.x..=max.x {
                tiles.push(TileCoord::new(x, z));
            }
        }
        tiles
    }

    /// World-space center of the tile.
    pub fn center(&self, tile_size: f32) -> (f32, f32) {
        (self.x as f32 * tile_size, self.z as f32 * tile_size)
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.x, self.z)
    }
}
