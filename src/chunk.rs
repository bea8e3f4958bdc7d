//! One tile of the editable terrain.
//!
//! A chunk owns a `resolution × resolution` height grid and a parallel surface
//! grid. Vertex `(col, row)` sits at world position
//! `(origin_x + col * spacing, origin_z + row * spacing)`, where the origin is the
//! tile's north-west corner and `spacing = tile_size / (resolution - 1)`. The
//! vertices on each edge are duplicated by the neighboring chunk; the manager
//! keeps both copies identical after edits.

use crate::border::{ChunkEdge, Corner, EdgeDirection};
use crate::brush::{
    falloff, lerp, BrushMode, BrushOptions, BrushOutcome, GridBounds, SlopeBand,
    SurfaceBrushOptions, CHANGE_EPSILON,
};
use crate::config::TerrainConfig;
use crate::grid::Grid;
use crate::store::{self, KeyValueStore, StoreError};
use crate::surface::SurfaceType;
use crate::tile::TileCoord;

/// Weight toward the band target at the band's lateral edge.
const BAND_EDGE_BLEND: f32 = 0.35;

/// Heightfield and surface field of one tile
#[derive(Clone, Debug)]
pub struct TerrainChunk {
    coord: TileCoord,
    tile_size: f32,
    max_height: f32,
    heights: Grid<f32>,
    surfaces: Grid<SurfaceType>,
    /// In-memory state differs from the persisted copy
    dirty: bool,
}

impl TerrainChunk {
    /// Create a flat, all-grass chunk.
    pub fn new(coord: TileCoord, config: &TerrainConfig) -> Self {
        Self {
            coord,
            tile_size: config.tile_size,
            max_height: config.max_height,
            heights: Grid::new_with(config.resolution, 0.0),
            surfaces: Grid::new_with(config.resolution, SurfaceType::Grass),
            dirty: false,
        }
    }

    pub fn coord(&self) -> TileCoord {
        self.coord
    }

    /// String key `"x:z"` of this chunk.
    pub fn key(&self) -> String {
        self.coord.key()
    }

    pub fn resolution(&self) -> usize {
        self.heights.size
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn max_height(&self) -> f32 {
        self.max_height
    }

    /// Row-major heights in mesh vertex order.
    pub fn heights(&self) -> &[f32] {
        self.heights.as_slice()
    }

    /// Row-major surface tags in mesh vertex order.
    pub fn surfaces(&self) -> &[SurfaceType] {
        self.surfaces.as_slice()
    }

    pub fn height(&self, col: usize, row: usize) -> f32 {
        *self.heights.get(col, row)
    }

    pub fn surface(&self, col: usize, row: usize) -> SurfaceType {
        *self.surfaces.get(col, row)
    }

    /// Set one vertex height (clamped). Returns whether the value changed.
    pub fn set_height(&mut self, col: usize, row: usize, value: f32) -> bool {
        self.write_height(col, row, value)
    }

    /// Set one vertex surface. Returns whether the value changed.
    pub fn set_surface(&mut self, col: usize, row: usize, surface: SurfaceType) -> bool {
        if *self.surfaces.get(col, row) == surface {
            return false;
        }
        self.surfaces.set(col, row, surface);
        self.dirty = true;
        true
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    // =========================================================================
    // Coordinates
    // =========================================================================

    /// World-space (x, z) of the north-west corner vertex.
    pub fn origin(&self) -> (f32, f32) {
        let (cx, cz) = self.coord.center(self.tile_size);
        let half = self.tile_size * 0.5;
        (cx - half, cz - half)
    }

    /// World units between adjacent vertices.
    pub fn spacing(&self) -> f32 {
        self.tile_size / (self.resolution() - 1) as f32
    }

    /// Fractional grid coordinates (col, row) of a world point, unclamped.
    pub fn world_to_grid(&self, x: f32, z: f32) -> (f32, f32) {
        let (ox, oz) = self.origin();
        let spacing = self.spacing();
        ((x - ox) / spacing, (z - oz) / spacing)
    }

    /// World-space (x, z) of a vertex.
    pub fn grid_to_world(&self, col: usize, row: usize) -> (f32, f32) {
        let (ox, oz) = self.origin();
        let spacing = self.spacing();
        (ox + col as f32 * spacing, oz + row as f32 * spacing)
    }

    /// Whether a world point lies inside this chunk's footprint (edges included).
    pub fn contains(&self, x: f32, z: f32) -> bool {
        let (ox, oz) = self.origin();
        x >= ox && x <= ox + self.tile_size && z >= oz && z <= oz + self.tile_size
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Bilinear height at a world point. Points outside the footprint are
    /// clamped to the nearest edge.
    pub fn height_at(&self, x: f32, z: f32) -> f32 {
        let (gx, gz) = self.world_to_grid(x, z);
        self.heights.sample_bilinear(gx, gz)
    }

    /// Surface of the vertex nearest to a world point.
    pub fn surface_at(&self, x: f32, z: f32) -> SurfaceType {
        let (gx, gz) = self.world_to_grid(x, z);
        let last = (self.resolution() - 1) as f32;
        let col = gx.round().clamp(0.0, last) as usize;
        let row = gz.round().clamp(0.0, last) as usize;
        *self.surfaces.get(col, row)
    }

    /// Lowest and highest vertex height.
    pub fn height_range(&self) -> (f32, f32) {
        self.heights.min_max()
    }

    // =========================================================================
    // Brushes
    // =========================================================================

    /// Apply a raise/lower/smooth/flatten dab centered on a world point.
    pub fn apply_brush(&mut self, x: f32, z: f32, options: &BrushOptions) -> BrushOutcome {
        if !options.is_active() || !x.is_finite() || !z.is_finite() {
            return BrushOutcome::unchanged();
        }

        let (gx, gz) = self.world_to_grid(x, z);
        let radius = options.radius / self.spacing();
        let Some(bounds) = self.footprint(gx, gz, radius) else {
            return BrushOutcome::unchanged();
        };

        // Targets are computed from the pre-dab state so smoothing does not
        // depend on visit order.
        let mut updates = Vec::new();
        for row in bounds.min_row..=bounds.max_row {
            for col in bounds.min_col..=bounds.max_col {
                let dx = col as f32 - gx;
                let dz = row as f32 - gz;
                let distance = (dx * dx + dz * dz).sqrt();
                if distance > radius {
                    continue;
                }

                let influence = falloff(distance, radius);
                let old = *self.heights.get(col, row);
                let new = match options.mode {
                    BrushMode::Raise => (old + options.strength * influence).min(self.max_height),
                    BrushMode::Lower => (old - options.strength * influence).max(-self.max_height),
                    BrushMode::Smooth => {
                        lerp(old, self.heights.average_3x3(col, row), 0.5 * influence)
                    }
                    BrushMode::Flatten { target } => {
                        lerp(old, target, options.strength.clamp(0.0, 1.0) * influence)
                    }
                };
                updates.push((col, row, new));
            }
        }

        let mut changed = false;
        for (col, row, value) in updates {
            changed |= self.write_height(col, row, value);
        }

        BrushOutcome {
            changed,
            touched: bounds.touched_edges(self.resolution()),
            bounds: Some(bounds),
        }
    }

    /// Paint a surface type with influence-weighted blending.
    ///
    /// Each vertex takes the tag nearest to
    /// `lerp(current, target, strength * influence)`, so strong brushes switch
    /// abruptly near the rim while weak ones bleed in gradually.
    pub fn apply_surface_brush(&mut self, x: f32, z: f32, options: &SurfaceBrushOptions) -> BrushOutcome {
        if !options.is_active() || !x.is_finite() || !z.is_finite() {
            return BrushOutcome::unchanged();
        }

        let (gx, gz) = self.world_to_grid(x, z);
        let radius = options.radius / self.spacing();
        let Some(bounds) = self.footprint(gx, gz, radius) else {
            return BrushOutcome::unchanged();
        };

        let target = options.surface.id() as f32;
        let mut changed = false;

        for row in bounds.min_row..=bounds.max_row {
            for col in bounds.min_col..=bounds.max_col {
                let dx = col as f32 - gx;
                let dz = row as f32 - gz;
                let distance = (dx * dx + dz * dz).sqrt();
                if distance > radius {
                    continue;
                }

                let influence = falloff(distance, radius);
                let current = *self.surfaces.get(col, row);
                let blended = lerp(current.id() as f32, target, options.strength * influence);
                changed |= self.set_surface(col, row, SurfaceType::from_blend(blended));
            }
        }

        BrushOutcome {
            changed,
            touched: bounds.touched_edges(self.resolution()),
            bounds: Some(bounds),
        }
    }

    /// Stamp a graded ramp into every vertex covered by the band.
    ///
    /// Vertices are pulled toward `base_height + delta_height * t` with a weight of
    /// 1 on the centerline falling to 0.35 at the lateral edges. The outcome's
    /// bounds cover the vertices actually modified.
    pub fn apply_slope_band(&mut self, band: &SlopeBand) -> BrushOutcome {
        let Some(band) = band.normalized() else {
            return BrushOutcome::unchanged();
        };

        let resolution = self.resolution();
        let mut modified: Option<GridBounds> = None;

        for row in 0..resolution {
            for col in 0..resolution {
                let (wx, wz) = self.grid_to_world(col, row);
                let ox = wx - band.center.0;
                let oz = wz - band.center.1;

                let along = ox * band.direction.0 + oz * band.direction.1;
                let lateral = ox * band.right.0 + oz * band.right.1;
                if along.abs() > band.half_length || lateral.abs() > band.half_width {
                    continue;
                }

                let t = (along + band.half_length) / (2.0 * band.half_length);
                let target = band.base_height + band.delta_height * t;
                let width_factor = 1.0 - lateral.abs() / band.half_width;
                let blend = BAND_EDGE_BLEND + (1.0 - BAND_EDGE_BLEND) * width_factor;

                let old = *self.heights.get(col, row);
                if self.write_height(col, row, lerp(old, target, blend)) {
                    match modified.as_mut() {
                        Some(bounds) => bounds.include(col, row),
                        None => modified = Some(GridBounds::cell(col, row)),
                    }
                }
            }
        }

        match modified {
            Some(bounds) => BrushOutcome {
                changed: true,
                touched: bounds.touched_edges(resolution),
                bounds: Some(bounds),
            },
            None => BrushOutcome::unchanged(),
        }
    }

    /// Clamped grid bounding box of a circle, or None when it misses the grid.
    fn footprint(&self, gx: f32, gz: f32, radius: f32) -> Option<GridBounds> {
        let last = (self.resolution() - 1) as f32;
        let min_col = (gx - radius).floor().max(0.0);
        let max_col = (gx + radius).ceil().min(last);
        let min_row = (gz - radius).floor().max(0.0);
        let max_row = (gz + radius).ceil().min(last);

        if min_col > max_col || min_row > max_row {
            return None;
        }

        Some(GridBounds {
            min_col: min_col as usize,
            max_col: max_col as usize,
            min_row: min_row as usize,
            max_row: max_row as usize,
        })
    }

    /// Clamp and store a height; marks the chunk dirty when it changes.
    fn write_height(&mut self, col: usize, row: usize, value: f32) -> bool {
        if !value.is_finite() {
            return false;
        }
        let value = value.clamp(-self.max_height, self.max_height);
        let old = *self.heights.get(col, row);
        if (value - old).abs() <= CHANGE_EPSILON {
            return false;
        }
        self.heights.set(col, row, value);
        self.dirty = true;
        true
    }

    // =========================================================================
    // Borders
    // =========================================================================

    /// Heights along one edge.
    pub fn edge(&self, direction: EdgeDirection) -> ChunkEdge {
        let last = self.resolution() - 1;
        let heights = match direction {
            EdgeDirection::North => self.heights.row(0),
            EdgeDirection::South => self.heights.row(last),
            EdgeDirection::West => self.heights.column(0),
            EdgeDirection::East => self.heights.column(last),
        };
        ChunkEdge::new(heights)
    }

    /// Overwrite one edge with neighbor data. Returns whether any value changed.
    /// Edges of a different length are ignored.
    pub fn apply_edge(&mut self, direction: EdgeDirection, edge: &ChunkEdge) -> bool {
        let resolution = self.resolution();
        if edge.len() != resolution {
            return false;
        }

        let last = resolution - 1;
        let mut changed = false;
        for (i, &h) in edge.heights.iter().enumerate() {
            let (col, row) = match direction {
                EdgeDirection::North => (i, 0),
                EdgeDirection::South => (i, last),
                EdgeDirection::West => (0, i),
                EdgeDirection::East => (last, i),
            };
            changed |= self.write_height(col, row, h);
        }
        changed
    }

    pub fn corner(&self, corner: Corner) -> f32 {
        let (col, row) = corner.cell(self.resolution());
        *self.heights.get(col, row)
    }

    /// Overwrite one corner vertex. Returns whether it changed.
    pub fn set_corner(&mut self, corner: Corner, height: f32) -> bool {
        let (col, row) = corner.cell(self.resolution());
        self.write_height(col, row, height)
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Restore state from the store. Each record falls back to its defaults (flat
    /// or grass) when missing or malformed. Returns whether any record was used.
    pub fn load(&mut self, store: &dyn KeyValueStore, base_key: &str) -> bool {
        let resolution = self.resolution();
        let expected = resolution * resolution;

        let heights = read_record(store, &store::height_key(base_key, self.coord))
            .and_then(|bytes| match store::decode_heights(&bytes, expected) {
                Ok(heights) => Some(heights),
                Err(e) => {
                    log::warn!("Chunk {}: discarding height record: {}", self.coord, e);
                    None
                }
            })
            .and_then(|heights| Grid::from_vec(resolution, heights));

        let surfaces = read_record(store, &store::surface_key(base_key, self.coord))
            .and_then(|bytes| match store::decode_surfaces(&bytes, expected) {
                Ok(surfaces) => Some(surfaces),
                Err(e) => {
                    log::warn!("Chunk {}: discarding surface record: {}", self.coord, e);
                    None
                }
            })
            .and_then(|surfaces| Grid::from_vec(resolution, surfaces));

        let restored = heights.is_some() || surfaces.is_some();

        match heights {
            Some(mut grid) => {
                // The clamp bound may have changed since the record was written
                let max = self.max_height;
                for col in 0..resolution {
                    for row in 0..resolution {
                        let h = grid.get(col, row).clamp(-max, max);
                        grid.set(col, row, h);
                    }
                }
                self.heights = grid;
            }
            None => self.heights.fill(0.0),
        }
        match surfaces {
            Some(grid) => self.surfaces = grid,
            None => self.surfaces.fill(SurfaceType::Grass),
        }

        self.dirty = false;
        log::debug!("Chunk {} loaded (restored: {})", self.coord, restored);
        restored
    }

    /// Write both records to the store and clear the dirty flag.
    pub fn save(&mut self, store: &mut dyn KeyValueStore, base_key: &str) -> Result<(), StoreError> {
        let heights = store::encode_heights(self.heights.as_slice())?;
        let surfaces = store::encode_surfaces(self.surfaces.as_slice())?;

        store.set(&store::height_key(base_key, self.coord), &heights)?;
        store.set(&store::surface_key(base_key, self.coord), &surfaces)?;

        self.dirty = false;
        Ok(())
    }
}

/// Fetch a record, treating read failures as a missing record.
fn read_record(store: &dyn KeyValueStore, key: &str) -> Option<Vec<u8>> {
    match store.get(key) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::warn!("Failed to read {}: {}", key, e);
            None
        }
    }
}
