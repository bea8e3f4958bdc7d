//! Sparse set of live chunks around the viewer.
//!
//! The manager streams chunks in and out as the viewer moves, routes brushes
//! and slope stamps to every chunk they overlap, and keeps shared edges
//! identical by pushing edited edges into the neighboring chunks.
//!
//! Persistence is explicit: edits only reach the store through
//! [`TerrainManager::save_dirty_chunks`]. Streaming never saves, so a dirty
//! chunk that leaves the view window loses its pending edits.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use crate::border::{ChunkEdge, Corner, EdgeDirection};
use crate::brush::{BrushOptions, SurfaceBrushOptions, TouchedEdges, TrackSlope};
use crate::chunk::TerrainChunk;
use crate::config::{ConfigError, TerrainConfig, MAX_VIEW_DISTANCE};
use crate::store::KeyValueStore;
use crate::tile::TileCoord;

/// Counters for monitoring streaming and persistence
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TerrainStats {
    /// Chunks currently resident
    pub resident: usize,
    /// Chunks awaiting a flush
    pub dirty: usize,
    /// Chunks restored from at least one stored record
    pub loads: usize,
    /// Chunks created flat because nothing was stored
    pub defaults: usize,
    /// Chunks written to the store
    pub saves: usize,
    /// Chunk saves that failed
    pub save_failures: usize,
    /// Chunks dropped from memory
    pub evictions: usize,
    /// Dirty chunks dropped before being flushed
    pub dropped_edits: usize,
}

impl TerrainStats {
    /// Format as human-readable string
    pub fn summary(&self) -> String {
        format!(
            "Chunks: {} | Dirty: {} | Loaded: {} | Fresh: {} | Saved: {} | Failed: {} | Evicted: {} | Lost: {}",
            self.resident,
            self.dirty,
            self.loads,
            self.defaults,
            self.saves,
            self.save_failures,
            self.evictions,
            self.dropped_edits
        )
    }
}

/// Result of [`TerrainManager::save_dirty_chunks`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub saved: usize,
    pub failed: usize,
}

/// Value copied from an edited chunk into a neighbor
enum BorderPush {
    Edge(EdgeDirection, ChunkEdge),
    Corner(Corner, f32),
}

/// Owns the live chunks of one world and the store they persist to.
pub struct TerrainManager<S: KeyValueStore> {
    config: TerrainConfig,
    store: S,
    /// Prefix of every record key (world or map slot)
    base_key: String,
    chunks: HashMap<TileCoord, TerrainChunk>,
    /// Chunks edited since their last save
    dirty: HashSet<TileCoord>,
    /// Chunks whose mesh must be rebuilt
    geometry_updates: HashSet<TileCoord>,
    /// Chunks dropped since the last `take_evicted`
    evicted: Vec<TileCoord>,
    viewer_tile: Option<TileCoord>,
    stats: TerrainStats,
}

impl<S: KeyValueStore> TerrainManager<S> {
    /// Create an empty manager. Chunks appear on the first streaming update or
    /// the first edit or query that needs them.
    pub fn new(config: TerrainConfig, store: S, base_key: impl Into<String>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            store,
            base_key: base_key.into(),
            chunks: HashMap::new(),
            dirty: HashSet::new(),
            geometry_updates: HashSet::new(),
            evicted: Vec::new(),
            viewer_tile: None,
            stats: TerrainStats::default(),
        })
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    pub fn base_key(&self) -> &str {
        &self.base_key
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Tile owning a world point.
    pub fn tile_for(&self, x: f32, z: f32) -> TileCoord {
        TileCoord::from_world(x, z, self.config.tile_size)
    }

    /// Tile of the last reported viewer position.
    pub fn viewer_tile(&self) -> Option<TileCoord> {
        self.viewer_tile
    }

    // =========================================================================
    // Streaming
    // =========================================================================

    /// Keep exactly the chunks within `view_distance` of the viewer's tile.
    pub fn update_visible_chunks(&mut self, x: f32, z: f32) {
        if !x.is_finite() || !z.is_finite() {
            log::warn!("Ignoring non-finite viewer position ({}, {})", x, z);
            return;
        }
        let viewer = self.tile_for(x, z);
        self.stream_around(viewer);
    }

    /// Change the retention radius and restream around the last viewer tile.
    /// Values above [`MAX_VIEW_DISTANCE`] are clamped.
    pub fn set_view_distance(&mut self, view_distance: u32) {
        if view_distance > MAX_VIEW_DISTANCE {
            log::warn!(
                "View distance {} clamped to {}",
                view_distance, MAX_VIEW_DISTANCE
            );
        }
        self.config.view_distance = view_distance.min(MAX_VIEW_DISTANCE);
        if let Some(viewer) = self.viewer_tile {
            self.stream_around(viewer);
        }
    }

    fn stream_around(&mut self, viewer: TileCoord) {
        let radius = self.config.view_distance.min(MAX_VIEW_DISTANCE) as i32;
        if self.viewer_tile != Some(viewer) {
            log::debug!("Viewer entered tile {}", viewer);
        }
        self.viewer_tile = Some(viewer);

        for tile in viewer.window(radius) {
            self.ensure_chunk(tile);
        }

        let mut stale: Vec<TileCoord> = self
            .chunks
            .keys()
            .filter(|tile| tile.distance(viewer) > radius)
            .copied()
            .collect();
        stale.sort();

        for tile in stale {
            self.evict(tile);
        }
    }

    /// Drop a chunk from memory without saving it.
    fn evict(&mut self, tile: TileCoord) {
        let Some(chunk) = self.chunks.remove(&tile) else {
            return;
        };

        if self.dirty.remove(&tile) || chunk.is_dirty() {
            self.stats.dropped_edits += 1;
            log::warn!("Chunk {} evicted with unsaved edits", tile);
        }
        self.geometry_updates.remove(&tile);
        self.evicted.push(tile);
        self.stats.evictions += 1;
    }

    /// Resident chunk for a tile, loading or creating it when absent.
    fn ensure_chunk(&mut self, tile: TileCoord) -> &mut TerrainChunk {
        match self.chunks.entry(tile) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let mut chunk = TerrainChunk::new(tile, &self.config);
                if chunk.load(&self.store, &self.base_key) {
                    self.stats.loads += 1;
                } else {
                    self.stats.defaults += 1;
                }
                self.geometry_updates.insert(tile);
                entry.insert(chunk)
            }
        }
    }

    /// Every tile overlapped by a world-space box.
    fn tiles_in_box(&self, min_x: f32, min_z: f32, max_x: f32, max_z: f32) -> Vec<TileCoord> {
        TileCoord::range(self.tile_for(min_x, min_z), self.tile_for(max_x, max_z))
    }

    fn mark_changed(&mut self, tile: TileCoord) {
        self.dirty.insert(tile);
        self.geometry_updates.insert(tile);
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Apply a height brush to every chunk it overlaps, then resync the edges
    /// the edit reached. Returns whether any height changed.
    pub fn apply_brush(&mut self, x: f32, z: f32, options: &BrushOptions) -> bool {
        let options = BrushOptions {
            radius: options.radius.min(self.config.max_brush_radius),
            ..*options
        };
        if !options.is_active() || !x.is_finite() || !z.is_finite() {
            return false;
        }

        let r = options.radius;
        let mut edited = Vec::new();
        for tile in self.tiles_in_box(x - r, z - r, x + r, z + r) {
            let outcome = self.ensure_chunk(tile).apply_brush(x, z, &options);
            if outcome.changed {
                self.mark_changed(tile);
                edited.push((tile, outcome.touched));
            }
        }

        // Brushes land on every chunk before any edge is copied, so a vertex
        // shared by two chunks is never raised twice.
        for &(tile, touched) in &edited {
            self.sync_chunk_borders(tile, touched);
        }

        !edited.is_empty()
    }

    /// Paint a surface type on every chunk the brush overlaps. Seams are left
    /// as painted.
    pub fn apply_surface_brush(&mut self, x: f32, z: f32, options: &SurfaceBrushOptions) -> bool {
        let options = SurfaceBrushOptions {
            radius: options.radius.min(self.config.max_brush_radius),
            ..*options
        };
        if !options.is_active() || !x.is_finite() || !z.is_finite() {
            return false;
        }

        let r = options.radius;
        let mut changed = false;
        for tile in self.tiles_in_box(x - r, z - r, x + r, z + r) {
            if self.ensure_chunk(tile).apply_surface_brush(x, z, &options).changed {
                self.mark_changed(tile);
                changed = true;
            }
        }
        changed
    }

    /// Stamp a graded ramp for a road or track segment. Returns whether any
    /// height changed.
    ///
    /// Length and width are clamped to the configured track limits, and only
    /// chunks under the band rectangle are touched.
    pub fn apply_slope_for_track(&mut self, track: &TrackSlope) -> bool {
        let track = track.clamped(self.config.max_track_length, self.config.max_track_width);
        let Some(band) = track.band() else {
            return false;
        };

        let r = band.bounding_radius();
        let (cx, cz) = band.center;
        let half_tile = self.config.tile_size * 0.5;
        let crossed: Vec<TileCoord> = self
            .tiles_in_box(cx - r, cz - r, cx + r, cz + r)
            .into_iter()
            .filter(|tile| band.overlaps_square(tile.center(self.config.tile_size), half_tile))
            .collect();

        let mut edited = Vec::new();
        for tile in crossed {
            let outcome = self.ensure_chunk(tile).apply_slope_band(&band);
            if outcome.changed {
                self.mark_changed(tile);
                edited.push((tile, outcome.touched));
            }
        }

        for &(tile, touched) in &edited {
            self.sync_chunk_borders(tile, touched);
        }

        log::debug!(
            "Track slope at ({:.1}, {:.1}): {} chunk(s) graded",
            cx, cz, edited.len()
        );
        !edited.is_empty()
    }

    /// Copy the touched edges of a chunk into its neighbors.
    ///
    /// Each touched side overwrites the opposite side of the adjacent chunk. When
    /// two sides meeting at a corner are both touched, the corner vertex is also
    /// copied into the diagonal neighbor. Neighbors are created if needed.
    /// Returns the number of neighbors that changed.
    pub fn sync_chunk_borders(&mut self, tile: TileCoord, touched: TouchedEdges) -> usize {
        if !touched.any() {
            return 0;
        }
        let Some(chunk) = self.chunks.get(&tile) else {
            return 0;
        };

        let mut pushes = Vec::new();
        for direction in EdgeDirection::ALL {
            if touched.touches(direction) {
                pushes.push((
                    tile.neighbor(direction),
                    BorderPush::Edge(direction.opposite(), chunk.edge(direction)),
                ));
            }
        }
        for corner in Corner::ALL {
            let (a, b) = corner.sides();
            if touched.touches(a) && touched.touches(b) {
                pushes.push((
                    tile.diagonal(corner),
                    BorderPush::Corner(corner.opposite(), chunk.corner(corner)),
                ));
            }
        }

        let mut updated = 0;
        for (neighbor, push) in pushes {
            let target = self.ensure_chunk(neighbor);
            let changed = match &push {
                BorderPush::Edge(side, edge) => target.apply_edge(*side, edge),
                BorderPush::Corner(corner, height) => target.set_corner(*corner, *height),
            };
            if changed {
                self.mark_changed(neighbor);
                updated += 1;
            }
        }
        updated
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Save every dirty resident chunk. Chunks that fail to save stay dirty.
    pub fn save_dirty_chunks(&mut self) -> FlushReport {
        let mut tiles: Vec<TileCoord> = self.dirty.drain().collect();
        tiles.sort();

        let mut report = FlushReport::default();
        for tile in tiles {
            let Some(chunk) = self.chunks.get_mut(&tile) else {
                continue;
            };
            match chunk.save(&mut self.store, &self.base_key) {
                Ok(()) => report.saved += 1,
                Err(e) => {
                    log::warn!("Failed to save chunk {}: {}", tile, e);
                    self.dirty.insert(tile);
                    report.failed += 1;
                }
            }
        }

        self.stats.saves += report.saved;
        self.stats.save_failures += report.failed;
        if report.saved > 0 || report.failed > 0 {
            log::info!("Flushed {} chunk(s), {} failed", report.saved, report.failed);
        }
        report
    }

    /// Queue a chunk edited through [`chunk_mut`](Self::chunk_mut) for saving and
    /// a mesh update.
    pub fn mark_dirty(&mut self, tile: TileCoord) {
        if self.chunks.contains_key(&tile) {
            self.mark_changed(tile);
        }
    }

    /// Switch to another world or map slot. Resident chunks are dropped without
    /// saving and reloaded from the new slot around the last viewer tile.
    pub fn switch_base_key(&mut self, base_key: impl Into<String>) {
        let base_key = base_key.into();
        if base_key == self.base_key {
            return;
        }

        let mut tiles: Vec<TileCoord> = self.chunks.keys().copied().collect();
        tiles.sort();
        for tile in tiles {
            self.evict(tile);
        }
        self.dirty.clear();

        log::info!("Switched terrain slot from '{}' to '{}'", self.base_key, base_key);
        self.base_key = base_key;

        if let Some(viewer) = self.viewer_tile {
            self.stream_around(viewer);
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Terrain height at a world point, loading the owning chunk if needed.
    /// Non-finite input yields 0.
    pub fn height_at(&mut self, x: f32, z: f32) -> f32 {
        if !x.is_finite() || !z.is_finite() {
            return 0.0;
        }
        let tile = self.tile_for(x, z);
        self.ensure_chunk(tile).height_at(x, z)
    }

    /// Height at a world point if its chunk is resident.
    pub fn sample_height(&self, x: f32, z: f32) -> Option<f32> {
        if !x.is_finite() || !z.is_finite() {
            return None;
        }
        self.chunks
            .get(&self.tile_for(x, z))
            .map(|chunk| chunk.height_at(x, z))
    }

    pub fn chunk(&self, tile: TileCoord) -> Option<&TerrainChunk> {
        self.chunks.get(&tile)
    }

    /// Mutable access to a resident chunk. Call [`mark_dirty`](Self::mark_dirty)
    /// after editing it directly.
    pub fn chunk_mut(&mut self, tile: TileCoord) -> Option<&mut TerrainChunk> {
        self.chunks.get_mut(&tile)
    }

    pub fn chunks(&self) -> impl Iterator<Item = &TerrainChunk> {
        self.chunks.values()
    }

    /// Resident tiles, sorted.
    pub fn loaded_tiles(&self) -> Vec<TileCoord> {
        let mut tiles: Vec<TileCoord> = self.chunks.keys().copied().collect();
        tiles.sort();
        tiles
    }

    pub fn is_dirty(&self, tile: TileCoord) -> bool {
        self.dirty.contains(&tile)
    }

    /// Dirty tiles, sorted.
    pub fn dirty_tiles(&self) -> Vec<TileCoord> {
        let mut tiles: Vec<TileCoord> = self.dirty.iter().copied().collect();
        tiles.sort();
        tiles
    }

    /// Tiles whose mesh needs rebuilding since the last call, sorted.
    pub fn take_geometry_updates(&mut self) -> Vec<TileCoord> {
        let mut tiles: Vec<TileCoord> = self.geometry_updates.drain().collect();
        tiles.sort();
        tiles
    }

    /// Tiles evicted since the last call, in eviction order.
    pub fn take_evicted(&mut self) -> Vec<TileCoord> {
        std::mem::take(&mut self.evicted)
    }

    pub fn stats(&self) -> TerrainStats {
        TerrainStats {
            resident: self.chunks.len(),
            dirty: self.dirty.len(),
            ..self.stats
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_store::FileStore;
    use crate::store::{self, MemoryStore};
    use crate::surface::SurfaceType;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    /// 20-unit tiles with one world unit between vertices.
    fn unit_config(view_distance: u32) -> TerrainConfig {
        TerrainConfig {
            tile_size: 20.0,
            resolution: 21,
            view_distance,
            max_height: 20.0,
            max_brush_radius: 40.0,
            ..TerrainConfig::default()
        }
    }

    fn manager(config: TerrainConfig) -> TerrainManager<MemoryStore> {
        TerrainManager::new(config, MemoryStore::new(), "world").unwrap()
    }

    fn tiles(coords: &[(i32, i32)]) -> Vec<TileCoord> {
        let mut tiles: Vec<TileCoord> = coords.iter().map(|&(x, z)| TileCoord::new(x, z)).collect();
        tiles.sort();
        tiles
    }

    fn assert_edges_match(manager: &TerrainManager<MemoryStore>, a: TileCoord, side: EdgeDirection) {
        let b = a.neighbor(side);
        let left = manager.chunk(a).unwrap().edge(side);
        let right = manager.chunk(b).unwrap().edge(side.opposite());
        for (i, (ha, hb)) in left.heights.iter().zip(&right.heights).enumerate() {
            assert!((ha - hb).abs() < 1e-5, "{} {:?} vertex {}: {} vs {}", a, side, i, ha, hb);
        }
    }

    fn add_noise(manager: &mut TerrainManager<MemoryStore>, seed: u64) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        for tile in manager.loaded_tiles() {
            let chunk = manager.chunk_mut(tile).unwrap();
            for row in 0..chunk.resolution() {
                for col in 0..chunk.resolution() {
                    chunk.set_height(col, row, rng.gen_range(-5.0..5.0));
                }
            }
        }
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = TerrainConfig { resolution: 1, ..TerrainConfig::default() };
        assert!(TerrainManager::new(config, MemoryStore::new(), "w").is_err());
    }

    #[test]
    fn test_streaming_window() {
        let config = TerrainConfig { resolution: 5, view_distance: 1, ..TerrainConfig::default() };
        let mut terrain = manager(config);

        terrain.update_visible_chunks(0.0, 0.0);
        let mut expected = Vec::new();
        for x in -1..=1 {
            for z in -1..=1 {
                expected.push((x, z));
            }
        }
        assert_eq!(terrain.loaded_tiles(), tiles(&expected));
        assert_eq!(terrain.take_geometry_updates().len(), 9);
        assert!(terrain.take_evicted().is_empty());

        terrain.update_visible_chunks(250.0, 0.0);
        let mut expected = Vec::new();
        for x in 0..=2 {
            for z in -1..=1 {
                expected.push((x, z));
            }
        }
        assert_eq!(terrain.loaded_tiles(), tiles(&expected));
        assert_eq!(terrain.take_evicted(), tiles(&[(-1, -1), (-1, 0), (-1, 1)]));
        assert_eq!(terrain.take_geometry_updates(), tiles(&[(2, -1), (2, 0), (2, 1)]));

        let stats = terrain.stats();
        assert_eq!(stats.resident, 9);
        assert_eq!(stats.defaults, 12);
        assert_eq!(stats.evictions, 3);
    }

    #[test]
    fn test_set_view_distance_restreams() {
        let mut terrain = manager(unit_config(2));
        terrain.update_visible_chunks(0.0, 0.0);
        assert_eq!(terrain.loaded_tiles().len(), 25);

        terrain.set_view_distance(0);
        assert_eq!(terrain.loaded_tiles(), tiles(&[(0, 0)]));
        assert_eq!(terrain.take_evicted().len(), 24);
    }

    #[test]
    fn test_far_viewer_streams_edge_window() {
        let config = TerrainConfig { tile_size: 20.0, resolution: 5, view_distance: 1, ..TerrainConfig::default() };
        let mut terrain = manager(config);

        terrain.update_visible_chunks(1.0e12, 0.0);
        assert_eq!(terrain.viewer_tile(), Some(TileCoord::new(crate::tile::MAX_TILE, 0)));
        assert_eq!(terrain.loaded_tiles().len(), 9);

        terrain.update_visible_chunks(-1.0e12, -1.0e12);
        assert_eq!(terrain.loaded_tiles().len(), 9);
        assert_eq!(terrain.take_evicted().len(), 9);

        terrain.update_visible_chunks(0.0, 0.0);
        assert_eq!(terrain.viewer_tile(), Some(TileCoord::new(0, 0)));
        assert_eq!(terrain.loaded_tiles().len(), 9);
    }

    #[test]
    fn test_view_distance_is_clamped() {
        let config = TerrainConfig { resolution: 2, view_distance: 0, ..TerrainConfig::default() };
        let mut terrain = manager(config);
        terrain.update_visible_chunks(0.0, 0.0);

        terrain.set_view_distance(u32::MAX);
        assert_eq!(terrain.config().view_distance, MAX_VIEW_DISTANCE);
        let side = 2 * MAX_VIEW_DISTANCE as usize + 1;
        assert_eq!(terrain.loaded_tiles().len(), side * side);

        terrain.set_view_distance(1);
        assert_eq!(terrain.loaded_tiles().len(), 9);
    }

    #[test]
    fn test_brush_across_seam_keeps_edges_identical() {
        let mut terrain = manager(unit_config(1));
        terrain.update_visible_chunks(0.0, 0.0);
        add_noise(&mut terrain, 11);

        // Corner shared by tiles (0,0), (1,0), (0,1) and (1,1)
        assert!(terrain.apply_brush(10.0, 10.0, &BrushOptions::smooth(4.0)));

        let origin = TileCoord::new(0, 0);
        assert_edges_match(&terrain, origin, EdgeDirection::East);
        assert_edges_match(&terrain, origin, EdgeDirection::South);
        assert_edges_match(&terrain, TileCoord::new(1, 0), EdgeDirection::South);
        assert_edges_match(&terrain, TileCoord::new(0, 1), EdgeDirection::East);

        let corner = terrain.chunk(origin).unwrap().corner(Corner::SouthEast);
        for (x, z, shared) in [(1, 1, Corner::NorthWest), (1, 0, Corner::SouthWest), (0, 1, Corner::NorthEast)] {
            let h = terrain.chunk(TileCoord::new(x, z)).unwrap().corner(shared);
            assert!((h - corner).abs() < 1e-5);
        }

        for tile in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            assert!(terrain.is_dirty(TileCoord::new(tile.0, tile.1)));
        }
    }

    #[test]
    fn test_raise_on_seam_is_not_doubled() {
        let mut terrain = manager(unit_config(1));
        terrain.update_visible_chunks(0.0, 0.0);

        assert!(terrain.apply_brush(10.0, 0.0, &BrushOptions::raise(3.0, 2.0)));
        // Both copies of the seam vertex got exactly one dab
        assert!((terrain.height_at(10.0, 0.0) - 2.0).abs() < 1e-6);
        assert!((terrain.chunk(TileCoord::new(0, 0)).unwrap().height(20, 10) - 2.0).abs() < 1e-6);
        assert!((terrain.chunk(TileCoord::new(1, 0)).unwrap().height(0, 10) - 2.0).abs() < 1e-6);
        assert_edges_match(&terrain, TileCoord::new(0, 0), EdgeDirection::East);
    }

    #[test]
    fn test_border_sync_creates_missing_neighbor() {
        let mut terrain = manager(unit_config(0));
        terrain.update_visible_chunks(0.0, 0.0);
        assert_eq!(terrain.loaded_tiles(), tiles(&[(0, 0)]));

        let origin = TileCoord::new(0, 0);
        let chunk = terrain.chunk_mut(origin).unwrap();
        for row in 0..chunk.resolution() {
            chunk.set_height(0, row, 3.0);
        }
        terrain.mark_dirty(origin);

        let touched = TouchedEdges { left: true, ..TouchedEdges::none() };
        assert_eq!(terrain.sync_chunk_borders(origin, touched), 1);
        assert!(terrain.is_dirty(TileCoord::new(-1, 0)));
        assert_edges_match(&terrain, origin, EdgeDirection::West);

        // Next streaming update evicts the out-of-window chunk
        terrain.update_visible_chunks(0.0, 0.0);
        assert_eq!(terrain.loaded_tiles(), tiles(&[(0, 0)]));
        assert_eq!(terrain.stats().dropped_edits, 1);
    }

    #[test]
    fn test_surface_brush_does_not_sync() {
        let mut terrain = manager(unit_config(0));
        terrain.update_visible_chunks(0.0, 0.0);

        // Footprint reaches the west edge without crossing it
        let paint = SurfaceBrushOptions::new(SurfaceType::Sand, 1.0, 1.0);
        assert!(terrain.apply_surface_brush(-9.0, 0.0, &paint));
        assert_eq!(terrain.loaded_tiles(), tiles(&[(0, 0)]));
        assert_eq!(terrain.dirty_tiles(), tiles(&[(0, 0)]));
        assert_eq!(terrain.chunk(TileCoord::new(0, 0)).unwrap().surface_at(-9.0, 0.0), SurfaceType::Sand);
    }

    #[test]
    fn test_brush_radius_is_clamped() {
        let mut config = unit_config(1);
        config.max_brush_radius = 5.0;
        let mut terrain = manager(config);
        terrain.update_visible_chunks(0.0, 0.0);

        assert!(terrain.apply_brush(0.0, 0.0, &BrushOptions::raise(1000.0, 1.0)));
        assert!(terrain.height_at(0.0, 0.0) > 0.0);
        assert_eq!(terrain.height_at(6.0, 0.0), 0.0);
        assert_eq!(terrain.height_at(0.0, -8.0), 0.0);
    }

    #[test]
    fn test_noop_edits() {
        let mut terrain = manager(unit_config(1));
        terrain.update_visible_chunks(0.0, 0.0);
        terrain.take_geometry_updates();

        assert!(!terrain.apply_brush(0.0, 0.0, &BrushOptions::raise(0.0, 1.0)));
        assert!(!terrain.apply_brush(f32::INFINITY, 0.0, &BrushOptions::raise(3.0, 1.0)));
        assert!(!terrain.apply_brush(0.0, 0.0, &BrushOptions::smooth(5.0)));

        let flat = TrackSlope {
            center: (0.0, 0.0),
            length: 10.0,
            width: 4.0,
            rotation: 0.0,
            slope_percent: 0.0,
            base_height: 0.0,
            direction: None,
        };
        assert!(!terrain.apply_slope_for_track(&flat));
        assert!(terrain.dirty_tiles().is_empty());
        assert!(terrain.take_geometry_updates().is_empty());
    }

    #[test]
    fn test_long_track_creates_only_crossed_chunks() {
        let mut terrain = manager(unit_config(0));
        terrain.update_visible_chunks(0.0, 0.0);

        // Clamped to the 800 unit default, so x spans [-400, 400]
        let track = TrackSlope {
            center: (0.0, 0.0),
            length: 4000.0,
            width: 4.0,
            rotation: 0.0,
            slope_percent: 1.0,
            base_height: 0.0,
            direction: Some((1.0, 0.0)),
        };
        assert!(terrain.apply_slope_for_track(&track));
        let expected: Vec<(i32, i32)> = (-20..=20).map(|x| (x, 0)).collect();
        assert_eq!(terrain.loaded_tiles(), tiles(&expected));

        // A diagonal band skips the corners of its enclosing box
        let mut terrain = manager(unit_config(0));
        terrain.update_visible_chunks(0.0, 0.0);
        let diagonal = TrackSlope {
            length: 400.0,
            direction: None,
            rotation: std::f32::consts::FRAC_PI_4,
            ..track
        };
        assert!(terrain.apply_slope_for_track(&diagonal));
        let loaded = terrain.loaded_tiles();
        assert!(loaded.len() < 100, "{} chunks resident", loaded.len());
        assert!(loaded.iter().all(|t| (t.x - t.z).abs() <= 1));
    }

    #[test]
    fn test_track_slope_across_seam() {
        let mut terrain = manager(unit_config(1));
        terrain.update_visible_chunks(0.0, 0.0);

        let track = TrackSlope {
            center: (10.0, 0.0),
            length: 12.0,
            width: 4.0,
            rotation: 0.0,
            slope_percent: 20.0,
            base_height: 1.0,
            direction: Some((1.0, 0.0)),
        };
        assert!(terrain.apply_slope_for_track(&track));

        // delta = 20% of 12 = 2.4 over x in [4, 16]
        for x in [4.0, 8.0, 10.0, 13.0, 16.0] {
            let expected = 1.0 + 2.4 * (x - 4.0) / 12.0;
            assert!((terrain.height_at(x, 0.0) - expected).abs() < 1e-4, "x = {}", x);
        }
        assert_edges_match(&terrain, TileCoord::new(0, 0), EdgeDirection::East);
        assert_eq!(terrain.dirty_tiles(), tiles(&[(0, 0), (1, 0)]));
    }

    #[test]
    fn test_flush_persists_and_clears() {
        let mut terrain = manager(unit_config(1));
        terrain.update_visible_chunks(0.0, 0.0);
        terrain.apply_brush(0.0, 0.0, &BrushOptions::raise(3.0, 4.0));
        assert_eq!(terrain.dirty_tiles(), tiles(&[(0, 0)]));

        let report = terrain.save_dirty_chunks();
        assert_eq!(report, FlushReport { saved: 1, failed: 0 });
        assert!(terrain.dirty_tiles().is_empty());
        assert!(terrain.store().contains_key(&store::height_key("world", TileCoord::new(0, 0))));
        assert_eq!(terrain.save_dirty_chunks(), FlushReport::default());
        assert_eq!(terrain.stats().saves, 1);
    }

    #[test]
    fn test_file_store_session_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut terrain =
                TerrainManager::new(unit_config(1), FileStore::new(dir.path()), "slot1").unwrap();
            terrain.update_visible_chunks(0.0, 0.0);
            terrain.apply_brush(10.0, 10.0, &BrushOptions::raise(5.0, 3.0));
            terrain.apply_surface_brush(0.0, 0.0, &SurfaceBrushOptions::new(SurfaceType::Rock, 3.0, 1.0));
            let report = terrain.save_dirty_chunks();
            assert_eq!(report.failed, 0);
            assert_eq!(report.saved, 4);
        }

        let mut terrain =
            TerrainManager::new(unit_config(1), FileStore::new(dir.path()), "slot1").unwrap();
        assert!((terrain.height_at(10.0, 10.0) - 3.0).abs() < 1e-5);
        assert_eq!(terrain.stats().loads, 1);
        terrain.update_visible_chunks(0.0, 0.0);
        assert_eq!(terrain.chunk(TileCoord::new(0, 0)).unwrap().surface_at(0.0, 0.0), SurfaceType::Rock);
        assert!(terrain.store().keys().unwrap().len() >= 8);
    }

    #[test]
    fn test_eviction_drops_unsaved_edits() {
        let mut terrain = manager(unit_config(0));
        terrain.update_visible_chunks(0.0, 0.0);
        terrain.apply_brush(0.0, 0.0, &BrushOptions::raise(3.0, 4.0));

        terrain.update_visible_chunks(1000.0, 0.0);
        assert_eq!(terrain.take_evicted(), tiles(&[(0, 0)]));
        assert_eq!(terrain.stats().dropped_edits, 1);
        assert!(terrain.dirty_tiles().is_empty());

        terrain.update_visible_chunks(0.0, 0.0);
        assert_eq!(terrain.height_at(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_height_query_creates_chunk_lazily() {
        let mut terrain = manager(unit_config(1));
        assert!(terrain.loaded_tiles().is_empty());
        assert_eq!(terrain.sample_height(500.0, -500.0), None);

        assert_eq!(terrain.height_at(500.0, -500.0), 0.0);
        assert_eq!(terrain.loaded_tiles(), tiles(&[(25, -25)]));
        assert_eq!(terrain.sample_height(500.0, -500.0), Some(0.0));

        assert_eq!(terrain.height_at(f32::NAN, 0.0), 0.0);
        assert_eq!(terrain.loaded_tiles().len(), 1);
    }

    #[test]
    fn test_manual_edit_marked_dirty() {
        let mut terrain = manager(unit_config(0));
        terrain.update_visible_chunks(0.0, 0.0);

        let origin = TileCoord::new(0, 0);
        terrain.chunk_mut(origin).unwrap().set_height(3, 3, 1.5);
        terrain.mark_dirty(origin);
        terrain.mark_dirty(TileCoord::new(9, 9));
        assert_eq!(terrain.dirty_tiles(), vec![origin]);
    }

    #[test]
    fn test_switch_base_key() {
        let mut terrain = manager(unit_config(0));
        terrain.update_visible_chunks(0.0, 0.0);
        terrain.apply_brush(0.0, 0.0, &BrushOptions::raise(3.0, 4.0));
        terrain.save_dirty_chunks();

        terrain.switch_base_key("slot2");
        assert_eq!(terrain.base_key(), "slot2");
        assert_eq!(terrain.loaded_tiles(), tiles(&[(0, 0)]));
        assert_eq!(terrain.height_at(0.0, 0.0), 0.0);

        terrain.switch_base_key("world");
        assert!((terrain.height_at(0.0, 0.0) - 4.0).abs() < 1e-6);
        assert_eq!(terrain.stats().dropped_edits, 0);
    }

    #[test]
    fn test_stats_summary() {
        let mut terrain = manager(unit_config(1));
        terrain.update_visible_chunks(0.0, 0.0);
        let summary = terrain.stats().summary();
        assert!(summary.contains("Chunks: 9"));
        assert!(summary.contains("Lost: 0"));
    }
}
