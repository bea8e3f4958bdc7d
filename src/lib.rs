//! Chunked, editable terrain heightfield library
//!
//! The ground plane is split into square tiles. Each tile is a [`TerrainChunk`]
//! holding a height grid and a surface-type grid. A [`TerrainManager`] streams
//! chunks around the viewer, routes brushes and track slopes to the chunks they
//! overlap, keeps shared edges seamless and flushes edits to a [`KeyValueStore`].

pub mod border;
pub mod brush;
pub mod chunk;
pub mod config;
pub mod export;
pub mod file_store;
pub mod grid;
pub mod manager;
pub mod store;
pub mod surface;
pub mod tile;

pub use brush::{BrushMode, BrushOptions, BrushOutcome, SlopeBand, SurfaceBrushOptions, TrackSlope};
pub use chunk::TerrainChunk;
pub use config::{ConfigError, TerrainConfig};
pub use file_store::FileStore;
pub use manager::{FlushReport, TerrainManager, TerrainStats};
pub use store::{KeyValueStore, MemoryStore, StoreError};
pub use surface::SurfaceType;
pub use tile::TileCoord;
