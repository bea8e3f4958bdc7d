//! PNG snapshots of the resident terrain.
//!
//! Chunks are stitched into one mosaic covering the bounding rectangle of
//! their tiles. Each chunk contributes `resolution - 1` pixels per axis (its last
//! row and column duplicate the neighbor's first ones), plus one closing pixel
//! row and column on the south and east border. Missing tiles stay black.

use std::collections::BTreeMap;
use std::path::Path;

use image::{ImageBuffer, Rgb, RgbImage};

use crate::chunk::TerrainChunk;
use crate::tile::TileCoord;

const BACKGROUND: [u8; 3] = [0, 0, 0];

/// Render heights with a terrain palette anchored at zero: `-max_height` is
/// deep blue, 0 is sand and `+max_height` is snow.
pub fn render_heights<'a, I>(chunks: I) -> RgbImage
where
    I: IntoIterator<Item = &'a TerrainChunk>,
{
    render_mosaic(chunks, |chunk, col, row| height_color(chunk.height(col, row), chunk.max_height()))
}

/// Render surface tags with their palette colors.
pub fn render_surfaces<'a, I>(chunks: I) -> RgbImage
where
    I: IntoIterator<Item = &'a TerrainChunk>,
{
    render_mosaic(chunks, |chunk, col, row| chunk.surface(col, row).color())
}

/// Export a height mosaic as PNG.
pub fn export_heights<'a, I, P>(chunks: I, path: P) -> Result<(), image::ImageError>
where
    I: IntoIterator<Item = &'a TerrainChunk>,
    P: AsRef<Path>,
{
    render_heights(chunks).save(path)
}

/// Export a surface mosaic as PNG.
pub fn export_surfaces<'a, I, P>(chunks: I, path: P) -> Result<(), image::ImageError>
where
    I: IntoIterator<Item = &'a TerrainChunk>,
    P: AsRef<Path>,
{
    render_surfaces(chunks).save(path)
}

fn render_mosaic<'a, I, F>(chunks: I, color: F) -> RgbImage
where
    I: IntoIterator<Item = &'a TerrainChunk>,
    F: Fn(&TerrainChunk, usize, usize) -> [u8; 3],
{
    let tiles: BTreeMap<TileCoord, &TerrainChunk> =
        chunks.into_iter().map(|chunk| (chunk.coord(), chunk)).collect();

    let Some(first) = tiles.values().next() else {
        return ImageBuffer::from_pixel(1, 1, Rgb(BACKGROUND));
    };

    let min_x = tiles.keys().map(|t| t.x).min().unwrap_or(0);
    let max_x = tiles.keys().map(|t| t.x).max().unwrap_or(0);
    let min_z = tiles.keys().map(|t| t.z).min().unwrap_or(0);
    let max_z = tiles.keys().map(|t| t.z).max().unwrap_or(0);

    let cells = first.resolution() - 1;
    let tiles_x = (max_x - min_x + 1) as usize;
    let tiles_z = (max_z - min_z + 1) as usize;
    let width = tiles_x * cells + 1;
    let height = tiles_z * cells + 1;

    let mut img: RgbImage = ImageBuffer::from_pixel(width as u32, height as u32, Rgb(BACKGROUND));

    for py in 0..height {
        let tz = (py / cells).min(tiles_z - 1);
        let row = py - tz * cells;
        for px in 0..width {
            let tx = (px / cells).min(tiles_x - 1);
            let col = px - tx * cells;

            let tile = TileCoord::new(min_x + tx as i32, min_z + tz as i32);
            if let Some(&chunk) = tiles.get(&tile) {
                img.put_pixel(px as u32, py as u32, Rgb(color(chunk, col, row)));
            }
        }
    }

    img
}

/// Color stops over the signed height ratio `h / max_height`: water blues
/// below zero, sand at zero, then grass, rock and snow up to the clamp.
const HEIGHT_STOPS: [(f32, [u8; 3]); 7] = [
    (-1.0, [24, 48, 112]),
    (-0.3, [64, 128, 200]),
    (0.0, [214, 200, 150]),
    (0.15, [96, 160, 72]),
    (0.5, [124, 110, 70]),
    (0.85, [150, 150, 150]),
    (1.0, [248, 248, 252]),
];

fn height_color(height: f32, max_height: f32) -> [u8; 3] {
    let s = (height / max_height).clamp(-1.0, 1.0);
    for pair in HEIGHT_STOPS.windows(2) {
        let ((lo, a), (hi, b)) = (pair[0], pair[1]);
        if s <= hi {
            let t = (s - lo) / (hi - lo);
            return [0, 1, 2].map(|i| (a[i] as f32 + (b[i] as f32 - a[i] as f32) * t).round() as u8);
        }
    }
    HEIGHT_STOPS[HEIGHT_STOPS.len() - 1].1
}
