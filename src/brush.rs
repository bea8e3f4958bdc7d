//! Brush parameters and results shared by chunks and the terrain manager.
//!
//! Brushes are radius-bounded: only the grid cells inside the bounding box of
//! the brush circle are visited, so the cost of a dab is O(radius²) in grid units.

use crate::border::EdgeDirection;
use crate::surface::SurfaceType;

/// Slopes below this percentage are treated as flat and skipped.
pub const MIN_SLOPE_PERCENT: f32 = 0.0001;

/// Height changes smaller than this are not counted as edits.
pub const CHANGE_EPSILON: f32 = 1e-6;

// =============================================================================
// BRUSH OPTIONS
// =============================================================================

/// Height brush operation
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum BrushMode {
    /// Add `strength * influence`, capped at the max height
    #[default]
    Raise,
    /// Subtract `strength * influence`, floored at minus the max height
    Lower,
    /// Blend toward the 3×3 neighborhood mean by `0.5 * influence`
    Smooth,
    /// Blend toward a fixed height by `strength * influence` (strength clamped to 0-1)
    Flatten { target: f32 },
}

/// Raise/lower/smooth/flatten brush settings
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BrushOptions {
    pub mode: BrushMode,
    /// Brush radius in world units
    pub radius: f32,
    /// Height change at the brush center per application
    pub strength: f32,
}

impl BrushOptions {
    pub fn new(mode: BrushMode, radius: f32, strength: f32) -> Self {
        Self { mode, radius, strength }
    }

    pub fn raise(radius: f32, strength: f32) -> Self {
        Self::new(BrushMode::Raise, radius, strength)
    }

    pub fn lower(radius: f32, strength: f32) -> Self {
        Self::new(BrushMode::Lower, radius, strength)
    }

    pub fn smooth(radius: f32) -> Self {
        Self::new(BrushMode::Smooth, radius, 1.0)
    }

    pub fn flatten(target: f32, radius: f32, strength: f32) -> Self {
        Self::new(BrushMode::Flatten { target }, radius, strength)
    }

    /// Whether the brush can change anything at all.
    pub fn is_active(&self) -> bool {
        self.radius.is_finite() && self.radius > 0.0 && self.strength.is_finite()
    }
}

/// Surface paint brush settings
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceBrushOptions {
    pub surface: SurfaceType,
    /// Brush radius in world units
    pub radius: f32,
    /// Blend weight at the brush center (0-1)
    pub strength: f32,
}

impl SurfaceBrushOptions {
    pub fn new(surface: SurfaceType, radius: f32, strength: f32) -> Self {
        Self { surface, radius, strength }
    }

    pub fn is_active(&self) -> bool {
        self.radius.is_finite() && self.radius > 0.0 && self.strength.is_finite()
    }
}

/// Linear falloff: 1 at the center, 0 at the rim and beyond.
#[inline]
pub fn falloff(distance: f32, radius: f32) -> f32 {
    (1.0 - distance / radius).max(0.0)
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

// =============================================================================
// SLOPE BANDS
// =============================================================================

/// A straight graded ramp stamped into the terrain under a road or track segment.
///
/// Vertices inside the `[-half_length, half_length] × [-half_width, half_width]`
/// rectangle are pulled toward `base_height + delta_height * t`, where `t` runs
/// from 0 at the back of the band to 1 at its front.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlopeBand {
    /// World-space (x, z) center of the band
    pub center: (f32, f32),
    /// Axis of the ramp in the x/z plane
    pub direction: (f32, f32),
    /// Lateral axis in the x/z plane
    pub right: (f32, f32),
    pub half_length: f32,
    pub half_width: f32,
    /// Height at the back end of the band
    pub base_height: f32,
    /// Height gained from back to front
    pub delta_height: f32,
}

impl SlopeBand {
    /// Copy with unit axes, or None when the band cannot affect anything.
    pub fn normalized(&self) -> Option<Self> {
        let finite = [
            self.center.0, self.center.1,
            self.half_length, self.half_width,
            self.base_height, self.delta_height,
        ]
        .iter()
        .all(|v| v.is_finite());

        if !finite || self.half_length <= 0.0 || self.half_width <= 0.0 {
            return None;
        }

        Some(Self {
            direction: normalize(self.direction)?,
            right: normalize(self.right)?,
            ..*self
        })
    }

    /// Radius of the circle enclosing the band rectangle.
    pub fn bounding_radius(&self) -> f32 {
        (self.half_length * self.half_length + self.half_width * self.half_width).sqrt()
    }

    /// Whether the band rectangle overlaps an axis-aligned square. Separating
    /// axis test over the world axes and the band axes; touching counts.
    pub fn overlaps_square(&self, center: (f32, f32), half: f32) -> bool {
        let (dx, dz) = (center.0 - self.center.0, center.1 - self.center.1);
        let (d, r) = (self.direction, self.right);

        let band_x = self.half_length * d.0.abs() + self.half_width * r.0.abs();
        let band_z = self.half_length * d.1.abs() + self.half_width * r.1.abs();
        if dx.abs() > half + band_x || dz.abs() > half + band_z {
            return false;
        }

        let along = dx * d.0 + dz * d.1;
        let lateral = dx * r.0 + dz * r.1;
        let square_along = half * (d.0.abs() + d.1.abs());
        let square_lateral = half * (r.0.abs() + r.1.abs());
        along.abs() <= self.half_length + square_along
            && lateral.abs() <= self.half_width + square_lateral
    }
}

/// Track segment request in world terms, turned into a [`SlopeBand`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackSlope {
    /// World-space (x, z) center of the segment
    pub center: (f32, f32),
    pub length: f32,
    pub width: f32,
    /// Yaw in radians, used when no direction vector is given
    pub rotation: f32,
    /// Grade in percent (rise over run × 100)
    pub slope_percent: f32,
    /// Height at the back end of the segment
    pub base_height: f32,
    /// Explicit segment direction in the x/z plane
    pub direction: Option<(f32, f32)>,
}

impl TrackSlope {
    /// Copy with length and width limited to the given maxima.
    pub fn clamped(&self, max_length: f32, max_width: f32) -> Self {
        Self {
            length: self.length.min(max_length),
            width: self.width.min(max_width),
            ..*self
        }
    }

    /// Band for this segment, or None when the request is a no-op.
    ///
    /// The direction comes from the explicit vector when it is non-zero, else from
    /// `(cos rotation, sin rotation)`. The lateral axis is the direction turned a
    /// quarter turn.
    pub fn band(&self) -> Option<SlopeBand> {
        if !(self.slope_percent.abs() >= MIN_SLOPE_PERCENT) {
            return None;
        }
        if !(self.length > 0.0) || !(self.width > 0.0) {
            return None;
        }

        let direction = self
            .direction
            .and_then(normalize)
            .or_else(|| normalize((self.rotation.cos(), self.rotation.sin())))?;
        let right = (-direction.1, direction.0);

        SlopeBand {
            center: self.center,
            direction,
            right,
            half_length: self.length * 0.5,
            half_width: self.width * 0.5,
            base_height: self.base_height,
            delta_height: self.slope_percent / 100.0 * self.length,
        }
        .normalized()
    }
}

fn normalize(v: (f32, f32)) -> Option<(f32, f32)> {
    let len = (v.0 * v.0 + v.1 * v.1).sqrt();
    if !len.is_finite() || len < 1e-9 {
        return None;
    }
    Some((v.0 / len, v.1 / len))
}

// =============================================================================
// RESULTS
// =============================================================================

/// Inclusive range of grid indices visited or modified by an edit
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridBounds {
    pub min_col: usize,
    pub max_col: usize,
    pub min_row: usize,
    pub max_row: usize,
}

impl GridBounds {
    pub fn cell(col: usize, row: usize) -> Self {
        Self { min_col: col, max_col: col, min_row: row, max_row: row }
    }

    /// Grow to include a cell.
    pub fn include(&mut self, col: usize, row: usize) {
        self.min_col = self.min_col.min(col);
        self.max_col = self.max_col.max(col);
        self.min_row = self.min_row.min(row);
        self.max_row = self.max_row.max(row);
    }

    /// Edges of a `resolution`-sized grid reached by these bounds.
    pub fn touched_edges(&self, resolution: usize) -> TouchedEdges {
        let last = resolution - 1;
        TouchedEdges {
            left: self.min_col == 0,
            right: self.max_col >= last,
            top: self.min_row == 0,
            bottom: self.max_row >= last,
        }
    }
}

/// Which chunk edges an edit reached
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TouchedEdges {
    /// Column 0 (west)
    pub left: bool,
    /// Last column (east)
    pub right: bool,
    /// Row 0 (north)
    pub top: bool,
    /// Last row (south)
    pub bottom: bool,
}

impl TouchedEdges {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn any(&self) -> bool {
        self.left || self.right || self.top || self.bottom
    }

    pub fn touches(&self, direction: EdgeDirection) -> bool {
        match direction {
            EdgeDirection::West => self.left,
            EdgeDirection::East => self.right,
            EdgeDirection::North => self.top,
            EdgeDirection::South => self.bottom,
        }
    }
}

/// Result of a chunk-local edit
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BrushOutcome {
    /// Whether any sample actually changed
    pub changed: bool,
    /// Edges reached by the edit's bounding box
    pub touched: TouchedEdges,
    /// Grid bounds visited (brushes) or modified (slope bands)
    pub bounds: Option<GridBounds>,
}

impl BrushOutcome {
    pub fn unchanged() -> Self {
        Self::default()
    }
}
