//! Square sample grid backing the height and surface layers of a chunk.

/// A square grid of samples stored row-major (row = z axis, column = x axis).
///
/// The order matches the vertex order of the chunk mesh, so the raw slice can be
/// handed to the renderer as-is. Reads never wrap: coordinates outside the grid
/// are clamped to the border.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid<T> {
    pub size: usize,
    data: Vec<T>,
}

impl<T: Clone> Grid<T> {
    pub fn new_with(size: usize, value: T) -> Self {
        Self {
            size,
            data: vec![value; size * size],
        }
    }

    /// Wrap an existing row-major buffer. Returns None when the length is not `size²`.
    pub fn from_vec(size: usize, data: Vec<T>) -> Option<Self> {
        if data.len() != size * size {
            return None;
        }
        Some(Self { size, data })
    }

    fn index(&self, col: usize, row: usize) -> usize {
        row * self.size + col
    }

    pub fn get(&self, col: usize, row: usize) -> &T {
        &self.data[self.index(col, row)]
    }

    pub fn set(&mut self, col: usize, row: usize, value: T) {
        let idx = self.index(col, row);
        self.data[idx] = value;
    }

    /// Fill the entire grid with a value.
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Copy of one row (constant z), ordered by column.
    pub fn row(&self, row: usize) -> Vec<T> {
        let start = self.index(0, row);
        self.data[start..start + self.size].to_vec()
    }

    /// Copy of one column (constant x), ordered by row.
    pub fn column(&self, col: usize) -> Vec<T> {
        (0..self.size).map(|row| self.get(col, row).clone()).collect()
    }

    /// In-bounds cells of the 3×3 block centered on (col, row), the center included.
    pub fn block_3x3(&self, col: usize, row: usize) -> Vec<(usize, usize)> {
        let mut result = Vec::with_capacity(9);
        let last = self.size as i32 - 1;

        for dr in -1i32..=1 {
            for dc in -1i32..=1 {
                let c = col as i32 + dc;
                let r = row as i32 + dr;
                if c >= 0 && c <= last && r >= 0 && r <= last {
                    result.push((c as usize, r as usize));
                }
            }
        }

        result
    }

    /// Iterate over all cells with their coordinates.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &T)> {
        let size = self.size;
        self.data.iter().enumerate().map(move |(idx, val)| {
            let col = idx % size;
            let row = idx / size;
            (col, row, val)
        })
    }
}

impl Grid<f32> {
    /// Sample using bilinear interpolation at fractional grid coordinates.
    ///
    /// Coordinates are clamped to `[0, size - 1]`; the weights are the fractional
    /// parts, so an exact vertex returns its stored value.
    pub fn sample_bilinear(&self, x: f32, y: f32) -> f32 {
        let last = (self.size - 1) as f32;
        let x = x.clamp(0.0, last);
        let y = y.clamp(0.0, last);

        let x0 = x.floor() as usize;
        let y0 = y.floor() as usize;
        let x1 = (x0 + 1).min(self.size - 1);
        let y1 = (y0 + 1).min(self.size - 1);

        let fx = x - x0 as f32;
        let fy = y - y0 as f32;

        let v00 = *self.get(x0, y0);
        let v10 = *self.get(x1, y0);
        let v01 = *self.get(x0, y1);
        let v11 = *self.get(x1, y1);

        let v0 = v00 * (1.0 - fx) + v10 * fx;
        let v1 = v01 * (1.0 - fx) + v11 * fx;
        v0 * (1.0 - fy) + v1 * fy
    }

    /// Mean of the in-bounds 3×3 neighborhood around a cell (center included).
    pub fn average_3x3(&self, col: usize, row: usize) -> f32 {
        let cells = self.block_3x3(col, row);
        let sum: f32 = cells.iter().map(|&(c, r)| *self.get(c, r)).sum();
        sum / cells.len() as f32
    }

    /// Lowest and highest sample.
    pub fn min_max(&self) -> (f32, f32) {
        let mut min_h = f32::MAX;
        let mut max_h = f32::MIN;
        for &h in &self.data {
            if h < min_h { min_h = h; }
            if h > max_h { max_h = h; }
        }
        (min_h, max_h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(size: usize) -> Grid<f32> {
        let data = (0..size * size).map(|i| i as f32).collect();
        Grid::from_vec(size, data).unwrap()
    }

    #[test]
    fn test_from_vec_rejects_wrong_length() {
        assert!(Grid::from_vec(3, vec![0.0f32; 8]).is_none());
        assert!(Grid::from_vec(3, vec![0.0f32; 9]).is_some());
    }

    #[test]
    fn test_row_major_layout() {
        let grid = ramp(4);
        assert_eq!(*grid.get(1, 0), 1.0);
        assert_eq!(*grid.get(0, 1), 4.0);
        assert_eq!(grid.row(2), vec![8.0, 9.0, 10.0, 11.0]);
        assert_eq!(grid.column(3), vec![3.0, 7.0, 11.0, 15.0]);
    }

    #[test]
    fn test_bilinear_exact_vertex() {
        let grid = ramp(5);
        for (col, row, &value) in grid.iter() {
            assert_eq!(grid.sample_bilinear(col as f32, row as f32), value);
        }
    }

    #[test]
    fn test_bilinear_midpoint_is_mean() {
        let mut grid = Grid::new_with(2, 0.0f32);
        grid.set(0, 0, 1.0);
        grid.set(1, 0, 3.0);
        grid.set(0, 1, 5.0);
        grid.set(1, 1, 11.0);
        assert!((grid.sample_bilinear(0.5, 0.5) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_bilinear_clamps_outside() {
        let grid = ramp(3);
        assert_eq!(grid.sample_bilinear(-4.0, -1.0), *grid.get(0, 0));
        assert_eq!(grid.sample_bilinear(10.0, 10.0), *grid.get(2, 2));
    }

    #[test]
    fn test_block_3x3_at_corner_and_center() {
        let grid = ramp(4);
        assert_eq!(grid.block_3x3(0, 0).len(), 4);
        assert_eq!(grid.block_3x3(3, 1).len(), 6);
        assert_eq!(grid.block_3x3(1, 1).len(), 9);
        // Corner block of a ramp: cells 0, 1, 4, 5
        assert!((grid.average_3x3(0, 0) - 2.5).abs() < 1e-6);
    }
}
