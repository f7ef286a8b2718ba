/// Grid layout model
///
/// Fixed 3-column grid with room for `MAX_PHOTOS` cells. Everything here is
/// pure index/coordinate math so it can be called from the UI thread while
/// a drag is in progress.

use cgmath::Vector2;

use crate::geometry::CellSize;

/// Number of slots in the grid
pub const MAX_PHOTOS: usize = 9;

/// Number of columns
pub const COLUMNS: usize = 3;

/// Default space between cells in logical pixels
pub const GAP: f32 = 8.0;

/// Horizontal padding around the grid on each side
pub const EDGE_PADDING: f32 = 8.0;

/// Cells are portrait, 1.4x taller than wide
pub const CELL_ASPECT: f32 = 1.4;

/// Row and column of a linear index
pub fn row_col(index: usize) -> (usize, usize) {
    (index / COLUMNS, index % COLUMNS)
}

/// Linear index of a row and column
pub fn index_of(row: usize, col: usize) -> usize {
    row * COLUMNS + col
}

/// Cell geometry of the grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    pub cell: CellSize,
    pub gap: f32,
}

impl GridLayout {
    pub fn new(cell: CellSize, gap: f32) -> Self {
        Self { cell, gap }
    }

    /// Size cells so three columns and two gaps fill `surface_width`
    pub fn for_surface_width(surface_width: f32, gap: f32) -> Self {
        let width = ((surface_width - EDGE_PADDING * 2.0 - gap * 2.0) / COLUMNS as f32).max(1.0);
        Self::new(CellSize::new(width, width * CELL_ASPECT), gap)
    }

    /// Distance between the origins of two neighbouring cells
    pub fn pitch(&self) -> Vector2<f32> {
        Vector2::new(self.cell.width + self.gap, self.cell.height + self.gap)
    }

    /// Top-left corner of a cell, relative to the grid origin
    pub fn cell_origin(&self, index: usize) -> Vector2<f32> {
        let (row, col) = row_col(index);
        let pitch = self.pitch();
        Vector2::new(col as f32 * pitch.x, row as f32 * pitch.y)
    }

    /// Total size of the grid including inner gaps
    pub fn grid_size(&self) -> Vector2<f32> {
        let rows = MAX_PHOTOS.div_ceil(COLUMNS);
        Vector2::new(
            COLUMNS as f32 * self.cell.width + (COLUMNS - 1) as f32 * self.gap,
            rows as f32 * self.cell.height + (rows - 1) as f32 * self.gap,
        )
    }

    /// Cell under a point relative to the grid origin; gaps hit nothing
    pub fn index_at(&self, point: Vector2<f32>) -> Option<usize> {
        if point.x < 0.0 || point.y < 0.0 {
            return None;
        }
        let pitch = self.pitch();
        let col = (point.x / pitch.x).floor() as usize;
        let row = (point.y / pitch.y).floor() as usize;
        if col >= COLUMNS || index_of(row, col) >= MAX_PHOTOS {
            return None;
        }

        let inside_x = point.x - col as f32 * pitch.x <= self.cell.width;
        let inside_y = point.y - row as f32 * pitch.y <= self.cell.height;
        (inside_x && inside_y).then(|| index_of(row, col))
    }

    /// Resolve where a drag released at `displacement` from its start lands
    ///
    /// Rounds the displacement to the nearest whole cell on each axis. Returns
    /// `None` for a target outside the grid or equal to `source`.
    pub fn drop_target(&self, source: usize, displacement: Vector2<f32>) -> Option<usize> {
        let pitch = self.pitch();
        let col_delta = (displacement.x / pitch.x).round() as i64;
        let row_delta = (displacement.y / pitch.y).round() as i64;

        let target = source as i64 + col_delta + row_delta * COLUMNS as i64;
        if target < 0 || target >= MAX_PHOTOS as i64 || target == source as i64 {
            return None;
        }
        Some(target as usize)
    }
}

impl Default for GridLayout {
    fn default() -> Self {
        // Typical phone-width surface
        Self::for_surface_width(390.0, GAP)
    }
}
