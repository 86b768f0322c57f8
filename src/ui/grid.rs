//! Virtualized grid layout
//!
//! Computes column/row counts for the card grid and maps rows back to
//! slices of the entity list, so only visible rows need to be rendered.
//!
//! ```
//! use ygo_catalog::ui::grid::{CellSize, GridGeometry};
//!
//! let grid = GridGeometry::compute(400.0, 5, CellSize::default());
//! assert_eq!((grid.columns, grid.rows), (2, 3));
//! assert_eq!(grid.row_range(2), 4..5);
//! ```

use std::ops::Range;

/// Size of one grid cell in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSize {
    pub width: f32,
    pub height: f32,
}

impl CellSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

impl Default for CellSize {
    fn default() -> Self {
        // Card art ratio (59 x 86 mm) plus a caption line
        Self::new(180.0, 262.0)
    }
}

/// Derived grid geometry for one (viewport width, item count) pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridGeometry {
    pub viewport_width: f32,
    pub item_count: usize,
    /// Never zero
    pub columns: usize,
    pub rows: usize,
    pub row_height: f32,
}

impl GridGeometry {
    /// Compute geometry for `item_count` cells in a viewport `viewport_width` wide.
    ///
    /// Zero, negative or non-finite widths (and degenerate cells) still give
    /// one column, so the row count is always defined.
    pub fn compute(viewport_width: f32, item_count: usize, cell: CellSize) -> Self {
        let columns = if cell.width > 0.0 && viewport_width.is_finite() {
            let fit = (viewport_width / cell.width).floor();
            if fit >= 1.0 {
                // Saturating float -> int cast
                fit as usize
            } else {
                1
            }
        } else {
            1
        };

        Self {
            viewport_width,
            item_count,
            columns,
            rows: item_count.div_ceil(columns),
            row_height: cell.height.max(0.0),
        }
    }

    /// Item indices shown on `row`; empty past the last row
    pub fn row_range(&self, row: usize) -> Range<usize> {
        let start = row.saturating_mul(self.columns).min(self.item_count);
        let end = row
            .saturating_add(1)
            .saturating_mul(self.columns)
            .min(self.item_count);
        start..end
    }

    /// Row holding item `index`
    pub fn row_of(&self, index: usize) -> usize {
        index / self.columns
    }

    /// Full scrollable height of the grid
    pub fn total_height(&self) -> f32 {
        self.rows as f32 * self.row_height
    }

    /// Rows intersecting `[scroll_top, scroll_top + viewport_height)`,
    /// widened by `overscan` rows on each side and clamped to the grid.
    pub fn visible_rows(&self, scroll_top: f32, viewport_height: f32, overscan: usize) -> Range<usize> {
        if self.rows == 0 || self.row_height <= 0.0 {
            return 0..self.rows;
        }

        let top = if scroll_top.is_finite() { scroll_top.max(0.0) } else { 0.0 };
        let height = if viewport_height.is_finite() { viewport_height.max(0.0) } else { 0.0 };

        let first = ((top / self.row_height).floor() as usize).min(self.rows);
        let last = (((top + height) / self.row_height).ceil() as usize)
            .max(first + 1)
            .min(self.rows);

        first.saturating_sub(overscan)..last.saturating_add(overscan).min(self.rows)
    }
}

/// Geometry bound to the list it was computed from
///
/// Holding both together means a row can never be read with geometry that
/// belongs to a different list.
#[derive(Debug, Clone, Copy)]
pub struct GridLayout<'a, T> {
    geometry: GridGeometry,
    items: &'a [T],
}

impl<'a, T> GridLayout<'a, T> {
    pub fn new(items: &'a [T], viewport_width: f32, cell: CellSize) -> Self {
        Self {
            geometry: GridGeometry::compute(viewport_width, items.len(), cell),
            items,
        }
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn columns(&self) -> usize {
        self.geometry.columns
    }

    pub fn row_count(&self) -> usize {
        self.geometry.rows
    }

    /// Items shown on `row`
    pub fn row(&self, row: usize) -> &'a [T] {
        &self.items[self.geometry.row_range(row)]
    }

    /// Every row, top to bottom
    pub fn rows(&self) -> impl Iterator<Item = &'a [T]> + '_ {
        (0..self.geometry.rows).map(move |row| self.row(row))
    }

    /// Rows to render for a scroll position, with their row index
    pub fn window(
        &self,
        scroll_top: f32,
        viewport_height: f32,
        overscan: usize,
    ) -> impl Iterator<Item = (usize, &'a [T])> + '_ {
        self.geometry
            .visible_rows(scroll_top, viewport_height, overscan)
            .map(move |row| (row, self.row(row)))
    }
}

/// Viewport state of the grid widget
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridViewport {
    pub width: f32,
    pub height: f32,
    pub scroll_top: f32,
    pub cell: CellSize,
    pub overscan: usize,
}

impl GridViewport {
    pub fn new(width: f32, height: f32, cell: CellSize, overscan: usize) -> Self {
        Self {
            width,
            height,
            scroll_top: 0.0,
            cell,
            overscan,
        }
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    pub fn scroll_to(&mut self, scroll_top: f32) {
        self.scroll_top = scroll_top.max(0.0);
    }

    /// Fresh layout for the current list; recomputed on every call
    pub fn layout<'a, T>(&self, items: &'a [T]) -> GridLayout<'a, T> {
        GridLayout::new(items, self.width, self.cell)
    }

    /// Rows of `items` to render at the current scroll position
    pub fn visible<'a, T>(&self, items: &'a [T]) -> Vec<(usize, &'a [T])> {
        let layout = self.layout(items);
        let rows = layout
            .window(self.scroll_top, self.height, self.overscan)
            .collect();
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CELL: CellSize = CellSize {
        width: 100.0,
        height: 150.0,
    };

    #[test]
    fn test_columns_floor_the_width() {
        assert_eq!(GridGeometry::compute(350.0, 10, CELL).columns, 3);
        assert_eq!(GridGeometry::compute(400.0, 10, CELL).columns, 4);
        assert_eq!(GridGeometry::compute(99.9, 10, CELL).columns, 1);
    }

    #[test]
    fn test_degenerate_widths_give_one_column() {
        for width in [0.0, -250.0, f32::NAN, f32::NEG_INFINITY, f32::INFINITY] {
            let geometry = GridGeometry::compute(width, 5, CELL);
            assert_eq!(geometry.columns, 1, "width {width}");
            assert_eq!(geometry.rows, 5);
        }
        let zero_cell = CellSize::new(0.0, 10.0);
        assert_eq!(GridGeometry::compute(500.0, 3, zero_cell).columns, 1);
    }

    #[test]
    fn test_row_count_rounds_up() {
        assert_eq!(GridGeometry::compute(300.0, 0, CELL).rows, 0);
        assert_eq!(GridGeometry::compute(300.0, 1, CELL).rows, 1);
        assert_eq!(GridGeometry::compute(300.0, 3, CELL).rows, 1);
        assert_eq!(GridGeometry::compute(300.0, 4, CELL).rows, 2);
        assert_eq!(GridGeometry::compute(300.0, 7, CELL).rows, 3);
    }

    #[test]
    fn test_rows_cover_every_item_exactly_once() {
        let widths = [-10.0, 0.0, 50.0, 100.0, 250.0, 999.0, 10_000.0];
        for width in widths {
            for count in [0usize, 1, 2, 3, 7, 10, 64, 101] {
                let items: Vec<usize> = (0..count).collect();
                let layout = GridLayout::new(&items, width, CELL);
                assert!(layout.columns() >= 1);

                let flattened: Vec<usize> = layout.rows().flatten().copied().collect();
                assert_eq!(flattened, items, "width {width} count {count}");
            }
        }
    }

    #[test]
    fn test_row_slices() {
        let items = ["a", "b", "c", "d", "e"];
        let layout = GridLayout::new(&items, 200.0, CELL);
        assert_eq!(layout.row(0), &["a", "b"]);
        assert_eq!(layout.row(2), &["e"]);
        assert!(layout.row(3).is_empty());
        assert!(layout.row(usize::MAX).is_empty());
        assert_eq!(layout.geometry().row_of(4), 2);
    }

    #[test]
    fn test_visible_rows_window() {
        // 100 items, 4 columns, 25 rows of 150px
        let geometry = GridGeometry::compute(400.0, 100, CELL);
        assert_eq!(geometry.total_height(), 3750.0);

        assert_eq!(geometry.visible_rows(0.0, 450.0, 0), 0..3);
        assert_eq!(geometry.visible_rows(160.0, 300.0, 0), 1..4);
        assert_eq!(geometry.visible_rows(160.0, 300.0, 2), 0..6);
        assert_eq!(geometry.visible_rows(10_000.0, 300.0, 1), 24..25);
        assert_eq!(geometry.visible_rows(-50.0, 0.0, 0), 0..1);
    }

    #[test]
    fn test_visible_rows_of_empty_grid() {
        let geometry = GridGeometry::compute(400.0, 0, CELL);
        assert_eq!(geometry.visible_rows(0.0, 600.0, 3), 0..0);
    }

    #[test]
    fn test_viewport_recomputes_for_each_list() {
        let mut viewport = GridViewport::new(300.0, 150.0, CELL, 0);
        let long: Vec<u32> = (0..9).collect();
        let short: Vec<u32> = (0..2).collect();

        assert_eq!(viewport.layout(&long).row_count(), 3);
        assert_eq!(viewport.layout(&short).row_count(), 1);

        viewport.resize(100.0, 150.0);
        assert_eq!(viewport.layout(&short).row_count(), 2);

        viewport.scroll_to(150.0);
        let visible = viewport.visible(&long);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0], (1, &long[1..2]));
    }
}
