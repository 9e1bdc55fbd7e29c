//! Fixed-size color grid.

use serde::{Deserialize, Serialize};

use crate::error::GridError;

/// Side length of every shared grid.
pub const GRID_SIZE: usize = 50;

/// A hex-encoded color such as `#FF0000`.
///
/// Colors are opaque on the wire: two colors are equal only when their
/// strings are equal, so `#ff0000` and `#FF0000` are different values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(String);

impl Color {
    /// Wrap a color string without validation.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Parse a `#RRGGBB` color, as produced by the input layer.
    pub fn parse_hex(value: &str) -> Option<Self> {
        let digits = value.strip_prefix('#')?;
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self(value.to_string()))
    }

    /// The raw color string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode to RGB components, if the color is in `#RRGGBB` form.
    pub fn to_rgb(&self) -> Option<[u8; 3]> {
        let digits = self.0.strip_prefix('#')?;
        if digits.len() != 6 {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
        Some([channel(0)?, channel(2)?, channel(4)?])
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A square grid of optional colors.
///
/// Cells are stored row-major in a flat vector. The size is fixed at
/// construction; `replace` refuses grids of a different size. On the wire a
/// grid is an array of rows, each an array of `string | null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "Vec<Vec<Option<Color>>>",
    into = "Vec<Vec<Option<Color>>>"
)]
pub struct Grid {
    size: usize,
    cells: Vec<Option<Color>>,
}

impl Default for Grid {
    fn default() -> Self {
        Self::new(GRID_SIZE)
    }
}

impl Grid {
    /// Create a `size` x `size` grid with every cell empty.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![None; size * size],
        }
    }

    /// Side length of the grid.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Flat index of a cell, if it lies inside the grid.
    pub fn index(&self, row: usize, col: usize) -> Option<usize> {
        (row < self.size && col < self.size).then(|| row * self.size + col)
    }

    fn checked_index(&self, row: usize, col: usize) -> Result<usize, GridError> {
        self.index(row, col).ok_or(GridError::OutOfBounds {
            row,
            col,
            size: self.size,
        })
    }

    /// Read a cell.
    pub fn get(&self, row: usize, col: usize) -> Result<Option<&Color>, GridError> {
        let idx = self.checked_index(row, col)?;
        Ok(self.cells[idx].as_ref())
    }

    /// Overwrite a single cell.
    pub fn set_cell(&mut self, row: usize, col: usize, color: Option<Color>) -> Result<(), GridError> {
        let idx = self.checked_index(row, col)?;
        self.cells[idx] = color;
        Ok(())
    }

    /// Replace the whole grid with `other`, which must have the same size.
    pub fn replace(&mut self, other: Grid) -> Result<(), GridError> {
        if other.size != self.size {
            return Err(GridError::DimensionMismatch {
                expected: self.size,
                actual: other.size,
            });
        }
        self.cells = other.cells;
        Ok(())
    }

    /// Reset every cell to empty.
    pub fn clear(&mut self) {
        self.cells.fill(None);
    }

    /// Whether every cell is empty.
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Option::is_none)
    }

    /// Number of cells holding exactly `color`.
    pub fn count(&self, color: Option<&Color>) -> usize {
        self.cells.iter().filter(|c| c.as_ref() == color).count()
    }

    /// Cells in flat row-major order.
    pub(crate) fn cells_mut(&mut self) -> &mut [Option<Color>] {
        &mut self.cells
    }

    /// Iterate over rows.
    pub fn rows(&self) -> impl Iterator<Item = &[Option<Color>]> {
        self.cells.chunks(self.size.max(1))
    }
}

impl TryFrom<Vec<Vec<Option<Color>>>> for Grid {
    type Error = GridError;

    fn try_from(rows: Vec<Vec<Option<Color>>>) -> Result<Self, Self::Error> {
        let size = rows.len();
        let mut cells = Vec::with_capacity(size * size);
        for row in rows {
            if row.len() != size {
                return Err(GridError::DimensionMismatch {
                    expected: size,
                    actual: row.len(),
                });
            }
            cells.extend(row);
        }
        Ok(Self { size, cells })
    }
}

impl From<Grid> for Vec<Vec<Option<Color>>> {
    fn from(grid: Grid) -> Self {
        if grid.size == 0 {
            return Vec::new();
        }
        grid.cells.chunks(grid.size).map(<[_]>::to_vec).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red() -> Color {
        Color::new("#FF0000")
    }

    #[test]
    fn test_new_grid_is_empty() {
        let grid = Grid::default();
        assert_eq!(grid.size(), GRID_SIZE);
        assert!(grid.is_empty());
        assert_eq!(grid.count(None), GRID_SIZE * GRID_SIZE);
    }

    #[test]
    fn test_set_then_get() {
        let mut grid = Grid::default();
        for (row, col) in [(0, 0), (0, 49), (49, 0), (49, 49), (17, 33)] {
            grid.set_cell(row, col, Some(red())).unwrap();
            assert_eq!(grid.get(row, col).unwrap(), Some(&red()));
        }
        assert_eq!(grid.count(Some(&red())), 5);

        grid.set_cell(0, 0, None).unwrap();
        assert_eq!(grid.get(0, 0).unwrap(), None);
    }

    #[test]
    fn test_out_of_bounds() {
        let mut grid = Grid::default();
        assert_eq!(
            grid.set_cell(50, 0, Some(red())),
            Err(GridError::OutOfBounds { row: 50, col: 0, size: 50 })
        );
        assert!(grid.set_cell(0, 50, Some(red())).is_err());
        assert!(grid.get(usize::MAX, 3).is_err());
        assert!(grid.is_empty());
    }

    #[test]
    fn test_replace_checks_size() {
        let mut grid = Grid::default();
        let err = grid.replace(Grid::new(10)).unwrap_err();
        assert_eq!(err, GridError::DimensionMismatch { expected: 50, actual: 10 });

        let mut other = Grid::default();
        other.set_cell(3, 4, Some(red())).unwrap();
        grid.replace(other.clone()).unwrap();
        assert_eq!(grid, other);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut grid = Grid::default();
        let snapshot = grid.clone();
        grid.set_cell(1, 1, Some(red())).unwrap();
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut grid = Grid::default();
        grid.set_cell(10, 10, Some(red())).unwrap();
        grid.clear();
        assert!(grid.is_empty());
    }

    #[test]
    fn test_wire_format() {
        let mut grid = Grid::new(2);
        grid.set_cell(0, 1, Some(red())).unwrap();
        let json = serde_json::to_string(&grid).unwrap();
        assert_eq!(json, r##"[[null,"#FF0000"],[null,null]]"##);

        let back: Grid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, grid);
    }

    #[test]
    fn test_non_square_rejected() {
        let result = serde_json::from_str::<Grid>(r#"[[null,null],[null]]"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_color_parse_hex() {
        assert_eq!(Color::parse_hex("#00ff7F"), Some(Color::new("#00ff7F")));
        assert!(Color::parse_hex("00FF7F").is_none());
        assert!(Color::parse_hex("#00FF7").is_none());
        assert!(Color::parse_hex("#GGGGGG").is_none());
        assert_eq!(Color::new("#102030").to_rgb(), Some([0x10, 0x20, 0x30]));
        assert_eq!(Color::new("red").to_rgb(), None);
    }
}
