//! Flood fill over a grid.

use crate::error::GridError;
use crate::grid::{Color, Grid};

/// Result of a flood fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillOutcome {
    /// The seed already had the requested color; nothing changed.
    Unchanged,
    /// The region was recolored; holds the number of cells touched.
    Filled(usize),
}

impl FillOutcome {
    pub fn changed(self) -> bool {
        matches!(self, FillOutcome::Filled(_))
    }
}

/// Recolor the 4-connected region of like-colored cells containing the seed.
///
/// The target color is captured once before any cell is touched, so cells
/// that were already recolored never match again. Membership is decided
/// against that captured color, not against the live grid.
pub fn flood_fill(
    grid: &mut Grid,
    row: usize,
    col: usize,
    new_color: Option<Color>,
) -> Result<FillOutcome, GridError> {
    let target = grid.get(row, col)?.cloned();
    if target == new_color {
        return Ok(FillOutcome::Unchanged);
    }

    let size = grid.size();
    let mut visited = vec![false; size * size];
    let mut stack = vec![(row, col)];
    let mut filled = 0;
    let cells = grid.cells_mut();

    while let Some((r, c)) = stack.pop() {
        let idx = r * size + c;
        if visited[idx] || cells[idx] != target {
            continue;
        }
        visited[idx] = true;
        cells[idx] = new_color.clone();
        filled += 1;

        if r + 1 < size {
            stack.push((r + 1, c));
        }
        if r > 0 {
            stack.push((r - 1, c));
        }
        if c + 1 < size {
            stack.push((r, c + 1));
        }
        if c > 0 {
            stack.push((r, c - 1));
        }
    }

    Ok(FillOutcome::Filled(filled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GRID_SIZE;

    fn color(hex: &str) -> Option<Color> {
        Some(Color::new(hex))
    }

    #[test]
    fn test_fill_whole_grid() {
        let mut grid = Grid::default();
        flood_fill(&mut grid, 0, 0, color("#FFFFFF")).unwrap();

        let outcome = flood_fill(&mut grid, 25, 25, color("#000000")).unwrap();
        assert_eq!(outcome, FillOutcome::Filled(GRID_SIZE * GRID_SIZE));
        assert_eq!(grid.count(color("#000000").as_ref()), 2500);
    }

    #[test]
    fn test_same_color_is_noop() {
        let mut grid = Grid::default();
        grid.set_cell(5, 5, color("#00FF00")).unwrap();
        let before = grid.clone();

        assert_eq!(
            flood_fill(&mut grid, 5, 5, color("#00FF00")).unwrap(),
            FillOutcome::Unchanged
        );
        assert_eq!(flood_fill(&mut grid, 0, 0, None).unwrap(), FillOutcome::Unchanged);
        assert_eq!(grid, before);
    }

    #[test]
    fn test_fill_stops_at_boundary() {
        // A closed 3x3 ring of blue with an empty center and an empty outside.
        let mut grid = Grid::new(5);
        for i in 1..4 {
            grid.set_cell(1, i, color("#0000FF")).unwrap();
            grid.set_cell(3, i, color("#0000FF")).unwrap();
            grid.set_cell(i, 1, color("#0000FF")).unwrap();
            grid.set_cell(i, 3, color("#0000FF")).unwrap();
        }

        let outcome = flood_fill(&mut grid, 2, 2, color("#FF0000")).unwrap();
        assert_eq!(outcome, FillOutcome::Filled(1));
        assert_eq!(grid.get(2, 2).unwrap(), color("#FF0000").as_ref());
        assert_eq!(grid.get(0, 0).unwrap(), None);
        assert_eq!(grid.count(color("#0000FF").as_ref()), 8);
    }

    #[test]
    fn test_disjoint_regions_untouched() {
        // Two red blocks separated by a blue column.
        let mut grid = Grid::new(5);
        for r in 0..5 {
            grid.set_cell(r, 0, color("#FF0000")).unwrap();
            grid.set_cell(r, 1, color("#FF0000")).unwrap();
            grid.set_cell(r, 2, color("#0000FF")).unwrap();
            grid.set_cell(r, 3, color("#FF0000")).unwrap();
            grid.set_cell(r, 4, color("#FF0000")).unwrap();
        }

        let outcome = flood_fill(&mut grid, 0, 0, color("#00FF00")).unwrap();
        assert_eq!(outcome, FillOutcome::Filled(10));
        for r in 0..5 {
            assert_eq!(grid.get(r, 1).unwrap(), color("#00FF00").as_ref());
            assert_eq!(grid.get(r, 3).unwrap(), color("#FF0000").as_ref());
            assert_eq!(grid.get(r, 4).unwrap(), color("#FF0000").as_ref());
        }
    }

    #[test]
    fn test_diagonal_not_connected() {
        let mut grid = Grid::new(3);
        grid.set_cell(0, 0, color("#111111")).unwrap();
        grid.set_cell(1, 1, color("#111111")).unwrap();

        let outcome = flood_fill(&mut grid, 0, 0, color("#222222")).unwrap();
        assert_eq!(outcome, FillOutcome::Filled(1));
        assert_eq!(grid.get(1, 1).unwrap(), color("#111111").as_ref());
    }

    #[test]
    fn test_erase_region() {
        let mut grid = Grid::new(4);
        flood_fill(&mut grid, 0, 0, color("#ABCDEF")).unwrap();
        let outcome = flood_fill(&mut grid, 3, 3, None).unwrap();
        assert_eq!(outcome, FillOutcome::Filled(16));
        assert!(grid.is_empty());
    }

    #[test]
    fn test_seed_out_of_bounds() {
        let mut grid = Grid::default();
        assert!(flood_fill(&mut grid, 50, 0, color("#000000")).is_err());
        assert!(grid.is_empty());
    }
}
