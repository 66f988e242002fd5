use thiserror::Error;

use crate::geom::{Area, Position};

const WALKABLE_CELL: char = '.';
const BLOCKED_CELL: char = '#';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalkDataError {
    #[error("walk grid must be at least 1x1, got {width}x{height}")]
    Empty { width: u32, height: u32 },
    #[error("cell count mismatch: expected {expected}, got {actual}")]
    CellCountMismatch { expected: usize, actual: usize },
    #[error("row {row} has width {actual}, expected {expected}")]
    RowWidthMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("invalid cell '{found}' at row {row}, column {column}; allowed: '.' walkable, '#' blocked")]
    InvalidCell {
        row: usize,
        column: usize,
        found: char,
    },
}

/// Grid origin convention:
/// - cell (0,0) is the map's min corner; bounds are `(0,0)..=(width-1,height-1)`.
/// - rows are stored bottom-up, row `y` covers cells `(0..width, y)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkData {
    width: u32,
    height: u32,
    walkable: Vec<bool>,
}

impl WalkData {
    pub fn new(width: u32, height: u32, walkable: Vec<bool>) -> Result<Self, WalkDataError> {
        if width == 0 || height == 0 {
            return Err(WalkDataError::Empty { width, height });
        }
        let expected = width as usize * height as usize;
        let actual = walkable.len();
        if expected != actual {
            return Err(WalkDataError::CellCountMismatch { expected, actual });
        }
        Ok(Self {
            width,
            height,
            walkable,
        })
    }

    /// Every cell walkable.
    pub fn open(width: u32, height: u32) -> Result<Self, WalkDataError> {
        Self::new(width, height, vec![true; width as usize * height as usize])
    }

    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self, WalkDataError> {
        let height = rows.len();
        let width = rows.first().map(|row| row.as_ref().chars().count()).unwrap_or(0);
        if width == 0 || height == 0 {
            return Err(WalkDataError::Empty {
                width: width as u32,
                height: height as u32,
            });
        }

        let mut walkable = Vec::with_capacity(width * height);
        for (row_index, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            let row_width = row.chars().count();
            if row_width != width {
                return Err(WalkDataError::RowWidthMismatch {
                    row: row_index,
                    expected: width,
                    actual: row_width,
                });
            }
            for (column, cell) in row.chars().enumerate() {
                match cell {
                    WALKABLE_CELL => walkable.push(true),
                    BLOCKED_CELL => walkable.push(false),
                    found => {
                        return Err(WalkDataError::InvalidCell {
                            row: row_index,
                            column,
                            found,
                        })
                    }
                }
            }
        }

        Self::new(width as u32, height as u32, walkable)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bounds(&self) -> Area {
        Area::new(0, 0, self.width as i32 - 1, self.height as i32 - 1)
    }

    pub fn index_of(&self, position: Position) -> Option<usize> {
        if position.x < 0 || position.y < 0 {
            return None;
        }
        let (x, y) = (position.x as u32, position.y as u32);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn is_cell_walkable(&self, position: Position) -> bool {
        self.index_of(position)
            .and_then(|index| self.walkable.get(index))
            .copied()
            .unwrap_or(false)
    }

    pub fn walkable_count(&self) -> usize {
        self.walkable.iter().filter(|cell| **cell).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_parse_into_cells() {
        let walk = WalkData::from_rows(&["..#", "#.."]).expect("walk");
        assert_eq!(walk.width(), 3);
        assert_eq!(walk.height(), 2);
        assert!(walk.is_cell_walkable(Position::new(0, 0)));
        assert!(!walk.is_cell_walkable(Position::new(2, 0)));
        assert!(!walk.is_cell_walkable(Position::new(0, 1)));
        assert_eq!(walk.walkable_count(), 4);
        assert_eq!(walk.bounds(), Area::new(0, 0, 2, 1));
    }

    #[test]
    fn out_of_bounds_is_not_walkable() {
        let walk = WalkData::open(4, 4).expect("walk");
        assert!(!walk.is_cell_walkable(Position::new(-1, 0)));
        assert!(!walk.is_cell_walkable(Position::new(4, 0)));
        assert!(walk.index_of(Position::new(3, 3)).is_some());
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = WalkData::from_rows(&["...", ".."]).expect_err("ragged");
        assert_eq!(
            err,
            WalkDataError::RowWidthMismatch {
                row: 1,
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn unknown_cell_is_rejected() {
        let err = WalkData::from_rows(&[".x."]).expect_err("cell");
        assert!(matches!(err, WalkDataError::InvalidCell { column: 1, .. }));
    }

    #[test]
    fn count_mismatch_is_rejected() {
        let err = WalkData::new(2, 2, vec![true; 3]).expect_err("count");
        assert_eq!(
            err,
            WalkDataError::CellCountMismatch {
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn empty_grid_is_rejected() {
        let rows: [&str; 0] = [];
        assert!(matches!(
            WalkData::from_rows(&rows),
            Err(WalkDataError::Empty { .. })
        ));
    }
}
