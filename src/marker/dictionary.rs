//! Original ArUco codebook
//!
//! Each of the five data rows holds one of four 5-bit words. The word index
//! carries two bits of the id, most significant row first, so ids run from
//! 0 to 1023. A `true` cell is white.

use super::MarkerId;

/// Data cells per side
pub const DATA_CELLS: usize = 5;

/// Cells per side including the black border
pub const MARKER_CELLS: usize = DATA_CELLS + 2;

/// Largest encodable id
pub const MAX_ID: MarkerId = 1023;

const WORDS: [u8; 4] = [0b10000, 0b10111, 0b01001, 0b01110];

/// A data grid, `grid[row][col]`
pub type BitGrid = [[bool; DATA_CELLS]; DATA_CELLS];

/// Build the data grid for `id`, `None` if out of range
pub fn encode(id: MarkerId) -> Option<BitGrid> {
    if id > MAX_ID {
        return None;
    }

    let mut grid = [[false; DATA_CELLS]; DATA_CELLS];
    for (row, cells) in grid.iter_mut().enumerate() {
        let word = WORDS[((id >> (2 * (DATA_CELLS - 1 - row))) & 0b11) as usize];
        for (col, cell) in cells.iter_mut().enumerate() {
            *cell = (word >> (DATA_CELLS - 1 - col)) & 1 == 1;
        }
    }
    Some(grid)
}

/// Decode a data grid seen in any orientation.
///
/// Returns the id and the number of clockwise quarter turns that bring the
/// observed grid upright.
pub fn decode(observed: &BitGrid) -> Option<(MarkerId, usize)> {
    let mut grid = *observed;
    for turns in 0..4 {
        if let Some(id) = decode_upright(&grid) {
            return Some((id, turns));
        }
        grid = rotate_cw(&grid);
    }
    None
}

fn decode_upright(grid: &BitGrid) -> Option<MarkerId> {
    let mut id: MarkerId = 0;
    for cells in grid {
        let word = cells
            .iter()
            .fold(0u8, |acc, &bit| (acc << 1) | bit as u8);
        let index = WORDS.iter().position(|&w| w == word)?;
        id = (id << 2) | index as MarkerId;
    }
    Some(id)
}

/// Rotate a grid a quarter turn clockwise
pub fn rotate_cw(grid: &BitGrid) -> BitGrid {
    let mut out = [[false; DATA_CELLS]; DATA_CELLS];
    for (row, cells) in out.iter_mut().enumerate() {
        for (col, cell) in cells.iter_mut().enumerate() {
            *cell = grid[DATA_CELLS - 1 - col][row];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_id_zero() {
        let grid = encode(0).unwrap();
        for row in grid {
            assert_eq!(row, [true, false, false, false, false]);
        }
    }

    #[test]
    fn test_out_of_range() {
        assert!(encode(MAX_ID).is_some());
        assert!(encode(MAX_ID + 1).is_none());
    }

    #[test]
    fn test_decode_upright() {
        for id in [0, 1, 2, 3, 77, 512, 1023] {
            let grid = encode(id).unwrap();
            assert_eq!(decode(&grid), Some((id, 0)));
        }
    }

    #[test]
    fn test_decode_rotated_id_zero() {
        // Turning the observed grid three more quarter turns restores it
        let upright = encode(0).unwrap();
        let observed = rotate_cw(&upright);
        assert_eq!(decode(&observed), Some((0, 3)));
    }

    #[test]
    fn test_rotation_cycle() {
        let grid = encode(345).unwrap();
        let back = rotate_cw(&rotate_cw(&rotate_cw(&rotate_cw(&grid))));
        assert_eq!(grid, back);
    }

    #[test]
    fn test_invalid_grid() {
        let grid = [[true; DATA_CELLS]; DATA_CELLS];
        assert_eq!(decode(&grid), None);
    }
}
