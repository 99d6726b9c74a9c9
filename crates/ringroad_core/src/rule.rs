//! The local update rule, a Rule-184-style traffic rule.
//!
//! A cell is a car slot; a car advances into the empty cell on its right.
//! Everything else in this crate exists to apply this function correctly and
//! consistently across partitions.

/// A single road cell: 0 = empty, 1 = occupied.
pub type Cell = u8;

pub const EMPTY: Cell = 0;
pub const OCCUPIED: Cell = 1;

/// Computes the next state of the center cell and whether a car moved out
/// of it this step.
///
/// The center becomes occupied when a car arrives from the left
/// (`left == 1 && center == 0`) or a car is blocked in place
/// (`center == 1 && right == 1`). A move is counted when the center holds a
/// car with an empty cell ahead (`center == 1 && right == 0`).
#[inline]
pub fn next_cell(left: Cell, center: Cell, right: Cell) -> (Cell, bool) {
    let next = if (left == OCCUPIED && center == EMPTY)
        || (center == OCCUPIED && right == OCCUPIED)
    {
        OCCUPIED
    } else {
        EMPTY
    };
    let moved = center == OCCUPIED && right == EMPTY;
    (next, moved)
}
