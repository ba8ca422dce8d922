//! Winning patterns on the 3x3 grid.
//!
//! Four overlapping 2x2 squares pay 1x the symbol multiplier, the full grid
//! pays 5x. Patterns are independent: one grid can satisfy several at once.

use itertools::iproduct;
use once_cell::sync::Lazy;

/// Grid coordinate as (row, col), both 0-based.
pub type Coord = (usize, usize);

pub const GRID_SIZE: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub name: &'static str,
    pub coords: Vec<Coord>,
    pub weight: u32,
}

impl Pattern {
    fn square(name: &'static str, top: usize, left: usize) -> Pattern {
        Pattern {
            name,
            coords: iproduct!(top..top + 2, left..left + 2).collect(),
            weight: 1,
        }
    }
}

static PATTERNS: Lazy<Vec<Pattern>> = Lazy::new(|| {
    vec![
        Pattern::square("top_left_2x2", 0, 0),
        Pattern::square("top_right_2x2", 0, 1),
        Pattern::square("bottom_left_2x2", 1, 0),
        Pattern::square("bottom_right_2x2", 1, 1),
        Pattern {
            name: "full_3x3",
            coords: iproduct!(0..GRID_SIZE, 0..GRID_SIZE).collect(),
            weight: 5,
        },
    ]
});

/// All patterns in evaluation order. The order is fixed so match lists are
/// deterministic.
pub fn all_patterns() -> &'static [Pattern] {
    &PATTERNS
}
