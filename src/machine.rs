//! Grid construction and payout evaluation.
//!
//! Each reel contributes one column: the reel window at its stop, read top
//! to bottom. The resulting 3x3 grid is scored against every pattern, and all
//! satisfied patterns pay. A uniform grid therefore collects the four 2x2
//! corners plus the full-grid bonus.

use rand::Rng;
use serde::Serialize;

use crate::error::{SlotError, SlotResult};
use crate::patterns::{all_patterns, Coord, Pattern, GRID_SIZE};
use crate::reel::{ReelSet, REEL_COUNT};
use crate::symbols::{multiplier_of, SymbolId};

/// Row-major 3x3 grid of symbol ids.
pub type Grid = [[SymbolId; GRID_SIZE]; GRID_SIZE];

/// One stop index per reel.
pub type Stops = [i64; REEL_COUNT];

/// A pattern satisfied by a grid, with its payout contribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    pub pattern: &'static str,
    pub coords: &'static [Coord],
    pub symbol: SymbolId,
    pub weight: u32,
    pub multiplier: f64,
    pub payout: f64,
}

/// Result of a single spin, including the stops so callers can animate it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpinOutcome {
    pub stops: Stops,
    pub grid: Grid,
    pub payout: f64,
    pub matches: Vec<Match>,
}

impl SpinOutcome {
    pub fn is_win(&self) -> bool {
        !self.matches.is_empty()
    }
}

/// Single-spin stakes may be zero (a free look at the grid) but never
/// negative or non-finite.
pub fn validate_bet(bet_amount: f64) -> SlotResult<()> {
    if !bet_amount.is_finite() || bet_amount < 0.0 {
        return Err(SlotError::InvalidRequest(format!(
            "bet amount must be a non-negative number, got {}",
            bet_amount
        )));
    }
    Ok(())
}

pub fn build_grid(config: &ReelSet, stops: &Stops) -> Grid {
    let columns: [[SymbolId; GRID_SIZE]; REEL_COUNT] = [
        config.reel(0).window(stops[0]),
        config.reel(1).window(stops[1]),
        config.reel(2).window(stops[2]),
    ];
    let mut grid = [[0; GRID_SIZE]; GRID_SIZE];
    for (r, row) in grid.iter_mut().enumerate() {
        for (c, cell) in row.iter_mut().enumerate() {
            *cell = columns[c][r];
        }
    }
    grid
}

/// The shared symbol if every cell of `pattern` holds it.
fn pattern_symbol(grid: &Grid, pattern: &Pattern) -> Option<SymbolId> {
    let (r0, c0) = pattern.coords[0];
    let symbol = grid[r0][c0];
    pattern
        .coords
        .iter()
        .all(|&(r, c)| grid[r][c] == symbol)
        .then_some(symbol)
}

pub fn evaluate(grid: &Grid, bet_amount: f64) -> SlotResult<Vec<Match>> {
    let mut matches = Vec::new();
    for pattern in all_patterns() {
        if let Some(symbol) = pattern_symbol(grid, pattern) {
            let multiplier = multiplier_of(symbol)?;
            matches.push(Match {
                pattern: pattern.name,
                coords: &pattern.coords,
                symbol,
                weight: pattern.weight,
                multiplier,
                payout: bet_amount * multiplier * pattern.weight as f64,
            });
        }
    }
    Ok(matches)
}

/// Total payout and number of satisfied patterns, without building match
/// records. Summation order matches `evaluate`.
pub fn grid_payout(grid: &Grid, bet_amount: f64) -> SlotResult<(f64, usize)> {
    let mut total = 0.0;
    let mut hits = 0;
    for pattern in all_patterns() {
        if let Some(symbol) = pattern_symbol(grid, pattern) {
            total += bet_amount * multiplier_of(symbol)? * pattern.weight as f64;
            hits += 1;
        }
    }
    Ok((total, hits))
}

pub fn spin_payout(config: &ReelSet, stops: &Stops, bet_amount: f64) -> SlotResult<(f64, Vec<Match>)> {
    validate_bet(bet_amount)?;
    let grid = build_grid(config, stops);
    let matches = evaluate(&grid, bet_amount)?;
    let total = matches.iter().map(|m| m.payout).sum();
    Ok((total, matches))
}

/// Uniform, independent stop per reel.
pub fn random_stops<R: Rng + ?Sized>(config: &ReelSet, rng: &mut R) -> Stops {
    let lengths = config.lengths();
    [
        rng.gen_range(0..lengths[0]) as i64,
        rng.gen_range(0..lengths[1]) as i64,
        rng.gen_range(0..lengths[2]) as i64,
    ]
}

/// Draw random stops and score the resulting grid.
pub fn spin<R: Rng + ?Sized>(config: &ReelSet, bet_amount: f64, rng: &mut R) -> SlotResult<SpinOutcome> {
    validate_bet(bet_amount)?;
    let stops = random_stops(config, rng);
    let grid = build_grid(config, &stops);
    let matches = evaluate(&grid, bet_amount)?;
    let payout = matches.iter().map(|m| m.payout).sum();
    Ok(SpinOutcome {
        stops,
        grid,
        payout,
        matches,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_are_transposed_into_rows() {
        let config = ReelSet::from_symbols([vec![0, 1, 2, 3], vec![4, 3, 2], vec![1, 1, 0, 0, 2]]).unwrap();
        let grid = build_grid(&config, &[1, 0, 3]);
        assert_eq!(grid, [[1, 4, 0], [2, 3, 2], [3, 2, 1]]);
    }

    #[test]
    fn pattern_symbol_requires_all_cells() {
        let grid: Grid = [[3, 3, 1], [3, 3, 1], [0, 1, 2]];
        let patterns = all_patterns();
        assert_eq!(pattern_symbol(&grid, &patterns[0]), Some(3));
        assert_eq!(pattern_symbol(&grid, &patterns[1]), None);
        assert_eq!(pattern_symbol(&grid, &patterns[4]), None);
    }

    #[test]
    fn negative_bet_rejected() {
        let config = ReelSet::from_symbols([vec![0, 1, 2], vec![0, 1, 2], vec![0, 1, 2]]).unwrap();
        assert!(spin_payout(&config, &[0, 0, 0], -1.0).is_err());
        assert!(spin_payout(&config, &[0, 0, 0], f64::INFINITY).is_err());
        assert!(spin_payout(&config, &[0, 0, 0], 0.0).is_ok());
    }
}
