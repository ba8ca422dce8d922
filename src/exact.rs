//! Exact RTP and win rate by enumerating every stop combination.
//!
//! Every combination of stops is equally likely, so the exact metrics are
//! plain averages over `len(r1) * len(r2) * len(r3)` grids. Cost grows with
//! that product, which is why the search keeps reels short.

use itertools::iproduct;
use rayon::prelude::*;

use crate::error::{SlotError, SlotResult};
use crate::machine::{build_grid, grid_payout};
use crate::metrics::{validate_stake, Metrics};
use crate::reel::ReelSet;

/// Largest stop product the exact evaluator will enumerate.
pub const MAX_EXACT_COMBINATIONS: u64 = 1 << 24;

pub fn evaluate_exact(config: &ReelSet, bet_amount: f64) -> SlotResult<Metrics> {
    validate_stake(bet_amount)?;
    let combinations = config.stop_combinations();
    if combinations > MAX_EXACT_COMBINATIONS {
        return Err(SlotError::InvalidRequest(format!(
            "{} stop combinations exceed the exact evaluation limit of {}",
            combinations, MAX_EXACT_COMBINATIONS
        )));
    }
    let [_, len_b, len_c] = config.lengths();

    // One row per stop of the first reel, reduced in row order.
    let rows: Vec<SlotResult<(u64, f64)>> = (0..config.reel(0).len())
        .into_par_iter()
        .map(|i| {
            let mut wins = 0u64;
            let mut total_return = 0.0;
            for (j, k) in iproduct!(0..len_b, 0..len_c) {
                let grid = build_grid(config, &[i as i64, j as i64, k as i64]);
                let (payout, hits) = grid_payout(&grid, bet_amount)?;
                total_return += payout;
                if hits > 0 {
                    wins += 1;
                }
            }
            Ok((wins, total_return))
        })
        .collect();

    let mut wins = 0u64;
    let mut total_return = 0.0;
    for row in rows {
        let (w, r) = row?;
        wins += w;
        total_return += r;
    }
    Metrics::from_totals(combinations, wins, bet_amount, total_return)
}
