//! Monte Carlo estimate of RTP and win rate.
//!
//! `simulate` draws from a caller-owned RNG. `simulate_seeded` is the
//! parallel variant used by the search loop: the run is cut into fixed-size
//! chunks, each chunk gets its own `StdRng` derived from the seed and the
//! chunk index, and chunk totals are reduced in index order. Its output
//! depends only on the seed and the spin count, never on the thread pool.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::error::SlotResult;
use crate::machine::{build_grid, grid_payout, random_stops};
use crate::metrics::{validate_stake, Metrics};
use crate::reel::ReelSet;

/// Spins per independently seeded chunk in `simulate_seeded`.
pub const CHUNK_SPINS: u64 = 4096;

#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    wins: u64,
    total_return: f64,
}

impl Tally {
    fn merge(self, other: Tally) -> Tally {
        Tally {
            wins: self.wins + other.wins,
            total_return: self.total_return + other.total_return,
        }
    }
}

fn run_spins<R: Rng + ?Sized>(config: &ReelSet, spins: u64, bet_amount: f64, rng: &mut R) -> SlotResult<Tally> {
    let mut tally = Tally::default();
    for _ in 0..spins {
        let stops = random_stops(config, rng);
        let grid = build_grid(config, &stops);
        let (payout, hits) = grid_payout(&grid, bet_amount)?;
        tally.total_return += payout;
        if hits > 0 {
            tally.wins += 1;
        }
    }
    Ok(tally)
}

pub fn simulate<R: Rng + ?Sized>(
    config: &ReelSet,
    spin_count: u64,
    bet_amount: f64,
    rng: &mut R,
) -> SlotResult<Metrics> {
    validate_stake(bet_amount)?;
    let tally = run_spins(config, spin_count, bet_amount, rng)?;
    Metrics::from_totals(spin_count, tally.wins, bet_amount, tally.total_return)
}

/// Seed for chunk `index` of a run seeded with `seed` (splitmix64 finalizer,
/// so neighbouring chunks get unrelated streams).
fn chunk_seed(seed: u64, index: u64) -> u64 {
    let mut z = seed ^ index.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

pub fn simulate_seeded(config: &ReelSet, spin_count: u64, bet_amount: f64, seed: u64) -> SlotResult<Metrics> {
    validate_stake(bet_amount)?;
    let chunks = spin_count.div_ceil(CHUNK_SPINS);

    let tallies: Vec<SlotResult<Tally>> = (0..chunks)
        .into_par_iter()
        .map(|i| {
            let spins = CHUNK_SPINS.min(spin_count - i * CHUNK_SPINS);
            let mut rng = StdRng::seed_from_u64(chunk_seed(seed, i));
            run_spins(config, spins, bet_amount, &mut rng)
        })
        .collect();

    let mut total = Tally::default();
    for tally in tallies {
        total = total.merge(tally?);
    }
    Metrics::from_totals(spin_count, total.wins, bet_amount, total.total_return)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_seeds_differ() {
        assert_ne!(chunk_seed(7, 0), chunk_seed(7, 1));
        assert_ne!(chunk_seed(7, 0), chunk_seed(8, 0));
        assert_eq!(chunk_seed(7, 3), chunk_seed(7, 3));
    }

    #[test]
    fn partial_last_chunk_counts_every_spin() {
        let config = ReelSet::from_symbols([vec![2, 2, 2], vec![2, 2, 2], vec![2, 2, 2]]).unwrap();
        let m = simulate_seeded(&config, CHUNK_SPINS + 17, 1.0, 5).unwrap();
        assert_eq!(m.spins, CHUNK_SPINS + 17);
        assert_eq!(m.win_rate, 1.0);
    }
}
