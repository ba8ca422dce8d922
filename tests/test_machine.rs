use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

use reel_tuner::error::SlotError;
use reel_tuner::machine::*;
use reel_tuner::reel::ReelSet;

fn uniform(symbol: u8) -> ReelSet {
    ReelSet::from_symbols([vec![symbol; 3], vec![symbol; 3], vec![symbol; 3]]).unwrap()
}

/// Every column has three distinct symbols, so no 2x2 square can ever form.
fn never_wins() -> ReelSet {
    ReelSet::from_symbols([vec![0, 1, 2, 3], vec![1, 2, 3, 4], vec![2, 3, 4, 0]]).unwrap()
}

#[test]
fn test_uniform_grid_fires_every_pattern() {
    let (payout, matches) = spin_payout(&uniform(2), &[0, 0, 0], 1.0).unwrap();
    assert_eq!(matches.len(), 5);
    for m in &matches[..4] {
        assert_relative_eq!(m.payout, 1.0);
        assert_eq!(m.weight, 1);
    }
    assert_eq!(matches[4].pattern, "full_3x3");
    assert_relative_eq!(matches[4].payout, 5.0);
    assert_relative_eq!(payout, 9.0);
}

#[test]
fn test_low_symbol_multiplier() {
    let (payout, _) = spin_payout(&uniform(0), &[1, 2, 0], 1.0).unwrap();
    assert_relative_eq!(payout, 4.0 * 0.25 + 5.0 * 0.25);
}

#[test]
fn test_single_square_match() {
    let reels = ReelSet::from_symbols([vec![4, 4, 0], vec![4, 4, 1], vec![0, 1, 2]]).unwrap();
    let (payout, matches) = spin_payout(&reels, &[0, 0, 0], 1.0).unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].pattern, "top_left_2x2");
    assert_eq!(matches[0].symbol, 4);
    assert_eq!(matches[0].coords, &[(0, 0), (0, 1), (1, 0), (1, 1)]);
    assert_relative_eq!(payout, 5.0);
}

#[test]
fn test_payout_scales_with_bet() {
    let (payout, matches) = spin_payout(&uniform(2), &[0, 0, 0], 2.5).unwrap();
    assert_relative_eq!(payout, 22.5);
    assert_relative_eq!(matches[4].payout, 12.5);

    let (free, matches) = spin_payout(&uniform(2), &[0, 0, 0], 0.0).unwrap();
    assert_eq!(free, 0.0);
    assert_eq!(matches.len(), 5);
}

#[test]
fn test_no_match_without_squares() {
    let reels = never_wins();
    for a in 0..4 {
        for b in 0..4 {
            for c in 0..4 {
                let (payout, matches) = spin_payout(&reels, &[a, b, c], 1.0).unwrap();
                assert!(matches.is_empty(), "stops {:?} matched", [a, b, c]);
                assert_eq!(payout, 0.0);
            }
        }
    }
}

#[test]
fn test_spin_payout_is_sum_of_matches() {
    let reels = ReelSet::from_symbols([
        vec![0, 0, 1, 1, 2, 2, 3, 0],
        vec![0, 0, 1, 1, 0, 0, 2, 2],
        vec![1, 1, 0, 0, 0, 2, 2, 1],
    ])
    .unwrap();
    let mut rng = StdRng::seed_from_u64(9);
    let mut wins = 0;
    for _ in 0..2000 {
        let outcome = spin(&reels, 1.0, &mut rng).unwrap();
        let sum: f64 = outcome.matches.iter().map(|m| m.payout).sum();
        assert_relative_eq!(outcome.payout, sum);
        assert_eq!(outcome.grid, build_grid(&reels, &outcome.stops));
        if outcome.is_win() {
            wins += 1;
        }
    }
    assert!(wins > 0);
}

#[test]
fn test_grid_payout_agrees_with_evaluate() {
    let grid: Grid = [[3, 3, 3], [3, 3, 3], [1, 3, 3]];
    let matches = evaluate(&grid, 1.0).unwrap();
    let (total, hits) = grid_payout(&grid, 1.0).unwrap();
    assert_eq!(hits, matches.len());
    assert_eq!(hits, 3);
    assert_relative_eq!(total, 9.0);
}

#[test]
fn test_spin_stops_in_range() {
    let reels = never_wins();
    let mut rng = StdRng::seed_from_u64(1);
    for _ in 0..500 {
        let stops = random_stops(&reels, &mut rng);
        assert!(stops.iter().all(|&s| (0..4).contains(&s)));
    }
}

#[test]
fn test_same_seed_same_spin() {
    let reels = never_wins();
    let a = spin(&reels, 1.0, &mut StdRng::seed_from_u64(77)).unwrap();
    let b = spin(&reels, 1.0, &mut StdRng::seed_from_u64(77)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_unknown_symbol_in_grid() {
    let grid: Grid = [[9; 3]; 3];
    assert!(matches!(evaluate(&grid, 1.0), Err(SlotError::UnknownSymbol(9))));
}

#[test]
fn test_invalid_bet_rejected() {
    let mut rng = StdRng::seed_from_u64(0);
    assert!(spin(&uniform(1), -0.5, &mut rng).is_err());
    assert!(spin(&uniform(1), f64::NAN, &mut rng).is_err());
}
