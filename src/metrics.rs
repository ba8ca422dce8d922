use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SlotError, SlotResult};

/// Aggregate economics of a spin population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub spins: u64,
    pub rtp: f64,
    pub win_rate: f64,
    pub total_bet: f64,
    pub total_return: f64,
}

impl Metrics {
    /// Build metrics from raw totals. Zero spins and non-positive bets are
    /// rejected rather than reported as a 0/0 RTP.
    pub fn from_totals(spins: u64, wins: u64, bet_amount: f64, total_return: f64) -> SlotResult<Metrics> {
        if spins == 0 {
            return Err(SlotError::InvalidRequest(
                "spin count must be positive".to_string(),
            ));
        }
        validate_stake(bet_amount)?;
        let total_bet = spins as f64 * bet_amount;
        Ok(Metrics {
            spins,
            rtp: total_return / total_bet,
            win_rate: wins as f64 / spins as f64,
            total_bet,
            total_return,
        })
    }

    /// Average payout per spin.
    pub fn return_per_spin(&self) -> f64 {
        self.total_return / self.spins as f64
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RTP {:.4} | Win rate {:.1}% | {} spins (bet {:.2}, return {:.2})",
            self.rtp,
            self.win_rate * 100.0,
            self.spins,
            self.total_bet,
            self.total_return,
        )
    }
}

/// Stake used by the aggregate evaluators must be a positive finite amount.
pub fn validate_stake(bet_amount: f64) -> SlotResult<()> {
    if !bet_amount.is_finite() || bet_amount <= 0.0 {
        return Err(SlotError::InvalidRequest(format!(
            "bet amount must be positive, got {}",
            bet_amount
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_are_consistent() {
        let m = Metrics::from_totals(200, 110, 0.5, 95.0).unwrap();
        assert_eq!(m.total_bet, 100.0);
        assert!((m.rtp - 0.95).abs() < 1e-12);
        assert!((m.win_rate - 0.55).abs() < 1e-12);
        assert!((m.return_per_spin() - 0.475).abs() < 1e-12);
    }

    #[test]
    fn zero_spins_rejected() {
        assert!(Metrics::from_totals(0, 0, 1.0, 0.0).is_err());
    }

    #[test]
    fn degenerate_stake_rejected() {
        assert!(Metrics::from_totals(10, 0, 0.0, 0.0).is_err());
        assert!(Metrics::from_totals(10, 0, f64::NAN, 0.0).is_err());
    }

    #[test]
    fn display_mentions_rtp() {
        let m = Metrics::from_totals(4, 2, 1.0, 3.8).unwrap();
        let s = format!("{}", m);
        assert!(s.contains("RTP 0.9500"));
        assert!(s.contains("50.0%"));
    }
}
