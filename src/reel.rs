use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SlotError, SlotResult};
use crate::symbols::{symbol_table, SymbolId};

/// Rows visible through the window of each reel.
pub const WINDOW: usize = 3;

/// Reels in a configuration.
pub const REEL_COUNT: usize = 3;

/// A circular strip of symbols. Immutable once built; search mutations
/// produce new reels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<SymbolId>", into = "Vec<SymbolId>")]
pub struct Reel {
    symbols: Vec<SymbolId>,
}

impl Reel {
    pub fn new(symbols: Vec<SymbolId>) -> SlotResult<Reel> {
        if symbols.len() < WINDOW {
            return Err(SlotError::InvalidReel(format!(
                "need at least {} symbols, got {}",
                WINDOW,
                symbols.len()
            )));
        }
        let table = symbol_table();
        if let Some(bad) = symbols.iter().find(|&&s| !table.contains(s)) {
            return Err(SlotError::InvalidReel(format!(
                "symbol {} is not in the symbol table",
                bad
            )));
        }
        Ok(Reel { symbols })
    }

    pub fn symbols(&self) -> &[SymbolId] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Three consecutive symbols starting at `stop`, top to bottom. Any
    /// signed stop is reduced modulo the reel length.
    pub fn window(&self, stop: i64) -> [SymbolId; WINDOW] {
        let n = self.symbols.len() as i64;
        let start = stop.rem_euclid(n) as usize;
        let len = self.symbols.len();
        [
            self.symbols[start],
            self.symbols[(start + 1) % len],
            self.symbols[(start + 2) % len],
        ]
    }

    /// Number of distinct symbol ids on the strip.
    pub fn distinct_symbols(&self) -> usize {
        let mut seen = [false; 256];
        self.symbols
            .iter()
            .filter(|&&s| !std::mem::replace(&mut seen[s as usize], true))
            .count()
    }

    /// Longest circular run of one repeated symbol.
    pub fn longest_run(&self) -> usize {
        let n = self.symbols.len();
        if self.distinct_symbols() == 1 {
            return n;
        }
        let mut best = 1;
        let mut run = 1;
        // Walk twice around so runs crossing the seam are counted whole.
        for i in 1..2 * n {
            if self.symbols[i % n] == self.symbols[(i - 1) % n] {
                run += 1;
                best = best.max(run);
            } else {
                run = 1;
            }
        }
        best.min(n)
    }
}

impl TryFrom<Vec<SymbolId>> for Reel {
    type Error = SlotError;

    fn try_from(symbols: Vec<SymbolId>) -> SlotResult<Reel> {
        Reel::new(symbols)
    }
}

impl From<Reel> for Vec<SymbolId> {
    fn from(reel: Reel) -> Vec<SymbolId> {
        reel.symbols
    }
}

impl fmt::Display for Reel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.symbols.iter().map(|s| s.to_string()).collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Parse a comma or whitespace separated list of symbol ids, e.g. "0,0,2,4".
pub fn parse_reel(notation: &str) -> SlotResult<Reel> {
    let symbols = notation
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<SymbolId>().map_err(|_| {
                SlotError::InvalidRequest(format!("'{}' is not a symbol id", s))
            })
        })
        .collect::<SlotResult<Vec<SymbolId>>>()?;
    Reel::new(symbols)
}

// ---------------------------------------------------------------------------
// Reel configuration
// ---------------------------------------------------------------------------

/// The three reels of one machine, left to right.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "ReelSetJson", into = "ReelSetJson")]
pub struct ReelSet {
    reels: [Reel; REEL_COUNT],
}

#[derive(Serialize, Deserialize)]
struct ReelSetJson {
    reel_1: Reel,
    reel_2: Reel,
    reel_3: Reel,
}

impl From<ReelSetJson> for ReelSet {
    fn from(json: ReelSetJson) -> ReelSet {
        ReelSet::new([json.reel_1, json.reel_2, json.reel_3])
    }
}

impl From<ReelSet> for ReelSetJson {
    fn from(set: ReelSet) -> ReelSetJson {
        let [reel_1, reel_2, reel_3] = set.reels;
        ReelSetJson {
            reel_1,
            reel_2,
            reel_3,
        }
    }
}

impl ReelSet {
    pub fn new(reels: [Reel; REEL_COUNT]) -> ReelSet {
        ReelSet { reels }
    }

    pub fn from_symbols(strips: [Vec<SymbolId>; REEL_COUNT]) -> SlotResult<ReelSet> {
        let [a, b, c] = strips;
        Ok(ReelSet::new([Reel::new(a)?, Reel::new(b)?, Reel::new(c)?]))
    }

    pub fn reel(&self, index: usize) -> &Reel {
        &self.reels[index]
    }

    pub fn reels(&self) -> &[Reel; REEL_COUNT] {
        &self.reels
    }

    pub fn lengths(&self) -> [usize; REEL_COUNT] {
        [self.reels[0].len(), self.reels[1].len(), self.reels[2].len()]
    }

    /// Number of distinct stop combinations (the exact evaluator's work).
    /// Saturates at `u64::MAX`.
    pub fn stop_combinations(&self) -> u64 {
        self.reels
            .iter()
            .try_fold(1u64, |acc, r| acc.checked_mul(r.len() as u64))
            .unwrap_or(u64::MAX)
    }

    /// Copy of this set with reel `index` replaced.
    pub fn with_reel(&self, index: usize, reel: Reel) -> ReelSet {
        let mut reels = self.reels.clone();
        reels[index] = reel;
        ReelSet { reels }
    }
}

impl fmt::Display for ReelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, reel) in self.reels.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "reel_{}: {}", i + 1, reel)?;
        }
        Ok(())
    }
}
