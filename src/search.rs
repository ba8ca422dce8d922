//! Reel search: a simulated-annealing optimizer over reel strips.
//!
//! Candidates are scored with the seeded Monte Carlo evaluator; anything
//! reported back to the caller carries exact metrics. The acceptance policy
//! lives in `Annealer`, a small state machine that is independent of the
//! mutation operator:
//!
//!   Exploring   --(half the step budget, or best loss < 0.05)-->  LocalRefine
//!   LocalRefine --(`patience` steps without a new best)------->  Exploring (restart from best)
//!   any         --(statistical hit confirmed by exact eval)---->  Converged
//!
//! Exploring accepts worse candidates with probability exp(-Δ/T) and applies
//! several mutations per proposal; LocalRefine is greedy with single
//! mutations.

use std::fmt;

use log::{debug, info, warn};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{SlotError, SlotResult};
use crate::exact::{evaluate_exact, MAX_EXACT_COMBINATIONS};
use crate::metrics::Metrics;
use crate::reel::{Reel, ReelSet, REEL_COUNT, WINDOW};
use crate::simulator::simulate_seeded;
use crate::symbols::{symbol_table, SymbolId};

pub const TARGET_RTP: f64 = 0.95;
pub const MIN_WIN_RATE: f64 = 0.55;

const WIN_SHORTFALL_WEIGHT: f64 = 2.0;
const WIN_EXCESS_WEIGHT: f64 = 0.1;
const DEGENERATE_REEL_PENALTY: f64 = 0.05;

/// Draw weights per symbol id, biased toward low multipliers.
const SYMBOL_BIAS: [u32; 5] = [5, 5, 4, 2, 1];

/// Best loss under which the first exploration phase ends early.
const REFINE_LOSS: f64 = 0.05;
const MIN_TEMPERATURE: f64 = 1e-6;
const EXPLORE_STRENGTH: usize = 3;

/// Searches always score candidates at unit stake.
const UNIT_BET: f64 = 1.0;

// ---------------------------------------------------------------------------
// Targets and loss
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Targets {
    pub rtp: f64,
    pub min_win_rate: f64,
    pub rtp_tolerance: f64,
}

impl Default for Targets {
    fn default() -> Self {
        Targets {
            rtp: TARGET_RTP,
            min_win_rate: MIN_WIN_RATE,
            rtp_tolerance: 0.01,
        }
    }
}

impl Targets {
    /// Unregularized distance from the targets.
    pub fn gap(&self, metrics: &Metrics) -> f64 {
        (metrics.rtp - self.rtp).abs() + (self.min_win_rate - metrics.win_rate).max(0.0)
    }

    /// Search loss. Win-rate shortfall costs twice as much as RTP error; a
    /// small penalty applies to surplus win rate and to reels that carry a
    /// single repeated symbol.
    pub fn loss(&self, metrics: &Metrics, reels: &ReelSet) -> f64 {
        let rtp_err = (metrics.rtp - self.rtp).abs();
        let shortfall = (self.min_win_rate - metrics.win_rate).max(0.0);
        let excess = (metrics.win_rate - self.min_win_rate).max(0.0);
        let degenerate = reels
            .reels()
            .iter()
            .filter(|r| r.distinct_symbols() < 2)
            .count();
        rtp_err
            + WIN_SHORTFALL_WEIGHT * shortfall
            + WIN_EXCESS_WEIGHT * excess
            + DEGENERATE_REEL_PENALTY * degenerate as f64
    }

    pub fn is_met(&self, metrics: &Metrics) -> bool {
        (metrics.rtp - self.rtp).abs() < self.rtp_tolerance && metrics.win_rate >= self.min_win_rate
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub target_rtp: f64,
    pub min_win_rate: f64,
    pub rtp_tolerance: f64,
    pub steps: usize,
    pub eval_spins: u64,
    /// `None` seeds from OS entropy.
    pub seed: Option<u64>,
    pub min_reel_len: usize,
    pub max_reel_len: usize,
    pub initial_temperature: f64,
    pub cooling_rate: f64,
    pub patience: usize,
    /// Starting configuration; random when absent.
    pub initial: Option<ReelSet>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            target_rtp: TARGET_RTP,
            min_win_rate: MIN_WIN_RATE,
            rtp_tolerance: 0.01,
            steps: 800,
            eval_spins: 50_000,
            seed: Some(42),
            min_reel_len: 8,
            max_reel_len: 14,
            initial_temperature: 1.0,
            cooling_rate: 0.98,
            patience: 60,
            initial: None,
        }
    }
}

impl SearchConfig {
    pub fn targets(&self) -> Targets {
        Targets {
            rtp: self.target_rtp,
            min_win_rate: self.min_win_rate,
            rtp_tolerance: self.rtp_tolerance,
        }
    }

    pub fn validate(&self) -> SlotResult<()> {
        let invalid = |msg: String| Err(SlotError::InvalidRequest(msg));

        if self.eval_spins == 0 {
            return invalid("eval_spins must be positive".to_string());
        }
        if !self.target_rtp.is_finite() || self.target_rtp < 0.0 {
            return invalid(format!("target_rtp must be non-negative, got {}", self.target_rtp));
        }
        if !(0.0..=1.0).contains(&self.min_win_rate) {
            return invalid(format!("min_win_rate must be in [0, 1], got {}", self.min_win_rate));
        }
        if !self.rtp_tolerance.is_finite() || self.rtp_tolerance <= 0.0 {
            return invalid(format!("rtp_tolerance must be positive, got {}", self.rtp_tolerance));
        }
        if self.min_reel_len < WINDOW || self.min_reel_len > self.max_reel_len {
            return invalid(format!(
                "reel length bounds must satisfy {} <= min <= max, got {}..{}",
                WINDOW, self.min_reel_len, self.max_reel_len
            ));
        }
        let widest = (self.max_reel_len as u64).checked_pow(REEL_COUNT as u32);
        if widest.map_or(true, |n| n > MAX_EXACT_COMBINATIONS) {
            return invalid(format!(
                "max_reel_len {} makes exact validation intractable",
                self.max_reel_len
            ));
        }
        if !self.initial_temperature.is_finite() || self.initial_temperature <= 0.0 {
            return invalid("initial_temperature must be positive".to_string());
        }
        if !(self.cooling_rate > 0.0 && self.cooling_rate <= 1.0) {
            return invalid(format!("cooling_rate must be in (0, 1], got {}", self.cooling_rate));
        }
        if let Some(initial) = &self.initial {
            if initial.stop_combinations() > MAX_EXACT_COMBINATIONS {
                return invalid("initial reels are too long for exact validation".to_string());
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Annealing state machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchPhase {
    Exploring,
    LocalRefine,
    Converged,
}

impl fmt::Display for SearchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchPhase::Exploring => write!(f, "exploring"),
            SearchPhase::LocalRefine => write!(f, "local refine"),
            SearchPhase::Converged => write!(f, "converged"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Exploring -> LocalRefine.
    Refine,
    /// LocalRefine -> Exploring; the loop resumes from the best-ever candidate.
    Restart,
}

#[derive(Debug, Clone)]
pub struct Annealer {
    phase: SearchPhase,
    temperature: f64,
    initial_temperature: f64,
    cooling_rate: f64,
    refine_at: usize,
    patience: usize,
    stagnant: usize,
    restarts: usize,
}

impl Annealer {
    pub fn new(initial_temperature: f64, cooling_rate: f64, steps: usize, patience: usize) -> Annealer {
        Annealer {
            phase: SearchPhase::Exploring,
            temperature: initial_temperature,
            initial_temperature,
            cooling_rate,
            refine_at: steps / 2,
            patience: patience.max(1),
            stagnant: 0,
            restarts: 0,
        }
    }

    pub fn phase(&self) -> SearchPhase {
        self.phase
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn restarts(&self) -> usize {
        self.restarts
    }

    /// Mutations applied per proposal.
    pub fn mutation_strength(&self) -> usize {
        match self.phase {
            SearchPhase::Exploring => EXPLORE_STRENGTH,
            SearchPhase::LocalRefine => 1,
            SearchPhase::Converged => 0,
        }
    }

    /// Whether to move from a candidate with loss `current` to one with loss
    /// `candidate`. `draw` is a uniform sample in [0, 1).
    pub fn accepts(&self, current: f64, candidate: f64, draw: f64) -> bool {
        match self.phase {
            SearchPhase::Converged => false,
            _ if candidate <= current => true,
            SearchPhase::LocalRefine => false,
            SearchPhase::Exploring => draw < ((current - candidate) / self.temperature).exp(),
        }
    }

    /// Bookkeeping after `step` (0-based): cools, tracks stagnation and
    /// switches phase when due.
    pub fn advance(&mut self, step: usize, best_loss: f64, improved: bool) -> Option<Transition> {
        self.temperature = (self.temperature * self.cooling_rate).max(MIN_TEMPERATURE);
        if improved {
            self.stagnant = 0;
        } else {
            self.stagnant += 1;
        }

        match self.phase {
            SearchPhase::Exploring => {
                let budget_spent = step + 1 >= self.refine_at;
                let close_early = self.restarts == 0 && best_loss < REFINE_LOSS;
                if budget_spent || close_early {
                    self.phase = SearchPhase::LocalRefine;
                    self.stagnant = 0;
                    return Some(Transition::Refine);
                }
                None
            }
            SearchPhase::LocalRefine if self.stagnant >= self.patience => {
                self.phase = SearchPhase::Exploring;
                self.temperature = self.initial_temperature * 0.5;
                self.refine_at = step + 1 + self.patience / 2;
                self.stagnant = 0;
                self.restarts += 1;
                Some(Transition::Restart)
            }
            _ => None,
        }
    }

    pub fn converge(&mut self) {
        self.phase = SearchPhase::Converged;
    }
}

// ---------------------------------------------------------------------------
// Mutation operator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Swap,
    Resymbol,
    Rotate,
    ExtendRun,
    BreakRun,
    CopySlice,
    Insert,
    Delete,
}

const MUTATION_WEIGHTS: [(Mutation, u32); 8] = [
    (Mutation::Swap, 20),
    (Mutation::Resymbol, 20),
    (Mutation::Rotate, 4),
    (Mutation::ExtendRun, 18),
    (Mutation::BreakRun, 10),
    (Mutation::CopySlice, 14),
    (Mutation::Insert, 9),
    (Mutation::Delete, 9),
];

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub reels: ReelSet,
    /// Exact metrics of `reels`.
    pub metrics: Metrics,
    /// Monte Carlo estimate that selected `reels`; absent when no sampling ran.
    pub estimate: Option<Metrics>,
    pub meets_targets: bool,
    pub iterations: usize,
    /// Sampled hits that exact validation turned down.
    pub rejected_hits: usize,
    pub phase: SearchPhase,
    pub loss: f64,
}

struct Scored {
    reels: ReelSet,
    estimate: Metrics,
    loss: f64,
}

pub struct ReelSearch {
    cfg: SearchConfig,
    targets: Targets,
    rng: StdRng,
    symbols: Vec<SymbolId>,
    symbol_dist: WeightedIndex<u32>,
    mutation_dist: WeightedIndex<u32>,
}

impl ReelSearch {
    pub fn new(cfg: SearchConfig) -> SlotResult<ReelSearch> {
        cfg.validate()?;
        let rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let (symbols, weights): (Vec<SymbolId>, Vec<u32>) =
            symbol_table().ids().zip(SYMBOL_BIAS).unzip();
        let symbol_dist = WeightedIndex::new(weights)
            .map_err(|e| SlotError::InvalidRequest(format!("symbol weights: {}", e)))?;
        let mutation_dist = WeightedIndex::new(MUTATION_WEIGHTS.iter().map(|&(_, w)| w))
            .map_err(|e| SlotError::InvalidRequest(format!("mutation weights: {}", e)))?;
        Ok(ReelSearch {
            targets: cfg.targets(),
            cfg,
            rng,
            symbols,
            symbol_dist,
            mutation_dist,
        })
    }

    fn random_symbol(&mut self) -> SymbolId {
        self.symbols[self.symbol_dist.sample(&mut self.rng)]
    }

    /// Strip of `len` symbols built from runs of 2-4 identical symbols.
    fn random_strip(&mut self, len: usize) -> Vec<SymbolId> {
        let mut strip = Vec::with_capacity(len + 4);
        while strip.len() < len {
            let symbol = self.random_symbol();
            let run = self.rng.gen_range(2..=4);
            strip.extend(std::iter::repeat(symbol).take(run));
        }
        strip.truncate(len);
        strip
    }

    pub fn random_candidate(&mut self) -> SlotResult<ReelSet> {
        let (lo, hi) = (self.cfg.min_reel_len, self.cfg.max_reel_len);
        let mut strips: [Vec<SymbolId>; REEL_COUNT] = Default::default();
        for strip in strips.iter_mut() {
            let len = self.rng.gen_range(lo..=hi);
            *strip = self.random_strip(len);
        }
        ReelSet::from_symbols(strips)
    }

    /// Neighbour of `reels` after `strength` single-reel edits.
    pub fn mutate(&mut self, reels: &ReelSet, strength: usize) -> SlotResult<ReelSet> {
        let mut strips: Vec<Vec<SymbolId>> = reels.reels().iter().map(|r| r.symbols().to_vec()).collect();
        for _ in 0..strength {
            let kind = MUTATION_WEIGHTS[self.mutation_dist.sample(&mut self.rng)].0;
            self.apply(kind, &mut strips);
        }
        let mut out = reels.clone();
        for (i, strip) in strips.into_iter().enumerate() {
            if strip.as_slice() != reels.reel(i).symbols() {
                out = out.with_reel(i, Reel::new(strip)?);
            }
        }
        Ok(out)
    }

    fn apply(&mut self, kind: Mutation, strips: &mut [Vec<SymbolId>]) {
        let i = self.rng.gen_range(0..strips.len());
        let n = strips[i].len();
        match kind {
            Mutation::Swap => {
                let a = self.rng.gen_range(0..n);
                let mut b = self.rng.gen_range(0..n - 1);
                if b >= a {
                    b += 1;
                }
                strips[i].swap(a, b);
            }
            Mutation::Resymbol => {
                let j = self.rng.gen_range(0..n);
                strips[i][j] = self.random_symbol();
            }
            // Neutral for the metrics; shifts where runs sit relative to
            // the other edits.
            Mutation::Rotate => {
                let k = self.rng.gen_range(1..n);
                strips[i].rotate_left(k);
            }
            Mutation::ExtendRun => {
                let start = self.rng.gen_range(0..n);
                let run = self.rng.gen_range(2..=4);
                let symbol = strips[i][start];
                for off in 1..run {
                    strips[i][(start + off) % n] = symbol;
                }
            }
            Mutation::BreakRun => {
                let joints: Vec<usize> = (0..n).filter(|&j| strips[i][j] == strips[i][(j + 1) % n]).collect();
                if joints.is_empty() {
                    return self.apply(Mutation::Resymbol, strips);
                }
                let j = (joints[self.rng.gen_range(0..joints.len())] + 1) % n;
                let old = strips[i][j];
                let replacement = self.random_symbol();
                strips[i][j] = if replacement == old {
                    self.symbols[(self.symbols.iter().position(|&s| s == old).unwrap_or(0) + 1) % self.symbols.len()]
                } else {
                    replacement
                };
            }
            Mutation::CopySlice => {
                let src = self.rng.gen_range(0..strips.len());
                let (n_src, n_dst) = (strips[src].len(), n);
                let len = self.rng.gen_range(2..=n_src.min(n_dst).min(6));
                let s0 = self.rng.gen_range(0..=n_src - len);
                let d0 = self.rng.gen_range(0..=n_dst - len);
                let slice: Vec<SymbolId> = strips[src][s0..s0 + len].to_vec();
                strips[i][d0..d0 + len].copy_from_slice(&slice);
            }
            Mutation::Insert => {
                if n >= self.cfg.max_reel_len {
                    return self.apply(Mutation::Resymbol, strips);
                }
                let pos = self.rng.gen_range(0..=n);
                // Half the time continue the neighbouring run.
                let symbol = if self.rng.gen_bool(0.5) {
                    strips[i][pos % n]
                } else {
                    self.random_symbol()
                };
                strips[i].insert(pos, symbol);
            }
            Mutation::Delete => {
                if n <= self.cfg.min_reel_len {
                    return self.apply(Mutation::Resymbol, strips);
                }
                let pos = self.rng.gen_range(0..n);
                strips[i].remove(pos);
            }
        }
    }

    fn estimate(&mut self, reels: &ReelSet) -> SlotResult<Metrics> {
        let seed: u64 = self.rng.gen();
        simulate_seeded(reels, self.cfg.eval_spins, UNIT_BET, seed)
    }

    fn outcome(
        &self,
        reels: ReelSet,
        estimate: Option<Metrics>,
        iterations: usize,
        rejected_hits: usize,
        phase: SearchPhase,
    ) -> SlotResult<SearchOutcome> {
        let metrics = evaluate_exact(&reels, UNIT_BET)?;
        let outcome = SearchOutcome {
            meets_targets: self.targets.is_met(&metrics),
            loss: self.targets.loss(&metrics, &reels),
            reels,
            metrics,
            estimate,
            iterations,
            rejected_hits,
            phase,
        };
        info!(
            "search finished after {} steps ({}): exact rtp {:.6}, win rate {:.6}, targets met: {}",
            outcome.iterations, outcome.phase, outcome.metrics.rtp, outcome.metrics.win_rate, outcome.meets_targets,
        );
        Ok(outcome)
    }

    pub fn run(&mut self) -> SlotResult<SearchOutcome> {
        let start = match self.cfg.initial.clone() {
            Some(reels) => reels,
            None => self.random_candidate()?,
        };
        let mut annealer = Annealer::new(
            self.cfg.initial_temperature,
            self.cfg.cooling_rate,
            self.cfg.steps,
            self.cfg.patience,
        );
        if self.cfg.steps == 0 {
            return self.outcome(start, None, 0, 0, annealer.phase());
        }

        let start_estimate = self.estimate(&start)?;
        let mut current_loss = self.targets.loss(&start_estimate, &start);
        let mut current = start.clone();
        let mut best = Scored {
            reels: start,
            estimate: start_estimate,
            loss: current_loss,
        };
        debug!("initial candidate: loss {:.4}, {}", best.loss, best.estimate);

        let mut iterations = 0;
        let mut rejected_hits = 0;
        for step in 0..self.cfg.steps {
            iterations = step + 1;
            let proposal = self.mutate(&current, annealer.mutation_strength())?;
            let estimate = self.estimate(&proposal)?;
            let loss = self.targets.loss(&estimate, &proposal);

            if self.targets.is_met(&estimate) {
                let exact = evaluate_exact(&proposal, UNIT_BET)?;
                if self.targets.is_met(&exact) {
                    annealer.converge();
                    return self.outcome(proposal, Some(estimate), iterations, rejected_hits, annealer.phase());
                }
                rejected_hits += 1;
                warn!(
                    "step {}: sampled targets met but exact validation failed (rtp {:.4}, win rate {:.4})",
                    step, exact.rtp, exact.win_rate,
                );
            }

            let draw: f64 = self.rng.gen();
            let mut improved = false;
            if annealer.accepts(current_loss, loss, draw) {
                if loss < best.loss {
                    debug!("step {}: new best loss {:.4} ({})", step, loss, estimate);
                    best = Scored {
                        reels: proposal.clone(),
                        estimate,
                        loss,
                    };
                    improved = true;
                }
                current = proposal;
                current_loss = loss;
            }

            match annealer.advance(step, best.loss, improved) {
                Some(Transition::Refine) => {
                    debug!("step {}: refining (best loss {:.4})", step, best.loss);
                }
                Some(Transition::Restart) => {
                    debug!("step {}: stalled, restarting from best (loss {:.4})", step, best.loss);
                    current = best.reels.clone();
                    current_loss = best.loss;
                }
                None => {}
            }
        }

        self.outcome(best.reels, Some(best.estimate), iterations, rejected_hits, annealer.phase())
    }
}

pub fn search(cfg: SearchConfig) -> SlotResult<SearchOutcome> {
    ReelSearch::new(cfg)?.run()
}

// ---------------------------------------------------------------------------
// Adaptive schedule
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub steps: usize,
    pub eval_spins: u64,
    pub seed: u64,
}

const fn entry(steps: usize, eval_spins: u64, seed: u64) -> ScheduleEntry {
    ScheduleEntry {
        steps,
        eval_spins,
        seed,
    }
}

/// Escalating budgets tried by `adaptive_search`.
pub const DEFAULT_SCHEDULE: [ScheduleEntry; 5] = [
    entry(150, 8_000, 1),
    entry(250, 10_000, 7),
    entry(350, 12_000, 42),
    entry(450, 15_000, 1337),
    entry(600, 20_000, 2024),
];

pub fn adaptive_search(seed: Option<u64>) -> SlotResult<SearchOutcome> {
    adaptive_search_with(&DEFAULT_SCHEDULE, &SearchConfig::default(), seed)
}

/// Run `base` once per schedule entry, returning the first result that passes
/// exact validation, otherwise the one closest to the targets. A base seed,
/// when given, offsets every entry's seed.
pub fn adaptive_search_with(
    schedule: &[ScheduleEntry],
    base: &SearchConfig,
    seed: Option<u64>,
) -> SlotResult<SearchOutcome> {
    let targets = base.targets();
    let mut best: Option<SearchOutcome> = None;

    for (i, entry) in schedule.iter().enumerate() {
        let cfg = SearchConfig {
            steps: entry.steps,
            eval_spins: entry.eval_spins,
            seed: Some(seed.map_or(entry.seed, |s| s.wrapping_add(entry.seed))),
            ..base.clone()
        };
        let outcome = search(cfg)?;
        info!(
            "schedule [{}/{}] steps={} eval_spins={}: gap {:.6}",
            i + 1,
            schedule.len(),
            entry.steps,
            entry.eval_spins,
            targets.gap(&outcome.metrics),
        );
        if outcome.meets_targets {
            return Ok(outcome);
        }
        let closer = match &best {
            Some(b) => targets.gap(&outcome.metrics) < targets.gap(&b.metrics),
            None => true,
        };
        if closer {
            best = Some(outcome);
        }
    }

    best.ok_or_else(|| SlotError::InvalidRequest("adaptive schedule is empty".to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
