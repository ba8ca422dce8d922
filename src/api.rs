//! Request/response layer for callers that talk JSON (the CLI, or an HTTP
//! front end). Requests carry their own defaults and are validated here
//! before they reach the engine; errors are split into caller mistakes and
//! engine failures.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{SlotError, SlotResult};
use crate::machine::{self, SpinOutcome};
use crate::metrics::Metrics;
use crate::reel::ReelSet;
use crate::search::{self, SearchConfig, SearchOutcome};
use crate::simulator::simulate_seeded;

const DEFAULT_SEED: u64 = 42;

fn require_positive(name: &str, value: u64) -> SlotResult<()> {
    if value == 0 {
        return Err(SlotError::InvalidRequest(format!("{} must be positive", name)));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    pub steps: usize,
    pub eval_spins: u64,
    /// Informational; exact validation supersedes any sampling count.
    #[serde(alias = "validation_spins")]
    pub spins: u64,
    pub seed: Option<u64>,
}

impl Default for SearchRequest {
    fn default() -> Self {
        SearchRequest {
            steps: 800,
            eval_spins: 50_000,
            spins: 100_000,
            seed: Some(DEFAULT_SEED),
        }
    }
}

impl SearchRequest {
    pub fn validate(&self) -> SlotResult<()> {
        require_positive("steps", self.steps as u64)?;
        require_positive("eval_spins", self.eval_spins)?;
        require_positive("spins", self.spins)
    }

    pub fn to_config(&self) -> SearchConfig {
        SearchConfig {
            steps: self.steps,
            eval_spins: self.eval_spins,
            seed: self.seed,
            ..SearchConfig::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub reels: ReelSet,
    pub validation: Metrics,
}

impl From<SearchOutcome> for SearchResponse {
    fn from(outcome: SearchOutcome) -> SearchResponse {
        SearchResponse {
            reels: outcome.reels,
            validation: outcome.metrics,
        }
    }
}

pub fn search(req: &SearchRequest) -> SlotResult<SearchResponse> {
    req.validate()?;
    search::search(req.to_config()).map(SearchResponse::from)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveRequest {
    pub seed: Option<u64>,
}

pub fn adaptive(req: &AdaptiveRequest) -> SlotResult<SearchResponse> {
    search::adaptive_search(req.seed).map(SearchResponse::from)
}

// ---------------------------------------------------------------------------
// Spin
// ---------------------------------------------------------------------------

fn unit_bet() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpinRequest {
    pub reels: ReelSet,
    #[serde(default = "unit_bet")]
    pub bet_amount: f64,
}

/// Grid, payout, matches and the stops drawn for display.
pub type SpinResponse = SpinOutcome;

pub fn spin<R: Rng + ?Sized>(req: &SpinRequest, rng: &mut R) -> SlotResult<SpinResponse> {
    machine::spin(&req.reels, req.bet_amount, rng)
}

// ---------------------------------------------------------------------------
// Simulate
// ---------------------------------------------------------------------------

fn default_simulate_spins() -> u64 {
    10_000
}

fn default_seed() -> Option<u64> {
    Some(DEFAULT_SEED)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulateRequest {
    pub reels: ReelSet,
    #[serde(default = "default_simulate_spins")]
    pub spins: u64,
    #[serde(default = "default_seed")]
    pub seed: Option<u64>,
}

/// Same evaluator as `reels simulate`, so a seed gives the same metrics
/// through either entry point.
pub fn simulate(req: &SimulateRequest) -> SlotResult<Metrics> {
    require_positive("spins", req.spins)?;
    let seed = req.seed.unwrap_or_else(|| StdRng::from_entropy().gen());
    simulate_seeded(&req.reels, req.spins, unit_bet(), seed)
}

// ---------------------------------------------------------------------------
// JSON boundary
// ---------------------------------------------------------------------------

/// Deserialize a request body; malformed bodies are the caller's fault.
pub fn parse_request<T: DeserializeOwned>(body: &str) -> SlotResult<T> {
    serde_json::from_str(body).map_err(|e| SlotError::InvalidRequest(e.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequest,
    EngineError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&SlotError> for ErrorBody {
    fn from(err: &SlotError) -> ErrorBody {
        let kind = if err.is_client_error() {
            ErrorKind::InvalidRequest
        } else {
            ErrorKind::EngineError
        };
        ErrorBody {
            kind,
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Search,
    Adaptive,
    Spin,
    Simulate,
}

/// Run one operation on a JSON body and return the JSON response.
pub fn handle_json<R: Rng + ?Sized>(op: Operation, body: &str, rng: &mut R) -> Result<serde_json::Value, ErrorBody> {
    fn run<R: Rng + ?Sized>(op: Operation, body: &str, rng: &mut R) -> SlotResult<serde_json::Value> {
        let value = match op {
            Operation::Search => serde_json::to_value(search(&parse_request(body)?)?)?,
            Operation::Adaptive => serde_json::to_value(adaptive(&parse_request(body)?)?)?,
            Operation::Spin => serde_json::to_value(spin(&parse_request(body)?, rng)?)?,
            Operation::Simulate => serde_json::to_value(simulate(&parse_request(body)?)?)?,
        };
        Ok(value)
    }
    run(op, body, rng).map_err(|e| ErrorBody::from(&e))
}
