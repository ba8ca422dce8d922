use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::api::{self, Operation};
use crate::artifact::{ReelArtifact, DEFAULT_ARTIFACT_PATH};
use crate::display::{
    grid_display, matches_table, metrics_table, print_error, print_section, print_success,
    print_warning, reels_table, rtp_bar,
};
use crate::error::{SlotError, SlotResult};
use crate::exact::evaluate_exact;
use crate::machine;
use crate::metrics::Metrics;
use crate::reel::{parse_reel, ReelSet};
use crate::search::{self, SearchConfig, SearchOutcome, Targets};
use crate::simulator::simulate_seeded;

/// Growth of the step budget on each retry of `search`.
const RETRY_STEP_GROWTH: f64 = 1.5;

#[derive(Parser)]
#[command(name = "reels", version = "1.0.0", about = "Slot reel tuner: search, validate and spin 3x3 reel configurations.")]
struct Cli {
    /// Print raw JSON instead of tables
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

/// Where a command gets its reels from.
#[derive(Args)]
struct ReelSource {
    /// Reel configuration file written by `search`
    #[arg(short, long, default_value = DEFAULT_ARTIFACT_PATH)]
    reels: PathBuf,
    /// Inline reel 1, e.g. "0,0,1,2,2" (needs all three reels)
    #[arg(long = "reel-1", requires_all = ["reel_2", "reel_3"])]
    reel_1: Option<String>,
    /// Inline reel 2
    #[arg(long = "reel-2", requires_all = ["reel_1", "reel_3"])]
    reel_2: Option<String>,
    /// Inline reel 3
    #[arg(long = "reel-3", requires_all = ["reel_1", "reel_2"])]
    reel_3: Option<String>,
}

impl ReelSource {
    fn load(&self) -> SlotResult<ReelSet> {
        match (&self.reel_1, &self.reel_2, &self.reel_3) {
            (Some(a), Some(b), Some(c)) => Ok(ReelSet::new([parse_reel(a)?, parse_reel(b)?, parse_reel(c)?])),
            _ => Ok(ReelArtifact::load(&self.reels)?.reels),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum RequestOp {
    Search,
    Adaptive,
    Spin,
    Simulate,
}

impl From<RequestOp> for Operation {
    fn from(op: RequestOp) -> Operation {
        match op {
            RequestOp::Search => Operation::Search,
            RequestOp::Adaptive => Operation::Adaptive,
            RequestOp::Spin => Operation::Spin,
            RequestOp::Simulate => Operation::Simulate,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Search for reels near the target RTP and win rate, then save them
    Search {
        /// Annealing steps for the first attempt
        #[arg(long)]
        steps: Option<usize>,
        /// Monte Carlo spins per candidate evaluation
        #[arg(long)]
        eval_spins: Option<u64>,
        /// Validation spins (reported only; validation is exact)
        #[arg(long, default_value_t = 100_000)]
        spins: u64,
        /// Random seed
        #[arg(long)]
        seed: Option<u64>,
        /// Further attempts when the targets are missed
        #[arg(long, default_value_t = 8)]
        retries: usize,
        /// JSON file overlaying the default search configuration
        #[arg(long)]
        config: Option<PathBuf>,
        /// Output file
        #[arg(short, long, default_value = DEFAULT_ARTIFACT_PATH)]
        out: PathBuf,
    },
    /// Run the escalating search schedule until the targets are met
    Auto {
        /// Offset added to every scheduled seed
        #[arg(long)]
        seed: Option<u64>,
        /// Output file
        #[arg(short, long, default_value = DEFAULT_ARTIFACT_PATH)]
        out: PathBuf,
    },
    /// Spin a reel configuration once
    Spin {
        #[command(flatten)]
        source: ReelSource,
        /// Stake for the spin
        #[arg(short, long, default_value_t = 1.0)]
        bet: f64,
        /// Seed for a reproducible spin
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Estimate RTP and win rate by Monte Carlo
    Simulate {
        #[command(flatten)]
        source: ReelSource,
        /// Number of spins
        #[arg(short = 'n', long, default_value_t = 10_000)]
        spins: u64,
        /// Random seed
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Exact RTP and win rate over every stop combination
    Exact {
        #[command(flatten)]
        source: ReelSource,
    },
    /// Run an operation on a JSON request body ("-" reads stdin)
    Request {
        op: RequestOp,
        #[arg(default_value = "{}")]
        body: String,
    },
}

pub fn run() {
    let code = dispatch(Cli::parse());
    if code != 0 {
        std::process::exit(code);
    }
}

/// Parse `args` (program name first) and run; returns the exit code.
pub fn run_with_args(args: Vec<String>) -> i32 {
    dispatch(Cli::parse_from(args))
}

fn dispatch(cli: Cli) -> i32 {
    let json = cli.json;
    match cli.command {
        Commands::Search {
            steps,
            eval_spins,
            spins,
            seed,
            retries,
            config,
            out,
        } => cmd_search(SearchArgs { steps, eval_spins, spins, seed, retries, config, out }, json),
        Commands::Auto { seed, out } => cmd_auto(seed, &out, json),
        Commands::Spin { source, bet, seed } => cmd_spin(&source, bet, seed, json),
        Commands::Simulate { source, spins, seed } => cmd_simulate(&source, spins, seed, json),
        Commands::Exact { source } => cmd_exact(&source, json),
        Commands::Request { op, body } => cmd_request(op, body),
    }
}

fn print_json<T: Serialize>(value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(s) => {
            println!("{}", s);
            0
        }
        Err(e) => {
            print_error(&e.to_string());
            1
        }
    }
}

// ---------------------------------------------------------------------------
// search / auto
// ---------------------------------------------------------------------------

struct SearchArgs {
    steps: Option<usize>,
    eval_spins: Option<u64>,
    spins: u64,
    seed: Option<u64>,
    retries: usize,
    config: Option<PathBuf>,
    out: PathBuf,
}

fn load_search_config(path: Option<&Path>) -> SlotResult<SearchConfig> {
    match path {
        Some(p) => {
            let json = std::fs::read_to_string(p)?;
            api::parse_request(&json)
        }
        None => Ok(SearchConfig::default()),
    }
}

fn cmd_search(args: SearchArgs, json: bool) -> i32 {
    if args.spins == 0 {
        print_error("--spins must be positive");
        return 1;
    }
    let mut base = match load_search_config(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            print_error(&e.to_string());
            return 1;
        }
    };
    if let Some(steps) = args.steps {
        base.steps = steps;
    }
    if let Some(eval_spins) = args.eval_spins {
        base.eval_spins = eval_spins;
    }
    if args.seed.is_some() {
        base.seed = args.seed;
    }
    let targets = base.targets();

    if !json {
        println!();
        println!(
            "  {} steps={} eval_spins={} seed={}",
            "Searching".bold(),
            base.steps,
            base.eval_spins,
            base.seed.map_or("entropy".to_string(), |s| s.to_string()),
        );
    }

    let mut cfg = base.clone();
    let mut outcome = match search::search(cfg.clone()) {
        Ok(o) => o,
        Err(e) => {
            print_error(&e.to_string());
            return 1;
        }
    };

    let mut attempt = 0;
    while !outcome.meets_targets && attempt < args.retries {
        attempt += 1;
        cfg.steps = (cfg.steps as f64 * RETRY_STEP_GROWTH) as usize;
        cfg.seed = base.seed.map(|s| s.wrapping_add(attempt as u64));
        log::info!("retry {}/{} with {} steps", attempt, args.retries, cfg.steps);
        if !json {
            println!(
                "  {} attempt {}/{}: {} steps",
                "Retrying".yellow(),
                attempt,
                args.retries,
                cfg.steps
            );
        }
        outcome = match search::search(cfg.clone()) {
            Ok(o) => o,
            Err(e) => {
                print_error(&e.to_string());
                return 1;
            }
        };
    }

    finish_search(&outcome, &targets, &args.out, json)
}

fn cmd_auto(seed: Option<u64>, out: &Path, json: bool) -> i32 {
    if !json {
        println!();
        println!("  {} {} scheduled runs", "Adaptive search:".bold(), search::DEFAULT_SCHEDULE.len());
    }
    match search::adaptive_search(seed) {
        Ok(outcome) => finish_search(&outcome, &Targets::default(), out, json),
        Err(e) => {
            print_error(&e.to_string());
            1
        }
    }
}

/// Save the artifact, report, and turn a missed target into exit code 1.
fn finish_search(outcome: &SearchOutcome, targets: &Targets, out: &Path, json: bool) -> i32 {
    let artifact = ReelArtifact::from_outcome(outcome, targets);
    if let Err(e) = artifact.save(out) {
        print_error(&format!("could not write {}: {}", out.display(), e));
        return 1;
    }

    if json {
        if print_json(&artifact) != 0 {
            return 1;
        }
    } else {
        print_section("Reels", &reels_table(&outcome.reels));
        print_section("Exact validation", &metrics_table(&outcome.metrics, Some(targets)));
        if let Some(est) = &outcome.estimate {
            println!("\n  Search estimate: {}", est);
        }
        println!(
            "  RTP      {}",
            rtp_bar(outcome.metrics.rtp, targets.rtp, 30)
        );
        println!(
            "  {} iterations, final phase: {}, rejected sampled hits: {}",
            outcome.iterations, outcome.phase, outcome.rejected_hits
        );
        println!("\n  Saved to {}", out.display().to_string().bold());
    }

    if outcome.meets_targets {
        if !json {
            print_success("  Targets met.");
        }
        0
    } else {
        print_warning("targets not met within tolerance; consider more steps or eval spins");
        1
    }
}

// ---------------------------------------------------------------------------
// spin / simulate / exact
// ---------------------------------------------------------------------------

fn cmd_spin(source: &ReelSource, bet: f64, seed: Option<u64>, json: bool) -> i32 {
    let reels = match source.load() {
        Ok(r) => r,
        Err(e) => {
            print_error(&e.to_string());
            return 1;
        }
    };
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    let outcome = match machine::spin(&reels, bet, &mut rng) {
        Ok(o) => o,
        Err(e) => {
            print_error(&e.to_string());
            return 1;
        }
    };
    if json {
        return print_json(&outcome);
    }

    let winning: Vec<_> = outcome.matches.iter().flat_map(|m| m.coords.iter().copied()).collect();
    println!();
    println!(
        "  Stops {:?}   Bet {:.2}",
        outcome.stops, bet
    );
    println!();
    println!("{}", grid_display(&outcome.grid, &winning));
    print_section("Matches", &matches_table(&outcome.matches));
    let payout = format!("{:.2}", outcome.payout);
    if outcome.is_win() {
        println!("\n  Payout: {}", payout.green().bold());
    } else {
        println!("\n  Payout: {}", payout.dimmed());
    }
    0
}

fn cmd_simulate(source: &ReelSource, spins: u64, seed: u64, json: bool) -> i32 {
    let result = source
        .load()
        .and_then(|reels| simulate_seeded(&reels, spins, 1.0, seed));
    report_metrics("Monte Carlo", result, json)
}

fn cmd_exact(source: &ReelSource, json: bool) -> i32 {
    let result = source.load().and_then(|reels| evaluate_exact(&reels, 1.0));
    report_metrics("Exact", result, json)
}

fn report_metrics(title: &str, result: SlotResult<Metrics>, json: bool) -> i32 {
    match result {
        Ok(metrics) if json => print_json(&metrics),
        Ok(metrics) => {
            let targets = Targets::default();
            print_section(title, &metrics_table(&metrics, Some(&targets)));
            println!("  RTP      {}", rtp_bar(metrics.rtp, targets.rtp, 30));
            0
        }
        Err(e) => {
            print_error(&e.to_string());
            1
        }
    }
}

// ---------------------------------------------------------------------------
// request
// ---------------------------------------------------------------------------

fn read_body(body: String) -> SlotResult<String> {
    if body != "-" {
        return Ok(body);
    }
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf).map_err(SlotError::from)?;
    Ok(buf)
}

fn cmd_request(op: RequestOp, body: String) -> i32 {
    let body = match read_body(body) {
        Ok(b) => b,
        Err(e) => {
            print_error(&e.to_string());
            return 1;
        }
    };
    let mut rng = StdRng::from_entropy();
    match api::handle_json(op.into(), &body, &mut rng) {
        Ok(value) => print_json(&value),
        Err(err) => {
            print_json(&err);
            match err.kind {
                api::ErrorKind::InvalidRequest => 2,
                api::ErrorKind::EngineError => 1,
            }
        }
    }
}
