use colored::Colorize;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};

use crate::machine::{Grid, Match};
use crate::metrics::Metrics;
use crate::patterns::Coord;
use crate::reel::ReelSet;
use crate::search::Targets;
use crate::symbols::SymbolId;

pub fn styled_symbol(id: SymbolId) -> String {
    let s = id.to_string();
    match id {
        0 => s.dimmed().to_string(),
        1 => s.white().to_string(),
        2 => s.green().to_string(),
        3 => s.yellow().bold().to_string(),
        4 => s.magenta().bold().to_string(),
        _ => s.red().to_string(),
    }
}

/// 3x3 grid; cells covered by a winning pattern are underlined.
pub fn grid_display(grid: &Grid, winning: &[Coord]) -> String {
    grid.iter()
        .enumerate()
        .map(|(r, row)| {
            let cells: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(c, &id)| {
                    if winning.contains(&(r, c)) {
                        styled_symbol(id).underline().bold().to_string()
                    } else {
                        styled_symbol(id)
                    }
                })
                .collect();
            format!("  [ {} ]", cells.join("  "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn reels_table(reels: &ReelSet) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Reel".bold().to_string()),
        Cell::new("Len").set_alignment(CellAlignment::Right),
        Cell::new("Longest run").set_alignment(CellAlignment::Right),
        Cell::new("Symbols"),
    ]);
    for (i, reel) in reels.reels().iter().enumerate() {
        let strip: Vec<String> = reel.symbols().iter().map(|&s| styled_symbol(s)).collect();
        table.add_row(vec![
            Cell::new(format!("reel_{}", i + 1)),
            Cell::new(reel.len()).set_alignment(CellAlignment::Right),
            Cell::new(reel.longest_run()).set_alignment(CellAlignment::Right),
            Cell::new(strip.join(" ")),
        ]);
    }
    table.to_string()
}

pub fn rtp_bar(rtp: f64, target: f64, width: usize) -> String {
    let filled = ((rtp / (target * 2.0)).clamp(0.0, 1.0) * width as f64) as usize;
    let bar: String = "\u{2588}".repeat(filled) + &"\u{2591}".repeat(width - filled);
    let label = format!("{:.4}", rtp);
    let off = (rtp - target).abs();
    if off < 0.01 {
        format!("{} {}", bar.green(), label)
    } else if off < 0.05 {
        format!("{} {}", bar.yellow(), label)
    } else {
        format!("{} {}", bar.red(), label)
    }
}

fn verdict(ok: bool) -> String {
    if ok {
        "PASS".green().bold().to_string()
    } else {
        "MISS".red().bold().to_string()
    }
}

pub fn metrics_table(metrics: &Metrics, targets: Option<&Targets>) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Metric".bold().to_string()),
        Cell::new("Value").set_alignment(CellAlignment::Right),
        Cell::new("Target"),
    ]);

    let (rtp_target, win_target) = match targets {
        Some(t) => (
            format!(
                "{} \u{00b1} {} {}",
                t.rtp,
                t.rtp_tolerance,
                verdict((metrics.rtp - t.rtp).abs() < t.rtp_tolerance)
            ),
            format!(">= {:.1}% {}", t.min_win_rate * 100.0, verdict(metrics.win_rate >= t.min_win_rate)),
        ),
        None => (String::new(), String::new()),
    };

    table.add_row(vec![Cell::new("Spins"), Cell::new(metrics.spins).set_alignment(CellAlignment::Right), Cell::new("")]);
    table.add_row(vec![
        Cell::new("RTP"),
        Cell::new(format!("{:.6}", metrics.rtp)).set_alignment(CellAlignment::Right),
        Cell::new(rtp_target),
    ]);
    table.add_row(vec![
        Cell::new("Win rate"),
        Cell::new(format!("{:.4}%", metrics.win_rate * 100.0)).set_alignment(CellAlignment::Right),
        Cell::new(win_target),
    ]);
    table.add_row(vec![
        Cell::new("Return / spin"),
        Cell::new(format!("{:.4}", metrics.return_per_spin())).set_alignment(CellAlignment::Right),
        Cell::new(""),
    ]);
    table.add_row(vec![
        Cell::new("Total bet"),
        Cell::new(format!("{:.2}", metrics.total_bet)).set_alignment(CellAlignment::Right),
        Cell::new(""),
    ]);
    table.add_row(vec![
        Cell::new("Total return"),
        Cell::new(format!("{:.2}", metrics.total_return)).set_alignment(CellAlignment::Right),
        Cell::new(""),
    ]);

    table.to_string()
}

pub fn matches_table(matches: &[Match]) -> String {
    if matches.is_empty() {
        return format!("  {}", "No winning patterns".dimmed());
    }
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Pattern".bold().to_string()),
        Cell::new("Symbol"),
        Cell::new("Mult").set_alignment(CellAlignment::Right),
        Cell::new("Weight").set_alignment(CellAlignment::Right),
        Cell::new("Payout").set_alignment(CellAlignment::Right),
    ]);
    for m in matches {
        table.add_row(vec![
            Cell::new(m.pattern),
            Cell::new(styled_symbol(m.symbol)),
            Cell::new(format!("{:.2}", m.multiplier)).set_alignment(CellAlignment::Right),
            Cell::new(m.weight).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.2}", m.payout).green().to_string()).set_alignment(CellAlignment::Right),
        ]);
    }
    table.to_string()
}

pub fn print_section(title: &str, content: &str) {
    println!("\n{}", title.cyan().bold());
    println!("{}", content);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "Error:".red().bold(), msg);
}

pub fn print_warning(msg: &str) {
    eprintln!("{} {}", "Warning:".yellow().bold(), msg);
}

pub fn print_success(msg: &str) {
    println!("{}", msg.green().bold());
}
