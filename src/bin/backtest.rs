use anyhow::{Context, Result, anyhow};

use matchday_edge::calibration::{self, Outcome};
use matchday_edge::config::PipelineConfig;
use matchday_edge::ledger::load_goal_ledger;
use matchday_edge::logging::init_logging;

const DEFAULT_MIN_HISTORY: usize = 30;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    init_logging("warn");

    let source = std::env::args()
        .nth(1)
        .filter(|s| !s.starts_with("--"))
        .or_else(|| std::env::var("EDGE_LEDGER").ok())
        .ok_or_else(|| anyhow!("usage: backtest <ledger path or url> [--min-history N]"))?;
    let min_history = parse_usize_arg("--min-history").unwrap_or(DEFAULT_MIN_HISTORY);

    let cfg = PipelineConfig::from_env()?;
    let ledger = load_goal_ledger(&source).with_context(|| format!("load ledger {source}"))?;
    let bt = calibration::walk_forward(&ledger, &cfg, min_history);
    let metrics = calibration::evaluate_probs(&bt.predictions, &bt.outcomes);

    println!("Ledger: {source} ({} matches)", ledger.len());
    println!(
        "Scored: {} | skipped: {} (min history {min_history})",
        metrics.samples, bt.skipped
    );
    println!("Brier: {:.4}", metrics.brier);
    println!("Log loss: {:.4}", metrics.log_loss);
    println!("Accuracy: {:.1}%", metrics.accuracy * 100.0);

    for (label, class) in [
        ("home", Outcome::Home),
        ("draw", Outcome::Draw),
        ("away", Outcome::Away),
    ] {
        println!("\nReliability ({label}):");
        for bin in calibration::calibration_bins(&bt.predictions, &bt.outcomes, class, 10) {
            if bin.count == 0 {
                continue;
            }
            println!(
                "  {:.1}-{:.1}  n={:<5} pred={:.3} actual={:.3}",
                bin.bucket_start, bin.bucket_end, bin.count, bin.avg_pred, bin.actual_rate
            );
        }
    }
    Ok(())
}

fn parse_usize_arg(name: &str) -> Option<usize> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&format!("{name}="))
            && let Ok(v) = raw.trim().parse::<usize>()
        {
            return Some(v);
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && let Ok(v) = next.trim().parse::<usize>()
        {
            return Some(v);
        }
    }
    None
}
