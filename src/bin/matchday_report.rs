use std::fs;
use std::path::PathBuf;
use std::thread;

use anyhow::{Context, Result, anyhow};
use chrono::{Local, NaiveTime, TimeDelta};
use tracing::{error, info, warn};

use matchday_edge::config::PipelineConfig;
use matchday_edge::ledger::{Surface, load_goal_ledger, load_racket_ledger};
use matchday_edge::logging::init_logging;
use matchday_edge::notify::TelegramNotifier;
use matchday_edge::pipeline::{MatchPair, run_goal_batch, run_racket_batch};
use matchday_edge::racket::CoinFlipTiebreak;
use matchday_edge::report::{render_goal_report, render_racket_report};

const DEFAULT_GOAL_LEDGER: &str = "https://www.football-data.co.uk/new/MEX.csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sport {
    Football,
    Tennis,
}

#[derive(Debug)]
struct Args {
    sport: Sport,
    surface: Surface,
    ledger: Option<String>,
    fixtures: PathBuf,
    daily_at: Option<NaiveTime>,
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    init_logging("info");

    let cfg = PipelineConfig::from_env()?;
    let args = parse_args()?;
    let notifier = TelegramNotifier::from_env();
    if notifier.is_none() {
        info!("telegram not configured; printing only");
    }

    let Some(at) = args.daily_at else {
        return run_once(&args, &cfg, notifier.as_ref());
    };

    loop {
        let wait = until_next(at);
        info!(at = %at.format("%H:%M"), wait_secs = wait.as_secs(), "waiting for next run");
        thread::sleep(wait);
        if let Err(err) = run_once(&args, &cfg, notifier.as_ref()) {
            error!(error = %format!("{err:#}"), "daily run failed");
        }
    }
}

fn run_once(args: &Args, cfg: &PipelineConfig, notifier: Option<&TelegramNotifier>) -> Result<()> {
    let raw = fs::read_to_string(&args.fixtures)
        .with_context(|| format!("read fixtures {}", args.fixtures.display()))?;
    let pairs = MatchPair::parse_lines(&raw);
    if pairs.is_empty() {
        warn!(path = %args.fixtures.display(), "no fixtures today");
        return Ok(());
    }

    let title = format!("Matchday picks {}", Local::now().format("%d/%m/%Y"));
    let text = match args.sport {
        Sport::Football => {
            let source = args.ledger.as_deref().unwrap_or(DEFAULT_GOAL_LEDGER);
            let ledger = load_goal_ledger(source)
                .with_context(|| format!("load goal ledger {source}"))?;
            render_goal_report(&title, &run_goal_batch(&pairs, &ledger, cfg))
        }
        Sport::Tennis => {
            let source = args
                .ledger
                .as_deref()
                .ok_or_else(|| anyhow!("--ledger is required for tennis"))?;
            let ledger = load_racket_ledger(source)
                .with_context(|| format!("load racket ledger {source}"))?;
            let reports = run_racket_batch(&pairs, args.surface, &ledger, &CoinFlipTiebreak, cfg);
            render_racket_report(&title, &reports)
        }
    };

    let Some(text) = text else {
        warn!(pairs = pairs.len(), "no pair could be analysed");
        return Ok(());
    };
    println!("{text}");
    if let Some(notifier) = notifier {
        notifier.send(&text).context("send report")?;
        info!("report sent");
    }
    Ok(())
}

/// Time left until the next local wall-clock `at`, tomorrow if it has already passed today.
fn until_next(at: NaiveTime) -> std::time::Duration {
    let now = Local::now().naive_local();
    let mut next = now.date().and_time(at);
    if next <= now {
        next += TimeDelta::days(1);
    }
    (next - now).to_std().unwrap_or_default()
}

fn parse_args() -> Result<Args> {
    let sport = match arg_value("--sport").as_deref() {
        None | Some("football") => Sport::Football,
        Some("tennis") => Sport::Tennis,
        Some(other) => return Err(anyhow!("unknown sport {other:?}")),
    };
    let surface = match arg_value("--surface") {
        Some(raw) => Surface::parse(&raw).ok_or_else(|| anyhow!("unknown surface {raw:?}"))?,
        None => Surface::Hard,
    };
    let fixtures = arg_value("--fixtures")
        .or_else(|| std::env::var("EDGE_FIXTURES").ok())
        .map(PathBuf::from)
        .context("--fixtures <file> is required")?;
    let daily_at = arg_value("--daily-at")
        .map(|raw| {
            NaiveTime::parse_from_str(raw.trim(), "%H:%M")
                .with_context(|| format!("--daily-at expects HH:MM, got {raw:?}"))
        })
        .transpose()?;

    Ok(Args {
        sport,
        surface,
        ledger: arg_value("--ledger").or_else(|| std::env::var("EDGE_LEDGER").ok()),
        fixtures,
        daily_at,
    })
}

fn arg_value(name: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&format!("{name}="))
            && !raw.trim().is_empty()
        {
            return Some(raw.trim().to_string());
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}
