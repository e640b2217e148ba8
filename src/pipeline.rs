use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::SkipReason;
use crate::features::{
    GoalFeatures, Role, ServeFeatures, extract_goal_features, extract_serve_features,
};
use crate::ledger::{GoalMatch, Ledger, RacketMatch, Surface};
use crate::name_resolver::{AliasTable, Candidates, LIGA_MX, Resolution, Resolver};
use crate::racket::RacketModel;
use crate::signal::{Signal, decide_goal, decide_racket};
use crate::simulate::{SimulationResult, expected_goals, seeded_rng, simulate};

/// Raw labels for one fixture as scraped from the calendar. For goal sports
/// `a` is the home side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPair {
    pub a: String,
    pub b: String,
}

impl MatchPair {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
        }
    }

    /// One `A,B` pair per line; blank lines and `#` comments are ignored, as are lines
    /// without both sides.
    pub fn parse_lines(text: &str) -> Vec<MatchPair> {
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| {
                let (a, b) = line.split_once(',')?;
                let (a, b) = (a.trim(), b.trim());
                (!a.is_empty() && !b.is_empty()).then(|| MatchPair::new(a, b))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GoalAnalysis {
    pub home: Resolution,
    pub away: Resolution,
    pub home_features: GoalFeatures,
    pub away_features: GoalFeatures,
    pub result: SimulationResult,
    pub signal: Option<Signal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RacketAnalysis {
    pub player_a: Resolution,
    pub player_b: Resolution,
    pub surface: Surface,
    pub serve_a: ServeFeatures,
    pub serve_b: ServeFeatures,
    pub p_win_a: f64,
    pub signal: Option<Signal>,
}

#[derive(Debug, Clone)]
pub struct PairReport<T> {
    pub pair: MatchPair,
    pub outcome: Result<T, SkipReason>,
}

impl<T> PairReport<T> {
    pub fn analysis(&self) -> Option<&T> {
        self.outcome.as_ref().ok()
    }
}

fn resolve_pair(
    pair: &MatchPair,
    candidates: &Candidates,
    resolver: &Resolver,
) -> Result<(Resolution, Resolution), SkipReason> {
    let resolve = |raw: &str| {
        resolver
            .resolve(raw, candidates)
            .ok_or_else(|| SkipReason::Unresolved {
                raw: raw.to_string(),
            })
    };
    let a = resolve(&pair.a)?;
    let b = resolve(&pair.b)?;
    if a.entity == b.entity {
        return Err(SkipReason::SameEntity { entity: a.entity });
    }
    Ok((a, b))
}

pub fn analyze_goal_pair<R: Rng + ?Sized>(
    pair: &MatchPair,
    ledger: &Ledger<GoalMatch>,
    candidates: &Candidates,
    resolver: &Resolver,
    cfg: &PipelineConfig,
    rng: &mut R,
) -> Result<GoalAnalysis, SkipReason> {
    let (home, away) = resolve_pair(pair, candidates, resolver)?;
    let home_features = extract_goal_features(&home.entity, ledger.matches(), Role::Home, cfg)?;
    let away_features = extract_goal_features(&away.entity, ledger.matches(), Role::Away, cfg)?;
    let xg = expected_goals(&home_features, &away_features, cfg);
    let result = simulate(xg, cfg, rng)?;
    let signal = decide_goal(&result, &home_features, &away_features, cfg);
    Ok(GoalAnalysis {
        home,
        away,
        home_features,
        away_features,
        result,
        signal,
    })
}

pub fn analyze_racket_pair<M: RacketModel + ?Sized>(
    pair: &MatchPair,
    surface: Surface,
    ledger: &Ledger<RacketMatch>,
    candidates: &Candidates,
    resolver: &Resolver,
    model: &M,
    cfg: &PipelineConfig,
) -> Result<RacketAnalysis, SkipReason> {
    let (player_a, player_b) = resolve_pair(pair, candidates, resolver)?;
    let serve_a = extract_serve_features(&player_a.entity, ledger.matches(), surface, cfg)?;
    let serve_b = extract_serve_features(&player_b.entity, ledger.matches(), surface, cfg)?;
    let p_win_a = model.win_probability(serve_a.serve_win, serve_b.serve_win);
    if !(0.0..=1.0).contains(&p_win_a) {
        return Err(SkipReason::InvalidProbability { value: p_win_a });
    }
    let signal = decide_racket(p_win_a, cfg);
    Ok(RacketAnalysis {
        player_a,
        player_b,
        surface,
        serve_a,
        serve_b,
        p_win_a,
        signal,
    })
}

/// Per-pair generator: derived from the configured seed and the pair's position, so a
/// seeded batch is reproducible whatever order the pool runs it in.
fn pair_rng(seed: Option<u64>, idx: usize) -> ChaCha8Rng {
    seeded_rng(seed.map(|s| s ^ (idx as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)))
}

pub fn run_goal_batch(
    pairs: &[MatchPair],
    ledger: &Ledger<GoalMatch>,
    cfg: &PipelineConfig,
) -> Vec<PairReport<GoalAnalysis>> {
    if ledger.is_empty() {
        warn!(pairs = pairs.len(), "goal ledger is empty; no signals today");
        return Vec::new();
    }
    let candidates = Candidates::new(ledger.entities());
    let resolver = Resolver::new(LIGA_MX.clone(), cfg);

    let reports: Vec<PairReport<GoalAnalysis>> = pairs
        .par_iter()
        .enumerate()
        .map(|(idx, pair)| {
            let mut rng = pair_rng(cfg.seed, idx);
            let outcome =
                analyze_goal_pair(pair, ledger, &candidates, &resolver, cfg, &mut rng);
            if let Err(reason) = &outcome {
                debug!(home = %pair.a, away = %pair.b, %reason, "pair skipped");
            }
            PairReport {
                pair: pair.clone(),
                outcome,
            }
        })
        .collect();

    log_batch("goal", &reports);
    reports
}

pub fn run_racket_batch<M: RacketModel + Sync>(
    pairs: &[MatchPair],
    surface: Surface,
    ledger: &Ledger<RacketMatch>,
    model: &M,
    cfg: &PipelineConfig,
) -> Vec<PairReport<RacketAnalysis>> {
    if ledger.is_empty() {
        warn!(pairs = pairs.len(), "racket ledger is empty; no signals today");
        return Vec::new();
    }
    let candidates = Candidates::new(ledger.entities());
    // Football nicknames must never rewrite player names.
    let resolver = Resolver::new(AliasTable::default(), cfg);

    let reports: Vec<PairReport<RacketAnalysis>> = pairs
        .par_iter()
        .map(|pair| {
            let outcome =
                analyze_racket_pair(pair, surface, ledger, &candidates, &resolver, model, cfg);
            if let Err(reason) = &outcome {
                debug!(a = %pair.a, b = %pair.b, %reason, "pair skipped");
            }
            PairReport {
                pair: pair.clone(),
                outcome,
            }
        })
        .collect();

    log_batch("racket", &reports);
    reports
}

fn log_batch<T>(sport: &str, reports: &[PairReport<T>]) {
    let analysed = reports.iter().filter(|r| r.outcome.is_ok()).count();
    info!(
        sport,
        pairs = reports.len(),
        analysed,
        skipped = reports.len() - analysed,
        "batch complete"
    );
}
