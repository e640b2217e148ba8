use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// What a feature does when its window has fewer qualifying matches than it needs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsufficientDataPolicy {
    /// Substitute a fixed prior and carry on.
    Neutral(f64),
    /// Drop the match pair.
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStrategy {
    ClosedForm,
    MonteCarlo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub alias_cutoff: f64,
    pub direct_cutoff: f64,

    pub form_window: usize,
    pub luck_window: usize,
    pub volatility_window: usize,
    pub rate_floor: f64,
    pub goal_rates_on_insufficient: InsufficientDataPolicy,

    pub serve_window: usize,
    pub serve_min_matches: usize,
    pub serve_on_insufficient: InsufficientDataPolicy,

    pub home_advantage: f64,
    pub max_goals: u32,
    pub samples: usize,
    pub totals_line: f64,
    pub strategy: GoalStrategy,
    pub seed: Option<u64>,

    pub home_pick_pct: f64,
    pub away_pick_pct: f64,
    pub over_pick_pct: f64,
    pub luck_floor: f64,
    pub racket_pick_pct: f64,
    pub risk_medium: f64,
    pub risk_high: f64,
    pub stake_normal_pct: f64,
    pub stake_strong_pct: f64,
    pub stake_max_pct: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            alias_cutoff: 0.6,
            direct_cutoff: 0.4,
            form_window: 5,
            luck_window: 10,
            volatility_window: 10,
            rate_floor: 0.1,
            goal_rates_on_insufficient: InsufficientDataPolicy::Neutral(1.0),
            serve_window: 8,
            serve_min_matches: 5,
            serve_on_insufficient: InsufficientDataPolicy::Skip,
            home_advantage: 1.20,
            max_goals: 5,
            samples: 10_000,
            totals_line: 2.5,
            strategy: GoalStrategy::MonteCarlo,
            seed: None,
            home_pick_pct: 55.0,
            away_pick_pct: 50.0,
            over_pick_pct: 60.0,
            luck_floor: 0.45,
            racket_pick_pct: 60.0,
            risk_medium: 1.2,
            risk_high: 1.5,
            stake_normal_pct: 55.0,
            stake_strong_pct: 65.0,
            stake_max_pct: 75.0,
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let cfg: PipelineConfig = serde_json::from_str(&raw)
            .with_context(|| format!("parse config {}", path.display()))?;
        Ok(cfg.validate())
    }

    /// Defaults, then `EDGE_CONFIG` (a JSON file), then single-value env overrides.
    pub fn from_env() -> Result<Self> {
        let mut cfg = match std::env::var("EDGE_CONFIG") {
            Ok(path) if !path.trim().is_empty() => Self::load(Path::new(path.trim()))?,
            _ => Self::default(),
        };
        if let Some(seed) = env_parse::<u64>("EDGE_SEED") {
            cfg.seed = Some(seed);
        }
        if let Some(samples) = env_parse::<usize>("EDGE_SAMPLES") {
            cfg.samples = samples;
        }
        if let Some(adv) = env_parse::<f64>("EDGE_HOME_ADVANTAGE") {
            cfg.home_advantage = adv;
        }
        Ok(cfg.validate())
    }

    /// Clamp values that would make the downstream math degenerate.
    pub fn validate(mut self) -> Self {
        self.alias_cutoff = self.alias_cutoff.clamp(0.0, 1.0);
        self.direct_cutoff = self.direct_cutoff.clamp(0.0, 1.0);
        self.form_window = self.form_window.max(1);
        self.luck_window = self.luck_window.max(1);
        self.volatility_window = self.volatility_window.max(1);
        if !(self.rate_floor > 0.0) {
            self.rate_floor = 0.1;
        }
        if let InsufficientDataPolicy::Neutral(v) = self.goal_rates_on_insufficient {
            self.goal_rates_on_insufficient = InsufficientDataPolicy::Neutral(v.max(self.rate_floor));
        }
        if let InsufficientDataPolicy::Neutral(v) = self.serve_on_insufficient {
            self.serve_on_insufficient = InsufficientDataPolicy::Neutral(v.clamp(0.01, 0.99));
        }
        self.serve_min_matches = self.serve_min_matches.max(1);
        self.serve_window = self.serve_window.max(self.serve_min_matches);
        if !self.home_advantage.is_finite() || self.home_advantage <= 0.0 {
            self.home_advantage = 1.20;
        }
        self.max_goals = self.max_goals.clamp(1, 20);
        self.samples = self.samples.max(1_000);
        self.totals_line = self.totals_line.max(0.0);
        self.risk_high = self.risk_high.max(self.risk_medium);
        self
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key)
        .ok()
        .and_then(|val| val.trim().parse::<T>().ok())
}
