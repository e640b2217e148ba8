use std::fmt;

use serde::Serialize;

use crate::config::PipelineConfig;
use crate::features::GoalFeatures;
use crate::simulate::SimulationResult;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Pick {
    Home,
    Away,
    Over { line: f64 },
    PlayerA,
    PlayerB,
}

impl fmt::Display for Pick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pick::Home => write!(f, "HOME"),
            Pick::Away => write!(f, "AWAY"),
            Pick::Over { line } => write!(f, "OVER {line}"),
            Pick::PlayerA => write!(f, "PLAYER A"),
            Pick::PlayerB => write!(f, "PLAYER B"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskTier::Low => "low risk",
            RiskTier::Medium => "medium risk",
            RiskTier::High => "high risk",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum StakeTier {
    Minimal,
    Normal,
    Strong,
    Max,
}

impl fmt::Display for StakeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StakeTier::Minimal => "minimal",
            StakeTier::Normal => "normal",
            StakeTier::Strong => "strong",
            StakeTier::Max => "max",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Signal {
    pub pick: Pick,
    /// Modeled probability of the pick, in percent.
    pub win_pct: f64,
    /// Break-even decimal price; only a market price above this has positive EV.
    pub fair_price: f64,
    pub stake: StakeTier,
    /// Informational only, never gates the pick. `None` where no volatility feature exists.
    pub risk: Option<RiskTier>,
}

pub fn fair_price(win_pct: f64) -> Option<f64> {
    (win_pct.is_finite() && win_pct > 0.0).then(|| 100.0 / win_pct)
}

pub fn stake_tier(win_pct: f64, cfg: &PipelineConfig) -> StakeTier {
    if win_pct >= cfg.stake_max_pct {
        StakeTier::Max
    } else if win_pct >= cfg.stake_strong_pct {
        StakeTier::Strong
    } else if win_pct >= cfg.stake_normal_pct {
        StakeTier::Normal
    } else {
        StakeTier::Minimal
    }
}

pub fn classify_risk(combined_volatility: f64, cfg: &PipelineConfig) -> RiskTier {
    if combined_volatility > cfg.risk_high {
        RiskTier::High
    } else if combined_volatility >= cfg.risk_medium {
        RiskTier::Medium
    } else {
        RiskTier::Low
    }
}

/// Mean of the two sides' goal-scoring volatility.
pub fn combined_volatility(a: &GoalFeatures, b: &GoalFeatures) -> f64 {
    (a.volatility + b.volatility) / 2.0
}

fn make_signal(
    pick: Pick,
    win_pct: f64,
    risk: Option<RiskTier>,
    cfg: &PipelineConfig,
) -> Option<Signal> {
    Some(Signal {
        pick,
        win_pct,
        fair_price: fair_price(win_pct)?,
        stake: stake_tier(win_pct, cfg),
        risk,
    })
}

/// First matching rule wins: corroborated home pick, corroborated away pick, totals over,
/// otherwise too close to call.
pub fn decide_goal(
    result: &SimulationResult,
    home: &GoalFeatures,
    away: &GoalFeatures,
    cfg: &PipelineConfig,
) -> Option<Signal> {
    let p_home = result.p_home * 100.0;
    let p_away = result.p_away * 100.0;
    let p_over = result.p_over * 100.0;
    let risk = Some(classify_risk(combined_volatility(home, away), cfg));

    if p_home > cfg.home_pick_pct && home.luck_ratio > cfg.luck_floor {
        make_signal(Pick::Home, p_home, risk, cfg)
    } else if p_away > cfg.away_pick_pct && away.luck_ratio > cfg.luck_floor {
        make_signal(Pick::Away, p_away, risk, cfg)
    } else if p_over > cfg.over_pick_pct {
        make_signal(
            Pick::Over {
                line: cfg.totals_line,
            },
            p_over,
            risk,
            cfg,
        )
    } else {
        None
    }
}

pub fn decide_racket(p_win_a: f64, cfg: &PipelineConfig) -> Option<Signal> {
    let pct = p_win_a * 100.0;
    if pct > cfg.racket_pick_pct {
        make_signal(Pick::PlayerA, pct, None, cfg)
    } else if pct < 100.0 - cfg.racket_pick_pct {
        make_signal(Pick::PlayerB, 100.0 - pct, None, cfg)
    } else {
        None
    }
}
