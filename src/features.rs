use serde::Serialize;

use crate::config::{InsufficientDataPolicy, PipelineConfig};
use crate::error::SkipReason;
use crate::ledger::{GoalMatch, RacketMatch, ServeStats, Surface};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Role {
    Home,
    Away,
}

impl Role {
    fn label(self) -> &'static str {
        match self {
            Role::Home => "home",
            Role::Away => "away",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GoalFeatures {
    /// Recency-weighted goals scored in this role.
    pub attack_rate: f64,
    /// Recency-weighted goals conceded in this role.
    pub defense_rate: f64,
    /// Pythagorean expectation GF² / (GF² + GA²).
    pub luck_ratio: f64,
    /// Population standard deviation of goals scored.
    pub volatility: f64,
    /// Matches that fed the attack/defense rates (0 when a prior was used).
    pub form_matches: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ServeFeatures {
    /// Pooled serve points won / serve points played.
    pub serve_win: f64,
    pub matches: usize,
}

/// Goals (for, against) from `entity`'s point of view, if it played in `m`.
fn goals_for_against(entity: &str, m: &GoalMatch) -> Option<(u32, u32)> {
    if m.home == entity {
        Some((m.home_goals, m.away_goals))
    } else if m.away == entity {
        Some((m.away_goals, m.home_goals))
    } else {
        None
    }
}

/// `history` is most recent first, as held by [`crate::ledger::Ledger`].
pub fn extract_goal_features(
    entity: &str,
    history: &[GoalMatch],
    role: Role,
    cfg: &PipelineConfig,
) -> Result<GoalFeatures, SkipReason> {
    let form: Vec<(u32, u32)> = history
        .iter()
        .filter_map(|m| match role {
            Role::Home if m.home == entity => Some((m.home_goals, m.away_goals)),
            Role::Away if m.away == entity => Some((m.away_goals, m.home_goals)),
            _ => None,
        })
        .take(cfg.form_window)
        .collect();

    let (attack_rate, defense_rate) = if form.is_empty() {
        match cfg.goal_rates_on_insufficient {
            InsufficientDataPolicy::Neutral(prior) => (prior, prior),
            InsufficientDataPolicy::Skip => {
                return Err(SkipReason::InsufficientData {
                    entity: entity.to_string(),
                    context: format!("{} form", role.label()),
                    have: 0,
                    need: 1,
                });
            }
        }
    } else {
        let (scored, conceded) = recency_weighted(&form);
        (scored.max(cfg.rate_floor), conceded.max(cfg.rate_floor))
    };

    let recent: Vec<(u32, u32)> = history
        .iter()
        .filter_map(|m| goals_for_against(entity, m))
        .take(cfg.luck_window.max(cfg.volatility_window))
        .collect();
    let luck_slice = &recent[..recent.len().min(cfg.luck_window)];
    let vol_slice = &recent[..recent.len().min(cfg.volatility_window)];

    Ok(GoalFeatures {
        attack_rate,
        defense_rate,
        luck_ratio: luck_ratio(luck_slice),
        volatility: volatility(vol_slice),
        form_matches: form.len(),
    })
}

/// Weighted means with the most recent match weighted `n`, the oldest `1`.
fn recency_weighted(rows: &[(u32, u32)]) -> (f64, f64) {
    let n = rows.len();
    let mut w_sum = 0.0;
    let mut scored = 0.0;
    let mut conceded = 0.0;
    for (i, (gf, ga)) in rows.iter().enumerate() {
        let w = (n - i) as f64;
        w_sum += w;
        scored += w * f64::from(*gf);
        conceded += w * f64::from(*ga);
    }
    if w_sum <= 0.0 {
        return (0.0, 0.0);
    }
    (scored / w_sum, conceded / w_sum)
}

pub fn luck_ratio(rows: &[(u32, u32)]) -> f64 {
    let gf: f64 = rows.iter().map(|(f, _)| f64::from(*f)).sum();
    let ga: f64 = rows.iter().map(|(_, a)| f64::from(*a)).sum();
    if gf + ga == 0.0 {
        return 0.5;
    }
    gf.powi(2) / (gf.powi(2) + ga.powi(2))
}

pub fn volatility(rows: &[(u32, u32)]) -> f64 {
    if rows.len() < 2 {
        return 0.0;
    }
    let n = rows.len() as f64;
    let mean = rows.iter().map(|(f, _)| f64::from(*f)).sum::<f64>() / n;
    let var = rows
        .iter()
        .map(|(f, _)| (f64::from(*f) - mean).powi(2))
        .sum::<f64>()
        / n;
    var.sqrt()
}

pub fn extract_serve_features(
    player: &str,
    history: &[RacketMatch],
    surface: Surface,
    cfg: &PipelineConfig,
) -> Result<ServeFeatures, SkipReason> {
    let rows: Vec<ServeStats> = history
        .iter()
        .filter(|m| m.surface == surface)
        .filter_map(|m| {
            if m.winner == player {
                Some(m.winner_serve)
            } else if m.loser == player {
                Some(m.loser_serve)
            } else {
                None
            }
        })
        .take(cfg.serve_window)
        .collect();

    let won: u64 = rows.iter().map(|s| u64::from(s.won)).sum();
    let total: u64 = rows.iter().map(|s| u64::from(s.total)).sum();

    if rows.len() < cfg.serve_min_matches || total == 0 {
        return match cfg.serve_on_insufficient {
            InsufficientDataPolicy::Neutral(prior) => Ok(ServeFeatures {
                serve_win: prior,
                matches: rows.len(),
            }),
            InsufficientDataPolicy::Skip => Err(SkipReason::InsufficientData {
                entity: player.to_string(),
                context: format!("serve on {}", surface.label()),
                have: rows.len(),
                need: cfg.serve_min_matches,
            }),
        };
    }

    Ok(ServeFeatures {
        serve_win: won as f64 / total as f64,
        matches: rows.len(),
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::ledger::Ledger;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn gm(d: u32, home: &str, away: &str, hg: u32, ag: u32) -> GoalMatch {
        GoalMatch {
            date: day(d),
            home: home.to_string(),
            away: away.to_string(),
            home_goals: hg,
            away_goals: ag,
        }
    }

    #[test]
    fn recency_weights_favor_latest_match() {
        // Most recent first after sorting: 3-0 (w=2), then 0-1 (w=1).
        let ledger = Ledger::new(vec![gm(1, "A", "B", 0, 1), gm(2, "A", "C", 3, 0)]);
        let f = extract_goal_features("A", ledger.matches(), Role::Home, &PipelineConfig::default())
            .unwrap();
        assert!((f.attack_rate - 2.0).abs() < 1e-12);
        assert!((f.defense_rate - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(f.form_matches, 2);
    }

    #[test]
    fn rates_are_floored() {
        let ledger = Ledger::new(vec![gm(1, "A", "B", 0, 0)]);
        let f = extract_goal_features("A", ledger.matches(), Role::Home, &PipelineConfig::default())
            .unwrap();
        assert_eq!(f.attack_rate, 0.1);
        assert_eq!(f.defense_rate, 0.1);
    }

    #[test]
    fn no_role_matches_uses_neutral_prior_or_skips() {
        let ledger = Ledger::new(vec![gm(1, "A", "B", 2, 1)]);
        let f = extract_goal_features("A", ledger.matches(), Role::Away, &PipelineConfig::default())
            .unwrap();
        assert_eq!((f.attack_rate, f.defense_rate), (1.0, 1.0));
        assert_eq!(f.form_matches, 0);

        let strict = PipelineConfig {
            goal_rates_on_insufficient: InsufficientDataPolicy::Skip,
            ..PipelineConfig::default()
        };
        let err = extract_goal_features("A", ledger.matches(), Role::Away, &strict).unwrap_err();
        assert!(matches!(err, SkipReason::InsufficientData { have: 0, .. }));
    }

    #[test]
    fn luck_ratio_boundaries() {
        assert_eq!(luck_ratio(&[]), 0.5);
        assert_eq!(luck_ratio(&[(0, 0), (0, 0)]), 0.5);
        assert!((luck_ratio(&[(3, 1)]) - 0.9).abs() < 1e-12);
    }

    #[test]
    fn volatility_needs_two_matches() {
        assert_eq!(volatility(&[(4, 0)]), 0.0);
        assert!((volatility(&[(0, 0), (2, 0)]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn luck_uses_both_roles_and_window() {
        let mut rows = vec![gm(1, "A", "B", 0, 9)];
        for d in 2..=11 {
            rows.push(gm(d, "C", "A", 0, 1));
        }
        let ledger = Ledger::new(rows);
        let f = extract_goal_features("A", ledger.matches(), Role::Home, &PipelineConfig::default())
            .unwrap();
        // The 0-9 loss is the 11th most recent and falls outside the window.
        assert_eq!(f.luck_ratio, 1.0);
        assert_eq!(f.volatility, 0.0);
    }

    fn rm(d: u32, w: &str, l: &str, surface: Surface, ws: (u32, u32), ls: (u32, u32)) -> RacketMatch {
        RacketMatch {
            date: day(d),
            winner: w.to_string(),
            loser: l.to_string(),
            surface,
            winner_serve: ServeStats { won: ws.0, total: ws.1 },
            loser_serve: ServeStats { won: ls.0, total: ls.1 },
        }
    }

    #[test]
    fn serve_ratio_pools_points_across_wins_and_losses() {
        let mut rows = Vec::new();
        for d in 1..=4 {
            rows.push(rm(d, "P", "Q", Surface::Clay, (30, 40), (20, 40)));
        }
        rows.push(rm(5, "Q", "P", Surface::Clay, (50, 60), (10, 40)));
        rows.push(rm(6, "P", "Q", Surface::Grass, (90, 90), (0, 90)));
        let ledger = Ledger::new(rows);
        let f = extract_serve_features("P", ledger.matches(), Surface::Clay, &PipelineConfig::default())
            .unwrap();
        assert_eq!(f.matches, 5);
        assert!((f.serve_win - 130.0 / 200.0).abs() < 1e-12);
    }

    #[test]
    fn serve_ratio_skips_thin_surface_history() {
        let ledger = Ledger::new(vec![rm(1, "P", "Q", Surface::Grass, (30, 40), (20, 40))]);
        let err = extract_serve_features("P", ledger.matches(), Surface::Grass, &PipelineConfig::default())
            .unwrap_err();
        assert!(matches!(err, SkipReason::InsufficientData { have: 1, need: 5, .. }));

        let lenient = PipelineConfig {
            serve_on_insufficient: InsufficientDataPolicy::Neutral(0.62),
            ..PipelineConfig::default()
        };
        let f = extract_serve_features("P", ledger.matches(), Surface::Grass, &lenient).unwrap();
        assert_eq!(f.serve_win, 0.62);
    }
}
