use serde::Serialize;

use crate::config::PipelineConfig;
use crate::features::{Role, extract_goal_features};
use crate::ledger::{GoalMatch, Ledger};
use crate::simulate::{closed_form, expected_goals};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Home,
    Draw,
    Away,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Prob3 {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Metrics {
    pub samples: usize,
    pub brier: f64,
    pub log_loss: f64,
    pub accuracy: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CalibrationBin {
    pub bucket_start: f64,
    pub bucket_end: f64,
    pub count: usize,
    pub avg_pred: f64,
    pub actual_rate: f64,
}

/// Walk-forward predictions paired with what actually happened.
#[derive(Debug, Clone, Default)]
pub struct Backtest {
    pub predictions: Vec<Prob3>,
    pub outcomes: Vec<Outcome>,
    pub skipped: usize,
}

pub fn classify_outcome(home_goals: u32, away_goals: u32) -> Outcome {
    if home_goals > away_goals {
        Outcome::Home
    } else if home_goals < away_goals {
        Outcome::Away
    } else {
        Outcome::Draw
    }
}

/// Predict every match from the matches strictly before its date, oldest first, with the
/// closed-form model. Matches with fewer than `min_history` earlier rows are skipped.
pub fn walk_forward(
    ledger: &Ledger<GoalMatch>,
    cfg: &PipelineConfig,
    min_history: usize,
) -> Backtest {
    let rows = ledger.matches();
    let mut out = Backtest::default();

    for i in (0..rows.len()).rev() {
        let m = &rows[i];
        let tail = &rows[i + 1..];
        let history = &tail[tail.partition_point(|h| h.date >= m.date)..];
        if history.len() < min_history {
            out.skipped += 1;
            continue;
        }

        let home = extract_goal_features(&m.home, history, Role::Home, cfg);
        let away = extract_goal_features(&m.away, history, Role::Away, cfg);
        let (Ok(home), Ok(away)) = (home, away) else {
            out.skipped += 1;
            continue;
        };
        let xg = expected_goals(&home, &away, cfg);
        let Ok(result) = closed_form(xg, cfg.max_goals, cfg.totals_line) else {
            out.skipped += 1;
            continue;
        };

        out.predictions.push(Prob3 {
            home: result.p_home,
            draw: result.p_draw,
            away: result.p_away,
        });
        out.outcomes.push(classify_outcome(m.home_goals, m.away_goals));
    }
    out
}

impl Prob3 {
    pub fn of(self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Home => self.home,
            Outcome::Draw => self.draw,
            Outcome::Away => self.away,
        }
    }

    /// Most likely outcome; ties go home, then draw.
    pub fn favourite(self) -> Outcome {
        [Outcome::Draw, Outcome::Away]
            .into_iter()
            .fold(Outcome::Home, |best, o| if self.of(o) > self.of(best) { o } else { best })
    }
}

const OUTCOMES: [Outcome; 3] = [Outcome::Home, Outcome::Draw, Outcome::Away];

/// Mean Brier score (summed over the three classes), log loss and hit rate. Mismatched or
/// empty inputs score as zero samples.
pub fn evaluate_probs(predictions: &[Prob3], outcomes: &[Outcome]) -> Metrics {
    let n = predictions.len();
    if n == 0 || n != outcomes.len() {
        return Metrics {
            samples: 0,
            brier: 0.0,
            log_loss: 0.0,
            accuracy: 0.0,
        };
    }

    let (brier, log_loss, hits) = predictions.iter().zip(outcomes).fold(
        (0.0_f64, 0.0_f64, 0usize),
        |(brier, log_loss, hits), (p, &actual)| {
            let sq: f64 = OUTCOMES
                .iter()
                .map(|&o| {
                    let y = if o == actual { 1.0 } else { 0.0 };
                    (p.of(o) - y).powi(2)
                })
                .sum();
            let ll = -p.of(actual).clamp(1e-12, 1.0).ln();
            (brier + sq, log_loss + ll, hits + usize::from(p.favourite() == actual))
        },
    );

    let n_f = n as f64;
    Metrics {
        samples: n,
        brier: brier / n_f,
        log_loss: log_loss / n_f,
        accuracy: hits as f64 / n_f,
    }
}

/// Reliability table for one class: equal-width probability buckets with the mean forecast
/// and the observed frequency in each.
pub fn calibration_bins(
    predictions: &[Prob3],
    outcomes: &[Outcome],
    class: Outcome,
    bins: usize,
) -> Vec<CalibrationBin> {
    let bins = bins.max(2);
    let width = 1.0 / bins as f64;
    let mut table: Vec<CalibrationBin> = (0..bins)
        .map(|i| CalibrationBin {
            bucket_start: i as f64 * width,
            bucket_end: (i + 1) as f64 * width,
            count: 0,
            avg_pred: 0.0,
            actual_rate: 0.0,
        })
        .collect();

    // Accumulate sums in place, then turn them into means.
    for (p, &actual) in predictions.iter().zip(outcomes) {
        let prob = p.of(class).clamp(0.0, 1.0);
        let bin = &mut table[((prob / width) as usize).min(bins - 1)];
        bin.count += 1;
        bin.avg_pred += prob;
        if actual == class {
            bin.actual_rate += 1.0;
        }
    }
    for bin in table.iter_mut().filter(|b| b.count > 0) {
        bin.avg_pred /= bin.count as f64;
        bin.actual_rate /= bin.count as f64;
    }
    table
}
