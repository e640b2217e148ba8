use std::fmt::Write;

use crate::pipeline::{GoalAnalysis, PairReport, RacketAnalysis};
use crate::signal::{Pick, Signal};

const RULE: &str = "-----------------------------";

pub fn render_goal_report(title: &str, reports: &[PairReport<GoalAnalysis>]) -> Option<String> {
    let mut out = format!("{title}\n\n");
    let mut any = false;
    for report in reports {
        let Some(a) = report.analysis() else { continue };
        any = true;
        let r = &a.result;
        let _ = writeln!(out, "{} vs {}", a.home.entity, a.away.entity);
        let _ = writeln!(
            out,
            "1X2: {:.1}% - {:.1}% - {:.1}% | xG {:.2}-{:.2} | over: {:.1}%",
            r.p_home * 100.0,
            r.p_draw * 100.0,
            r.p_away * 100.0,
            r.xg.home,
            r.xg.away,
            r.p_over * 100.0
        );
        let pick = a
            .signal
            .as_ref()
            .map(|s| signal_line(s, &a.home.entity, &a.away.entity))
            .unwrap_or_else(|| "no signal (too close to call)".to_string());
        let _ = writeln!(out, "Pick: {pick}\n{RULE}");
    }
    any.then_some(out)
}

pub fn render_racket_report(
    title: &str,
    reports: &[PairReport<RacketAnalysis>],
) -> Option<String> {
    let mut out = format!("{title}\n\n");
    let mut any = false;
    for report in reports {
        let Some(a) = report.analysis() else { continue };
        any = true;
        let _ = writeln!(
            out,
            "{} vs {} ({})",
            a.player_a.entity,
            a.player_b.entity,
            a.surface.label()
        );
        let _ = writeln!(
            out,
            "Serve: {:.1}% / {:.1}% | win: {:.1}%",
            a.serve_a.serve_win * 100.0,
            a.serve_b.serve_win * 100.0,
            a.p_win_a * 100.0
        );
        let pick = a
            .signal
            .as_ref()
            .map(|s| signal_line(s, &a.player_a.entity, &a.player_b.entity))
            .unwrap_or_else(|| "no signal (too close to call)".to_string());
        let _ = writeln!(out, "Pick: {pick}\n{RULE}");
    }
    any.then_some(out)
}

fn signal_line(signal: &Signal, a: &str, b: &str) -> String {
    let who = match signal.pick {
        Pick::Home | Pick::PlayerA => a.to_string(),
        Pick::Away | Pick::PlayerB => b.to_string(),
        Pick::Over { line } => format!("over {line} goals"),
    };
    let mut line = format!(
        "{who} @ {:.1}% | fair {:.2} | stake {}",
        signal.win_pct, signal.fair_price, signal.stake
    );
    if let Some(risk) = signal.risk {
        let _ = write!(line, " | {risk}");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SkipReason;
    use crate::pipeline::MatchPair;

    #[test]
    fn report_is_none_when_nothing_resolved() {
        let reports: Vec<PairReport<GoalAnalysis>> = vec![PairReport {
            pair: MatchPair::new("x", "y"),
            outcome: Err(SkipReason::Unresolved {
                raw: "x".to_string(),
            }),
        }];
        assert!(render_goal_report("Daily", &reports).is_none());
    }
}
