use std::path::PathBuf;

use matchday_edge::config::{GoalStrategy, PipelineConfig};
use matchday_edge::error::SkipReason;
use matchday_edge::features::GoalFeatures;
use matchday_edge::ledger::{Surface, load_goal_ledger, load_racket_ledger};
use matchday_edge::pipeline::{MatchPair, run_goal_batch, run_racket_batch};
use matchday_edge::racket::CoinFlipTiebreak;
use matchday_edge::report::{render_goal_report, render_racket_report};
use matchday_edge::signal::{Pick, RiskTier, StakeTier, classify_risk, decide_goal};
use matchday_edge::simulate::{ExpectedGoals, SimulationResult};

fn fixture_path(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path.to_string_lossy().into_owned()
}

fn seeded(seed: u64) -> PipelineConfig {
    PipelineConfig {
        seed: Some(seed),
        ..PipelineConfig::default()
    }
}

#[test]
fn goal_ledger_fixture_skips_malformed_rows() {
    let ledger = load_goal_ledger(&fixture_path("mex_sample.csv")).expect("fixture should load");
    assert_eq!(ledger.len(), 56);
    assert_eq!(ledger.entities().len(), 8);
    let dates: Vec<_> = ledger.matches().iter().map(|m| m.date).collect();
    assert!(dates.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn scraped_labels_flow_through_to_signals() {
    let ledger = load_goal_ledger(&fixture_path("mex_sample.csv")).expect("fixture should load");
    let pairs = vec![
        MatchPair::new("Club América 19:00", "Chivas"),
        MatchPair::new("Pumas UNAM", "Rayados"),
        MatchPair::new("Zzqx Unknown FC", "Toluca"),
        MatchPair::new("Tigres", "Atlas"),
    ];
    let reports = run_goal_batch(&pairs, &ledger, &seeded(99));
    assert_eq!(reports.len(), pairs.len());

    let first = reports[0].analysis().expect("first pair resolves");
    assert_eq!(first.home.entity, "America");
    assert_eq!(first.away.entity, "Guadalajara");

    let second = reports[1].analysis().expect("second pair resolves");
    assert_eq!(second.home.entity, "U.N.A.M.- Pumas");
    assert_eq!(second.away.entity, "Monterrey");

    assert!(matches!(
        &reports[2].outcome,
        Err(SkipReason::Unresolved { raw }) if raw == "Zzqx Unknown FC"
    ));
    assert_eq!(reports[3].analysis().unwrap().home.entity, "Tigres UANL");

    for analysis in reports.iter().filter_map(|r| r.analysis()) {
        let r = &analysis.result;
        for p in [r.p_home, r.p_draw, r.p_away, r.p_over] {
            assert!((0.0..=1.0).contains(&p));
        }
        assert!((r.p_home + r.p_draw + r.p_away - 1.0).abs() < 1e-9);
        if let Some(signal) = &analysis.signal {
            assert!(signal.win_pct > 50.0);
            assert!((signal.fair_price - 100.0 / signal.win_pct).abs() < 1e-12);
        }
    }

    let text = render_goal_report("Matchday", &reports).expect("some pairs analysed");
    assert!(text.contains("America vs Guadalajara"));
    assert!(!text.contains("Zzqx"));
}

#[test]
fn seeded_monte_carlo_batch_is_reproducible() {
    let ledger = load_goal_ledger(&fixture_path("mex_sample.csv")).unwrap();
    let pairs = vec![
        MatchPair::new("Toluca", "Cruz Azul"),
        MatchPair::new("Atlas", "America"),
        MatchPair::new("Monterrey", "Tigres"),
    ];
    let cfg = seeded(31337);
    let a = run_goal_batch(&pairs, &ledger, &cfg);
    let b = run_goal_batch(&pairs, &ledger, &cfg);
    for (x, y) in a.iter().zip(&b) {
        let (x, y) = (x.analysis().unwrap(), y.analysis().unwrap());
        assert_eq!(x.result, y.result);
        assert_eq!(x.signal, y.signal);
    }
}

#[test]
fn closed_form_batch_ignores_the_seed() {
    let ledger = load_goal_ledger(&fixture_path("mex_sample.csv")).unwrap();
    let pairs = vec![MatchPair::new("Toluca", "Cruz Azul")];
    let cfg = |seed| PipelineConfig {
        strategy: GoalStrategy::ClosedForm,
        seed,
        ..PipelineConfig::default()
    };
    let a = run_goal_batch(&pairs, &ledger, &cfg(Some(1)));
    let b = run_goal_batch(&pairs, &ledger, &cfg(None));
    assert_eq!(
        a[0].analysis().unwrap().result,
        b[0].analysis().unwrap().result
    );
}

#[test]
fn racket_batch_picks_the_stronger_server() {
    let ledger = load_racket_ledger(&fixture_path("atp_sample.csv")).expect("fixture should load");
    let pairs = vec![
        MatchPair::new("Alex Strong", "Ben Weak"),
        MatchPair::new("Ben Weak", "Alex Strong"),
        MatchPair::new("Thin Player", "Alex Strong"),
    ];
    let reports = run_racket_batch(
        &pairs,
        Surface::Hard,
        &ledger,
        &CoinFlipTiebreak,
        &PipelineConfig::default(),
    );
    assert_eq!(reports.len(), 3);

    let forward = reports[0].analysis().unwrap();
    assert!((forward.serve_a.serve_win - 0.70).abs() < 1e-12);
    assert!((forward.serve_b.serve_win - 0.58).abs() < 1e-12);
    let signal = forward.signal.expect("clear favourite");
    assert_eq!(signal.pick, Pick::PlayerA);
    assert_eq!(signal.risk, None);

    let reverse = reports[1].analysis().unwrap();
    assert_eq!(reverse.signal.unwrap().pick, Pick::PlayerB);

    assert!(matches!(
        &reports[2].outcome,
        Err(SkipReason::InsufficientData { entity, have: 1, need: 5, .. }) if entity == "Thin Player"
    ));

    let text = render_racket_report("Tennis", &reports).unwrap();
    assert!(text.contains("Alex Strong vs Ben Weak (hard)"));
}

#[test]
fn player_names_ignore_football_aliases() {
    let ledger = load_racket_ledger(&fixture_path("atp_sample.csv")).unwrap();
    let reports = run_racket_batch(
        &[
            MatchPair::new("Leonardo Mayer", "Leo Borg"),
            MatchPair::new("Leonardo Mayr", "Alex Strong"),
        ],
        Surface::Hard,
        &ledger,
        &CoinFlipTiebreak,
        &PipelineConfig::default(),
    );

    let exact = reports[0].analysis().expect("both players have hard-court history");
    assert_eq!(exact.player_a.entity, "Leonardo Mayer");
    assert_eq!(exact.player_b.entity, "Leo Borg");
    assert!((exact.serve_a.serve_win - 0.65).abs() < 1e-12);

    let typo = reports[1].analysis().expect("typo still resolves");
    assert_eq!(typo.player_a.entity, "Leonardo Mayer");
}

#[test]
fn racket_batch_on_thin_surface_skips_everyone() {
    let ledger = load_racket_ledger(&fixture_path("atp_sample.csv")).unwrap();
    let reports = run_racket_batch(
        &[MatchPair::new("Alex Strong", "Ben Weak")],
        Surface::Clay,
        &ledger,
        &CoinFlipTiebreak,
        &PipelineConfig::default(),
    );
    assert!(reports[0].analysis().is_none());
}

fn features(luck_ratio: f64, volatility: f64) -> GoalFeatures {
    GoalFeatures {
        attack_rate: 1.5,
        defense_rate: 1.0,
        luck_ratio,
        volatility,
        form_matches: 5,
    }
}

fn result(p_home: f64, p_draw: f64, p_away: f64, p_over: f64) -> SimulationResult {
    SimulationResult {
        p_home,
        p_draw,
        p_away,
        p_over,
        xg: ExpectedGoals {
            home: 1.6,
            away: 1.0,
        },
    }
}

#[test]
fn luck_floor_is_exclusive() {
    let cfg = PipelineConfig::default();
    let r = result(0.60, 0.20, 0.20, 0.40);
    assert!(decide_goal(&r, &features(0.45, 0.5), &features(0.5, 0.5), &cfg).is_none());

    let s = decide_goal(&r, &features(0.451, 0.5), &features(0.5, 0.5), &cfg).unwrap();
    assert_eq!(s.pick, Pick::Home);
    assert_eq!(s.stake, StakeTier::Normal);
    assert!((s.fair_price - 100.0 / 60.0).abs() < 1e-12);
}

#[test]
fn risk_tiers_follow_combined_volatility() {
    let cfg = PipelineConfig::default();
    assert_eq!(classify_risk(1.6, &cfg), RiskTier::High);
    assert_eq!(classify_risk(1.3, &cfg), RiskTier::Medium);
    assert_eq!(classify_risk(0.8, &cfg), RiskTier::Low);

    let r = result(0.30, 0.25, 0.45, 0.65);
    let s = decide_goal(&r, &features(0.6, 1.4), &features(0.6, 1.8), &cfg).unwrap();
    assert_eq!(s.pick, Pick::Over { line: 2.5 });
    assert_eq!(s.risk, Some(RiskTier::High));
}
