/// Win probability of player A against player B from serve-point win rates.
pub trait RacketModel {
    fn win_probability(&self, serve_a: f64, serve_b: f64) -> f64;
}

/// Closed-form hold, alternating-serve set chain, best of three.
///
/// Only the service game is exact. The set chain treats 6-6 as a 50 % coin flip instead of
/// playing out the tiebreak, and the match treats sets as independent, so this is an
/// approximation of the full point-level chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoinFlipTiebreak;

impl RacketModel for CoinFlipTiebreak {
    fn win_probability(&self, serve_a: f64, serve_b: f64) -> f64 {
        let hold_a = hold_probability(serve_a);
        let hold_b = hold_probability(serve_b);
        match_win_probability(set_win_probability(hold_a, hold_b))
    }
}

/// Probability the server holds a race-to-4-with-deuce game.
pub fn hold_probability(p: f64) -> f64 {
    let p = p.clamp(0.0, 1.0);
    let num = p.powi(4) * (15.0 - 34.0 * p + 28.0 * p * p - 8.0 * p.powi(3));
    let den = 1.0 - 2.0 * p + 2.0 * p * p;
    (num / den).clamp(0.0, 1.0)
}

/// A serves the first game; first to six games by two, 6–6 goes to a 50 % tiebreak.
pub fn set_win_probability(hold_a: f64, hold_b: f64) -> f64 {
    const TIEBREAK: f64 = 0.5;
    let hold_a = hold_a.clamp(0.0, 1.0);
    let hold_b = hold_b.clamp(0.0, 1.0);

    // v[a][b]: P(A takes the set | A has a games, B has b games).
    let mut v = [[0.0_f64; 8]; 8];
    for a in (0..8usize).rev() {
        for b in (0..8usize).rev() {
            v[a][b] = if a == 6 && b == 6 {
                TIEBREAK
            } else if a == 7 || (a >= 6 && a >= b + 2) {
                1.0
            } else if b == 7 || (b >= 6 && b >= a + 2) {
                0.0
            } else {
                let p_game = if (a + b) % 2 == 0 { hold_a } else { 1.0 - hold_b };
                p_game * v[a + 1][b] + (1.0 - p_game) * v[a][b + 1]
            };
        }
    }
    v[0][0]
}

/// Best of three: the 2–0 sweep plus the two 2–1 paths.
pub fn match_win_probability(set: f64) -> f64 {
    let s = set.clamp(0.0, 1.0);
    s * s + 2.0 * s * s * (1.0 - s)
}
