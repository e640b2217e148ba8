use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::LedgerError;
use crate::http_client::fetch_text;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalMatch {
    pub date: NaiveDate,
    pub home: String,
    pub away: String,
    pub home_goals: u32,
    pub away_goals: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Surface {
    Hard,
    Clay,
    Grass,
    Carpet,
}

impl Surface {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "hard" => Some(Surface::Hard),
            "clay" => Some(Surface::Clay),
            "grass" => Some(Surface::Grass),
            "carpet" => Some(Surface::Carpet),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Surface::Hard => "hard",
            Surface::Clay => "clay",
            Surface::Grass => "grass",
            Surface::Carpet => "carpet",
        }
    }
}

/// Serve points won / played by one player in one match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServeStats {
    pub won: u32,
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RacketMatch {
    pub date: NaiveDate,
    pub winner: String,
    pub loser: String,
    pub surface: Surface,
    pub winner_serve: ServeStats,
    pub loser_serve: ServeStats,
}

pub trait LedgerEntry {
    fn date(&self) -> NaiveDate;
    fn sides(&self) -> [&str; 2];
}

impl LedgerEntry for GoalMatch {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn sides(&self) -> [&str; 2] {
        [&self.home, &self.away]
    }
}

impl LedgerEntry for RacketMatch {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn sides(&self) -> [&str; 2] {
        [&self.winner, &self.loser]
    }
}

/// One fetched snapshot of a sport's match history, most recent first.
#[derive(Debug, Clone)]
pub struct Ledger<M> {
    matches: Vec<M>,
}

impl<M: LedgerEntry> Ledger<M> {
    pub fn new(mut matches: Vec<M>) -> Self {
        matches.sort_by(|a, b| b.date().cmp(&a.date()));
        Self { matches }
    }

    pub fn matches(&self) -> &[M] {
        &self.matches
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Distinct entity names, sorted. This is the resolver's candidate set.
    pub fn entities(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self.matches.iter().flat_map(|m| m.sides()).collect();
        set.into_iter().map(str::to_string).collect()
    }

    /// Ledger restricted to matches strictly before `date`.
    pub fn before(&self, date: NaiveDate) -> Self
    where
        M: Clone,
    {
        Self {
            matches: self
                .matches
                .iter()
                .filter(|m| m.date() < date)
                .cloned()
                .collect(),
        }
    }
}

pub fn load_goal_ledger(source: &str) -> Result<Ledger<GoalMatch>, LedgerError> {
    let rows = with_source(source, |r| parse_goal_csv(r))?;
    info!(source, rows = rows.len(), "goal ledger loaded");
    if rows.is_empty() {
        return Err(LedgerError::Empty);
    }
    Ok(Ledger::new(rows))
}

pub fn load_racket_ledger(source: &str) -> Result<Ledger<RacketMatch>, LedgerError> {
    let rows = with_source(source, |r| parse_racket_csv(r))?;
    info!(source, rows = rows.len(), "racket ledger loaded");
    if rows.is_empty() {
        return Err(LedgerError::Empty);
    }
    Ok(Ledger::new(rows))
}

fn with_source<T>(
    source: &str,
    parse: impl Fn(&mut dyn Read) -> Result<Vec<T>, LedgerError>,
) -> Result<Vec<T>, LedgerError> {
    if source.starts_with("http://") || source.starts_with("https://") {
        let body = fetch_text(source)?;
        parse(&mut body.as_bytes())
    } else {
        let mut file = File::open(source)?;
        parse(&mut file)
    }
}

/// football-data.co.uk layout. Both the "new" (`Home`/`HG`) and the main-league
/// (`HomeTeam`/`FTHG`) column names are accepted.
pub fn parse_goal_csv<R: Read + ?Sized>(reader: &mut R) -> Result<Vec<GoalMatch>, LedgerError> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();
    let date_i = column(&headers, &["Date"]).ok_or(LedgerError::MissingColumn("Date"))?;
    let home_i =
        column(&headers, &["Home", "HomeTeam"]).ok_or(LedgerError::MissingColumn("Home"))?;
    let away_i =
        column(&headers, &["Away", "AwayTeam"]).ok_or(LedgerError::MissingColumn("Away"))?;
    let hg_i = column(&headers, &["HG", "FTHG"]).ok_or(LedgerError::MissingColumn("HG"))?;
    let ag_i = column(&headers, &["AG", "FTAG"]).ok_or(LedgerError::MissingColumn("AG"))?;

    let mut out = Vec::new();
    let mut skipped = 0usize;
    for record in rdr.records() {
        let Ok(record) = record else {
            skipped += 1;
            continue;
        };
        let row = (|| {
            let date = parse_day_month_year(record.get(date_i)?)?;
            let home = non_empty(record.get(home_i)?)?;
            let away = non_empty(record.get(away_i)?)?;
            let home_goals = parse_count(record.get(hg_i)?)?;
            let away_goals = parse_count(record.get(ag_i)?)?;
            Some(GoalMatch {
                date,
                home,
                away,
                home_goals,
                away_goals,
            })
        })();
        match row {
            Some(m) => out.push(m),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        debug!(skipped, "goal ledger rows skipped");
    }
    Ok(out)
}

/// Jeff Sackmann style ATP/WTA match files.
pub fn parse_racket_csv<R: Read + ?Sized>(
    reader: &mut R,
) -> Result<Vec<RacketMatch>, LedgerError> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();
    let col = |name: &'static str| column(&headers, &[name]).ok_or(LedgerError::MissingColumn(name));
    let date_i = col("tourney_date")?;
    let surface_i = col("surface")?;
    let winner_i = col("winner_name")?;
    let loser_i = col("loser_name")?;
    let w_svpt = col("w_svpt")?;
    let w_1st = col("w_1stWon")?;
    let w_2nd = col("w_2ndWon")?;
    let l_svpt = col("l_svpt")?;
    let l_1st = col("l_1stWon")?;
    let l_2nd = col("l_2ndWon")?;

    let mut out = Vec::new();
    let mut skipped = 0usize;
    for record in rdr.records() {
        let Ok(record) = record else {
            skipped += 1;
            continue;
        };
        let serve = |pts: usize, first: usize, second: usize| -> Option<ServeStats> {
            let total = parse_count(record.get(pts)?)?;
            let won = parse_count(record.get(first)?)? + parse_count(record.get(second)?)?;
            (won <= total).then_some(ServeStats { won, total })
        };
        let row = (|| {
            let date = NaiveDate::parse_from_str(record.get(date_i)?, "%Y%m%d").ok()?;
            Some(RacketMatch {
                date,
                winner: non_empty(record.get(winner_i)?)?,
                loser: non_empty(record.get(loser_i)?)?,
                surface: Surface::parse(record.get(surface_i)?)?,
                winner_serve: serve(w_svpt, w_1st, w_2nd)?,
                loser_serve: serve(l_svpt, l_1st, l_2nd)?,
            })
        })();
        match row {
            Some(m) => out.push(m),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        debug!(skipped, "racket ledger rows skipped");
    }
    Ok(out)
}

fn column(headers: &StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
}

fn non_empty(raw: &str) -> Option<String> {
    let s = raw.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn parse_count(raw: &str) -> Option<u32> {
    let s = raw.trim();
    if let Ok(n) = s.parse::<u32>() {
        return Some(n);
    }
    // Some exports write counts as "2.0".
    let f = s.parse::<f64>().ok()?;
    (f.is_finite() && f >= 0.0 && f.fract() == 0.0).then_some(f as u32)
}

fn parse_day_month_year(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    let year_len = s.rsplit('/').next().map(str::len).unwrap_or(0);
    let fmt = if year_len == 2 { "%d/%m/%y" } else { "%d/%m/%Y" };
    NaiveDate::parse_from_str(s, fmt).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOAL_CSV: &str = "\
Country,League,Season,Date,Time,Home,Away,HG,AG,Res
Mexico,Liga MX,2024/2025,12/01/2025,19:00,Toluca,Club America,2,1,H
Mexico,Liga MX,2024/2025,19/01/25,21:00,Club America,Tigres,0,0,D
Mexico,Liga MX,2024/2025,26/01/2025,19:00,Tigres,Toluca,,,
Mexico,Liga MX,2024/2025,not-a-date,19:00,Tigres,Toluca,1,1,D
";

    #[test]
    fn goal_csv_skips_bad_rows_and_sorts_recent_first() {
        let rows = parse_goal_csv(&mut GOAL_CSV.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        let ledger = Ledger::new(rows);
        assert_eq!(ledger.matches()[0].home, "Club America");
        assert_eq!(
            ledger.matches()[0].date,
            NaiveDate::from_ymd_opt(2025, 1, 19).unwrap()
        );
        assert_eq!(ledger.entities(), vec!["Club America", "Tigres", "Toluca"]);
    }

    #[test]
    fn goal_csv_accepts_main_league_headers() {
        let raw = "Div,Date,HomeTeam,AwayTeam,FTHG,FTAG\nE0,16/08/2024,Man United,Fulham,1,0\n";
        let rows = parse_goal_csv(&mut raw.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].away, "Fulham");
        assert_eq!(rows[0].home_goals, 1);
    }

    #[test]
    fn goal_csv_without_required_column_is_an_error() {
        let raw = "Date,Home,Away\n01/01/2025,A,B\n";
        let err = parse_goal_csv(&mut raw.as_bytes()).unwrap_err();
        assert!(matches!(err, LedgerError::MissingColumn("HG")));
    }

    #[test]
    fn racket_csv_sums_first_and_second_serve_points() {
        let raw = "\
tourney_date,surface,winner_name,loser_name,w_svpt,w_1stWon,w_2ndWon,l_svpt,l_1stWon,l_2ndWon
20240115,Hard,Jannik Sinner,Daniil Medvedev,80,40,14,90,38,15
20240116,Hard,Jannik Sinner,Someone,,,,,,
";
        let rows = parse_racket_csv(&mut raw.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].winner_serve, ServeStats { won: 54, total: 80 });
        assert_eq!(rows[0].loser_serve, ServeStats { won: 53, total: 90 });
        assert_eq!(rows[0].surface, Surface::Hard);
    }

    #[test]
    fn before_excludes_same_day() {
        let rows = parse_goal_csv(&mut GOAL_CSV.as_bytes()).unwrap();
        let ledger = Ledger::new(rows);
        let cut = ledger.before(NaiveDate::from_ymd_opt(2025, 1, 19).unwrap());
        assert_eq!(cut.len(), 1);
        assert_eq!(cut.matches()[0].home, "Toluca");
    }
}
