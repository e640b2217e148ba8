use once_cell::sync::Lazy;
use serde::Serialize;
use strsim::normalized_levenshtein;

use crate::config::PipelineConfig;

/// noisy substring -> preferred canonical form
pub const LIGA_MX_ALIASES: &[(&str, &str)] = &[
    ("america", "Club America"),
    ("club america", "Club America"),
    ("guadalajara", "Guadalajara"),
    ("chivas", "Guadalajara"),
    ("cruz azul", "Cruz Azul"),
    ("unam", "Unam Pumas"),
    ("pumas", "Unam Pumas"),
    ("tigres", "Tigres"),
    ("tigres uanl", "Tigres"),
    ("monterrey", "Monterrey"),
    ("rayados", "Monterrey"),
    ("toluca", "Toluca"),
    ("pachuca", "Pachuca"),
    ("leon", "Leon"),
    ("santos", "Santos Laguna"),
    ("santos laguna", "Santos Laguna"),
    ("atlas", "Atlas"),
    ("puebla", "Puebla"),
    ("san luis", "San Luis"),
    ("atletico san luis", "San Luis"),
    ("juarez", "Juarez"),
    ("fc juarez", "Juarez"),
    ("mazatlan", "Mazatlan FC"),
    ("mazatlan fc", "Mazatlan FC"),
    ("necaxa", "Necaxa"),
    ("queretaro", "Queretaro"),
    ("tijuana", "Tijuana"),
    ("xolos", "Tijuana"),
];

const NOISE_TOKENS: &[&str] = &["fc", "cf", "vs", "v"];

#[derive(Debug, Clone)]
struct AliasEntry {
    key: String,
    target: String,
}

/// Alias hints for one data source, keys stored normalized. Each ledger brings its own
/// table; an empty table disables the alias-assisted pass.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: Vec<AliasEntry>,
}

impl AliasTable {
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        let entries = pairs
            .iter()
            .map(|&(key, target)| AliasEntry {
                key: normalize(key),
                target: normalize(target),
            })
            .filter(|entry| !entry.key.is_empty() && !entry.target.is_empty())
            .collect();
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

pub static LIGA_MX: Lazy<AliasTable> = Lazy::new(|| AliasTable::new(LIGA_MX_ALIASES));

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum ResolveStrategy {
    /// Normalized label equals a candidate's normalized name.
    Exact,
    AliasAssisted { cutoff: f64 },
    Direct { cutoff: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub entity: String,
    pub score: f64,
    pub strategy: ResolveStrategy,
}

/// Candidate entity names with their normalized forms computed once per ledger.
#[derive(Debug, Clone, Default)]
pub struct Candidates {
    names: Vec<String>,
    normalized: Vec<String>,
}

impl Candidates {
    pub fn new(names: Vec<String>) -> Self {
        let normalized = names.iter().map(|n| normalize(n)).collect();
        Self { names, normalized }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn exact(&self, query: &str) -> Option<usize> {
        self.normalized.iter().position(|cand| cand == query)
    }

    /// Best candidate at or above `cutoff`; ties keep the earlier candidate.
    fn best_match(&self, query: &str, cutoff: f64) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (idx, cand) in self.normalized.iter().enumerate() {
            let score = similarity(query, cand);
            if score < cutoff {
                continue;
            }
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((idx, score));
            }
        }
        best
    }
}

#[derive(Debug, Clone)]
pub struct Resolver {
    aliases: AliasTable,
    strategies: Vec<ResolveStrategy>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(LIGA_MX.clone(), &PipelineConfig::default())
    }
}

impl Resolver {
    /// Exact names first, then the alias pass (only with a non-empty table), then the
    /// direct fuzzy fallback.
    pub fn new(aliases: AliasTable, cfg: &PipelineConfig) -> Self {
        let mut strategies = vec![ResolveStrategy::Exact];
        if !aliases.is_empty() {
            strategies.push(ResolveStrategy::AliasAssisted {
                cutoff: cfg.alias_cutoff,
            });
        }
        strategies.push(ResolveStrategy::Direct {
            cutoff: cfg.direct_cutoff,
        });
        Self::with_strategies(aliases, strategies)
    }

    pub fn with_strategies(aliases: AliasTable, strategies: Vec<ResolveStrategy>) -> Self {
        Self {
            aliases,
            strategies,
        }
    }

    pub fn strategies(&self) -> &[ResolveStrategy] {
        &self.strategies
    }

    pub fn resolve(&self, raw: &str, candidates: &Candidates) -> Option<Resolution> {
        let normalized = normalize(raw);
        if normalized.is_empty() || candidates.is_empty() {
            return None;
        }
        self.strategies
            .iter()
            .find_map(|&s| self.attempt(s, &normalized, candidates))
    }

    fn attempt(
        &self,
        strategy: ResolveStrategy,
        normalized: &str,
        candidates: &Candidates,
    ) -> Option<Resolution> {
        let (idx, score) = match strategy {
            ResolveStrategy::Exact => (candidates.exact(normalized)?, 1.0),
            ResolveStrategy::AliasAssisted { cutoff } => self
                .aliases
                .entries
                .iter()
                .filter(|alias| normalized.contains(alias.key.as_str()))
                .find_map(|alias| candidates.best_match(&alias.target, cutoff))?,
            ResolveStrategy::Direct { cutoff } => candidates.best_match(normalized, cutoff)?,
        };
        Some(Resolution {
            entity: candidates.names[idx].clone(),
            score,
            strategy,
        })
    }
}

/// Lowercase, fold accents, drop kickoff times and filler tokens, collapse whitespace.
pub fn normalize(raw: &str) -> String {
    let lower = raw.to_lowercase();
    let mut tokens: Vec<String> = Vec::new();
    for tok in lower.split_whitespace() {
        if is_clock(tok) {
            continue;
        }
        let cleaned: String = tok
            .chars()
            .filter(|c| *c != '.' && *c != '\'')
            .map(|c| {
                let c = fold_accent(c);
                if c.is_alphanumeric() { c } else { ' ' }
            })
            .collect();
        for part in cleaned.split_whitespace() {
            if NOISE_TOKENS.contains(&part) {
                continue;
            }
            tokens.push(part.to_string());
        }
    }
    tokens.join(" ")
}

/// Normalized Levenshtein ratio over the whole strings, or over the best-aligned run of
/// words when one side carries extra words ("club america" vs "america").
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let whole = normalized_levenshtein(a, b);
    let ta: Vec<&str> = a.split_whitespace().collect();
    let tb: Vec<&str> = b.split_whitespace().collect();
    let (short, long) = if ta.len() <= tb.len() {
        (ta, tb)
    } else {
        (tb, ta)
    };
    if short.is_empty() || short.len() == long.len() {
        return whole;
    }
    let needle = short.join(" ");
    long.windows(short.len())
        .map(|w| normalized_levenshtein(&needle, &w.join(" ")))
        .fold(whole, f64::max)
}

fn is_clock(tok: &str) -> bool {
    tok.contains(':') && tok.chars().all(|c| c.is_ascii_digit() || c == ':')
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' | 'ã' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        _ => c,
    }
}
