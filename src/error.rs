use thiserror::Error;

/// Per-match conditions that drop a single pair from a batch without stopping it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SkipReason {
    #[error("unresolved name: {raw:?}")]
    Unresolved { raw: String },

    #[error("insufficient data for {entity} ({context}): have {have}, need {need}")]
    InsufficientData {
        entity: String,
        context: String,
        have: usize,
        need: usize,
    },

    #[error("both sides resolved to {entity}")]
    SameEntity { entity: String },

    #[error("invalid probability input: {value}")]
    InvalidProbability { value: f64 },
}

/// Ledger fetch and decode failures.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger is empty")]
    Empty,

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("http status {status} fetching {url}")]
    Status { status: u16, url: String },

    #[error("missing column: {0}")]
    MissingColumn(&'static str),
}
