pub mod calibration;
pub mod config;
pub mod error;
pub mod features;
pub mod http_client;
pub mod ledger;
pub mod logging;
pub mod name_resolver;
pub mod notify;
pub mod pipeline;
pub mod racket;
pub mod report;
pub mod signal;
pub mod simulate;
