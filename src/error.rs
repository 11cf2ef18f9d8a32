//! Typed failure categories for the resolution pipeline.
//!
//! None of these ever reach the caller of
//! [`Aggregator::resolve_all`](crate::stream::Aggregator::resolve_all):
//! they are logged at the smallest scope that failed and turned into
//! "no result" there.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("missing configuration key: {0}")]
    MissingConfig(&'static str),
}
