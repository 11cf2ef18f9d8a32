//! Stream resolution across source sites.
//!
//! Providers scrape one site each; the [`Aggregator`] runs them all
//! concurrently and concatenates what they find.

pub mod aggregator;
pub mod provider;
pub mod providers;

pub use aggregator::Aggregator;
pub use provider::{PlaybackHints, StreamProvider, StreamResponse, StreamResult};
