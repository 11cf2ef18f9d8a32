//! `StreamScout` - Concurrent stream-link resolver
//!
//! # Features
//!
//! - **Providers**: Site-specific scrapers (`VixSrc`, `GuardaHD`) that locate
//!   player pages and embedded hosting links
//! - **Resolvers**: Host-specific extraction (`SuperVideo`, `MixDrop`,
//!   `MaxStream`) turning an embed page into a direct media URL
//! - **Unpacker**: Decoder for `eval(function(p,a,c,k,e,d)...)` packed scripts
//! - **Aggregation**: All providers run concurrently; a failing provider only
//!   costs its own results
//!
//! # Example
//!
//! ```rust,no_run
//! use streamscout::{AcceleratedClient, Aggregator, MediaKind, ResolutionRequest, UserConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = AcceleratedClient::new()?;
//!     let aggregator = Aggregator::with_default_providers(None);
//!     let config = UserConfig {
//!         tmdb_key: Some("my-tmdb-key".into()),
//!         ..UserConfig::default()
//!     };
//!     let request = ResolutionRequest::new("tt0111161", MediaKind::Movie, config);
//!     let streams = aggregator.resolve_all(&request, &client).await;
//!     println!("Found {} streams", streams.len());
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod fingerprint;
pub mod http_client;
pub mod metadata;
pub mod request;
pub mod resolver;
pub mod stream;
pub mod unpack;

#[cfg(test)]
pub(crate) mod test_support;

pub use cache::{CacheEntry, EmbedCache};
pub use config::UserConfig;
pub use error::ResolveError;
pub use fingerprint::{chrome_profile, BrowserProfile};
pub use http_client::{AcceleratedClient, FetchRequest, FetchResponse, Fetcher};
pub use metadata::{MediaMetadata, MetadataLookup, TmdbLookup};
pub use request::{MediaId, MediaKind, ResolutionRequest};
pub use resolver::{EmbedReference, HostKind};
pub use stream::{Aggregator, PlaybackHints, StreamProvider, StreamResponse, StreamResult};
pub use unpack::{unpack_in, PackedPayload};

/// Version of streamscout
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
