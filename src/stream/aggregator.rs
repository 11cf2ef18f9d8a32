//! Concurrent fan-out over all registered providers.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use futures::FutureExt;
use tracing::{error, info, instrument, warn};

use super::provider::{StreamProvider, StreamResult};
use super::providers::{GuardaHdProvider, VixProvider};
use crate::cache::EmbedCache;
use crate::http_client::Fetcher;
use crate::metadata::{MetadataLookup, TmdbLookup};
use crate::request::ResolutionRequest;

/// Runs every provider against one request and merges the results.
///
/// Output order is registration order, then each provider's own order.
/// Results are not deduplicated across providers.
pub struct Aggregator {
    providers: Vec<Arc<dyn StreamProvider>>,
}

impl Aggregator {
    pub fn new(providers: Vec<Arc<dyn StreamProvider>>) -> Self {
        Self { providers }
    }

    /// `VixSrc` then `GuardaHD`, both using TMDB for metadata.
    pub fn with_default_providers(cache: Option<Arc<EmbedCache>>) -> Self {
        let metadata: Arc<dyn MetadataLookup> = Arc::new(TmdbLookup::new());
        Self::new(vec![
            Arc::new(VixProvider::new(Arc::clone(&metadata))),
            Arc::new(GuardaHdProvider::new(metadata, cache)),
        ])
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Resolve streams from every provider concurrently.
    ///
    /// A provider that errors or panics contributes nothing; the others are
    /// unaffected. Never fails.
    #[instrument(skip_all, fields(id = %request.external_id, kind = %request.kind))]
    pub async fn resolve_all(
        &self,
        request: &ResolutionRequest,
        fetcher: &dyn Fetcher,
    ) -> Vec<StreamResult> {
        let runs = self
            .providers
            .iter()
            .map(|provider| run_isolated(provider.as_ref(), request, fetcher));

        let streams: Vec<StreamResult> = join_all(runs).await.into_iter().flatten().collect();
        info!("Total streams found: {}", streams.len());
        streams
    }
}

async fn run_isolated(
    provider: &dyn StreamProvider,
    request: &ResolutionRequest,
    fetcher: &dyn Fetcher,
) -> Vec<StreamResult> {
    let started = Instant::now();
    let outcome = AssertUnwindSafe(provider.get_stream(request, fetcher))
        .catch_unwind()
        .await;
    let elapsed = started.elapsed();

    match outcome {
        Ok(Ok(streams)) => {
            info!(
                provider = provider.name(),
                count = streams.len(),
                ?elapsed,
                "Provider finished"
            );
            streams
        }
        Ok(Err(e)) => {
            warn!(provider = provider.name(), ?elapsed, "Provider failed: {e:#}");
            Vec::new()
        }
        Err(_) => {
            error!(provider = provider.name(), "Provider panicked");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;

    use super::*;
    use crate::config::UserConfig;
    use crate::request::MediaKind;
    use crate::stream::provider::PlaybackHints;
    use crate::test_support::StubFetcher;

    enum Behaviour {
        Fail,
        Panic,
        Streams(Vec<&'static str>),
        Slow(Duration, &'static str),
    }

    struct FakeProvider {
        name: &'static str,
        behaviour: Behaviour,
    }

    fn stream(url: &str) -> StreamResult {
        StreamResult {
            name: "fake".into(),
            title: "fake".into(),
            url: url.into(),
            grouping_key: "fake".into(),
            playback_hints: PlaybackHints::default(),
        }
    }

    #[async_trait]
    impl StreamProvider for FakeProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn get_stream(
            &self,
            _request: &ResolutionRequest,
            _fetcher: &dyn Fetcher,
        ) -> Result<Vec<StreamResult>> {
            match &self.behaviour {
                Behaviour::Fail => Err(anyhow!("boom")),
                Behaviour::Panic => panic!("provider bug"),
                Behaviour::Streams(urls) => Ok(urls.iter().map(|u| stream(u)).collect()),
                Behaviour::Slow(delay, url) => {
                    tokio::time::sleep(*delay).await;
                    Ok(vec![stream(url)])
                }
            }
        }
    }

    fn aggregator(providers: Vec<(&'static str, Behaviour)>) -> Aggregator {
        Aggregator::new(
            providers
                .into_iter()
                .map(|(name, behaviour)| {
                    Arc::new(FakeProvider { name, behaviour }) as Arc<dyn StreamProvider>
                })
                .collect(),
        )
    }

    fn request() -> ResolutionRequest {
        ResolutionRequest::new("tt0111161", MediaKind::Movie, UserConfig::default())
    }

    #[tokio::test]
    async fn failing_provider_is_isolated() {
        let agg = aggregator(vec![
            ("fails", Behaviour::Fail),
            ("empty", Behaviour::Streams(vec![])),
            ("two", Behaviour::Streams(vec!["https://a/1", "https://a/2"])),
        ]);
        let streams = agg.resolve_all(&request(), &StubFetcher::new()).await;
        let urls: Vec<_> = streams.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a/1", "https://a/2"]);
    }

    #[tokio::test]
    async fn panicking_provider_is_isolated() {
        let agg = aggregator(vec![
            ("panics", Behaviour::Panic),
            ("one", Behaviour::Streams(vec!["https://b/1"])),
        ]);
        let streams = agg.resolve_all(&request(), &StubFetcher::new()).await;
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].url, "https://b/1");
    }

    #[tokio::test]
    async fn registration_order_wins_over_completion_order() {
        let agg = aggregator(vec![
            ("slow", Behaviour::Slow(Duration::from_millis(50), "https://slow/1")),
            ("fast", Behaviour::Streams(vec!["https://fast/1"])),
        ]);
        let streams = agg.resolve_all(&request(), &StubFetcher::new()).await;
        let urls: Vec<_> = streams.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(urls, vec!["https://slow/1", "https://fast/1"]);
    }

    #[tokio::test]
    async fn providers_run_concurrently() {
        let delay = Duration::from_millis(200);
        let agg = aggregator(vec![
            ("a", Behaviour::Slow(delay, "https://a/1")),
            ("b", Behaviour::Slow(delay, "https://b/1")),
            ("c", Behaviour::Slow(delay, "https://c/1")),
        ]);
        let started = Instant::now();
        let streams = agg.resolve_all(&request(), &StubFetcher::new()).await;
        assert_eq!(streams.len(), 3);
        assert!(started.elapsed() < delay * 3);
    }

    #[tokio::test]
    async fn duplicates_across_providers_are_kept() {
        let agg = aggregator(vec![
            ("a", Behaviour::Streams(vec!["https://same/1"])),
            ("b", Behaviour::Streams(vec!["https://same/1"])),
        ]);
        let streams = agg.resolve_all(&request(), &StubFetcher::new()).await;
        assert_eq!(streams.len(), 2);
    }

    #[tokio::test]
    async fn everything_empty_is_empty_list() {
        let agg = aggregator(vec![("fails", Behaviour::Fail)]);
        assert!(agg.resolve_all(&request(), &StubFetcher::new()).await.is_empty());
        assert!(Aggregator::new(vec![])
            .resolve_all(&request(), &StubFetcher::new())
            .await
            .is_empty());
    }

    #[test]
    fn default_providers_in_order() {
        let agg = Aggregator::with_default_providers(None);
        assert_eq!(agg.provider_names(), vec!["vixsrc", "guardahd"]);
    }
}
