//! Host resolvers: embed page URL → direct media URL.
//!
//! # Architecture
//!
//! - [`HostKind::classify`]: pure substring classification of an embed URL
//! - [`HostKind::resolve`]: dispatches to the matching host module
//! - [`EmbedReference`]: an embed URL paired with its host kind
//!
//! Resolvers never fail loudly: transport errors, bad status codes and
//! missing literals all come back as `None`.

pub mod maxstream;
pub mod mixdrop;
pub mod supervideo;

use std::fmt;

use tracing::debug;

use crate::extract::absolutize;
use crate::http_client::{FetchRequest, Fetcher};

/// Hosting site an embed URL points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostKind {
    Supervideo,
    Mixdrop,
    Maxstream,
    Unrecognized,
}

impl HostKind {
    /// Classify by containment of the host's name; first match wins.
    pub fn classify(url: &str) -> Self {
        let url = url.to_ascii_lowercase();
        if url.contains("supervideo") {
            HostKind::Supervideo
        } else if url.contains("mixdrop") {
            HostKind::Mixdrop
        } else if url.contains("maxstream") {
            HostKind::Maxstream
        } else {
            HostKind::Unrecognized
        }
    }

    pub fn is_supported(self) -> bool {
        self != HostKind::Unrecognized
    }

    /// Display label used in stream names.
    pub fn label(self) -> &'static str {
        match self {
            HostKind::Supervideo => "SuperVideo",
            HostKind::Mixdrop => "MixDrop",
            HostKind::Maxstream => "MaxStream",
            HostKind::Unrecognized => "Unknown",
        }
    }

    /// Run the host's resolver against `url`.
    pub async fn resolve(self, fetcher: &dyn Fetcher, url: &str) -> Option<String> {
        match self {
            HostKind::Supervideo => supervideo::resolve(fetcher, url).await,
            HostKind::Mixdrop => mixdrop::resolve(fetcher, url).await,
            HostKind::Maxstream => maxstream::resolve(fetcher, url).await,
            HostKind::Unrecognized => None,
        }
    }
}

impl fmt::Display for HostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Embed URL found on a scraped page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedReference {
    pub raw_url: String,
    pub host: HostKind,
}

impl EmbedReference {
    /// Absolutize a protocol-relative URL and classify it.
    pub fn new(url: &str) -> Self {
        let raw_url = absolutize(url);
        let host = HostKind::classify(&raw_url);
        Self { raw_url, host }
    }

    pub async fn resolve(&self, fetcher: &dyn Fetcher) -> Option<String> {
        self.host.resolve(fetcher, &self.raw_url).await
    }
}

/// Fetch an embed page, returning the body only for a 2xx answer.
pub(crate) async fn fetch_body(fetcher: &dyn Fetcher, url: &str) -> Option<String> {
    match fetcher.get(FetchRequest::new(url)).await {
        Ok(response) => match response.ensure_success() {
            Ok(response) => Some(response.body),
            Err(e) => {
                debug!("Embed fetch rejected: {e}");
                None
            }
        },
        Err(e) => {
            debug!("Embed fetch failed for {url}: {e:#}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubFetcher;

    #[test]
    fn classify_known_hosts() {
        assert_eq!(HostKind::classify("https://supervideo.tv/e/abc"), HostKind::Supervideo);
        assert_eq!(HostKind::classify("https://mixdrop.club/e/xyz"), HostKind::Mixdrop);
        assert_eq!(HostKind::classify("https://maxstream.video/emvvv/1"), HostKind::Maxstream);
        assert_eq!(HostKind::classify("https://SuperVideo.cc/e/ABC"), HostKind::Supervideo);
    }

    #[test]
    fn classify_unknown_host() {
        assert_eq!(HostKind::classify("https://example.com/x"), HostKind::Unrecognized);
        assert_eq!(HostKind::classify(""), HostKind::Unrecognized);
        assert!(!HostKind::classify("https://example.com/x").is_supported());
    }

    #[test]
    fn embed_reference_absolutizes_protocol_relative() {
        let embed = EmbedReference::new("//supervideo.tv/e/abc");
        assert_eq!(embed.raw_url, "https://supervideo.tv/e/abc");
        assert_eq!(embed.host, HostKind::Supervideo);
    }

    #[tokio::test]
    async fn unrecognized_host_never_fetches() {
        let fetcher = StubFetcher::new();
        let embed = EmbedReference::new("https://example.com/x");
        assert!(embed.resolve(&fetcher).await.is_none());
        assert!(fetcher.requests().is_empty());
    }

    #[tokio::test]
    async fn fetch_body_swallows_errors() {
        let fetcher = StubFetcher::new().status("https://supervideo.tv/e/gone", 404, "nope");
        assert!(fetch_body(&fetcher, "https://supervideo.tv/e/gone").await.is_none());
        assert!(fetch_body(&fetcher, "https://supervideo.tv/e/unknown").await.is_none());
    }
}
