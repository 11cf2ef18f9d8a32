//! Stream provider trait and result types.
//!
//! A [`StreamProvider`] knows how to turn a [`ResolutionRequest`] into
//! playable [`StreamResult`]s for one source site (`VixSrc`, `GuardaHD`).

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use serde::ser::{Serialize, Serializer};

use crate::http_client::Fetcher;
use crate::request::ResolutionRequest;

/// Hints telling the player how to open a URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackHints {
    /// The URL does not play in a plain web video element (e.g. HLS behind
    /// header checks) and needs an external or proxying player.
    pub requires_custom_player: bool,
    /// Request headers the player must replay to be served.
    pub forwarded_request_headers: BTreeMap<String, String>,
}

impl PlaybackHints {
    /// Hints for a URL that must be fetched with the resolving client's identity.
    pub fn custom_player(user_agent: &str) -> Self {
        Self {
            requires_custom_player: true,
            forwarded_request_headers: BTreeMap::from([(
                "User-Agent".to_string(),
                user_agent.to_string(),
            )]),
        }
    }
}

/// One playable source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamResult {
    /// Short label (provider and host).
    pub name: String,
    /// Multi-line human description.
    pub title: String,
    /// Direct playable URL; never empty.
    pub url: String,
    /// Groups alternates of the same title for binge playback.
    pub grouping_key: String,
    pub playback_hints: PlaybackHints,
}

/// Payload returned to the HTTP layer.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct StreamResponse {
    pub streams: Vec<StreamResult>,
}

impl StreamResponse {
    pub fn new(streams: Vec<StreamResult>) -> Self {
        Self { streams }
    }
}

// Wire shape expected by addon clients

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct WireStream<'a> {
    name: &'a str,
    title: &'a str,
    url: &'a str,
    behavior_hints: WireHints<'a>,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct WireHints<'a> {
    binge_group: &'a str,
    not_web_ready: bool,
    proxy_headers: WireProxyHeaders<'a>,
}

#[derive(serde::Serialize)]
struct WireProxyHeaders<'a> {
    request: &'a BTreeMap<String, String>,
}

impl Serialize for StreamResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireStream {
            name: &self.name,
            title: &self.title,
            url: &self.url,
            behavior_hints: WireHints {
                binge_group: &self.grouping_key,
                not_web_ready: self.playback_hints.requires_custom_player,
                proxy_headers: WireProxyHeaders {
                    request: &self.playback_hints.forwarded_request_headers,
                },
            },
        }
        .serialize(serializer)
    }
}

/// Trait for source-site providers.
///
/// Implementations return `Ok(vec![])` for every expected failure (missing
/// configuration, upstream errors, nothing found). An `Err` or a panic is
/// still contained by the aggregator, but only costs this provider's results.
#[async_trait]
pub trait StreamProvider: Send + Sync {
    /// Short provider name (e.g., `"vixsrc"`, `"guardahd"`).
    fn name(&self) -> &'static str;

    /// Resolve streams for `request` using the shared `fetcher`.
    async fn get_stream(
        &self,
        request: &ResolutionRequest,
        fetcher: &dyn Fetcher,
    ) -> Result<Vec<StreamResult>>;
}
