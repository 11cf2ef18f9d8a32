//! Incoming resolution request and identifier parsing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::UserConfig;

/// Kind of title being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Series,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Movie => f.write_str("movie"),
            MediaKind::Series => f.write_str("series"),
        }
    }
}

impl FromStr for MediaKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "movie" => Ok(MediaKind::Movie),
            "series" | "tv" => Ok(MediaKind::Series),
            other => Err(anyhow::anyhow!("unknown media kind: {other}")),
        }
    }
}

/// An identifier split into its base id and optional episode coordinates.
///
/// `tt0903747:2:5` is season 2 episode 5 of `tt0903747`; `tt0111161` has no
/// episode part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaId {
    pub base: String,
    pub episode: Option<(String, String)>,
}

impl MediaId {
    pub fn parse(external_id: &str) -> Self {
        let mut parts = external_id.split(':');
        let base = parts.next().unwrap_or_default().to_string();
        let episode = match (parts.next(), parts.next()) {
            (Some(season), Some(episode)) if !season.is_empty() && !episode.is_empty() => {
                Some((season.to_string(), episode.to_string()))
            }
            _ => None,
        };
        Self { base, episode }
    }

    /// Season and episode, defaulting to the first episode.
    pub fn season_episode(&self) -> (&str, &str) {
        self.episode
            .as_ref()
            .map_or(("1", "1"), |(s, e)| (s.as_str(), e.as_str()))
    }
}

/// One incoming request; never mutated once built.
#[derive(Debug, Clone)]
pub struct ResolutionRequest {
    pub external_id: String,
    pub kind: MediaKind,
    pub config: UserConfig,
}

impl ResolutionRequest {
    pub fn new(external_id: impl Into<String>, kind: MediaKind, config: UserConfig) -> Self {
        Self {
            external_id: external_id.into(),
            kind,
            config,
        }
    }

    pub fn media_id(&self) -> MediaId {
        MediaId::parse(&self.external_id)
    }

    /// Movies ignore any episode suffix; series carry one when present.
    pub fn is_episode(&self) -> bool {
        self.kind == MediaKind::Series && self.media_id().episode.is_some()
    }
}
