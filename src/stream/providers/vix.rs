//! `VixSrc` provider
//!
//! Pages are addressed by TMDB id (`/movie/{id}/`, `/tv/{id}/{s}/{e}/`). The
//! first inline body script carries a signed master playlist: a server URL
//! plus `token` and `expires` parameters.

use std::sync::{Arc, LazyLock};

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use scraper::Html;
use tracing::{debug, info, warn};

use crate::error::ResolveError;
use crate::extract::{capture, select_texts};
use crate::http_client::{FetchRequest, Fetcher};
use crate::metadata::MetadataLookup;
use crate::request::{MediaKind, ResolutionRequest};
use crate::stream::provider::{PlaybackHints, StreamProvider, StreamResult};

const VIX_BASE: &str = "https://vixsrc.to";
const PLAYLIST_SUFFIX: &str = ".m3u8";

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"['"]?token['"]?\s*[:=]\s*['"](\w+)['"]"#).expect("token pattern")
});
static EXPIRES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"['"]?expires['"]?\s*[:=]\s*['"](\d+)['"]"#).expect("expires pattern")
});
static SERVER_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\burl:\s*'([^']+)'").expect("server url pattern"));
static QUALITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"['"]?quality['"]?\s*:\s*(\d+)"#).expect("quality pattern"));
static FULL_HD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"canPlayFHD\s*=\s*true").expect("fhd pattern"));

pub struct VixProvider {
    base_url: String,
    metadata: Arc<dyn MetadataLookup>,
}

impl VixProvider {
    pub fn new(metadata: Arc<dyn MetadataLookup>) -> Self {
        Self::with_base_url(VIX_BASE, metadata)
    }

    pub fn with_base_url(base_url: impl Into<String>, metadata: Arc<dyn MetadataLookup>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            metadata,
        }
    }

    fn page_url(&self, request: &ResolutionRequest, tmdb_id: &str) -> String {
        match request.kind {
            MediaKind::Movie => format!("{}/movie/{tmdb_id}/", self.base_url),
            MediaKind::Series => {
                let id = request.media_id();
                let (season, episode) = id.season_episode();
                format!("{}/tv/{tmdb_id}/{season}/{episode}/", self.base_url)
            }
        }
    }
}

#[async_trait]
impl StreamProvider for VixProvider {
    fn name(&self) -> &'static str {
        "vixsrc"
    }

    async fn get_stream(
        &self,
        request: &ResolutionRequest,
        fetcher: &dyn Fetcher,
    ) -> Result<Vec<StreamResult>> {
        let Some(api_key) = request.config.tmdb_key() else {
            info!("VixSrc skipped: {}", ResolveError::MissingConfig("tmdb_key"));
            return Ok(vec![]);
        };

        let Some(meta) = self
            .metadata
            .find(fetcher, &request.external_id, request.kind, api_key)
            .await
        else {
            warn!("VixSrc: no metadata for {}", request.external_id);
            return Ok(vec![]);
        };

        let page_url = self.page_url(request, &meta.provider_id);
        info!("VixSrc scraping {page_url}");

        let fetch = FetchRequest::new(&page_url)
            .header("Referer", format!("{}/", self.base_url))
            .header("Origin", self.base_url.as_str());
        let html = match fetcher.get(fetch).await.map(|r| r.ensure_success()) {
            Ok(Ok(response)) => response.body,
            Ok(Err(e)) => {
                warn!("VixSrc: {e}");
                return Ok(vec![]);
            }
            Err(e) => {
                warn!("VixSrc fetch failed: {e:#}");
                return Ok(vec![]);
            }
        };

        let Some(player) = PlayerConfig::from_page(&html) else {
            debug!("VixSrc: player config not found on {page_url}");
            return Ok(vec![]);
        };

        Ok(vec![StreamResult {
            name: "VixSrc".to_string(),
            title: format!("VixCloud {}\n{}", player.quality_label(), meta.title),
            url: player.playlist_url(),
            grouping_key: "vixsrc".to_string(),
            playback_hints: PlaybackHints::custom_player(fetcher.user_agent()),
        }])
    }
}

/// Signed playlist parameters read from the player script.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PlayerConfig {
    token: String,
    expires: String,
    server_url: String,
    quality: Option<String>,
    full_hd: bool,
}

impl PlayerConfig {
    /// Parse from the first body script that carries a token.
    fn from_page(html: &str) -> Option<Self> {
        let document = Html::parse_document(html);
        let scripts = select_texts(&document, "body script");
        let script = scripts.iter().find(|s| TOKEN.is_match(s))?;
        Self::from_script(script)
    }

    fn from_script(script: &str) -> Option<Self> {
        Some(Self {
            token: capture(&TOKEN, script)?,
            expires: capture(&EXPIRES, script)?,
            server_url: capture(&SERVER_URL, script)?,
            quality: capture(&QUALITY, script),
            full_hd: FULL_HD.is_match(script),
        })
    }

    fn quality_label(&self) -> String {
        self.quality
            .as_ref()
            .map_or_else(|| "HD".to_string(), |q| format!("{q}p"))
    }

    /// Signed URL rewritten to point at the HLS playlist.
    fn playlist_url(&self) -> String {
        let separator = if self.server_url.contains('?') { '&' } else { '?' };
        let mut url = format!(
            "{}{separator}token={}&expires={}",
            self.server_url, self.token, self.expires
        );
        if self.full_hd {
            url.push_str("&h=1");
        }
        insert_playlist_suffix(&url)
    }
}

/// Put [`PLAYLIST_SUFFIX`] right before the query string, replacing a file
/// extension on the last path segment if there is one.
fn insert_playlist_suffix(url: &str) -> String {
    let (path, query) = match url.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (url, None),
    };

    let host_start = path.find("://").map_or(0, |i| i + 3);
    let stem = match path[host_start..].find('/') {
        Some(first_slash) => {
            let path_start = host_start + first_slash;
            let segment_start = path[path_start..]
                .rfind('/')
                .map_or(path_start, |i| path_start + i + 1);
            match path[segment_start..].rfind('.') {
                Some(dot) => &path[..segment_start + dot],
                None => path,
            }
        }
        None => path,
    };

    match query {
        Some(query) => format!("{stem}{PLAYLIST_SUFFIX}?{query}"),
        None => format!("{stem}{PLAYLIST_SUFFIX}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UserConfig;
    use crate::metadata::MediaMetadata;
    use crate::test_support::{StubFetcher, STUB_USER_AGENT};

    struct StaticLookup(Option<MediaMetadata>);

    #[async_trait]
    impl MetadataLookup for StaticLookup {
        async fn find(
            &self,
            _fetcher: &dyn Fetcher,
            _external_id: &str,
            _kind: MediaKind,
            _api_key: &str,
        ) -> Option<MediaMetadata> {
            self.0.clone()
        }
    }

    fn shawshank() -> Arc<dyn MetadataLookup> {
        Arc::new(StaticLookup(Some(MediaMetadata {
            provider_id: "278".into(),
            title: "The Shawshank Redemption".into(),
            year: "1994".into(),
        })))
    }

    fn config() -> UserConfig {
        UserConfig {
            tmdb_key: Some("key".into()),
            ..UserConfig::default()
        }
    }

    const PLAYER_PAGE: &str = r#"<html><head><script>var analytics = 1;</script></head><body>
<div id="app"></div>
<script>
    window.video = {"id":278,"name":"The Shawshank Redemption","quality":1080};
    window.masterPlaylist = {
        params: { token='abc123', expires='99999' },
        url: 'https://cdn.example/play.mp4?x=1',
    }
</script>
</body></html>"#;

    #[test]
    fn playlist_suffix_placement() {
        assert_eq!(
            insert_playlist_suffix("https://cdn.example/play.mp4?x=1&token=t"),
            "https://cdn.example/play.m3u8?x=1&token=t"
        );
        assert_eq!(
            insert_playlist_suffix("https://vixsrc.to/playlist/12345?token=t"),
            "https://vixsrc.to/playlist/12345.m3u8?token=t"
        );
        assert_eq!(
            insert_playlist_suffix("https://cdn.example?token=t"),
            "https://cdn.example.m3u8?token=t"
        );
    }

    #[test]
    fn playlist_url_separator_and_fhd() {
        let player = PlayerConfig {
            token: "tok".into(),
            expires: "1".into(),
            server_url: "https://vixsrc.to/playlist/9".into(),
            quality: None,
            full_hd: true,
        };
        assert_eq!(
            player.playlist_url(),
            "https://vixsrc.to/playlist/9.m3u8?token=tok&expires=1&h=1"
        );
        assert_eq!(player.quality_label(), "HD");
    }

    #[test]
    fn player_config_requires_all_fields() {
        assert!(PlayerConfig::from_script("token='a', url: 'https://x/y'").is_none());
        let parsed =
            PlayerConfig::from_script("'token': 'a1', 'expires': '5', url: 'https://x/y'").unwrap();
        assert_eq!(parsed.token, "a1");
        assert_eq!(parsed.expires, "5");
        assert!(!parsed.full_hd);
    }

    #[tokio::test]
    async fn movie_end_to_end() {
        let fetcher = StubFetcher::new().page("https://vixsrc.to/movie/278/", PLAYER_PAGE);
        let provider = VixProvider::new(shawshank());
        let request = ResolutionRequest::new("tt0111161", MediaKind::Movie, config());

        let streams = provider.get_stream(&request, &fetcher).await.unwrap();
        assert_eq!(streams.len(), 1);
        let stream = &streams[0];
        assert_eq!(
            stream.url,
            "https://cdn.example/play.m3u8?x=1&token=abc123&expires=99999"
        );
        assert_eq!(stream.name, "VixSrc");
        assert_eq!(stream.title, "VixCloud 1080p\nThe Shawshank Redemption");
        assert!(stream.playback_hints.requires_custom_player);
        assert_eq!(
            stream.playback_hints.forwarded_request_headers["User-Agent"],
            STUB_USER_AGENT
        );

        let sent = &fetcher.requests()[0];
        assert!(sent
            .headers
            .contains(&("Referer".to_string(), "https://vixsrc.to/".to_string())));
    }

    #[tokio::test]
    async fn series_page_url_uses_season_and_episode() {
        let page = PLAYER_PAGE.replace("'99999' }", "'99999' }; window.canPlayFHD = true");
        let fetcher = StubFetcher::new().page("https://vixsrc.to/tv/278/2/5/", page);
        let provider = VixProvider::new(shawshank());
        let request = ResolutionRequest::new("tt0111161:2:5", MediaKind::Series, config());

        let streams = provider.get_stream(&request, &fetcher).await.unwrap();
        assert_eq!(streams.len(), 1);
        assert!(streams[0].url.ends_with("&expires=99999&h=1"));
    }

    #[tokio::test]
    async fn missing_key_skips_network() {
        let fetcher = StubFetcher::new();
        let provider = VixProvider::new(shawshank());
        let request = ResolutionRequest::new("tt0111161", MediaKind::Movie, UserConfig::default());
        assert!(provider.get_stream(&request, &fetcher).await.unwrap().is_empty());
        assert!(fetcher.requests().is_empty());
    }

    #[tokio::test]
    async fn unknown_title_is_empty() {
        let fetcher = StubFetcher::new();
        let provider = VixProvider::new(Arc::new(StaticLookup(None)));
        let request = ResolutionRequest::new("tt0000000", MediaKind::Movie, config());
        assert!(provider.get_stream(&request, &fetcher).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upstream_error_is_empty() {
        let fetcher = StubFetcher::new().status("https://vixsrc.to/movie/278/", 403, "denied");
        let provider = VixProvider::new(shawshank());
        let request = ResolutionRequest::new("tt0111161", MediaKind::Movie, config());
        assert!(provider.get_stream(&request, &fetcher).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn page_without_token_is_empty() {
        let fetcher = StubFetcher::new().page(
            "https://vixsrc.to/movie/278/",
            "<html><body><script>var nothing = 1;</script></body></html>",
        );
        let provider = VixProvider::new(shawshank());
        let request = ResolutionRequest::new("tt0111161", MediaKind::Movie, config());
        assert!(provider.get_stream(&request, &fetcher).await.unwrap().is_empty());
    }
}
