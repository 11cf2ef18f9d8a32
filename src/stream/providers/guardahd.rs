//! `GuardaHD` provider
//!
//! Movies are addressed directly by IMDb id (`/movie/{id}`); series go
//! through the site search with the TMDB title, then the episode link is
//! picked from the series page. Each target page lists alternative players
//! as `<li data-link="...">` entries, which are handed to the host resolvers.
//!
//! The site sits behind bot protection, so every page fetch goes through the
//! user's MediaFlow-style proxy. Embed pages are fetched directly.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::{CacheEntry, EmbedCache};
use crate::error::ResolveError;
use crate::extract::{contains_ignore_case, select_attrs, select_texts};
use crate::http_client::{FetchRequest, Fetcher};
use crate::metadata::MetadataLookup;
use crate::request::{MediaKind, ResolutionRequest};
use crate::resolver::EmbedReference;
use crate::stream::provider::{PlaybackHints, StreamProvider, StreamResult};

const GUARDAHD_BASE: &str = "https://mostraguarda.stream";
const GROUPING_KEY: &str = "guardahd";
const PROXY_USER: &str = "admin";

pub struct GuardaHdProvider {
    site: String,
    site_host: String,
    metadata: Arc<dyn MetadataLookup>,
    cache: Option<Arc<EmbedCache>>,
}

/// Proxy endpoint and credentials taken from the user config.
struct Proxy {
    base: String,
    password: Option<String>,
}

impl Proxy {
    fn from_request(request: &ResolutionRequest) -> Option<Self> {
        let url = request.config.proxy_url()?;
        let base = if url.ends_with('/') {
            url.to_string()
        } else {
            format!("{url}/")
        };
        Some(Self {
            base,
            password: request.config.proxy_password().map(str::to_string),
        })
    }

    /// Request for `target` routed through the proxy.
    fn request(&self, target: &str) -> FetchRequest {
        let mut request = FetchRequest::new(format!("{}{target}", self.base)).headers([
            ("Referer", "https://google.com/"),
            (
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
            ),
        ]);
        if let Some(password) = &self.password {
            request = request
                .basic_auth(PROXY_USER, password.as_str())
                .header("X-Proxy-Password", password.as_str())
                .header("mfp-code", password.as_str());
        }
        request
    }
}

/// What a target page yields.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ScrapedPage {
    title: Option<String>,
    embed_urls: Vec<String>,
}

impl GuardaHdProvider {
    pub fn new(metadata: Arc<dyn MetadataLookup>, cache: Option<Arc<EmbedCache>>) -> Self {
        Self::with_site(GUARDAHD_BASE, metadata, cache)
    }

    pub fn with_site(
        site: impl Into<String>,
        metadata: Arc<dyn MetadataLookup>,
        cache: Option<Arc<EmbedCache>>,
    ) -> Self {
        let site = site.into().trim_end_matches('/').to_string();
        let site_host = Url::parse(&site)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();
        Self {
            site,
            site_host,
            metadata,
            cache,
        }
    }

    /// Fetch `target` through the proxy; `None` on any failure.
    async fn fetch_page(&self, fetcher: &dyn Fetcher, proxy: &Proxy, target: &str) -> Option<String> {
        match fetcher.get(proxy.request(target)).await {
            Ok(response) => match response.ensure_success() {
                Ok(response) => Some(response.body),
                Err(e) => {
                    warn!("GuardaHD: {e}");
                    None
                }
            },
            Err(e) => {
                warn!("GuardaHD fetch failed for {target}: {e:#}");
                None
            }
        }
    }

    /// Site URL of the page listing players for this request.
    async fn target_page(
        &self,
        request: &ResolutionRequest,
        fetcher: &dyn Fetcher,
        proxy: &Proxy,
    ) -> Option<(String, String)> {
        let id = request.media_id();
        match request.kind {
            MediaKind::Movie => Some((format!("{}/movie/{}", self.site, id.base), id.base)),
            MediaKind::Series => {
                let Some(api_key) = request.config.tmdb_key() else {
                    info!("GuardaHD series skipped: {}", ResolveError::MissingConfig("tmdb_key"));
                    return None;
                };
                let meta = self
                    .metadata
                    .find(fetcher, &request.external_id, request.kind, api_key)
                    .await?;
                let (season, episode) = id.season_episode();

                let search = format!("{}/?s={}", self.site, urlencoding::encode(&meta.title));
                let results = self.fetch_page(fetcher, proxy, &search).await?;
                let Some(series_url) = find_series_link(&results, &meta.title, &self.site) else {
                    debug!("GuardaHD: no search result for {}", meta.title);
                    return None;
                };

                let series_page = self.fetch_page(fetcher, proxy, &series_url).await?;
                let Some(episode_url) = find_episode_link(&series_page, season, episode, &self.site)
                else {
                    debug!("GuardaHD: episode {season}x{episode} not listed on {series_url}");
                    return None;
                };
                Some((episode_url, meta.title))
            }
        }
    }

    /// Embed URLs for the request, from cache when fresh.
    async fn embeds(
        &self,
        request: &ResolutionRequest,
        fetcher: &dyn Fetcher,
        proxy: &Proxy,
    ) -> Option<CacheEntry> {
        let key = if request.is_episode() {
            request.external_id.clone()
        } else {
            request.media_id().base
        };

        if let Some(cache) = &self.cache {
            cache.purge();
            if let Some(entry) = cache.get(&key) {
                info!("GuardaHD cache hit for {key}");
                return Some(entry);
            }
            info!("GuardaHD cache miss for {key}");
        }

        let (target, fallback_title) = self.target_page(request, fetcher, proxy).await?;
        let html = self.fetch_page(fetcher, proxy, &target).await?;
        let page = parse_page(&html, &self.site_host);
        if page.embed_urls.is_empty() {
            warn!("GuardaHD: no usable embeds on {target}");
            return None;
        }
        info!("GuardaHD found {} embeds", page.embed_urls.len());

        let entry = CacheEntry::new(page.embed_urls, page.title.unwrap_or(fallback_title));
        if let Some(cache) = &self.cache {
            cache.insert(key, entry.clone());
        }
        Some(entry)
    }
}

#[async_trait]
impl StreamProvider for GuardaHdProvider {
    fn name(&self) -> &'static str {
        "guardahd"
    }

    async fn get_stream(
        &self,
        request: &ResolutionRequest,
        fetcher: &dyn Fetcher,
    ) -> Result<Vec<StreamResult>> {
        let Some(proxy) = Proxy::from_request(request) else {
            info!("GuardaHD skipped: {}", ResolveError::MissingConfig("proxy_url"));
            return Ok(vec![]);
        };

        let Some(entry) = self.embeds(request, fetcher, &proxy).await else {
            return Ok(vec![]);
        };

        let embeds: Vec<EmbedReference> = entry
            .embed_urls
            .iter()
            .map(|url| EmbedReference::new(url))
            .filter(|embed| embed.host.is_supported())
            .collect();
        info!("GuardaHD resolving {} embeds", embeds.len());

        let resolved = join_all(embeds.iter().map(|embed| embed.resolve(fetcher))).await;

        let mut seen = HashSet::new();
        let mut streams = Vec::new();
        for (embed, direct) in embeds.iter().zip(resolved) {
            let Some(direct) = direct.filter(|url| !url.is_empty()) else {
                debug!("GuardaHD: {} did not resolve", embed.raw_url);
                continue;
            };
            if !seen.insert(direct.clone()) {
                continue;
            }
            streams.push(StreamResult {
                name: format!("🦁 GuardaHD\n⚡ {}", embed.host.label()),
                title: rich_description(&entry.title, "HD"),
                url: direct,
                grouping_key: GROUPING_KEY.to_string(),
                playback_hints: PlaybackHints::custom_player(fetcher.user_agent()),
            });
        }

        Ok(streams)
    }
}

fn rich_description(title: &str, quality: &str) -> String {
    let title = if title.is_empty() { "Video" } else { title };
    [
        format!("🎬 {title}"),
        "🇮🇹 ITA • 🔊 AAC".to_string(),
        format!("🎞️ {quality} • Streaming Web"),
        "☁️ Web Stream • ⚡ Instant".to_string(),
        "🦁 GuardaHD".to_string(),
    ]
    .join("\n")
}

/// Title and supported embed URLs of a target page, in page order.
fn parse_page(html: &str, site_host: &str) -> ScrapedPage {
    let document = Html::parse_document(html);

    let title = select_texts(&document, "h1")
        .into_iter()
        .next()
        .map(|t| t.replace("Streaming", "").trim().to_string())
        .filter(|t| !t.is_empty());

    let mut embed_urls: Vec<String> = Vec::new();
    for raw in select_attrs(&document, "li[data-link]", "data-link") {
        let embed = EmbedReference::new(&raw);
        let self_link = !site_host.is_empty() && embed.raw_url.contains(site_host);
        if !embed.raw_url.starts_with("http") || self_link || !embed.host.is_supported() {
            continue;
        }
        if !embed_urls.contains(&embed.raw_url) {
            embed_urls.push(embed.raw_url);
        }
    }

    ScrapedPage { title, embed_urls }
}

/// First search result whose text contains `title`.
fn find_series_link(html: &str, title: &str, site: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let anchors = Selector::parse("a[href]").ok()?;
    document
        .select(&anchors)
        .filter(|a| contains_ignore_case(&a.text().collect::<String>(), title))
        .find_map(|a| absolute_link(site, a.value().attr("href")?))
}

/// Link whose text names the episode (`2x5`, `2x05`, `02x05`, `S02E05`,
/// `Stagione 2 Episodio 5`).
fn find_episode_link(html: &str, season: &str, episode: &str, site: &str) -> Option<String> {
    let season: u32 = season.parse().ok()?;
    let episode: u32 = episode.parse().ok()?;
    let pattern = Regex::new(&format!(
        r"(?i)\b(?:{season}x{episode}|{season}x{episode:02}|{season:02}x{episode:02}|s{season:02}e{episode:02}|(?:season|stagione)\s+{season}\s+(?:episode|episodio)\s+{episode})\b"
    ))
    .ok()?;

    let document = Html::parse_document(html);
    let anchors = Selector::parse("a[href]").ok()?;
    document
        .select(&anchors)
        .filter(|a| pattern.is_match(&a.text().collect::<String>()))
        .find_map(|a| absolute_link(site, a.value().attr("href")?))
}

fn absolute_link(site: &str, href: &str) -> Option<String> {
    let base = Url::parse(&format!("{site}/")).ok()?;
    base.join(href.trim()).ok().map(String::from)
}
