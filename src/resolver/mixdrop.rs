//! `MixDrop` resolver.
//!
//! `MixDrop` always packs its player script; the media URL is the
//! `MDCore.wurl` assignment, usually protocol-relative.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::fetch_body;
use crate::extract::{absolutize, capture};
use crate::http_client::Fetcher;
use crate::unpack::unpack_in;

/// Domain spellings served by the same backend.
const DOMAIN_ALIASES: &[(&str, &str)] = &[("mixdrop.club", "mixdrop.cv")];

/// Path prefixes that identify a video; `/f/` is the download page of the same id.
const VIDEO_PATHS: &[&str] = &["/e/", "/f/"];

const EMBED_PATH: &str = "/e/";

static WURL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"wurl="([^"]+)""#).expect("wurl pattern"));

/// Canonicalize an embed URL to `https://<domain>/e/<id>`.
///
/// Aliased domains are rewritten, and everything after the video id (extra
/// path segments, query, fragment) is dropped.
pub fn normalize_url(url: &str) -> String {
    let mut url = url.trim().to_string();
    for (alias, canonical) in DOMAIN_ALIASES {
        if url.contains(alias) {
            url = url.replacen(alias, canonical, 1);
        }
    }

    for marker in VIDEO_PATHS {
        if let Some(pos) = url.find(marker) {
            let start = pos + marker.len();
            let rest = &url[start..];
            let id = rest.find(['/', '?', '#']).map_or(rest, |end| &rest[..end]);
            return format!("{}{EMBED_PATH}{id}", &url[..pos]);
        }
    }
    url
}

pub async fn resolve(fetcher: &dyn Fetcher, url: &str) -> Option<String> {
    let url = normalize_url(url);
    let html = fetch_body(fetcher, &url).await?;
    let direct = extract_direct_url(&html);
    if direct.is_none() {
        debug!("MixDrop: no wurl in {url}");
    }
    direct
}

fn extract_direct_url(html: &str) -> Option<String> {
    let script = unpack_in(html)?;
    capture(&WURL, &script).map(|wurl| absolutize(&wurl))
}
