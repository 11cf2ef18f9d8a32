//! `SuperVideo` resolver.
//!
//! The player setup is usually packed; the direct URL is the `file:"..."`
//! literal of the jwplayer config, with `src:'...'` as a fallback.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::fetch_body;
use crate::extract::capture;
use crate::http_client::Fetcher;
use crate::unpack::unpack_in;

static FILE_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"file:\s*"([^"]+)""#).expect("file literal pattern"));

static SRC_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"src:\s*'([^']+)'").expect("src literal pattern"));

pub async fn resolve(fetcher: &dyn Fetcher, url: &str) -> Option<String> {
    let html = fetch_body(fetcher, url).await?;
    let direct = extract_direct_url(&html);
    if direct.is_none() {
        debug!("SuperVideo: no media literal in {url}");
    }
    direct
}

fn extract_direct_url(html: &str) -> Option<String> {
    let text = unpack_in(html).unwrap_or_else(|| html.to_string());
    capture(&FILE_LITERAL, &text).or_else(|| capture(&SRC_LITERAL, &text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{packed, StubFetcher};

    #[test]
    fn file_literal_from_packed_script() {
        let html = format!(
            "<html><script>{}</script></html>",
            packed(
                r#"0({1:"2://3.4/5.6"})"#,
                10,
                &["setup", "file", "https", "sv", "cdn", "aaa", "m3u8"],
            )
        );
        assert_eq!(
            extract_direct_url(&html).as_deref(),
            Some("https://sv.cdn/aaa.m3u8")
        );
    }

    #[test]
    fn raw_page_without_packing() {
        let html = r#"<script>jwplayer().setup({sources:[{file: "https://sv.cdn/raw.mp4"}]})</script>"#;
        assert_eq!(extract_direct_url(html).as_deref(), Some("https://sv.cdn/raw.mp4"));
    }

    #[test]
    fn src_literal_fallback() {
        let html = "<script>player({src: 'https://sv.cdn/alt.m3u8'})</script>";
        assert_eq!(extract_direct_url(html).as_deref(), Some("https://sv.cdn/alt.m3u8"));
    }

    #[tokio::test]
    async fn missing_literal_is_none() {
        let fetcher = StubFetcher::new().page("https://supervideo.tv/e/x", "<html>File not found</html>");
        assert!(resolve(&fetcher, "https://supervideo.tv/e/x").await.is_none());
    }

    #[tokio::test]
    async fn resolves_through_fetcher() {
        let fetcher = StubFetcher::new().page(
            "https://supervideo.tv/e/ok",
            r#"<script>setup({file:"https://sv.cdn/ok.m3u8"})</script>"#,
        );
        assert_eq!(
            resolve(&fetcher, "https://supervideo.tv/e/ok").await.as_deref(),
            Some("https://sv.cdn/ok.m3u8")
        );
    }
}
