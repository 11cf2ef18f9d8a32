//! `MaxStream` resolver. The page carries the source unpacked.

use std::sync::LazyLock;

use regex::Regex;

use super::fetch_body;
use crate::extract::capture;
use crate::http_client::Fetcher;

static SOURCES_SRC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"sources\W+src\W+(.*)","#).expect("sources pattern"));

pub async fn resolve(fetcher: &dyn Fetcher, url: &str) -> Option<String> {
    let html = fetch_body(fetcher, url).await?;
    extract_direct_url(&html)
}

fn extract_direct_url(html: &str) -> Option<String> {
    let raw = capture(&SOURCES_SRC, html)?;
    let url = raw.replace('"', "").trim().to_string();
    (!url.is_empty()).then_some(url)
}
