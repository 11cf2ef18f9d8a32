//! Small text-extraction helpers shared by providers and resolvers.

use regex::Regex;
use scraper::{Html, Selector};

/// First capture group of `pattern` in `text`.
pub fn capture(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Rewrite `//host/path` to `https://host/path`; other input is returned trimmed.
pub fn absolutize(url: &str) -> String {
    let url = url.trim();
    if url.starts_with("//") {
        format!("https:{url}")
    } else {
        url.to_string()
    }
}

pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Text of every element matching `selector`, in document order.
pub fn select_texts(document: &Html, selector: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };
    document
        .select(&selector)
        .map(|el| el.text().collect::<String>())
        .collect()
}

/// Value of `attr` on every element matching `selector`, in document order.
pub fn select_attrs(document: &Html, selector: &str, attr: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter_map(|el| el.value().attr(attr))
        .map(str::to_string)
        .collect()
}
