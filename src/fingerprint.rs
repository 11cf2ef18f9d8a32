//! Browser Fingerprint
//!
//! Embed hosts block clients that do not look like a desktop browser, so
//! every fetch carries a realistic Chrome header set. The profile is picked
//! once per client and never changes while requests are in flight.

use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, USER_AGENT,
};

/// Browser profile with realistic fingerprint
#[derive(Debug, Clone)]
pub struct BrowserProfile {
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
    pub accept_encoding: String,
    pub sec_ch_ua: String,
    pub sec_ch_ua_mobile: String,
    pub sec_ch_ua_platform: String,
    pub sec_fetch_dest: String,
    pub sec_fetch_mode: String,
    pub sec_fetch_site: String,
    pub sec_fetch_user: String,
}

/// Recent Chrome releases (major, full)
const CHROME_VERSIONS: &[(&str, &str)] = &[
    ("139", "139.0.0.0"),
    ("138", "138.0.0.0"),
    ("137", "137.0.0.0"),
    ("131", "131.0.0.0"),
    ("121", "121.0.0.0"),
];

/// Platform configurations
#[derive(Debug, Clone, Copy)]
pub enum Platform {
    MacOS,
    Windows,
    Linux,
}

impl Platform {
    fn random() -> Self {
        let mut rng = rand::thread_rng();
        // Realistic distribution: Windows 65%, macOS 20%, Linux 15%
        let roll: f32 = rng.gen();
        if roll < 0.65 {
            Platform::Windows
        } else if roll < 0.85 {
            Platform::MacOS
        } else {
            Platform::Linux
        }
    }

    fn os_string(self) -> &'static str {
        match self {
            Platform::MacOS => "Macintosh; Intel Mac OS X 10_15_7",
            Platform::Windows => "Windows NT 10.0; Win64; x64",
            Platform::Linux => "X11; Linux x86_64",
        }
    }

    fn sec_ch_platform(self) -> &'static str {
        match self {
            Platform::MacOS => "\"macOS\"",
            Platform::Windows => "\"Windows\"",
            Platform::Linux => "\"Linux\"",
        }
    }
}

/// Generate a realistic Chrome browser profile
#[must_use]
pub fn chrome_profile() -> BrowserProfile {
    let mut rng = rand::thread_rng();
    let platform = Platform::random();
    let (major, full) = CHROME_VERSIONS
        .choose(&mut rng)
        .copied()
        .unwrap_or(CHROME_VERSIONS[0]);

    let user_agent = format!(
        "Mozilla/5.0 ({}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{full} Safari/537.36",
        platform.os_string(),
    );

    let brands = [
        format!("\"Google Chrome\";v=\"{major}\""),
        format!("\"Chromium\";v=\"{major}\""),
        "\"Not_A Brand\";v=\"24\"".to_string(),
    ];

    BrowserProfile {
        user_agent,
        accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7".to_string(),
        accept_language: random_accept_language(),
        accept_encoding: "gzip, deflate, br, zstd".to_string(),
        sec_ch_ua: brands.join(", "),
        sec_ch_ua_mobile: "?0".to_string(),
        sec_ch_ua_platform: platform.sec_ch_platform().to_string(),
        sec_fetch_dest: "document".to_string(),
        sec_fetch_mode: "navigate".to_string(),
        sec_fetch_site: "none".to_string(),
        sec_fetch_user: "?1".to_string(),
    }
}

/// Accept-Language values weighted towards the Italian sites we scrape
fn random_accept_language() -> String {
    let mut rng = rand::thread_rng();
    let languages = [
        "it-IT,it;q=0.9,en-US;q=0.8,en;q=0.7",
        "it-IT,it;q=0.9",
        "it,en-US;q=0.9,en;q=0.8",
        "en-US,en;q=0.9,it;q=0.8",
    ];
    languages
        .choose(&mut rng)
        .copied()
        .unwrap_or(languages[0])
        .to_string()
}

impl BrowserProfile {
    /// Convert profile to reqwest `HeaderMap`
    ///
    /// Values that are not valid header text are skipped.
    pub fn to_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        insert(&mut headers, USER_AGENT, &self.user_agent);
        insert(&mut headers, ACCEPT, &self.accept);
        insert(&mut headers, ACCEPT_LANGUAGE, &self.accept_language);
        insert(&mut headers, ACCEPT_ENCODING, &self.accept_encoding);

        if !self.sec_ch_ua.is_empty() {
            insert(&mut headers, HeaderName::from_static("sec-ch-ua"), &self.sec_ch_ua);
            insert(
                &mut headers,
                HeaderName::from_static("sec-ch-ua-mobile"),
                &self.sec_ch_ua_mobile,
            );
            insert(
                &mut headers,
                HeaderName::from_static("sec-ch-ua-platform"),
                &self.sec_ch_ua_platform,
            );
        }

        insert(&mut headers, HeaderName::from_static("sec-fetch-dest"), &self.sec_fetch_dest);
        insert(&mut headers, HeaderName::from_static("sec-fetch-mode"), &self.sec_fetch_mode);
        insert(&mut headers, HeaderName::from_static("sec-fetch-site"), &self.sec_fetch_site);
        insert(&mut headers, HeaderName::from_static("sec-fetch-user"), &self.sec_fetch_user);

        headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));

        headers
    }
}

fn insert(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chrome_profile() {
        let profile = chrome_profile();
        assert!(profile.user_agent.contains("Chrome"));
        assert!(profile.user_agent.starts_with("Mozilla/5.0 ("));
        assert!(!profile.sec_ch_ua.is_empty());
    }

    #[test]
    fn test_headers_conversion() {
        let profile = chrome_profile();
        let headers = profile.to_headers();
        assert!(headers.contains_key(USER_AGENT));
        assert!(headers.contains_key(ACCEPT));
        assert!(headers.contains_key("sec-ch-ua"));
        assert_eq!(headers.get(USER_AGENT).unwrap(), profile.user_agent.as_str());
    }

    #[test]
    fn test_invalid_header_value_skipped() {
        let mut profile = chrome_profile();
        profile.accept_language = "bad\nvalue".to_string();
        let headers = profile.to_headers();
        assert!(!headers.contains_key(ACCEPT_LANGUAGE));
        assert!(headers.contains_key(USER_AGENT));
    }
}
