//! Fetch context shared by every provider and resolver.
//!
//! Features:
//! - HTTP/2 with fallback to HTTP/1.1
//! - TLS 1.3 via rustls
//! - Brotli, Zstd, Gzip compression (auto-negotiated)
//! - Cookie store and bounded redirect following
//! - Realistic browser fingerprinting
//! - A hard per-request timeout so one slow upstream cannot stall a request

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use crate::error::ResolveError;
use crate::fingerprint::{chrome_profile, BrowserProfile};

/// Ceiling applied to every individual fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// A single GET request.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    /// Extra headers on top of the client's browser profile.
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub basic_auth: Option<(String, String)>,
    pub timeout: Duration,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            query: Vec::new(),
            basic_auth: None,
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn basic_auth(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth = Some((user.into(), password.into()));
        self
    }
}

/// Status, final URL (after redirects) and decoded body of a fetch.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub url: String,
    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx answer into [`ResolveError::Status`].
    pub fn ensure_success(self) -> Result<Self, ResolveError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ResolveError::Status {
                url: self.url,
                status: self.status,
            })
        }
    }
}

/// Network fetch capability.
///
/// One implementation is built per incoming request and passed by reference
/// into every provider and resolver call.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Issue a GET, following redirects.
    async fn get(&self, request: FetchRequest) -> Result<FetchResponse>;

    /// User-Agent this fetcher presents upstream.
    fn user_agent(&self) -> &str;
}

/// HTTP client with a browser identity
pub struct AcceleratedClient {
    client: Client,
    profile: BrowserProfile,
}

impl AcceleratedClient {
    /// Create a client with a fresh Chrome profile
    pub fn new() -> Result<Self> {
        Self::with_profile(chrome_profile())
    }

    /// Create client with specific browser profile
    pub fn with_profile(profile: BrowserProfile) -> Result<Self> {
        let headers = profile.to_headers();

        let client = Client::builder()
            // ═══════════════════════════════════════════════════════════════
            // CONNECTION
            // ═══════════════════════════════════════════════════════════════
            // Don't assume HTTP/2 - let server negotiate
            .http2_adaptive_window(true)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .tcp_nodelay(true)
            // ═══════════════════════════════════════════════════════════════
            // TLS
            // ═══════════════════════════════════════════════════════════════
            .use_rustls_tls()
            // ═══════════════════════════════════════════════════════════════
            // COMPRESSION (auto-negotiated via Accept-Encoding)
            // ═══════════════════════════════════════════════════════════════
            .brotli(true)
            .zstd(true)
            .gzip(true)
            .deflate(true)
            // ═══════════════════════════════════════════════════════════════
            // BROWSER FINGERPRINTING
            // ═══════════════════════════════════════════════════════════════
            .default_headers(headers)
            // ═══════════════════════════════════════════════════════════════
            // TIMEOUTS
            // ═══════════════════════════════════════════════════════════════
            .connect_timeout(Duration::from_secs(5))
            .timeout(DEFAULT_FETCH_TIMEOUT)
            // ═══════════════════════════════════════════════════════════════
            // REDIRECTS & COOKIES
            // ═══════════════════════════════════════════════════════════════
            .redirect(reqwest::redirect::Policy::limited(10))
            .cookie_store(true)
            .build()?;

        Ok(Self { client, profile })
    }

    /// Browser profile this client was built with
    pub fn profile(&self) -> &BrowserProfile {
        &self.profile
    }
}

#[async_trait]
impl Fetcher for AcceleratedClient {
    #[instrument(skip(self, request), fields(url = %request.url))]
    async fn get(&self, request: FetchRequest) -> Result<FetchResponse> {
        debug!("Fetching");
        let mut builder = self.client.get(&request.url).timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some((user, password)) = &request.basic_auth {
            builder = builder.basic_auth(user, Some(password));
        }

        let response = builder.send().await.map_err(|source| {
            if source.is_timeout() {
                ResolveError::Timeout {
                    url: request.url.clone(),
                }
            } else {
                ResolveError::Transport {
                    url: request.url.clone(),
                    source,
                }
            }
        })?;

        let status = response.status().as_u16();
        let url = response.url().to_string();
        debug!(
            status,
            version = ?response.version(),
            content_encoding = ?response.headers().get("content-encoding"),
            "Response received"
        );

        let body = response.text().await.map_err(|source| ResolveError::Transport {
            url: url.clone(),
            source,
        })?;

        Ok(FetchResponse { status, url, body })
    }

    fn user_agent(&self) -> &str {
        &self.profile.user_agent
    }
}
