//! Canned fetcher and fixtures for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::http_client::{FetchRequest, FetchResponse, Fetcher};

pub const STUB_USER_AGENT: &str = "Mozilla/5.0 (StubAgent)";

/// Serves fixed bodies by exact URL; unknown URLs fail like a refused connection.
#[derive(Default)]
pub struct StubFetcher {
    pages: HashMap<String, (u16, String)>,
    requests: Mutex<Vec<FetchRequest>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, body: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), (200, body.into()));
        self
    }

    pub fn status(mut self, url: &str, status: u16, body: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), (status, body.into()));
        self
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn get(&self, request: FetchRequest) -> Result<FetchResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let (status, body) = self
            .pages
            .get(&request.url)
            .cloned()
            .ok_or_else(|| anyhow!("connection refused: {}", request.url))?;
        Ok(FetchResponse {
            status,
            url: request.url,
            body,
        })
    }

    fn user_agent(&self) -> &str {
        STUB_USER_AGENT
    }
}

/// Build a packed invocation the way the packer emits it.
pub fn packed(payload: &str, radix: u32, dictionary: &[&str]) -> String {
    format!(
        "eval(function(p,a,c,k,e,d){{while(c--)if(k[c])p=p.replace(new RegExp('\\\\b'+c.toString(a)+'\\\\b','g'),k[c]);return p}}('{payload}',{radix},{count},'{words}'.split('|')))",
        count = dictionary.len(),
        words = dictionary.join("|"),
    )
}
