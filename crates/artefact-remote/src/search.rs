//! Source news search.

use std::time::Duration;

use artefact_types::{CalendarKey, SourceItem};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{RemoteError, Result, ServiceKind};

const KIND: ServiceKind = ServiceKind::SourceSearch;

/// Default Tavily search endpoint.
pub const DEFAULT_TAVILY_URL: &str = "https://api.tavily.com/search";

/// Finds candidate source items for a calendar key.
#[async_trait]
pub trait SourceSearch: Send + Sync {
    /// Search for news from the day before `key`.
    async fn search(&self, key: CalendarKey) -> Result<Vec<SourceItem>>;
}

/// The query for news on the day before `key`.
pub fn query_for(key: CalendarKey) -> String {
    let day = key.pred().unwrap_or(key);
    format!(
        "global news events on {day} focusing on cultural shifts, strange discoveries, \
         technology ethics, or environmental changes -politics -finance -sports -markets"
    )
}

#[derive(Debug, Clone)]
pub struct TavilyConfig {
    pub api_key: String,
    pub url: String,
    pub max_results: u32,
    pub days: u32,
    pub exclude_domains: Vec<String>,
    pub timeout: Duration,
}

impl TavilyConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            url: DEFAULT_TAVILY_URL.to_string(),
            max_results: 15,
            days: 3,
            exclude_domains: Vec::new(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_max_results(mut self, max: u32) -> Self {
        self.max_results = max;
        self
    }

    pub fn with_days(mut self, days: u32) -> Self {
        self.days = days;
        self
    }

    pub fn with_exclude_domains(mut self, domains: Vec<String>) -> Self {
        self.exclude_domains = domains;
        self
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: String,
    topic: &'static str,
    days: u32,
    search_depth: &'static str,
    include_answer: bool,
    include_raw_content: bool,
    max_results: u32,
    exclude_domains: &'a [String],
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SourceItem>,
}

pub struct TavilySearch {
    client: Client,
    config: TavilyConfig,
}

impl TavilySearch {
    pub fn new(config: TavilyConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(RemoteError::Config("search API key is empty".to_string()));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RemoteError::Internal(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl SourceSearch for TavilySearch {
    async fn search(&self, key: CalendarKey) -> Result<Vec<SourceItem>> {
        let request = SearchRequest {
            api_key: &self.config.api_key,
            query: query_for(key),
            topic: "news",
            days: self.config.days,
            search_depth: "advanced",
            include_answer: false,
            include_raw_content: false,
            max_results: self.config.max_results,
            exclude_domains: &self.config.exclude_domains,
        };

        let response = self
            .client
            .post(&self.config.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RemoteError::transport(KIND, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RemoteError::transport(KIND, e))?;
        if !status.is_success() {
            return Err(RemoteError::status(KIND, status.as_u16(), body));
        }

        let parsed: SearchResponse =
            serde_json::from_str(&body).map_err(|e| RemoteError::decode(KIND, e))?;
        tracing::debug!(key = %key, results = parsed.results.len(), "Source search complete");
        Ok(parsed.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_targets_day_before() {
        let key = CalendarKey::parse("2024-03-01").unwrap();
        let query = query_for(key);
        assert!(query.contains("on 2024-02-29"));
        assert!(query.contains("-politics"));
    }
}
