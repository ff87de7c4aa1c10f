//! Web search through a SearxNG-compatible JSON endpoint

use crate::config::core::WebSearchConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const SEARCH_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WebSearchError {
    #[error("Web search is not configured (set [web_search].endpoint)")]
    NotConfigured,
    #[error("Network error during web search: {0}")]
    Network(String),
    #[error("Invalid search response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: String,
}

pub struct WebSearchClient {
    http_client: reqwest::Client,
    endpoint: Option<String>,
    max_results: usize,
}

impl WebSearchClient {
    pub fn new(config: &WebSearchConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(SEARCH_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http_client,
            endpoint: config.endpoint.clone().filter(|url| !url.trim().is_empty()),
            max_results: config.max_results.max(1),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>, WebSearchError> {
        let endpoint = self.endpoint.as_deref().ok_or(WebSearchError::NotConfigured)?;

        let response = self
            .http_client
            .get(endpoint)
            .query(&[("q", query), ("format", "json")])
            .send()
            .await
            .map_err(|err| WebSearchError::Network(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WebSearchError::Network(format!("HTTP {status}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| WebSearchError::InvalidResponse(err.to_string()))?;
        let results = parse_search_response(&body, self.max_results)?;
        debug!(query, results = results.len(), "web search finished");
        Ok(results)
    }
}

/// Pull `results[].{title,url,content}` out of a SearxNG JSON body
pub fn parse_search_response(
    body: &Value,
    max_results: usize,
) -> Result<Vec<SearchResult>, WebSearchError> {
    let items = body
        .get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| WebSearchError::InvalidResponse("missing 'results' list".to_string()))?;

    Ok(items
        .iter()
        .filter_map(|item| {
            let url = item.get("url")?.as_str()?.to_string();
            let title = item
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or(&url)
                .to_string();
            let snippet = item
                .get("content")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            Some(SearchResult {
                title,
                url,
                snippet,
            })
        })
        .take(max_results)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_and_caps_results() {
        let body = json!({
            "results": [
                {"title": "Rust", "url": "https://www.rust-lang.org", "content": "A language"},
                {"url": "https://docs.rs"},
                {"title": "no url"},
                {"title": "Third", "url": "https://crates.io"}
            ]
        });
        let results = parse_search_response(&body, 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].snippet, "A language");
        assert_eq!(results[1].title, "https://docs.rs");
    }

    #[test]
    fn empty_results_are_fine_but_missing_list_is_not() {
        assert!(parse_search_response(&json!({"results": []}), 5).unwrap().is_empty());
        assert!(matches!(
            parse_search_response(&json!({"error": "x"}), 5),
            Err(WebSearchError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn unconfigured_client_refuses() {
        let client = WebSearchClient::new(&WebSearchConfig::default());
        assert!(!client.is_configured());
        assert_eq!(
            client.search("rust").await,
            Err(WebSearchError::NotConfigured)
        );
    }
}
