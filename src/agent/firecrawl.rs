// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Apo and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Web search through Firecrawl's `/search` endpoint.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::ProviderConfig;

pub const DEFAULT_SEARCH_RESULTS: u32 = 6;
pub const MAX_SEARCH_RESULTS: u32 = 10;
pub const DEFAULT_TBS: &str = "w";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub fn default_sources() -> Vec<String> {
    vec!["web".to_owned(), "news".to_owned()]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchRequest {
    pub query: String,
    pub limit: u32,
    /// Time filter, e.g. `w` for the past week.
    pub tbs: String,
    pub sources: Vec<String>,
}

impl SearchRequest {
    /// Applies the defaults and clamps `limit` into `1..=10`.
    pub fn new(
        query: impl Into<String>,
        limit: Option<u32>,
        tbs: Option<String>,
        sources: Option<Vec<String>>,
    ) -> Self {
        Self {
            query: query.into(),
            limit: limit.unwrap_or(DEFAULT_SEARCH_RESULTS).clamp(1, MAX_SEARCH_RESULTS),
            tbs: tbs.filter(|tbs| !tbs.trim().is_empty()).unwrap_or_else(|| DEFAULT_TBS.to_owned()),
            sources: sources.filter(|sources| !sources.is_empty()).unwrap_or_else(default_sources),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    MissingApiKey,
    EmptyQuery,
    Transport { message: String },
    Status { status: u16, body: String },
    InvalidResponse { message: String },
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingApiKey => f.write_str("FIRECRAWL_API_KEY is not set"),
            Self::EmptyQuery => f.write_str("search query must not be empty"),
            Self::Transport { message } => write!(f, "search request failed: {message}"),
            Self::Status { status, body } => write!(f, "Firecrawl search failed ({status}): {body}"),
            Self::InvalidResponse { message } => write!(f, "invalid search response: {message}"),
        }
    }
}

impl std::error::Error for SearchError {}

/// Ranked web search: query in, hits out.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>, SearchError>;
}

#[derive(Debug, Clone)]
pub struct FirecrawlSearch {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl FirecrawlSearch {
    pub fn new(config: &ProviderConfig) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| SearchError::Transport { message: err.to_string() })?;
        Ok(Self {
            client,
            base_url: config.firecrawl_base_url.clone(),
            api_key: config.firecrawl_api_key.clone(),
        })
    }
}

fn str_field<'a>(item: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().filter_map(|key| item.get(*key).and_then(Value::as_str)).find(|s| !s.is_empty())
}

fn flatten_group(group: &Value, out: &mut Vec<SearchResult>) {
    let Some(items) = group.as_array() else {
        return;
    };
    for item in items {
        let Some(url) = str_field(item, &["url", "link"]) else {
            continue;
        };
        out.push(SearchResult {
            title: str_field(item, &["title"]).unwrap_or(url).to_owned(),
            url: url.to_owned(),
            snippet: str_field(item, &["description", "snippet", "markdown"]).unwrap_or_default().to_owned(),
        });
    }
}

/// Flattens the grouped (`web`/`news`) or plain array result shapes into one hit list.
pub fn flatten_results(body: &Value, limit: usize) -> Vec<SearchResult> {
    let data = body.get("data").or_else(|| body.get("results")).unwrap_or(body);
    let mut out = Vec::new();
    if data.is_array() {
        flatten_group(data, &mut out);
    } else {
        for key in ["web", "news"] {
            if let Some(group) = data.get(key) {
                flatten_group(group, &mut out);
            }
        }
    }
    out.truncate(limit);
    out
}

#[async_trait]
impl SearchProvider for FirecrawlSearch {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>, SearchError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(SearchError::MissingApiKey);
        };
        if request.query.trim().is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await
            .map_err(|err| SearchError::Transport { message: err.to_string() })?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Status { status: status.as_u16(), body });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| SearchError::InvalidResponse { message: err.to_string() })?;
        let results = flatten_results(&body, request.limit as usize);
        debug!(query = %request.query, results = results.len(), "firecrawl search finished");
        Ok(results)
    }
}
