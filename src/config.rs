// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Apo and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Provider configuration read from the environment.

use std::fmt;

pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";
/// Retry target after a model failure. Fixed, independent of `AI_MODEL` and `--model`.
pub const FALLBACK_MODEL: &str = DEFAULT_MODEL;
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_FIRECRAWL_BASE_URL: &str = "https://api.firecrawl.dev/v2";

/// Model ids a client may request. Anything else falls back to [`DEFAULT_MODEL`].
pub const ALLOWED_MODELS: &[&str] = &[DEFAULT_MODEL, "openai/gpt-4o", "google/gemini-2.5-flash"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    /// Sent as `HTTP-Referer` for OpenRouter attribution.
    pub site_url: Option<String>,
    /// Sent as `X-Title` for OpenRouter attribution.
    pub app_name: Option<String>,
    pub default_model: String,
    pub firecrawl_api_key: Option<String>,
    pub firecrawl_base_url: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_owned(),
            site_url: None,
            app_name: None,
            default_model: DEFAULT_MODEL.to_owned(),
            firecrawl_api_key: None,
            firecrawl_base_url: DEFAULT_FIRECRAWL_BASE_URL.to_owned(),
        }
    }
}

impl ProviderConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).map(|value| value.trim().to_owned()).filter(|v| !v.is_empty());

        let base_url = var("OPENROUTER_BASE_URL")
            .or_else(|| var("OPENAI_BASE_URL"))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        let firecrawl_base_url =
            var("FIRECRAWL_BASE_URL").unwrap_or_else(|| DEFAULT_FIRECRAWL_BASE_URL.to_owned());
        for (name, url) in [("base url", &base_url), ("firecrawl base url", &firecrawl_base_url)] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::InvalidUrl { name, value: url.clone() });
            }
        }

        let default_model = var("AI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_owned());
        if !ALLOWED_MODELS.contains(&default_model.as_str()) {
            return Err(ConfigError::UnsupportedModel { model: default_model });
        }

        Ok(Self {
            api_key: var("OPENROUTER_API_KEY").or_else(|| var("OPENAI_API_KEY")),
            base_url: base_url.trim_end_matches('/').to_owned(),
            site_url: var("OPENROUTER_SITE_URL"),
            app_name: var("OPENROUTER_APP_NAME"),
            default_model,
            firecrawl_api_key: var("FIRECRAWL_API_KEY"),
            firecrawl_base_url: firecrawl_base_url.trim_end_matches('/').to_owned(),
        })
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Result<Self, ConfigError> {
        let model = model.into();
        if !ALLOWED_MODELS.contains(&model.as_str()) {
            return Err(ConfigError::UnsupportedModel { model });
        }
        self.default_model = model;
        Ok(self)
    }

    pub fn has_model_key(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Maps a client-requested model id onto the allow-list.
pub fn sanitize_model(requested: Option<&str>, default_model: &str) -> String {
    match requested.map(str::trim) {
        Some(model) if ALLOWED_MODELS.contains(&model) => model.to_owned(),
        _ => default_model.to_owned(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidUrl { name: &'static str, value: String },
    UnsupportedModel { model: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl { name, value } => write!(f, "invalid {name}: {value}"),
            Self::UnsupportedModel { model } => write!(
                f,
                "unsupported model '{model}' (expected one of: {})",
                ALLOWED_MODELS.join(", ")
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
