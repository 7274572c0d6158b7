// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Apo and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Chat-completions client for OpenAI-compatible endpoints (OpenRouter, OpenAI, ...).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::chat::{ChatMessage, ChatModel, ChatRequest, ModelError, ModelReply, ToolCall, Usage};
use crate::config::ProviderConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct OpenAiCompatibleModel {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    site_url: Option<String>,
    app_name: Option<String>,
}

impl OpenAiCompatibleModel {
    pub fn new(config: &ProviderConfig) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| ModelError::Transport { message: err.to_string() })?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            site_url: config.site_url.clone(),
            app_name: config.app_name.clone(),
        })
    }
}

fn wire_message(message: &ChatMessage) -> Value {
    match message {
        ChatMessage::System { content } => json!({"role": "system", "content": content}),
        ChatMessage::User { content } => json!({"role": "user", "content": content}),
        ChatMessage::Assistant { content, tool_calls } if tool_calls.is_empty() => {
            json!({"role": "assistant", "content": content})
        }
        ChatMessage::Assistant { content, tool_calls } => json!({
            "role": "assistant",
            "content": content,
            "tool_calls": tool_calls
                .iter()
                .map(|call| json!({
                    "id": call.id,
                    "type": "function",
                    "function": {"name": call.name, "arguments": call.arguments},
                }))
                .collect::<Vec<_>>(),
        }),
        ChatMessage::Tool { tool_call_id, content } => {
            json!({"role": "tool", "tool_call_id": tool_call_id, "content": content})
        }
    }
}

fn request_body(request: &ChatRequest) -> Value {
    let mut body = json!({
        "model": request.model,
        "messages": request.messages.iter().map(wire_message).collect::<Vec<_>>(),
    });
    if !request.tools.is_empty() {
        body["tools"] = request
            .tools
            .iter()
            .map(|tool| json!({
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.parameters,
                },
            }))
            .collect();
        body["tool_choice"] = json!("auto");
    }
    if request.json_mode {
        body["response_format"] = json!({"type": "json_object"});
    }
    body
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: String,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    #[serde(default)]
    name: String,
    #[serde(default)]
    arguments: Option<String>,
}

fn parse_reply(response: CompletionResponse) -> Result<ModelReply, ModelError> {
    let Some(choice) = response.choices.into_iter().next() else {
        return Err(ModelError::InvalidResponse { message: "response has no choices".to_owned() });
    };
    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| ToolCall {
            id: call.id,
            name: call.function.name,
            arguments: call.function.arguments.unwrap_or_default(),
        })
        .collect();
    Ok(ModelReply { content: choice.message.content, tool_calls, usage: response.usage })
}

#[async_trait]
impl ChatModel for OpenAiCompatibleModel {
    async fn complete(&self, request: ChatRequest) -> Result<ModelReply, ModelError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(ModelError::MissingApiKey);
        };

        let started = Instant::now();
        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&request_body(&request));
        if let Some(site_url) = &self.site_url {
            builder = builder.header("HTTP-Referer", site_url);
        }
        if let Some(app_name) = &self.app_name {
            builder = builder.header("X-Title", app_name);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| ModelError::Transport { message: err.to_string() })?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status { status: status.as_u16(), body });
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|err| ModelError::InvalidResponse { message: err.to_string() })?;
        debug!(
            model = %request.model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "chat completion finished"
        );
        parse_reply(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::chat::ToolSpec;

    #[test]
    fn body_includes_tools_and_json_mode_only_when_requested() {
        let plain = request_body(&ChatRequest::new("m", vec![ChatMessage::user("hi")]));
        assert!(plain.get("tools").is_none());
        assert!(plain.get("response_format").is_none());

        let tooled = request_body(
            &ChatRequest::new("m", vec![ChatMessage::user("hi")])
                .with_tools(vec![ToolSpec {
                    name: "web_search".to_owned(),
                    description: "Search".to_owned(),
                    parameters: json!({"type": "object"}),
                }])
                .json(),
        );
        assert_eq!(tooled["tool_choice"], "auto");
        assert_eq!(tooled["tools"][0]["function"]["name"], "web_search");
        assert_eq!(tooled["response_format"]["type"], "json_object");
    }

    #[test]
    fn assistant_tool_calls_use_function_wire_shape() {
        let message = ChatMessage::Assistant {
            content: String::new(),
            tool_calls: vec![ToolCall::new("c1", "read_canvas", "{\"ids\":[]}")],
        };
        let wire = wire_message(&message);
        assert_eq!(wire["tool_calls"][0]["type"], "function");
        assert_eq!(wire["tool_calls"][0]["function"]["arguments"], "{\"ids\":[]}");
    }

    #[test]
    fn parses_tool_calls_and_usage() {
        let response: CompletionResponse = serde_json::from_value(json!({
            "choices": [{"message": {
                "content": null,
                "tool_calls": [{"id": "c1", "type": "function", "function": {"name": "web_search"}}]
            }}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12}
        }))
        .expect("response");
        let reply = parse_reply(response).expect("reply");
        assert_eq!(reply.content, None);
        assert_eq!(reply.tool_calls, vec![ToolCall::new("c1", "web_search", "")]);
        assert_eq!(reply.usage.map(|usage| usage.total_tokens), Some(12));
    }

    #[test]
    fn empty_choices_are_invalid() {
        let response: CompletionResponse = serde_json::from_value(json!({"choices": []})).expect("response");
        assert!(matches!(parse_reply(response), Err(ModelError::InvalidResponse { .. })));
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let model = OpenAiCompatibleModel::new(&ProviderConfig::default()).expect("client");
        let err = model.complete(ChatRequest::new("m", Vec::new())).await.unwrap_err();
        assert_eq!(err, ModelError::MissingApiKey);
    }
}
