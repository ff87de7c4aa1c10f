use crate::config::constants::defaults;
use crate::llm::provider::{
    FinishReason, FunctionCall, LLMError, LLMProvider, LLMRequest, LLMResponse, MessageRole,
    ToolCall, Usage,
};
use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum characters of an error body echoed into an `LLMError`
const ERROR_BODY_PREVIEW: usize = 400;

pub struct OpenAIProvider {
    api_key: String,
    http_client: HttpClient,
    base_url: String,
}

impl OpenAIProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(
            api_key,
            defaults::DEFAULT_BASE_URL.to_string(),
            Duration::from_secs(defaults::DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    pub fn with_base_url(api_key: String, base_url: String, timeout: Duration) -> Self {
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|err| {
                warn!("Falling back to default HTTP client: {err}");
                HttpClient::new()
            });

        Self {
            api_key,
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, request: LLMRequest) -> Result<LLMResponse, LLMError> {
        self.validate_request(&request)?;
        let openai_request = convert_to_openai_format(&request);

        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %request.model, messages = request.messages.len(), "calling chat completions");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&openai_request)
            .send()
            .await
            .map_err(|e| LLMError::Network(format!("OpenAI request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(classify_http_error(status, &error_text));
        }

        let openai_response: Value = response
            .json()
            .await
            .map_err(|e| LLMError::Provider(format!("Failed to parse response: {e}")))?;

        parse_openai_response(openai_response)
    }
}

/// Map a non-success HTTP status onto the error taxonomy
pub(crate) fn classify_http_error(status: StatusCode, body: &str) -> LLMError {
    let preview: String = body.chars().take(ERROR_BODY_PREVIEW).collect();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            LLMError::Authentication(format!("HTTP {status}: {preview}"))
        }
        StatusCode::TOO_MANY_REQUESTS => LLMError::RateLimit,
        StatusCode::REQUEST_TIMEOUT | StatusCode::BAD_GATEWAY | StatusCode::GATEWAY_TIMEOUT => {
            LLMError::Network(format!("HTTP {status}: {preview}"))
        }
        _ => LLMError::Provider(format!("HTTP {status}: {preview}")),
    }
}

pub(crate) fn convert_to_openai_format(request: &LLMRequest) -> Value {
    let messages: Vec<Value> = request
        .messages
        .iter()
        .map(|msg| {
            let mut message = json!({
                "role": msg.role.as_openai_str(),
                "content": msg.content,
            });

            // Only assistant messages can have tool_calls
            if msg.role == MessageRole::Assistant && msg.has_tool_calls() {
                let tool_calls_json: Vec<Value> = msg
                    .tool_calls()
                    .iter()
                    .map(|tc| {
                        json!({
                            "id": tc.id,
                            "type": "function",
                            "function": {
                                "name": tc.function.name,
                                "arguments": tc.function.arguments
                            }
                        })
                    })
                    .collect();
                message["tool_calls"] = Value::Array(tool_calls_json);
            }

            if msg.role == MessageRole::Tool {
                if let Some(tool_call_id) = &msg.tool_call_id {
                    message["tool_call_id"] = Value::String(tool_call_id.clone());
                }
                // Tool content must be a string
                if msg.content.is_none() {
                    message["content"] = Value::String("null".to_string());
                }
            }

            if let Some(name) = &msg.name
                && msg.role == MessageRole::Tool
            {
                message["name"] = Value::String(name.clone());
            }

            message
        })
        .collect();

    let mut openai_request = json!({
        "model": request.model,
        "messages": messages,
    });

    if let Some(max_tokens) = request.max_tokens {
        openai_request["max_tokens"] = json!(max_tokens);
    }

    if let Some(temperature) = request.temperature {
        openai_request["temperature"] = json!(temperature);
    }

    if let Some(tools) = &request.tools
        && !tools.is_empty()
    {
        let tools_json: Vec<Value> = tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.function.name,
                        "description": tool.function.description,
                        "parameters": tool.function.parameters
                    }
                })
            })
            .collect();
        openai_request["tools"] = Value::Array(tools_json);

        if let Some(tool_choice) = &request.tool_choice {
            openai_request["tool_choice"] = tool_choice.to_provider_format("openai");
        }
    }

    openai_request
}

pub(crate) fn parse_openai_response(response_json: Value) -> Result<LLMResponse, LLMError> {
    let choice = response_json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|choices| choices.first())
        .ok_or_else(|| LLMError::Provider("No choices in response".to_string()))?;

    let message = choice.get("message").ok_or_else(|| {
        LLMError::Provider("Invalid response format: missing message".to_string())
    })?;

    let content = message
        .get("content")
        .and_then(|c| c.as_str())
        .map(|s| s.to_string());

    let tool_calls = message
        .get("tool_calls")
        .and_then(|tc| tc.as_array())
        .map(|calls| {
            calls
                .iter()
                .filter_map(|call| {
                    let function = call.get("function")?;
                    Some(ToolCall {
                        id: call.get("id")?.as_str()?.to_string(),
                        call_type: "function".to_string(),
                        function: FunctionCall {
                            name: function.get("name")?.as_str()?.to_string(),
                            arguments: function
                                .get("arguments")
                                .and_then(|args| args.as_str())
                                .unwrap_or("{}")
                                .to_string(),
                        },
                    })
                })
                .collect::<Vec<_>>()
        })
        .filter(|calls| !calls.is_empty());

    let finish_reason = choice
        .get("finish_reason")
        .and_then(|fr| fr.as_str())
        .map(|fr| match fr {
            "stop" => FinishReason::Stop,
            "length" => FinishReason::Length,
            "tool_calls" => FinishReason::ToolCalls,
            "content_filter" => FinishReason::ContentFilter,
            _ => FinishReason::Error(fr.to_string()),
        })
        .unwrap_or(FinishReason::Stop);

    let usage = response_json.get("usage").map(|u| {
        let field = |name: &str| u.get(name).and_then(|v| v.as_u64()).unwrap_or(0) as u32;
        Usage {
            prompt_tokens: field("prompt_tokens"),
            completion_tokens: field("completion_tokens"),
            total_tokens: field("total_tokens"),
        }
    });

    Ok(LLMResponse {
        content,
        tool_calls,
        usage,
        finish_reason,
    })
}
