//! OpenAI-compatible chat-completion provider

use async_trait::async_trait;
use reqwest::Client;

use super::provider_trait::{
    ChatMessage, ChatProvider, ChatRequest, ChatResponse, FinishReason, MessageRole,
    ProviderError, ToolCallRequest, ToolDefinition,
};

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Any endpoint speaking the OpenAI chat-completions wire format
pub struct OpenAICompatibleProvider {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
}

impl OpenAICompatibleProvider {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        if api_key.is_some() {
            tracing::info!("[LLM_API] Provider initialized with API key");
        } else {
            tracing::warn!("[LLM_API] Provider created without API key");
        }

        Self {
            client: Client::new(),
            api_key,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn message_to_openai(msg: &ChatMessage) -> serde_json::Value {
        let role = match msg.role {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
        };

        let mut obj = serde_json::json!({
            "role": role,
            "content": msg.content
        });

        if let Some(ref tool_call_id) = msg.tool_call_id {
            obj["tool_call_id"] = serde_json::json!(tool_call_id);
        }

        if let Some(ref tool_calls) = msg.tool_calls {
            let calls: Vec<serde_json::Value> = tool_calls
                .iter()
                .map(|tc| {
                    serde_json::json!({
                        "id": tc.id,
                        "type": "function",
                        "function": {
                            "name": tc.name,
                            "arguments": tc.arguments
                        }
                    })
                })
                .collect();
            obj["tool_calls"] = serde_json::json!(calls);
            if msg.content.is_empty() {
                obj["content"] = serde_json::Value::Null;
            }
        }

        obj
    }

    fn tool_to_openai(tool: &ToolDefinition) -> serde_json::Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.parameters
            }
        })
    }

    fn build_payload(request: &ChatRequest) -> serde_json::Value {
        let messages: Vec<serde_json::Value> =
            request.messages.iter().map(Self::message_to_openai).collect();

        let mut payload = serde_json::json!({
            "model": request.config.model,
            "max_tokens": request.config.max_tokens,
            "messages": messages
        });

        if let Some(temperature) = request.config.temperature {
            payload["temperature"] = serde_json::json!(temperature);
        }

        if !request.tools.is_empty() {
            let tools: Vec<serde_json::Value> =
                request.tools.iter().map(Self::tool_to_openai).collect();
            payload["tools"] = serde_json::json!(tools);
        }

        payload
    }

    /// Read the first choice of a completion body
    pub(crate) fn parse_response(json: &serde_json::Value) -> Result<ChatResponse, ProviderError> {
        let choice = json["choices"]
            .get(0)
            .ok_or_else(|| ProviderError::ParseError("response has no choices".to_string()))?;
        let message = &choice["message"];

        let finish_reason = FinishReason::parse(choice["finish_reason"].as_str().unwrap_or("stop"));

        let tool_calls: Vec<ToolCallRequest> = message["tool_calls"]
            .as_array()
            .map(|calls| {
                calls
                    .iter()
                    .filter_map(|tc| {
                        Some(ToolCallRequest {
                            id: tc["id"].as_str()?.to_string(),
                            name: tc["function"]["name"].as_str()?.to_string(),
                            arguments: tc["function"]["arguments"]
                                .as_str()
                                .unwrap_or("{}")
                                .to_string(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let content = message["content"].as_str().map(|s| s.to_string());

        Ok(ChatResponse {
            finish_reason,
            content,
            tool_calls,
        })
    }
}

#[async_trait]
impl ChatProvider for OpenAICompatibleProvider {
    fn name(&self) -> &'static str {
        "openai-compatible"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let auth_header = self
            .api_key
            .as_ref()
            .map(|k| format!("Bearer {}", k))
            .ok_or_else(|| ProviderError::AuthError("No API key configured".to_string()))?;

        let payload = Self::build_payload(request);

        tracing::debug!(
            "[LLM_API] Sending request: model={}, messages={}, tools={}",
            request.config.model,
            request.messages.len(),
            request.tools.len()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("Authorization", auth_header)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_ms = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1000);
            let body = response.text().await.unwrap_or_default();

            return Err(match status.as_u16() {
                429 => ProviderError::RateLimited { retry_after_ms },
                401 => ProviderError::AuthError(body),
                code => ProviderError::ApiError {
                    status: code,
                    message: body,
                },
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        Self::parse_response(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::providers::ChatConfig;

    #[test]
    fn test_message_conversion() {
        let msg = ChatMessage::assistant_with_tools(
            "",
            vec![ToolCallRequest {
                id: "call_1".into(),
                name: "create_note".into(),
                arguments: r#"{"title":"x"}"#.into(),
            }],
        );
        let json = OpenAICompatibleProvider::message_to_openai(&msg);
        assert_eq!(json["role"], "assistant");
        assert!(json["content"].is_null());
        assert_eq!(json["tool_calls"][0]["function"]["arguments"], r#"{"title":"x"}"#);

        let ack = OpenAICompatibleProvider::message_to_openai(&ChatMessage::tool_result(
            "call_1",
            r#"{"success":true}"#,
        ));
        assert_eq!(ack["role"], "tool");
        assert_eq!(ack["tool_call_id"], "call_1");
    }

    #[test]
    fn test_payload_shape() {
        let request = ChatRequest {
            messages: vec![ChatMessage::system("ctx"), ChatMessage::user("hi")],
            tools: vec![ToolDefinition {
                name: "create_note".into(),
                description: "Create a note".into(),
                parameters: serde_json::json!({"type": "object"}),
            }],
            config: ChatConfig::default(),
        };
        let payload = OpenAICompatibleProvider::build_payload(&request);
        assert_eq!(payload["model"], "gpt-4o-mini");
        assert_eq!(payload["max_tokens"], 1024);
        assert_eq!(payload["messages"].as_array().unwrap().len(), 2);
        assert_eq!(payload["tools"][0]["function"]["name"], "create_note");
        assert!(payload.get("temperature").is_none());
    }

    #[test]
    fn test_parse_tool_call_response() {
        let body = serde_json::json!({
            "choices": [{
                "finish_reason": "tool_calls",
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": {"name": "create_tasks", "arguments": "{\"tasks\":[]}"}
                    }]
                }
            }]
        });
        let response = OpenAICompatibleProvider::parse_response(&body).unwrap();
        assert!(response.wants_tools());
        assert_eq!(response.content, None);
        assert_eq!(response.tool_calls[0].name, "create_tasks");
        assert_eq!(response.tool_calls[0].arguments, "{\"tasks\":[]}");
    }

    #[test]
    fn test_parse_text_response() {
        let body = serde_json::json!({
            "choices": [{"finish_reason": "stop", "message": {"content": "Done!"}}]
        });
        let response = OpenAICompatibleProvider::parse_response(&body).unwrap();
        assert_eq!(response.finish_reason, FinishReason::Stop);
        assert_eq!(response.content.as_deref(), Some("Done!"));
        assert!(response.tool_calls.is_empty());
    }

    #[test]
    fn test_parse_rejects_empty_choices() {
        let body = serde_json::json!({"choices": []});
        assert!(matches!(
            OpenAICompatibleProvider::parse_response(&body),
            Err(ProviderError::ParseError(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_key_is_auth_error() {
        let provider = OpenAICompatibleProvider::new(DEFAULT_ENDPOINT, None);
        let request = ChatRequest {
            messages: vec![ChatMessage::user("hi")],
            tools: Vec::new(),
            config: ChatConfig::default(),
        };
        let err = provider.chat(&request).await.unwrap_err();
        assert!(matches!(err, ProviderError::AuthError(_)));
    }
}
