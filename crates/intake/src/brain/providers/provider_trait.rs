//! Provider trait and the message shapes shared with the orchestrator

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Error type for provider operations
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Response parse error: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Authentication failed: {0}")]
    AuthError(String),
}

impl ProviderError {
    /// Whether the retry wrapper should back off and try again
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ProviderError::RateLimited { .. })
    }

    /// Code the UI uses to style an error reply
    pub fn user_code(&self) -> ChatErrorCode {
        match self {
            ProviderError::RateLimited { .. } => ChatErrorCode::QuotaExceeded,
            ProviderError::AuthError(_) => ChatErrorCode::InvalidApiKey,
            ProviderError::ApiError { status: 401, .. } => ChatErrorCode::InvalidApiKey,
            ProviderError::RequestFailed(_) => ChatErrorCode::NetworkError,
            ProviderError::ApiError { .. }
            | ProviderError::ParseError(_)
            | ProviderError::ConfigError(_) => ChatErrorCode::UpstreamError,
        }
    }
}

/// User-facing classification of a failed conversational turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
pub enum ChatErrorCode {
    QuotaExceeded,
    InvalidApiKey,
    NetworkError,
    UpstreamError,
    /// The local store failed; the model was never reached
    StoreUnavailable,
}

impl ChatErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatErrorCode::QuotaExceeded => "quota_exceeded",
            ChatErrorCode::InvalidApiKey => "invalid_api_key",
            ChatErrorCode::NetworkError => "network_error",
            ChatErrorCode::UpstreamError => "upstream_error",
            ChatErrorCode::StoreUnavailable => "store_unavailable",
        }
    }

    /// Text shown in the assistant bubble; `detail` is the underlying error
    pub fn guidance(&self, detail: &str) -> String {
        match self {
            ChatErrorCode::QuotaExceeded => "The assistant is receiving too many requests right \
                 now. Wait a minute and try again, or check the usage limits of your API plan."
                .to_string(),
            ChatErrorCode::InvalidApiKey => "The API key was rejected. Check INTAKE_API_KEY (or \
                 OPENAI_API_KEY) and try again."
                .to_string(),
            ChatErrorCode::NetworkError => {
                format!("Could not reach the assistant: {}", detail)
            }
            ChatErrorCode::UpstreamError => format!("Something went wrong: {}", detail),
            ChatErrorCode::StoreUnavailable => {
                format!("Could not read your tasks: {}", detail)
            }
        }
    }
}

impl std::fmt::Display for ChatErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of a message in the upstream conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

/// A message in the upstream conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
    /// For tool role messages - the ID of the tool call this is responding to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// For assistant messages that include tool calls
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallRequest>>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
            tool_call_id: None,
            tool_calls: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            tool_call_id: None,
            tool_calls: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            tool_call_id: None,
            tool_calls: None,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: content.into(),
            tool_call_id: Some(tool_call_id.into()),
            tool_calls: None,
        }
    }

    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            tool_call_id: None,
            tool_calls: Some(tool_calls),
        }
    }
}

/// A tool call requested by the model.
///
/// `arguments` is kept as the raw JSON text the model produced; malformed
/// arguments surface as a tool failure, not a transport error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

/// Tool definition for function calling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Model parameters for a chat request
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_tokens: 1024,
            temperature: None,
        }
    }
}

/// A complete chat request
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDefinition>,
    pub config: ChatConfig,
}

/// Why the model stopped generating
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    ToolCalls,
    Length,
    ContentFilter,
    Other(String),
}

impl FinishReason {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "stop" => FinishReason::Stop,
            "tool_calls" => FinishReason::ToolCalls,
            "length" => FinishReason::Length,
            "content_filter" => FinishReason::ContentFilter,
            other => FinishReason::Other(other.to_string()),
        }
    }
}

/// First choice of a chat-completion response
#[derive(Debug, Clone, PartialEq)]
pub struct ChatResponse {
    pub finish_reason: FinishReason,
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
}

impl ChatResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            finish_reason: FinishReason::Stop,
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool_calls(calls: Vec<ToolCallRequest>) -> Self {
        Self {
            finish_reason: FinishReason::ToolCalls,
            content: None,
            tool_calls: calls,
        }
    }

    /// The model asked for tools and actually named some
    pub fn wants_tools(&self) -> bool {
        self.finish_reason == FinishReason::ToolCalls && !self.tool_calls.is_empty()
    }
}

/// A chat-completion endpoint
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &'static str;

    /// Send one request; throttling must surface as [`ProviderError::RateLimited`]
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let limited = ProviderError::RateLimited {
            retry_after_ms: None,
        };
        assert!(limited.is_rate_limited());
        assert_eq!(limited.user_code(), ChatErrorCode::QuotaExceeded);
        assert_eq!(
            ProviderError::AuthError("bad key".into()).user_code(),
            ChatErrorCode::InvalidApiKey
        );
        assert_eq!(
            ProviderError::RequestFailed("dns".into()).user_code(),
            ChatErrorCode::NetworkError
        );
        assert_eq!(
            ProviderError::ApiError {
                status: 500,
                message: "boom".into()
            }
            .user_code(),
            ChatErrorCode::UpstreamError
        );
    }

    #[test]
    fn test_wants_tools_needs_calls() {
        let mut response = ChatResponse::tool_calls(Vec::new());
        assert!(!response.wants_tools());
        response.tool_calls.push(ToolCallRequest {
            id: "call_1".into(),
            name: "create_note".into(),
            arguments: "{}".into(),
        });
        assert!(response.wants_tools());
    }

    #[test]
    fn test_guidance_includes_detail() {
        let text = ChatErrorCode::UpstreamError.guidance("bad gateway");
        assert!(text.contains("bad gateway"));
    }
}
