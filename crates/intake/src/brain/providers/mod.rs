//! Provider abstraction over chat-completion endpoints
//!
//! The orchestrator only talks to [`ChatProvider`]; tests script it, the CLI
//! plugs in [`OpenAICompatibleProvider`].

mod openai;
mod provider_trait;

pub use openai::{OpenAICompatibleProvider, DEFAULT_ENDPOINT};
pub use provider_trait::{
    ChatConfig, ChatErrorCode, ChatMessage, ChatProvider, ChatRequest, ChatResponse, FinishReason,
    MessageRole, ProviderError, ToolCallRequest, ToolDefinition,
};
