//! Chat-completion plumbing: provider abstraction and throttling retry

pub mod providers;
pub mod retry;

pub use providers::{
    ChatConfig, ChatErrorCode, ChatMessage, ChatProvider, ChatRequest, ChatResponse, FinishReason,
    MessageRole, OpenAICompatibleProvider, ProviderError, ToolCallRequest, ToolDefinition,
};
pub use retry::{call_with_retry, RetryPolicy};
