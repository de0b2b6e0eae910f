//! LLM chat completion against hosted providers (OpenAI, Groq).
//!
//! Both providers speak the OpenAI chat-completions protocol; responses are
//! streamed over SSE and can be collected into a single completion.

pub mod config;
pub mod error;
pub mod providers;
pub mod types;

pub use config::{LLMConfig, ResolvedProvider};
pub use error::GenerationError;
pub use providers::{
    collect_completion, request_body, BoxedStream, ChatBackend, HttpChatBackend, StreamChunk,
};
pub use types::*;
