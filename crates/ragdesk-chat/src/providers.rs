//! OpenAI-compatible streaming chat completions.
//!
//! OpenAI and Groq share the same request body and SSE response format:
//! `data: {json}` lines carrying `choices[0].delta.content`, terminated by
//! `data: [DONE]`.

use std::pin::Pin;
use std::time::Duration;

use futures::Stream;
use reqwest::Client;
use serde_json::json;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use crate::config::ResolvedProvider;
use crate::error::GenerationError;
use crate::types::{ChatMessage, Completion, GenerationOptions, LLMProvider};

/// Boxed stream type for returning different stream implementations.
pub type BoxedStream = Pin<Box<dyn Stream<Item = StreamChunk> + Send>>;

/// A single streamed token, end marker or failure.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamChunk {
    Token(String),
    Done { tokens_used: usize },
    Error(GenerationError),
}

/// The LLM completion capability consumed by the agents.
pub trait ChatBackend: Send + Sync {
    fn provider(&self) -> LLMProvider;

    fn model(&self) -> &str;

    /// Start a completion. The stream is finite and cannot be restarted.
    fn stream(&self, messages: Vec<ChatMessage>, options: &GenerationOptions) -> BoxedStream;
}

/// `ChatBackend` talking to the resolved provider over HTTPS.
pub struct HttpChatBackend {
    client: Client,
    resolved: ResolvedProvider,
}

impl HttpChatBackend {
    pub fn new(resolved: ResolvedProvider) -> Self {
        Self {
            client: Client::new(),
            resolved,
        }
    }
}

impl ChatBackend for HttpChatBackend {
    fn provider(&self) -> LLMProvider {
        self.resolved.provider
    }

    fn model(&self) -> &str {
        &self.resolved.model
    }

    fn stream(&self, messages: Vec<ChatMessage>, options: &GenerationOptions) -> BoxedStream {
        stream_chat(&self.client, &self.resolved, messages, options)
    }
}

/// OpenAI-compatible streaming chat request; `top_p` only when set.
pub fn request_body(
    model: &str,
    messages: &[ChatMessage],
    options: &GenerationOptions,
) -> serde_json::Value {
    let mut body = json!({
        "model": model,
        "messages": messages,
        "temperature": options.temperature,
        "max_tokens": options.max_tokens,
        "stream": true,
    });
    if let Some(top_p) = options.top_p {
        body["top_p"] = json!(top_p);
    }
    body
}

/// Stream tokens from the resolved provider.
pub fn stream_chat(
    client: &Client,
    resolved: &ResolvedProvider,
    messages: Vec<ChatMessage>,
    options: &GenerationOptions,
) -> BoxedStream {
    let body = request_body(&resolved.model, &messages, options);
    let client = client.clone();
    let url = resolved.provider.endpoint();
    let model = resolved.model.clone();
    let api_key = resolved.api_key.clone();

    Box::pin(async_stream::stream! {
        debug!("Streaming from {} with model {}", url, model);

        let response = match client
            .post(url)
            .bearer_auth(&api_key)
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                yield StreamChunk::Error(GenerationError::Request(e.to_string()));
                return;
            }
        };

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!("LLM API returned {}", status);
            yield StreamChunk::Error(GenerationError::Api { status, body });
            return;
        }

        for await chunk in parse_sse(response.bytes_stream()) {
            yield chunk;
        }
    })
}

/// Turn an SSE byte stream into chunks. Ends with exactly one `Done` or `Error`.
pub fn parse_sse<S, B, E>(body: S) -> impl Stream<Item = StreamChunk> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: std::fmt::Display + Send,
{
    async_stream::stream! {
        let mut body = Box::pin(body);
        let mut buffer: Vec<u8> = Vec::new();
        let mut token_count = 0usize;

        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(bytes) => buffer.extend_from_slice(bytes.as_ref()),
                Err(e) => {
                    yield StreamChunk::Error(GenerationError::Stream(e.to_string()));
                    return;
                }
            }

            // Process complete lines only; a line may span several network chunks
            while let Some(line_end) = buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=line_end).collect();
                let line = String::from_utf8_lossy(&line);

                match parse_sse_line(line.trim()) {
                    SseLine::Token(text) => {
                        token_count += 1;
                        yield StreamChunk::Token(text);
                    }
                    SseLine::Done => {
                        yield StreamChunk::Done { tokens_used: token_count };
                        return;
                    }
                    SseLine::Error(message) => {
                        yield StreamChunk::Error(GenerationError::Stream(message));
                        return;
                    }
                    SseLine::Skip => {}
                }
            }
        }

        yield StreamChunk::Done { tokens_used: token_count };
    }
}

#[derive(Debug, PartialEq)]
enum SseLine {
    Token(String),
    Done,
    Error(String),
    Skip,
}

fn parse_sse_line(line: &str) -> SseLine {
    if line.is_empty() || line.starts_with(':') {
        return SseLine::Skip;
    }
    let Some(data) = line.strip_prefix("data:") else {
        return SseLine::Skip;
    };
    let data = data.trim();
    if data == "[DONE]" {
        return SseLine::Done;
    }

    match serde_json::from_str::<serde_json::Value>(data) {
        Ok(parsed) => {
            if let Some(message) = parsed["error"]["message"].as_str() {
                return SseLine::Error(message.to_string());
            }
            match parsed["choices"][0]["delta"]["content"].as_str() {
                Some(content) if !content.is_empty() => SseLine::Token(content.to_string()),
                _ => SseLine::Skip,
            }
        }
        Err(e) => {
            debug!("Skipping unparseable SSE payload: {}", e);
            SseLine::Skip
        }
    }
}

/// Drain a completion stream into one text, bounded by `timeout`.
pub async fn collect_completion(
    mut stream: BoxedStream,
    timeout: Duration,
) -> Result<Completion, GenerationError> {
    let collect = async move {
        let mut content = String::new();
        let mut tokens_used = 0;

        while let Some(chunk) = stream.next().await {
            match chunk {
                StreamChunk::Token(text) => content.push_str(&text),
                StreamChunk::Done { tokens_used: t } => {
                    tokens_used = t;
                    break;
                }
                StreamChunk::Error(e) => return Err(e),
            }
        }

        if content.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(Completion {
            content,
            tokens_used,
        })
    };

    tokio::time::timeout(timeout, collect)
        .await
        .map_err(|_| GenerationError::Timeout(timeout))?
}
