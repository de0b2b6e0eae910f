//! Domain agents: retrieve from one domain's index, ground a prompt, generate.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use ragdesk_chat::{
    collect_completion, ChatBackend, ChatMessage, GenerationError, GenerationOptions, StreamChunk,
};
use ragdesk_core::config::DEFAULT_LLM_TIMEOUT_SECS;
use ragdesk_core::{Domain, Result};
use ragdesk_store::KnowledgeIndex;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use crate::types::*;

/// Snippets retrieved per query.
pub const TOP_K: usize = 3;

const SALARY_INSTRUCTION: &str = "You are the Salary Agent. Answer ONLY salary-related questions using the salary context.\n\
If not about salary, say you don't have that information.";

const INSURANCE_INSTRUCTION: &str = "You are the Insurance Agent. Answer ONLY insurance-related questions using the insurance context.\n\
If not about insurance, say you don't have that information.";

/// The deterministic answer used when no LLM is configured.
pub fn fallback_answer(context: &str) -> String {
    format!(
        "[Fallback Answer]\nBased on the retrieved notes:\n\n{}\n\nSummary: I used the retrieved text above to answer your query.",
        context
    )
}

fn error_answer(err: &GenerationError) -> String {
    format!("[Error] {}", err)
}

/// Generation capability shared by all agents: an optional LLM backend plus
/// sampling options and the overall deadline for one completion.
#[derive(Clone)]
pub struct Generator {
    backend: Option<Arc<dyn ChatBackend>>,
    options: GenerationOptions,
    timeout: Duration,
}

impl Generator {
    pub fn new(backend: Option<Arc<dyn ChatBackend>>, timeout: Duration) -> Self {
        Self {
            backend,
            options: GenerationOptions::default(),
            timeout,
        }
    }

    /// No LLM; every answer uses the fallback template.
    pub fn fallback() -> Self {
        Self::new(None, Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS))
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    pub fn backend(&self) -> Option<&Arc<dyn ChatBackend>> {
        self.backend.as_ref()
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// e.g. `Using Groq (llama-3.1-8b-instant)`.
    pub fn status_line(&self) -> String {
        match &self.backend {
            Some(b) => format!("Using {} ({})", b.provider().display_name(), b.model()),
            None => FALLBACK_STATUS.to_string(),
        }
    }
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("backend", &self.backend.as_ref().map(|b| b.model().to_string()))
            .field("options", &self.options)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Snippets and their sources for one query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Retrieved {
    pub snippets: Vec<String>,
    pub sources: BTreeSet<String>,
}

impl Retrieved {
    /// Snippets joined by newlines, in retrieval order.
    pub fn context(&self) -> String {
        self.snippets.join("\n")
    }
}

/// A retrieval-augmented answerer bound to one domain.
#[derive(Debug, Clone)]
pub struct DomainAgent {
    domain: Domain,
    instruction: String,
}

impl DomainAgent {
    pub fn new(domain: Domain, instruction: impl Into<String>) -> Self {
        Self {
            domain,
            instruction: instruction.into(),
        }
    }

    pub fn salary() -> Self {
        Self::new(Domain::Salary, SALARY_INSTRUCTION)
    }

    pub fn insurance() -> Self {
        Self::new(Domain::Insurance, INSURANCE_INSTRUCTION)
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    /// Top-`TOP_K` snippets for `query`. A missing index retrieves nothing.
    pub fn retrieve(&self, query: &str, index: Option<&KnowledgeIndex>) -> Result<Retrieved> {
        let hits = match index {
            Some(index) => index.search(query, TOP_K)?,
            None => Vec::new(),
        };

        let retrieved = Retrieved {
            sources: hits.iter().map(|h| h.metadata.source.clone()).collect(),
            snippets: hits.into_iter().map(|h| h.content).collect(),
        };
        debug!(
            domain = %self.domain,
            snippets = retrieved.snippets.len(),
            "Retrieved context"
        );
        Ok(retrieved)
    }

    /// System instruction plus the grounded user question.
    pub fn build_messages(&self, query: &str, context: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.instruction.trim()),
            ChatMessage::user(format!(
                "Question: {}\n\nUse ONLY this context:\n{}",
                query, context
            )),
        ]
    }

    fn respond(&self, retrieved: Retrieved, answer: String, kind: AnswerKind) -> AgentResponse {
        AgentResponse {
            domain: self.domain,
            answer,
            sources: retrieved.sources,
            retrieved_snippets: retrieved.snippets,
            kind,
        }
    }

    /// Answer `query` in one piece.
    ///
    /// Retrieval failures are returned as `Error::Retrieval`; generation
    /// failures become a `GenerationFailed` response.
    pub async fn answer(
        &self,
        query: &str,
        index: Option<&KnowledgeIndex>,
        generator: &Generator,
    ) -> Result<AgentResponse> {
        let retrieved = self.retrieve(query, index)?;
        let context = retrieved.context();

        let Some(backend) = generator.backend() else {
            return Ok(self.respond(retrieved, fallback_answer(&context), AnswerKind::Fallback));
        };

        let messages = self.build_messages(query, &context);
        let stream = backend.stream(messages, generator.options());
        let response = match collect_completion(stream, generator.timeout()).await {
            Ok(completion) => {
                info!(
                    domain = %self.domain,
                    tokens = completion.tokens_used,
                    "Generated answer"
                );
                self.respond(retrieved, completion.content, AnswerKind::Generated)
            }
            Err(e) => {
                warn!(domain = %self.domain, "Generation failed: {}", e);
                self.respond(retrieved, error_answer(&e), AnswerKind::GenerationFailed)
            }
        };
        Ok(response)
    }

    /// Answer `query` as events: `Context`, then `Token`s, then `Done`.
    ///
    /// Retrieval happens before the stream is returned, so its failure is an
    /// `Err` here rather than an event.
    pub fn answer_stream(
        &self,
        query: &str,
        index: Option<&KnowledgeIndex>,
        generator: &Generator,
    ) -> Result<AgentStream> {
        let retrieved = self.retrieve(query, index)?;
        let context = retrieved.context();
        let agent = self.clone();

        let Some(backend) = generator.backend().cloned() else {
            return Ok(Box::pin(async_stream::stream! {
                yield AgentEvent::Context {
                    snippets: retrieved.snippets.clone(),
                    sources: retrieved.sources.clone(),
                };
                let answer = fallback_answer(&context);
                yield AgentEvent::Token { content: answer.clone() };
                yield AgentEvent::Done {
                    response: agent.respond(retrieved, answer, AnswerKind::Fallback),
                };
            }));
        };

        let mut llm_stream = backend.stream(self.build_messages(query, &context), generator.options());
        let timeout = generator.timeout();

        Ok(Box::pin(async_stream::stream! {
            yield AgentEvent::Context {
                snippets: retrieved.snippets.clone(),
                sources: retrieved.sources.clone(),
            };

            let deadline = tokio::time::Instant::now() + timeout;
            let mut content = String::new();
            let mut failure = None;

            loop {
                match tokio::time::timeout_at(deadline, llm_stream.next()).await {
                    Err(_) => {
                        failure = Some(GenerationError::Timeout(timeout));
                        break;
                    }
                    Ok(None) | Ok(Some(StreamChunk::Done { .. })) => break,
                    Ok(Some(StreamChunk::Token(text))) => {
                        content.push_str(&text);
                        yield AgentEvent::Token { content: text };
                    }
                    Ok(Some(StreamChunk::Error(e))) => {
                        failure = Some(e);
                        break;
                    }
                }
            }

            if failure.is_none() && content.trim().is_empty() {
                failure = Some(GenerationError::EmptyResponse);
            }

            let response = match failure {
                None => agent.respond(retrieved, content, AnswerKind::Generated),
                Some(e) => {
                    warn!(domain = %agent.domain, "Streaming generation failed: {}", e);
                    agent.respond(retrieved, error_answer(&e), AnswerKind::GenerationFailed)
                }
            };
            yield AgentEvent::Done { response };
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use ragdesk_chat::{BoxedStream, LLMProvider};
    use ragdesk_infer::{EmbedderBackend, HashingEmbedder};
    use ragdesk_store::{build, BuildOptions, DomainText};

    struct ScriptedBackend {
        chunks: Vec<StreamChunk>,
        calls: AtomicUsize,
        last_messages: parking_lot::Mutex<Vec<ChatMessage>>,
        last_options: parking_lot::Mutex<Option<GenerationOptions>>,
    }

    impl ScriptedBackend {
        fn new(chunks: Vec<StreamChunk>) -> Arc<Self> {
            Arc::new(Self {
                chunks,
                calls: AtomicUsize::new(0),
                last_messages: parking_lot::Mutex::new(Vec::new()),
                last_options: parking_lot::Mutex::new(None),
            })
        }
    }

    impl ChatBackend for ScriptedBackend {
        fn provider(&self) -> LLMProvider {
            LLMProvider::Groq
        }

        fn model(&self) -> &str {
            "llama-3.1-8b-instant"
        }

        fn stream(&self, messages: Vec<ChatMessage>, options: &GenerationOptions) -> BoxedStream {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_messages.lock() = messages;
            *self.last_options.lock() = Some(*options);
            Box::pin(futures::stream::iter(self.chunks.clone()))
        }
    }

    struct HangingBackend;

    impl ChatBackend for HangingBackend {
        fn provider(&self) -> LLMProvider {
            LLMProvider::OpenAI
        }

        fn model(&self) -> &str {
            "gpt-4o-mini"
        }

        fn stream(&self, _messages: Vec<ChatMessage>, _options: &GenerationOptions) -> BoxedStream {
            Box::pin(futures::stream::pending())
        }
    }

    fn salary_index() -> Arc<KnowledgeIndex> {
        let embedder: Arc<dyn EmbedderBackend> = Arc::new(HashingEmbedder::new(128));
        let texts = HashMap::from([(
            Domain::Salary,
            DomainText::new(
                "Annual salary is monthly gross pay multiplied by twelve.",
                "salary.txt",
            ),
        )]);
        build(&texts, &embedder, &BuildOptions::default())
            .unwrap()
            .get(Domain::Salary)
            .unwrap()
    }

    fn tokens(parts: &[&str]) -> Vec<StreamChunk> {
        let mut chunks: Vec<StreamChunk> = parts
            .iter()
            .map(|p| StreamChunk::Token(p.to_string()))
            .collect();
        chunks.push(StreamChunk::Done {
            tokens_used: parts.len(),
        });
        chunks
    }

    #[tokio::test]
    async fn test_fallback_quotes_context() {
        let index = salary_index();
        let response = DomainAgent::salary()
            .answer("How do I calculate annual salary?", Some(&*index), &Generator::fallback())
            .await
            .unwrap();

        assert_eq!(response.kind, AnswerKind::Fallback);
        assert!(response.answer.starts_with("[Fallback Answer]"));
        assert!(response
            .answer
            .contains("Annual salary is monthly gross pay multiplied by twelve."));
        assert_eq!(response.retrieved_snippets.len(), 1);
        assert!(response.sources.is_subset(&index.sources()));
    }

    #[tokio::test]
    async fn test_fallback_is_deterministic() {
        let index = salary_index();
        let agent = DomainAgent::salary();
        let generator = Generator::fallback();
        let a = agent.answer("annual salary", Some(&*index), &generator).await.unwrap();
        let b = agent.answer("annual salary", Some(&*index), &generator).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_missing_index_still_answers() {
        let response = DomainAgent::insurance()
            .answer("What does my policy cover?", None, &Generator::fallback())
            .await
            .unwrap();
        assert_eq!(response.domain, Domain::Insurance);
        assert!(response.retrieved_snippets.is_empty());
        assert!(response.sources.is_empty());
        assert!(!response.answer.is_empty());
    }

    #[tokio::test]
    async fn test_generation_uses_grounded_prompt() {
        let index = salary_index();
        let backend = ScriptedBackend::new(tokens(&["Multiply ", "by twelve."]));
        let generator = Generator::new(Some(backend.clone()), Duration::from_secs(5));

        let response = DomainAgent::salary()
            .answer("How do I calculate annual salary?", Some(&*index), &generator)
            .await
            .unwrap();

        assert_eq!(response.kind, AnswerKind::Generated);
        assert_eq!(response.answer, "Multiply by twelve.");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

        let messages = backend.last_messages.lock().clone();
        assert_eq!(messages.len(), 2);
        assert!(matches!(&messages[0], ChatMessage::System(s) if s.starts_with("You are the Salary Agent.")));
        assert_eq!(messages[0].content(), DomainAgent::salary().instruction());
        assert_eq!(
            messages[1].content(),
            "Question: How do I calculate annual salary?\n\nUse ONLY this context:\nAnnual salary is monthly gross pay multiplied by twelve."
        );
    }

    #[tokio::test]
    async fn test_generation_failure_is_recovered() {
        let index = salary_index();
        let backend = ScriptedBackend::new(vec![StreamChunk::Error(GenerationError::Api {
            status: 401,
            body: "invalid key".into(),
        })]);
        let generator = Generator::new(Some(backend), Duration::from_secs(5));

        let response = DomainAgent::salary()
            .answer("annual salary", Some(&*index), &generator)
            .await
            .unwrap();
        assert_eq!(response.kind, AnswerKind::GenerationFailed);
        assert_eq!(response.answer, "[Error] API error 401: invalid key");
        assert_eq!(response.retrieved_snippets.len(), 1);
    }

    #[tokio::test]
    async fn test_sampling_options_reach_backend() {
        let index = salary_index();
        let backend = ScriptedBackend::new(tokens(&["Twelve months."]));
        let options = GenerationOptions {
            temperature: 0.7,
            max_tokens: 256,
            top_p: Some(0.9),
        };
        let generator =
            Generator::new(Some(backend.clone()), Duration::from_secs(5)).with_options(options);

        DomainAgent::salary()
            .answer("annual salary", Some(&*index), &generator)
            .await
            .unwrap();
        assert_eq!(*backend.last_options.lock(), Some(options));
    }

    #[tokio::test]
    async fn test_timeout_is_recovered() {
        let index = salary_index();
        let generator = Generator::new(Some(Arc::new(HangingBackend)), Duration::from_millis(20));

        let response = DomainAgent::salary()
            .answer("annual salary", Some(&*index), &generator)
            .await
            .unwrap();
        assert_eq!(response.kind, AnswerKind::GenerationFailed);
        assert!(response.answer.starts_with("[Error] No response within"));
    }

    #[tokio::test]
    async fn test_stream_event_order() {
        let index = salary_index();
        let backend = ScriptedBackend::new(tokens(&["Twelve ", "months."]));
        let generator = Generator::new(Some(backend), Duration::from_secs(5));

        let events: Vec<AgentEvent> = DomainAgent::salary()
            .answer_stream("annual salary", Some(&*index), &generator)
            .unwrap()
            .collect()
            .await;

        assert!(matches!(events[0], AgentEvent::Context { .. }));
        assert_eq!(events[1], AgentEvent::Token { content: "Twelve ".into() });
        assert_eq!(events[2], AgentEvent::Token { content: "months.".into() });
        match &events[3] {
            AgentEvent::Done { response } => {
                assert_eq!(response.answer, "Twelve months.");
                assert_eq!(response.kind, AnswerKind::Generated);
            }
            other => panic!("expected Done, got {:?}", other),
        }
        assert_eq!(events.len(), 4);
    }

    #[tokio::test]
    async fn test_stream_fallback_single_token() {
        let index = salary_index();
        let events: Vec<AgentEvent> = DomainAgent::salary()
            .answer_stream("annual salary", Some(&*index), &Generator::fallback())
            .unwrap()
            .collect()
            .await;

        assert_eq!(events.len(), 3);
        let AgentEvent::Token { content } = &events[1] else {
            panic!("expected Token");
        };
        let AgentEvent::Done { response } = &events[2] else {
            panic!("expected Done");
        };
        assert_eq!(content, &response.answer);
        assert_eq!(response.kind, AnswerKind::Fallback);
    }

    #[tokio::test]
    async fn test_stream_timeout_marks_failure() {
        let index = salary_index();
        let generator = Generator::new(Some(Arc::new(HangingBackend)), Duration::from_millis(20));
        let events: Vec<AgentEvent> = DomainAgent::salary()
            .answer_stream("annual salary", Some(&*index), &generator)
            .unwrap()
            .collect()
            .await;

        let Some(AgentEvent::Done { response }) = events.last() else {
            panic!("expected Done");
        };
        assert_eq!(response.kind, AnswerKind::GenerationFailed);
    }

    #[test]
    fn test_status_lines() {
        assert_eq!(Generator::fallback().status_line(), "No API key found - fallback mode");
        let generator = Generator::new(
            Some(ScriptedBackend::new(Vec::new())),
            Duration::from_secs(1),
        );
        assert_eq!(generator.status_line(), "Using Groq (llama-3.1-8b-instant)");
    }

    #[tokio::test]
    async fn test_stream_error_after_tokens() {
        let index = salary_index();
        let backend = ScriptedBackend::new(vec![
            StreamChunk::Token("Annual ".into()),
            StreamChunk::Token("salary".into()),
            StreamChunk::Error(GenerationError::Stream("connection reset".into())),
        ]);
        let generator = Generator::new(Some(backend), Duration::from_secs(5));

        let events: Vec<AgentEvent> = DomainAgent::salary()
            .answer_stream("annual salary", Some(&*index), &generator)
            .unwrap()
            .collect()
            .await;

        assert_eq!(events.len(), 4);
        assert_eq!(events[1], AgentEvent::Token { content: "Annual ".into() });
        assert_eq!(events[2], AgentEvent::Token { content: "salary".into() });
        let AgentEvent::Done { response } = &events[3] else {
            panic!("expected Done, got {:?}", events[3]);
        };
        assert_eq!(response.kind, AnswerKind::GenerationFailed);
        assert_eq!(response.answer, "[Error] Stream read error: connection reset");
        assert_eq!(response.retrieved_snippets.len(), 1);
    }
}
