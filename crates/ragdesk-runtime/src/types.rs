//! Runtime types.

use std::collections::BTreeSet;
use std::pin::Pin;

use futures::Stream;
use ragdesk_core::Domain;
use serde::Serialize;

/// Answer for queries that match neither domain.
pub const REFUSAL_ANSWER: &str = "I can only handle questions about salary or insurance.";

/// Shown when no LLM provider is configured.
pub const FALLBACK_STATUS: &str = "No API key found - fallback mode";

/// How an answer was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AnswerKind {
    /// Written by the LLM from the retrieved context.
    Generated,
    /// Deterministic template quoting the retrieved context.
    Fallback,
    /// Query matched no domain.
    Refused,
    /// The LLM call failed; the answer carries the error marker.
    GenerationFailed,
    /// The index query failed; the answer carries the error marker.
    RetrievalFailed,
}

/// Result of handling one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResponse {
    pub domain: Domain,
    pub answer: String,
    /// Distinct source identifiers of the retrieved snippets.
    pub sources: BTreeSet<String>,
    /// Retrieved snippets, best match first.
    pub retrieved_snippets: Vec<String>,
    pub kind: AnswerKind,
}

impl AgentResponse {
    pub fn refused() -> Self {
        Self {
            domain: Domain::Unknown,
            answer: REFUSAL_ANSWER.to_string(),
            sources: BTreeSet::new(),
            retrieved_snippets: Vec::new(),
            kind: AnswerKind::Refused,
        }
    }

    pub fn retrieval_failed(domain: Domain, description: &str) -> Self {
        Self {
            domain,
            answer: format!("[Retrieval Error] {}", description),
            sources: BTreeSet::new(),
            retrieved_snippets: Vec::new(),
            kind: AnswerKind::RetrievalFailed,
        }
    }
}

/// Incremental progress of a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AgentEvent {
    Routed {
        domain: Domain,
    },
    Context {
        snippets: Vec<String>,
        sources: BTreeSet<String>,
    },
    Token {
        content: String,
    },
    Done {
        response: AgentResponse,
    },
}

pub type AgentStream = Pin<Box<dyn Stream<Item = AgentEvent> + Send>>;
