//! Keyword router and the coordinator that dispatches to domain agents.

use std::sync::Arc;

use ragdesk_core::{Domain, Error, Result};
use ragdesk_store::{KnowledgeIndex, SharedKnowledge};
use tokio_stream::StreamExt;
use tracing::{info, warn};

use crate::agent::{DomainAgent, Generator};
use crate::conversation::ConversationTurn;
use crate::session::SessionHandle;
use crate::types::*;

/// Checked first, so a query mentioning both domains goes to insurance.
pub const INSURANCE_KEYWORDS: [&str; 7] = [
    "insurance",
    "coverage",
    "premium",
    "claim",
    "policy",
    "hospital",
    "cashless",
];

pub const SALARY_KEYWORDS: [&str; 8] = [
    "salary",
    "monthly",
    "annual",
    "deduction",
    "bonus",
    "net pay",
    "gross",
    "pf",
];

/// Case-insensitive substring match against the keyword lists.
pub fn classify(query: &str) -> Domain {
    let q = query.to_lowercase();
    if INSURANCE_KEYWORDS.iter().any(|k| q.contains(k)) {
        Domain::Insurance
    } else if SALARY_KEYWORDS.iter().any(|k| q.contains(k)) {
        Domain::Salary
    } else {
        Domain::Unknown
    }
}

/// Routes queries to the agent owning their domain and records the exchange
/// in the caller's session.
pub struct Coordinator {
    knowledge: SharedKnowledge,
    generator: Generator,
    salary: DomainAgent,
    insurance: DomainAgent,
}

impl Coordinator {
    pub fn new(knowledge: SharedKnowledge, generator: Generator) -> Self {
        Self {
            knowledge,
            generator,
            salary: DomainAgent::salary(),
            insurance: DomainAgent::insurance(),
        }
    }

    pub fn knowledge(&self) -> &SharedKnowledge {
        &self.knowledge
    }

    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    pub fn agent(&self, domain: Domain) -> Option<&DomainAgent> {
        match domain {
            Domain::Salary => Some(&self.salary),
            Domain::Insurance => Some(&self.insurance),
            Domain::Unknown => None,
        }
    }

    /// LLM status line, e.g. `Using OpenAI (gpt-4o-mini)`.
    pub fn status(&self) -> String {
        self.generator.status_line()
    }

    fn index_for(&self, domain: Domain) -> Option<Arc<KnowledgeIndex>> {
        self.knowledge.snapshot().get(domain)
    }

    /// Answer a query without touching any conversation.
    pub async fn respond(&self, query: &str) -> Result<AgentResponse> {
        let domain = classify(query);
        info!(domain = %domain, "Routed query");

        let Some(agent) = self.agent(domain) else {
            return Ok(AgentResponse::refused());
        };

        let index = self.index_for(domain);
        match agent.answer(query, index.as_deref(), &self.generator).await {
            Err(Error::Retrieval(description)) => {
                warn!(domain = %domain, "Retrieval failed: {}", description);
                Ok(AgentResponse::retrieval_failed(domain, &description))
            }
            other => other,
        }
    }

    /// Answer a query within `session`, recording both turns.
    pub async fn handle(&self, session: &SessionHandle, query: &str) -> Result<AgentResponse> {
        let mut session = session.lock().await;
        session.conversation.append(ConversationTurn::user(query))?;

        let response = self.respond(query).await?;
        session
            .conversation
            .append(ConversationTurn::assistant(response.answer.clone()))?;
        Ok(response)
    }

    /// Streaming form of [`handle`](Self::handle).
    ///
    /// Events are `Routed`, then for a known domain `Context` and `Token`s,
    /// then `Done`. The session stays locked until the stream finishes or is
    /// dropped; the assistant turn is recorded on `Done`.
    pub async fn handle_stream(&self, session: &SessionHandle, query: &str) -> Result<AgentStream> {
        let mut guard = session.lock_owned().await;
        guard.conversation.append(ConversationTurn::user(query))?;

        let domain = classify(query);
        info!(domain = %domain, "Routed streaming query");

        let inner: AgentStream = match self.agent(domain) {
            None => Box::pin(futures::stream::iter([AgentEvent::Done {
                response: AgentResponse::refused(),
            }])),
            Some(agent) => {
                let index = self.index_for(domain);
                match agent.answer_stream(query, index.as_deref(), &self.generator) {
                    Ok(stream) => stream,
                    Err(Error::Retrieval(description)) => {
                        warn!(domain = %domain, "Retrieval failed: {}", description);
                        Box::pin(futures::stream::iter([AgentEvent::Done {
                            response: AgentResponse::retrieval_failed(domain, &description),
                        }]))
                    }
                    Err(e) => return Err(e),
                }
            }
        };

        Ok(Box::pin(async_stream::stream! {
            let mut guard = guard;
            let mut inner = inner;
            yield AgentEvent::Routed { domain };

            while let Some(event) = inner.next().await {
                if let AgentEvent::Done { response } = &event {
                    if let Err(e) = guard
                        .conversation
                        .append(ConversationTurn::assistant(response.answer.clone()))
                    {
                        warn!("Could not record answer: {}", e);
                    }
                }
                yield event;
            }
        }))
    }
}
