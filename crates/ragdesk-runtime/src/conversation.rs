//! Per-session chat history.

use ragdesk_core::{Error, Result};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One displayed message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
    /// Unix millis.
    pub timestamp: i64,
}

impl ConversationTurn {
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, content)
    }
}

/// Ordered turns of one conversation. Unbounded, in memory only.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    turns: Vec<ConversationTurn>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn. An assistant turn must answer a pending user turn.
    pub fn append(&mut self, turn: ConversationTurn) -> Result<()> {
        if turn.role == TurnRole::Assistant && self.last_pending_user().is_none() {
            return Err(Error::Conversation(
                "assistant turn without a pending user turn".into(),
            ));
        }
        self.turns.push(turn);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn all(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The last turn, if it is a user turn still awaiting an answer.
    pub fn last_pending_user(&self) -> Option<&ConversationTurn> {
        self.turns.last().filter(|t| t.role == TurnRole::User)
    }
}
