//! RagDesk runtime: routes queries to the salary and insurance agents.
//!
//! A query is classified by keyword, answered by the owning domain agent
//! from its knowledge index (LLM-generated or fallback template), and
//! recorded in the caller's session.

pub mod agent;
pub mod conversation;
pub mod router;
pub mod session;
pub mod types;

pub use agent::{fallback_answer, DomainAgent, Generator, Retrieved, TOP_K};
pub use conversation::{ConversationState, ConversationTurn, TurnRole};
pub use router::{classify, Coordinator};
pub use session::{Session, SessionHandle, SessionRegistry};
pub use types::*;
