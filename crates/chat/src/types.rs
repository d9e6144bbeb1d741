//! Conversation and result types.

use crate::intent::Intent;
use chrono::{DateTime, Utc};
use helpdesk_retrieval::ScoredPassage;
use helpdesk_sql::SqlRowSet;
use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single chat message. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Message author
    pub role: Role,

    /// Message text
    pub text: String,

    /// Creation time
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a user message stamped with the current time.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create an assistant message stamped with the current time.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// One complete exchange plus its routing metadata.
///
/// A turn is constructed only after a full response exists; requests that are
/// aborted or fail before an answer is assembled never produce a turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// What the customer sent
    pub user: Message,

    /// What the assistant answered
    pub assistant: Message,

    /// Intent the request was routed under
    pub intent: Intent,

    /// Context the answer was grounded in (may be empty)
    pub context: Vec<String>,
}

/// Raw backend payload carried alongside a result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum QueryPayload {
    /// No retrieval happened (general/unknown intent, or a degraded path)
    None,

    /// Guide passages from the retrieval collaborator
    Documents(Vec<ScoredPassage>),

    /// Rows from the SQL executor
    Rows(SqlRowSet),
}

/// The structured result returned to the caller for every request.
///
/// The answer field is always non-empty, including on full backend failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// Classified intent of the request
    pub intent: Intent,

    /// Final answer text
    pub answer: String,

    /// Context strings the answer was grounded in
    pub source_context: Vec<String>,

    /// Raw backend payload for callers that want more than text
    pub payload: QueryPayload,

    /// Collaborator failure reasons and other non-fatal events
    pub diagnostics: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        let user = Message::user("hello");
        assert_eq!(user.role, Role::User);
        assert_eq!(user.text, "hello");

        let assistant = Message::assistant("hi there");
        assert_eq!(assistant.role, Role::Assistant);
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            "\"assistant\""
        );
    }
}
