//! Chat orchestration for the Helpdesk Assistant.
//!
//! This crate holds the decision logic of the system:
//! - Intent classification (keyword and model-assisted)
//! - SQL safety validation (the hard gate in front of execution)
//! - Conversation memory with per-session ownership
//! - The router/orchestrator composing the retrieval, SQL, and response
//!   generation collaborators into one request/response cycle
//!
//! Collaborator failures never escape [`Orchestrator::handle`]; every branch
//! degrades to a result with a non-empty answer and the failure reason in
//! diagnostics.

pub mod intent;
pub mod memory;
pub mod router;
pub mod safety;
pub mod types;

// Re-export main types
pub use intent::{
    ClassificationMode, ClassificationOutcome, Classifier, Intent, KeywordClassifier,
    ModelAssistedClassifier,
};
pub use memory::{ConversationMemory, SessionRegistry};
pub use router::Orchestrator;
pub use safety::{SqlValidation, SqlValidator};
pub use types::{ConversationTurn, Message, QueryPayload, QueryResult, Role};
