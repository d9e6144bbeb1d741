//! Retrieval types.

use serde::{Deserialize, Serialize};

/// A passage extracted from a guide document and stored in the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuidePassage {
    /// Unique passage identifier
    pub id: String,

    /// Source document name (e.g., "reporting.md")
    pub source: String,

    /// Position of the passage within its source document
    pub position: u32,

    /// Passage text
    pub text: String,

    /// Embedding vector, present once indexed
    pub embedding: Option<Vec<f32>>,
}

/// A retrieval hit: passage text plus its similarity score.
///
/// This is what the orchestrator receives from the retriever; results are
/// always ordered by descending score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPassage {
    /// Source document name
    pub source: String,

    /// Passage text
    pub text: String,

    /// Cosine similarity against the query, in [-1, 1]
    pub score: f32,
}
