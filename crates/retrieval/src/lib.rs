//! Guide retrieval crate for the Helpdesk Assistant.
//!
//! This crate implements the document-retrieval collaborator used for
//! user-guide questions: loading guide documents from a directory, indexing
//! passages in a local SQLite database with locally computed embeddings, and
//! serving scored similarity searches.
//!
//! The orchestrator only depends on the [`Retriever`] trait; everything else
//! in this crate is an implementation detail of the default backend.

pub mod embedder;
pub mod index;
pub mod loader;
pub mod retriever;
pub mod types;

// Re-export main types
pub use embedder::TrigramEmbedder;
pub use retriever::{GuideRetriever, Retriever};
pub use types::{GuidePassage, ScoredPassage};
