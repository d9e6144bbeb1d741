//! Retriever trait and the default guide-index implementation.

use crate::embedder::TrigramEmbedder;
use crate::index;
use crate::loader;
use crate::types::{GuidePassage, ScoredPassage};
use helpdesk_core::{AppError, AppResult};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;

/// Trait for document-retrieval backends.
///
/// This is the narrow interface the orchestrator depends on; any failure is
/// reported as an `AppError` and handled by the orchestrator's degradation
/// policy rather than propagated to callers.
#[async_trait::async_trait]
pub trait Retriever: Send + Sync {
    /// Retrieve the passages most relevant to a query.
    ///
    /// Returns passages ordered by descending relevance score.
    async fn retrieve(&self, query: &str, top_k: usize) -> AppResult<Vec<ScoredPassage>>;

    /// Number of passages currently indexed.
    fn passage_count(&self) -> AppResult<u32>;
}

/// Guide retriever backed by the SQLite passage index.
pub struct GuideRetriever {
    embedder: TrigramEmbedder,
    conn: Mutex<Connection>,
}

impl GuideRetriever {
    /// Open (or create) a retriever over an on-disk index.
    pub fn open(index_path: &Path) -> AppResult<Self> {
        let conn = index::init_index(index_path)?;
        Ok(Self {
            embedder: TrigramEmbedder::default(),
            conn: Mutex::new(conn),
        })
    }

    /// Create a retriever over an in-memory index.
    pub fn in_memory() -> AppResult<Self> {
        let conn = index::init_index_in_memory()?;
        Ok(Self {
            embedder: TrigramEmbedder::default(),
            conn: Mutex::new(conn),
        })
    }

    /// Open the index and populate it from the guides directory if empty.
    ///
    /// Returns the retriever together with a status message describing what
    /// happened (loaded existing index vs. indexed fresh documents).
    pub fn initialize_or_load(guides_path: &Path, index_path: &Path) -> AppResult<(Self, String)> {
        let retriever = Self::open(index_path)?;

        let existing = retriever.passage_count()?;
        if existing > 0 {
            return Ok((
                retriever,
                format!("Loaded existing guide index ({} passages)", existing),
            ));
        }

        let indexed = retriever.index_guides(guides_path)?;
        let status = format!("Indexed {} passages from {:?}", indexed, guides_path);
        Ok((retriever, status))
    }

    /// Load, embed, and index every guide document under a directory.
    ///
    /// Returns the number of passages indexed.
    pub fn index_guides(&self, guides_path: &Path) -> AppResult<u32> {
        let passages = loader::load_guides(guides_path)?;
        let conn = self.lock_conn()?;

        let mut indexed = 0u32;
        for loaded in &passages {
            let passage = GuidePassage {
                id: format!("{}:{}", loaded.source, loaded.position),
                source: loaded.source.clone(),
                position: loaded.position,
                text: loaded.text.clone(),
                embedding: Some(self.embedder.embed(&loaded.text)),
            };
            index::insert_passage(&conn, &passage)?;
            indexed += 1;
        }

        tracing::info!("Indexed {} guide passages", indexed);
        Ok(indexed)
    }

    /// Remove everything from the index.
    pub fn reset(&self) -> AppResult<()> {
        let conn = self.lock_conn()?;
        index::reset_index(&conn)
    }

    fn lock_conn(&self) -> AppResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Retrieval("Guide index lock poisoned".to_string()))
    }
}

#[async_trait::async_trait]
impl Retriever for GuideRetriever {
    async fn retrieve(&self, query: &str, top_k: usize) -> AppResult<Vec<ScoredPassage>> {
        let query_embedding = self.embedder.embed(query);
        let conn = self.lock_conn()?;

        let results = index::query_passages(&conn, &query_embedding, top_k)?;

        Ok(results
            .into_iter()
            .map(|(passage, score)| ScoredPassage {
                source: passage.source,
                text: passage.text,
                score,
            })
            .collect())
    }

    fn passage_count(&self) -> AppResult<u32> {
        let conn = self.lock_conn()?;
        let (_, passages) = index::get_stats(&conn)?;
        Ok(passages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn guides_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("reporting.md"),
            "To export a report, open the Reports page and press the Export button. \
             The download starts immediately as a CSV file.\n\n\
             Scheduled reports can be configured under Settings and are emailed monthly \
             to every account administrator.",
        )
        .unwrap();
        fs::write(
            dir.path().join("users.md"),
            "To invite a new user, open the Admin page and enter their email address. \
             Invitations expire after seven days and can be resent at any time.",
        )
        .unwrap();
        dir
    }

    #[tokio::test]
    async fn test_initialize_indexes_documents() {
        let guides = guides_dir();
        let index_dir = TempDir::new().unwrap();
        let index_path = index_dir.path().join("guides.db");

        let (retriever, status) =
            GuideRetriever::initialize_or_load(guides.path(), &index_path).unwrap();

        assert!(status.starts_with("Indexed"));
        assert!(retriever.passage_count().unwrap() >= 3);
    }

    #[tokio::test]
    async fn test_initialize_loads_existing_index() {
        let guides = guides_dir();
        let index_dir = TempDir::new().unwrap();
        let index_path = index_dir.path().join("guides.db");

        let (first, _) = GuideRetriever::initialize_or_load(guides.path(), &index_path).unwrap();
        let count = first.passage_count().unwrap();
        drop(first);

        let (_, status) = GuideRetriever::initialize_or_load(guides.path(), &index_path).unwrap();
        assert!(status.contains(&format!("{} passages", count)));
    }

    #[tokio::test]
    async fn test_retrieve_returns_descending_scores() {
        let guides = guides_dir();
        let retriever = GuideRetriever::in_memory().unwrap();
        retriever.index_guides(guides.path()).unwrap();

        let results = retriever.retrieve("how do I export a report", 3).await.unwrap();

        assert!(!results.is_empty());
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        // The export passage should outrank the user-invitation passage
        assert!(results[0].text.contains("Export"));
    }

    #[tokio::test]
    async fn test_retrieve_respects_top_k() {
        let guides = guides_dir();
        let retriever = GuideRetriever::in_memory().unwrap();
        retriever.index_guides(guides.path()).unwrap();

        let results = retriever.retrieve("report", 1).await.unwrap();
        assert_eq!(results.len(), 1);
    }
}
