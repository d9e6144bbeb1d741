//! SQLite-backed passage index for guide documents.

use crate::types::GuidePassage;
use helpdesk_core::{AppError, AppResult};
use rusqlite::{params, Connection};
use std::path::Path;

/// Initialize the SQLite index database at the given path.
pub fn init_index(db_path: &Path) -> AppResult<Connection> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            AppError::Retrieval(format!("Failed to create index directory: {}", e))
        })?;
    }

    let conn = Connection::open(db_path)
        .map_err(|e| AppError::Retrieval(format!("Failed to open SQLite index: {}", e)))?;

    create_tables(&conn)?;

    tracing::debug!("Initialized guide index at {:?}", db_path);
    Ok(conn)
}

/// Initialize an in-memory index (used by tests and ephemeral sessions).
pub fn init_index_in_memory() -> AppResult<Connection> {
    let conn = Connection::open_in_memory()
        .map_err(|e| AppError::Retrieval(format!("Failed to open in-memory index: {}", e)))?;

    create_tables(&conn)?;
    Ok(conn)
}

fn create_tables(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS passages (
            id TEXT PRIMARY KEY,
            source TEXT NOT NULL,
            position INTEGER NOT NULL,
            text TEXT NOT NULL,
            embedding BLOB NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_passages_source ON passages(source);
        "#,
    )
    .map_err(|e| AppError::Retrieval(format!("Failed to create tables: {}", e)))?;

    Ok(())
}

/// Insert a passage with its embedding into the index.
pub fn insert_passage(conn: &Connection, passage: &GuidePassage) -> AppResult<()> {
    let embedding_bytes = embedding_to_bytes(
        passage
            .embedding
            .as_ref()
            .ok_or_else(|| AppError::Retrieval("Passage missing embedding".to_string()))?,
    );

    conn.execute(
        "INSERT OR REPLACE INTO passages (id, source, position, text, embedding)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            passage.id,
            passage.source,
            passage.position as i64,
            passage.text,
            embedding_bytes,
        ],
    )
    .map_err(|e| AppError::Retrieval(format!("Failed to insert passage: {}", e)))?;

    Ok(())
}

/// Query the index for the top-k most similar passages.
///
/// Results are ordered by descending cosine similarity.
pub fn query_passages(
    conn: &Connection,
    query_embedding: &[f32],
    top_k: usize,
) -> AppResult<Vec<(GuidePassage, f32)>> {
    let mut stmt = conn
        .prepare("SELECT id, source, position, text, embedding FROM passages")
        .map_err(|e| AppError::Retrieval(format!("Failed to prepare query: {}", e)))?;

    let passages_iter = stmt
        .query_map([], |row| {
            let embedding_bytes: Vec<u8> = row.get(4)?;
            let embedding = bytes_to_embedding(&embedding_bytes)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

            Ok(GuidePassage {
                id: row.get(0)?,
                source: row.get(1)?,
                position: row.get::<_, i64>(2)? as u32,
                text: row.get(3)?,
                embedding: Some(embedding),
            })
        })
        .map_err(|e| AppError::Retrieval(format!("Failed to query passages: {}", e)))?;

    let mut results: Vec<(GuidePassage, f32)> = passages_iter
        .filter_map(|r| r.ok())
        .map(|passage| {
            let score = cosine_similarity(
                query_embedding,
                passage.embedding.as_deref().unwrap_or(&[]),
            );
            (passage, score)
        })
        .collect();

    // Sort by score descending
    results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    results.truncate(top_k);

    tracing::debug!(
        "Retrieved {} passages (requested top-{})",
        results.len(),
        top_k
    );

    Ok(results)
}

/// Get statistics for the index.
///
/// Returns (sources_count, passages_count).
pub fn get_stats(conn: &Connection) -> AppResult<(u32, u32)> {
    let sources_count: u32 = conn
        .query_row("SELECT COUNT(DISTINCT source) FROM passages", [], |row| {
            row.get::<_, i64>(0).map(|v| v as u32)
        })
        .map_err(|e| AppError::Retrieval(format!("Failed to count sources: {}", e)))?;

    let passages_count: u32 = conn
        .query_row("SELECT COUNT(*) FROM passages", [], |row| {
            row.get::<_, i64>(0).map(|v| v as u32)
        })
        .map_err(|e| AppError::Retrieval(format!("Failed to count passages: {}", e)))?;

    Ok((sources_count, passages_count))
}

/// Reset the index (delete all data).
pub fn reset_index(conn: &Connection) -> AppResult<()> {
    conn.execute("DELETE FROM passages", [])
        .map_err(|e| AppError::Retrieval(format!("Failed to delete passages: {}", e)))?;

    tracing::info!("Reset guide index");
    Ok(())
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Retrieval(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    let mut embedding = Vec::with_capacity(bytes.len() / 4);
    for chunk in bytes.chunks_exact(4) {
        let value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        embedding.push(value);
    }

    Ok(embedding)
}

/// Calculate cosine similarity between two vectors.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passage(id: &str, source: &str, position: u32, text: &str, embedding: Vec<f32>) -> GuidePassage {
        GuidePassage {
            id: id.to_string(),
            source: source.to_string(),
            position,
            text: text.to_string(),
            embedding: Some(embedding),
        }
    }

    #[test]
    fn test_init_in_memory_index() {
        let conn = init_index_in_memory().unwrap();
        let (sources, passages) = get_stats(&conn).unwrap();
        assert_eq!(sources, 0);
        assert_eq!(passages, 0);
    }

    #[test]
    fn test_insert_and_query_ordering() {
        let conn = init_index_in_memory().unwrap();

        insert_passage(&conn, &passage("p1", "a.md", 0, "alpha", vec![1.0, 0.0])).unwrap();
        insert_passage(&conn, &passage("p2", "a.md", 1, "beta", vec![0.0, 1.0])).unwrap();
        insert_passage(&conn, &passage("p3", "b.md", 0, "gamma", vec![0.7, 0.7])).unwrap();

        let results = query_passages(&conn, &[1.0, 0.0], 3).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0.id, "p1");
        assert!(results[0].1 > results[1].1);
        assert!(results[1].1 >= results[2].1);
    }

    #[test]
    fn test_query_respects_top_k() {
        let conn = init_index_in_memory().unwrap();

        insert_passage(&conn, &passage("p1", "a.md", 0, "alpha", vec![1.0, 0.0])).unwrap();
        insert_passage(&conn, &passage("p2", "a.md", 1, "beta", vec![0.0, 1.0])).unwrap();

        let results = query_passages(&conn, &[1.0, 0.0], 1).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_stats_and_reset() {
        let conn = init_index_in_memory().unwrap();

        insert_passage(&conn, &passage("p1", "a.md", 0, "alpha", vec![1.0])).unwrap();
        insert_passage(&conn, &passage("p2", "b.md", 0, "beta", vec![1.0])).unwrap();

        let (sources, passages) = get_stats(&conn).unwrap();
        assert_eq!(sources, 2);
        assert_eq!(passages, 2);

        reset_index(&conn).unwrap();
        let (sources, passages) = get_stats(&conn).unwrap();
        assert_eq!(sources, 0);
        assert_eq!(passages, 0);
    }

    #[test]
    fn test_cosine_similarity_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_embedding_roundtrip() {
        let original = vec![0.25_f32, -1.5, 3.0];
        let bytes = embedding_to_bytes(&original);
        let restored = bytes_to_embedding(&bytes).unwrap();
        assert_eq!(original, restored);
    }
}
