//! Guide document loading and passage splitting.

use helpdesk_core::{AppError, AppResult};
use std::path::Path;

/// Passages shorter than this are merged into the next one; stray headings
/// and one-liners make poor retrieval units on their own.
const MIN_PASSAGE_LEN: usize = 40;

/// A passage extracted from a document, prior to indexing.
#[derive(Debug, Clone)]
pub struct LoadedPassage {
    /// Source document name (file name, not full path)
    pub source: String,

    /// Position within the source document
    pub position: u32,

    /// Passage text
    pub text: String,
}

/// Load all guide documents under a directory and split them into passages.
///
/// Supported formats: `.txt` and `.md`. Files that fail to read are skipped
/// with a warning rather than aborting the whole load.
pub fn load_guides(guides_path: &Path) -> AppResult<Vec<LoadedPassage>> {
    if !guides_path.exists() {
        return Err(AppError::Retrieval(format!(
            "User guides directory not found: {:?}",
            guides_path
        )));
    }

    let mut passages = Vec::new();

    for entry in walkdir::WalkDir::new(guides_path)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let supported = matches!(
            path.extension().and_then(|s| s.to_str()),
            Some("txt") | Some("md")
        );
        if !supported {
            continue;
        }

        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        match std::fs::read_to_string(path) {
            Ok(contents) => {
                let count_before = passages.len();
                passages.extend(split_passages(&source, &contents));
                tracing::debug!(
                    "Loaded {} passages from {}",
                    passages.len() - count_before,
                    source
                );
            }
            Err(e) => {
                tracing::warn!("Failed to load {:?}: {}", path, e);
            }
        }
    }

    tracing::info!(
        "Loaded {} passages from {:?}",
        passages.len(),
        guides_path
    );

    Ok(passages)
}

/// Split document contents into paragraph-level passages.
///
/// Paragraphs are separated by blank lines; fragments below the minimum
/// length are folded into the following paragraph.
pub fn split_passages(source: &str, contents: &str) -> Vec<LoadedPassage> {
    let mut passages = Vec::new();
    let mut pending = String::new();

    for block in contents.split("\n\n") {
        let block = block.trim();
        if block.is_empty() {
            continue;
        }

        if !pending.is_empty() {
            pending.push('\n');
        }
        pending.push_str(block);

        if pending.len() >= MIN_PASSAGE_LEN {
            passages.push(LoadedPassage {
                source: source.to_string(),
                position: passages.len() as u32,
                text: std::mem::take(&mut pending),
            });
        }
    }

    // Flush a short trailing fragment
    if !pending.is_empty() {
        passages.push(LoadedPassage {
            source: source.to_string(),
            position: passages.len() as u32,
            text: pending,
        });
    }

    passages
}
