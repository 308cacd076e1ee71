//! Chunk persistence.
//!
//! `chunks.json` is a versioned container of ordered chunk records, each
//! carrying its source file name and character offsets, so a reload gives
//! back exactly what was saved. The per-document text dump is for reading
//! only: chunk boundaries are not recoverable from it.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::chunk::Chunk;
use crate::error::StoreError;

pub const CHUNK_FILE: &str = "chunks.json";
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct ChunkFile {
    version: u32,
    chunks: Vec<Chunk>,
}

pub struct ChunkStore {
    dir: PathBuf,
}

impl ChunkStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(CHUNK_FILE)
    }

    pub fn save(&self, chunks: &[Chunk]) -> Result<PathBuf, StoreError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;

        let file = ChunkFile {
            version: FORMAT_VERSION,
            chunks: chunks.to_vec(),
        };
        let path = self.path();
        let json = serde_json::to_string_pretty(&file)?;
        std::fs::write(&path, json).map_err(|e| StoreError::io(&path, e))?;

        info!(path = %path.display(), chunks = chunks.len(), "Chunks saved");
        Ok(path)
    }

    pub fn load(&self) -> Result<Vec<Chunk>, StoreError> {
        let path = self.path();
        if !path.exists() {
            return Err(StoreError::NotFound(path));
        }

        let json = std::fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
        let file: ChunkFile = serde_json::from_str(&json)?;
        if file.version != FORMAT_VERSION {
            return Err(StoreError::UnsupportedVersion {
                found: file.version,
                expected: FORMAT_VERSION,
            });
        }

        Ok(file.chunks)
    }

    /// Write one file per source document, named after it, holding the
    /// chunk texts each followed by a newline.
    pub fn save_text_dump(&self, chunks: &[Chunk]) -> Result<Vec<PathBuf>, StoreError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;

        let mut written = Vec::new();
        for (source, group) in group_by_source(chunks) {
            let path = self.dir.join(file_name_of(&source));
            let mut content = String::new();
            for chunk in &group {
                content.push_str(&chunk.text);
                content.push('\n');
            }
            std::fs::write(&path, content).map_err(|e| StoreError::io(&path, e))?;
            info!(source = %source, chunks = group.len(), "Chunk text dump saved");
            written.push(path);
        }

        Ok(written)
    }
}

fn file_name_of(source: &str) -> String {
    Path::new(source)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| source.to_string())
}

/// Group chunks by source document, keeping first-appearance order.
pub fn group_by_source(chunks: &[Chunk]) -> IndexMap<String, Vec<Chunk>> {
    let mut groups: IndexMap<String, Vec<Chunk>> = IndexMap::new();
    for chunk in chunks {
        groups
            .entry(chunk.source.clone())
            .or_default()
            .push(chunk.clone());
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::{Chunker, ChunkerConfig};

    fn chunks() -> Vec<Chunk> {
        let chunker = Chunker::new(ChunkerConfig::with_sizes(20, 5));
        chunker.chunk_documents(&[
            ("in/b.txt".to_string(), "beta words go here and there".to_string()),
            ("in/a.txt".to_string(), "alpha text".to_string()),
        ])
    }

    #[test]
    fn test_save_and_load_preserve_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkStore::new(dir.path().join("chunks"));
        let original = chunks();

        let path = store.save(&original).unwrap();
        assert!(path.ends_with(CHUNK_FILE));
        assert_eq!(store.load().unwrap(), original);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkStore::new(dir.path());
        assert!(matches!(store.load(), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CHUNK_FILE),
            r#"{"version": 7, "chunks": []}"#,
        )
        .unwrap();

        let err = ChunkStore::new(dir.path()).load().unwrap_err();
        assert!(matches!(
            err,
            StoreError::UnsupportedVersion { found: 7, expected: 1 }
        ));
    }

    #[test]
    fn test_text_dump_writes_one_file_per_source() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkStore::new(dir.path());
        let original = chunks();

        let written = store.save_text_dump(&original).unwrap();
        assert_eq!(written.len(), 2);

        let b = std::fs::read_to_string(dir.path().join("b.txt")).unwrap();
        let expected: String = original
            .iter()
            .filter(|c| c.source == "b.txt")
            .map(|c| format!("{}\n", c.text))
            .collect();
        assert_eq!(b, expected);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("a.txt")).unwrap(),
            "alpha text\n"
        );
    }

    #[test]
    fn test_group_by_source_keeps_first_appearance_order() {
        let groups = group_by_source(&chunks());
        let keys: Vec<&String> = groups.keys().collect();
        assert_eq!(keys, vec!["b.txt", "a.txt"]);
        assert!(groups["b.txt"].len() > 1);
    }
}
