pub mod chunk;
pub mod chunker;
pub mod error;
pub mod paper;
pub mod pdf;
pub mod peel;
pub mod reader;
pub mod store;

pub use chunk::Chunk;
pub use chunker::{Chunker, ChunkerConfig, reassemble};
pub use error::{IngestError, PdfError, StoreError};
pub use paper::{CleanedPaper, Paper, extract_sections, save_cleaned};
pub use pdf::{PdfExtractor, TableMode};
pub use peel::{Boundary, PeelError, peel_section};
pub use reader::FileReader;
pub use store::{ChunkStore, group_by_source};

use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::info;

/// Generate a stable document ID from file path
pub fn generate_doc_id(path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..16])
}

/// Load, peel and save every paper in `input`, returning the cleaned set.
pub async fn clean_directory(
    input: &Path,
    output: &Path,
    extractor: &PdfExtractor,
) -> Result<Vec<CleanedPaper>, IngestError> {
    let papers = FileReader::load_all_papers(input, extractor).await?;
    let cleaned = extract_sections(papers);
    save_cleaned(&cleaned, output).await?;

    let fallbacks = cleaned.iter().filter(|p| p.is_fallback()).count();
    info!(
        papers = cleaned.len(),
        peeled = cleaned.len() - fallbacks,
        fallbacks,
        "Section extraction finished"
    );
    Ok(cleaned)
}

/// Chunk every `.txt` file under `dir`.
pub async fn chunk_directory(dir: &Path, config: ChunkerConfig) -> Result<Vec<Chunk>, IngestError> {
    let files = FileReader::read_text_tree(dir).await?;
    let chunker = Chunker::new(config);
    let chunks = chunker.chunk_documents(&files);

    info!(documents = files.len(), chunks = chunks.len(), "Chunking finished");
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_id_is_stable() {
        assert_eq!(generate_doc_id("a.txt"), generate_doc_id("a.txt"));
        assert_ne!(generate_doc_id("a.txt"), generate_doc_id("b.txt"));
    }

    #[tokio::test]
    async fn test_clean_then_chunk_directory() {
        let dir = tempfile::tempdir().unwrap();
        let pdfs = dir.path().join("pdfs");
        let cleaned_dir = dir.path().join("cleaned_papers");
        std::fs::create_dir(&pdfs).unwrap();
        std::fs::write(
            pdfs.join("study.txt"),
            "Intro\n\nResults\nWe found X.\nReferences\n[1] A.",
        )
        .unwrap();
        std::fs::write(pdfs.join("other.txt"), "No sections here.").unwrap();

        let cleaned = clean_directory(&pdfs, &cleaned_dir, &PdfExtractor::default())
            .await
            .unwrap();
        assert_eq!(cleaned.len(), 2);

        let chunks = chunk_directory(&cleaned_dir, ChunkerConfig::default())
            .await
            .unwrap();
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["No sections here.", "Results\nWe found X."]);
    }
}
