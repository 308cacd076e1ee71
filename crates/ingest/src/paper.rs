use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::IngestError;
use crate::peel::{PeelError, peel_section};

/// A paper as loaded from disk, identified by its file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paper {
    pub name: String,
    pub text: String,
}

impl Paper {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    pub fn peel(&self) -> Result<String, PeelError> {
        peel_section(&self.name, &self.text)
    }
}

/// A paper after section extraction. `fallback` is set when the Results
/// section could not be isolated and `text` is the whole paper.
#[derive(Debug, Clone)]
pub struct CleanedPaper {
    pub name: String,
    pub text: String,
    pub fallback: Option<PeelError>,
}

impl CleanedPaper {
    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// Output file name: a `.pdf` suffix becomes `.txt`, other names get
    /// `.txt` appended unless they already end with it.
    pub fn file_name(&self) -> String {
        let stem = self.name.strip_suffix(".pdf").unwrap_or(&self.name);
        if stem.ends_with(".txt") {
            stem.to_string()
        } else {
            format!("{stem}.txt")
        }
    }
}

/// Peel every paper. Papers whose boundaries are missing or ambiguous keep
/// their full text, so every input paper appears in the output.
pub fn extract_sections(papers: Vec<Paper>) -> Vec<CleanedPaper> {
    papers
        .into_iter()
        .map(|paper| match paper.peel() {
            Ok(section) => CleanedPaper {
                name: paper.name,
                text: section,
                fallback: None,
            },
            Err(e) => {
                warn!(error = %e, "Section extraction failed, keeping full text");
                CleanedPaper {
                    name: paper.name,
                    text: paper.text,
                    fallback: Some(e),
                }
            }
        })
        .collect()
}

pub async fn save_cleaned(
    papers: &[CleanedPaper],
    dir: &Path,
) -> Result<Vec<PathBuf>, IngestError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| IngestError::io(dir, e))?;

    let mut written = Vec::with_capacity(papers.len());
    for paper in papers {
        let path = dir.join(paper.file_name());
        tokio::fs::write(&path, &paper.text)
            .await
            .map_err(|e| IngestError::io(&path, e))?;
        info!(paper = %paper.name, path = %path.display(), "Saving completed");
        written.push(path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_peel_falls_back_to_full_text() {
        let papers = vec![
            Paper::new("good.pdf", "Intro\nResults\nX.\nReferences\n[1]"),
            Paper::new("toc.pdf", "Results\nResults\nReferences\n"),
            Paper::new("bare.txt", "no headings at all"),
        ];

        let cleaned = extract_sections(papers);
        assert_eq!(cleaned.len(), 3);

        assert_eq!(cleaned[0].text, "Results\nX.\n");
        assert!(!cleaned[0].is_fallback());

        assert!(cleaned[1].is_fallback());
        assert_eq!(cleaned[1].text, "Results\nResults\nReferences\n");

        assert_eq!(cleaned[2].text, "no headings at all");
        assert!(matches!(cleaned[2].fallback, Some(PeelError::Missing { .. })));
    }

    #[test]
    fn test_output_file_names() {
        let paper = |name: &str| CleanedPaper {
            name: name.to_string(),
            text: String::new(),
            fallback: None,
        };
        assert_eq!(paper("smith2020.pdf").file_name(), "smith2020.txt");
        assert_eq!(paper("notes.txt").file_name(), "notes.txt");
        assert_eq!(paper("raw").file_name(), "raw.txt");
    }

    #[tokio::test]
    async fn test_save_cleaned_writes_text_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("cleaned_papers");
        let cleaned = extract_sections(vec![Paper::new(
            "a.pdf",
            "Results\nbody\nReferences\n",
        )]);

        let written = save_cleaned(&cleaned, &out).await.unwrap();
        assert_eq!(written, vec![out.join("a.txt")]);
        assert_eq!(std::fs::read_to_string(out.join("a.txt")).unwrap(), "Results\nbody\n");
    }
}
