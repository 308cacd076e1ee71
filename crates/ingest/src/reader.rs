use std::path::Path;
use tokio::fs;
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::error::IngestError;
use crate::paper::Paper;
use crate::pdf::PdfExtractor;

pub struct FileReader;

impl FileReader {
    /// Load every `.pdf` and `.txt` file directly under `dir` as a paper.
    ///
    /// A missing or empty folder aborts the load. Files that cannot be read
    /// or yield no text are logged and left out.
    pub async fn load_all_papers(
        dir: &Path,
        extractor: &PdfExtractor,
    ) -> Result<Vec<Paper>, IngestError> {
        if !dir.is_dir() {
            return Err(IngestError::FolderNotFound(dir.to_path_buf()));
        }

        let mut entries = fs::read_dir(dir)
            .await
            .map_err(|e| IngestError::io(dir, e))?;
        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| IngestError::io(dir, e))?
        {
            paths.push(entry.path());
        }

        if paths.is_empty() {
            return Err(IngestError::EmptyFolder(dir.to_path_buf()));
        }
        paths.sort();

        let mut papers = Vec::new();
        for path in paths {
            let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
                continue;
            };
            let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

            let text = match extension {
                "pdf" => {
                    let extractor = *extractor;
                    let pdf = path.clone();
                    match tokio::task::spawn_blocking(move || extractor.extract_or_empty(&pdf)).await {
                        Ok(text) => text,
                        Err(e) => {
                            error!(path = %path.display(), error = %e, "PDF extraction task failed");
                            String::new()
                        }
                    }
                }
                "txt" => match fs::read_to_string(&path).await {
                    Ok(content) => content,
                    Err(e) => {
                        error!(path = %path.display(), error = %e, "Error reading text file");
                        String::new()
                    }
                },
                _ => continue,
            };

            if text.is_empty() {
                warn!(paper = %name, "No text extracted, skipping");
                continue;
            }
            papers.push(Paper::new(name, text));
        }

        info!(count = papers.len(), dir = %dir.display(), "Successfully loaded papers");
        Ok(papers)
    }

    /// Read every `.txt` file under `dir`, recursively, as `(path, content)`.
    pub async fn read_text_tree(dir: &Path) -> Result<Vec<(String, String)>, IngestError> {
        if !dir.is_dir() {
            return Err(IngestError::FolderNotFound(dir.to_path_buf()));
        }

        let mut paths: Vec<_> = WalkDir::new(dir)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable directory entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "txt"))
            .collect();
        paths.sort();

        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let content = fs::read_to_string(&path)
                .await
                .map_err(|e| IngestError::io(&path, e))?;
            files.push((path.to_string_lossy().to_string(), content));
        }

        Ok(files)
    }
}
