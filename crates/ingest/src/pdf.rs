//! PDF text extraction.
//!
//! Pages are extracted one at a time with `lopdf`; a page that fails is
//! logged and left out, a document that cannot be opened is an error.
//! `TableMode::Strip` removes table-like blocks by literal substring removal
//! of their flattened text. That removal only succeeds when the flattened
//! rows match the page text exactly, so fragments can survive.

use lopdf::Document;
use std::path::Path;
use tracing::{error, warn};

use crate::error::PdfError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableMode {
    /// Keep table content verbatim.
    #[default]
    Keep,
    /// Detect tables per page and cut their text out.
    Strip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    pub pages_read: usize,
    pub failed_pages: Vec<u32>,
}

/// A detected table: rows of whitespace-separated cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Cells joined by a space, rows joined by a newline.
    pub fn flattened(&self) -> String {
        self.rows
            .iter()
            .map(|row| row.join(" "))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor {
    mode: TableMode,
}

impl PdfExtractor {
    pub fn new(mode: TableMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> TableMode {
        self.mode
    }

    pub fn extract(&self, path: &Path) -> Result<ExtractedText, PdfError> {
        let doc = Document::load(path).map_err(|e| PdfError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let pages = doc.get_pages();
        if pages.is_empty() {
            return Err(PdfError::NoPages(path.to_path_buf()));
        }

        let mut page_texts = Vec::with_capacity(pages.len());
        let mut failed_pages = Vec::new();

        for page_num in pages.keys() {
            match doc.extract_text(&[*page_num]) {
                Ok(text) => page_texts.push(self.clean_page(&text)),
                Err(e) => {
                    warn!(path = %path.display(), page = page_num, error = %e, "Error reading page");
                    failed_pages.push(*page_num);
                }
            }
        }

        Ok(ExtractedText {
            pages_read: page_texts.len(),
            text: self.join_pages(&page_texts),
            failed_pages,
        })
    }

    /// Extract, logging failures and returning an empty string so a batch
    /// can carry on.
    pub fn extract_or_empty(&self, path: &Path) -> String {
        match self.extract(path) {
            Ok(extracted) => extracted.text,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Error processing PDF");
                String::new()
            }
        }
    }

    fn clean_page(&self, text: &str) -> String {
        match self.mode {
            TableMode::Keep => text.to_string(),
            TableMode::Strip => strip_tables(text, &detect_tables(text)),
        }
    }

    fn join_pages(&self, pages: &[String]) -> String {
        match self.mode {
            TableMode::Keep => pages
                .iter()
                .filter(|p| !p.is_empty())
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(" ")
                .trim()
                .to_string(),
            TableMode::Strip => pages.join("\n"),
        }
    }
}

fn is_numeric_cell(cell: &str) -> bool {
    let trimmed = cell.trim_matches(|c: char| "()[]%±,;*".contains(c));
    !trimmed.is_empty()
        && trimmed.chars().any(|c| c.is_ascii_digit())
        && trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || ".-–+<>=/".contains(c))
}

fn row_cells(line: &str) -> Option<Vec<String>> {
    let cells: Vec<String> = line.split_whitespace().map(str::to_string).collect();
    if cells.len() < 2 {
        return None;
    }
    let numeric = cells.iter().filter(|c| is_numeric_cell(c)).count();
    (numeric * 2 >= cells.len()).then_some(cells)
}

/// Find runs of at least two consecutive row-like lines.
pub fn detect_tables(page_text: &str) -> Vec<Table> {
    let mut tables = Vec::new();
    let mut rows: Vec<Vec<String>> = Vec::new();

    for line in page_text.lines() {
        match row_cells(line) {
            Some(cells) => rows.push(cells),
            None => {
                if rows.len() >= 2 {
                    tables.push(Table {
                        rows: std::mem::take(&mut rows),
                    });
                } else {
                    rows.clear();
                }
            }
        }
    }
    if rows.len() >= 2 {
        tables.push(Table { rows });
    }

    tables
}

/// Remove each table's flattened text from the page by literal replacement.
pub fn strip_tables(page_text: &str, tables: &[Table]) -> String {
    tables
        .iter()
        .fold(page_text.to_string(), |text, table| {
            text.replace(&table.flattened(), "")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "Results\nParticipants improved.\nGroup 12 3.4 (1.2)\nControl 10 2.1 (0.9)\nSee table above.";

    #[test]
    fn test_detects_numeric_rows() {
        let tables = detect_tables(PAGE);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows.len(), 2);
        assert_eq!(
            tables[0].flattened(),
            "Group 12 3.4 (1.2)\nControl 10 2.1 (0.9)"
        );
    }

    #[test]
    fn test_single_numeric_line_is_not_a_table() {
        let text = "We recruited 40 participants.\nMean 3.2 4.1\nprose again here";
        assert!(detect_tables(text).is_empty());
    }

    #[test]
    fn test_strip_removes_exact_table_text() {
        let stripped = strip_tables(PAGE, &detect_tables(PAGE));
        assert_eq!(
            stripped,
            "Results\nParticipants improved.\n\nSee table above."
        );
    }

    #[test]
    fn test_strip_leaves_remnants_on_inexact_spacing() {
        let page = "Intro\nGroup  12  3.4\nControl 10 2.1\nEnd words here";
        let stripped = strip_tables(page, &detect_tables(page));
        // Double spaces in the page break the literal match.
        assert!(stripped.contains("Control 10 2.1"));
    }

    #[test]
    fn test_unreadable_file_yields_empty_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"not a pdf").unwrap();

        let extractor = PdfExtractor::new(TableMode::Keep);
        assert!(matches!(
            extractor.extract(&path),
            Err(PdfError::Load { .. })
        ));
        assert_eq!(extractor.extract_or_empty(&path), "");
    }
}
