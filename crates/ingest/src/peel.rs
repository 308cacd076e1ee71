//! Results-section peeling.
//!
//! A paper's Results section is the text between a line reading "Results"
//! and a line reading "References". PDF extraction often letter-spaces
//! headings ("R E S U L T S"), so horizontal whitespace is tolerated between
//! letters. Both headings must appear exactly once; anything else is an
//! error for the caller to handle.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

static START_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| heading_pattern("result"));
static END_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| heading_pattern("reference"));

/// Build a whole-line, case-insensitive pattern for `word` with an optional
/// plural "s" and optional spaces or tabs between letters.
fn heading_pattern(word: &str) -> Regex {
    let letters: Vec<String> = word.chars().map(|c| c.to_string()).collect();
    let pattern = format!(
        r"(?im)^[ \t]*{}(?:[ \t]*s)?[ \t]*\r?$",
        letters.join(r"[ \t]*")
    );
    Regex::new(&pattern).expect("heading pattern is valid")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    Start,
    End,
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Boundary::Start => write!(f, "starting point"),
            Boundary::End => write!(f, "ending point"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PeelError {
    #[error("{paper}: no {boundary} found for section extraction")]
    Missing { paper: String, boundary: Boundary },

    #[error("{paper}: multiple {boundary} found for section extraction ({count} matches)")]
    Multiple {
        paper: String,
        boundary: Boundary,
        count: usize,
    },

    #[error("{paper}: ending point precedes starting point")]
    OutOfOrder { paper: String },
}

impl PeelError {
    pub fn boundary(&self) -> Option<Boundary> {
        match self {
            PeelError::Missing { boundary, .. } | PeelError::Multiple { boundary, .. } => {
                Some(*boundary)
            }
            PeelError::OutOfOrder { .. } => None,
        }
    }
}

/// Locate the single match of `pattern`, returning its byte offset.
fn unique_line(
    paper: &str,
    text: &str,
    pattern: &Regex,
    boundary: Boundary,
) -> Result<usize, PeelError> {
    let mut matches = pattern.find_iter(text);
    let first = matches.next().ok_or_else(|| PeelError::Missing {
        paper: paper.to_string(),
        boundary,
    })?;

    let extra = matches.count();
    if extra > 0 {
        return Err(PeelError::Multiple {
            paper: paper.to_string(),
            boundary,
            count: extra + 1,
        });
    }

    Ok(first.start())
}

/// Return the text from the Results heading line up to, but excluding, the
/// References heading line.
pub fn peel_section(paper: &str, text: &str) -> Result<String, PeelError> {
    let start = unique_line(paper, text, &START_BOUNDARY, Boundary::Start)?;
    let end = unique_line(paper, text, &END_BOUNDARY, Boundary::End)?;

    if end < start {
        return Err(PeelError::OutOfOrder {
            paper: paper.to_string(),
        });
    }

    Ok(text[start..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peels_between_headings() {
        let text = "Intro\n\nResults\nWe found X.\nReferences\n[1] A.";
        let section = peel_section("paper.pdf", text).unwrap();
        assert_eq!(section, "Results\nWe found X.\n");
    }

    #[test]
    fn test_peel_is_idempotent_with_end_marker() {
        let text = "Abstract\nstuff\nRESULTS\nEffect sizes were large [3].\n\nMore.\nREFERENCES\n1. B";
        let once = peel_section("p", text).unwrap();
        let again = peel_section("p", &format!("{once}References\n")).unwrap();
        assert_eq!(once, again);
    }

    #[test]
    fn test_letter_spaced_and_singular_headings() {
        let text = "Method\nR E S U L T S\nbody\n  r e f e r e n c e  \ncited";
        assert_eq!(peel_section("p", text).unwrap(), "R E S U L T S\nbody\n");

        let text = "x\nResult\ny\nReference\nz";
        assert_eq!(peel_section("p", text).unwrap(), "Result\ny\n");
    }

    #[test]
    fn test_crlf_line_endings() {
        let text = "Intro\r\nResults\r\nbody\r\nReferences\r\n[1]";
        assert_eq!(peel_section("p", text).unwrap(), "Results\r\nbody\r\n");
    }

    #[test]
    fn test_heading_must_be_whole_line() {
        let text = "The results were clear.\nResults and discussion\nReferences\n";
        let err = peel_section("p", text).unwrap_err();
        assert_eq!(
            err,
            PeelError::Missing {
                paper: "p".to_string(),
                boundary: Boundary::Start
            }
        );
    }

    #[test]
    fn test_multiple_start_headings() {
        let text = "Contents\nResults\nIntro\nResults\nWe found X.\nReferences\n[1] A.";
        let err = peel_section("paper.pdf", text).unwrap_err();
        assert_eq!(err.boundary(), Some(Boundary::Start));
        assert!(matches!(err, PeelError::Multiple { count: 2, .. }));
        let message = err.to_string();
        assert!(message.contains("multiple starting point"));
        assert!(message.starts_with("paper.pdf"));
    }

    #[test]
    fn test_missing_and_duplicated_end() {
        let err = peel_section("p", "Results\nbody\n").unwrap_err();
        assert_eq!(err.boundary(), Some(Boundary::End));
        assert!(err.to_string().contains("no ending point"));

        let err = peel_section("p", "Results\nReferences\nx\nReferences\n").unwrap_err();
        assert!(err.to_string().contains("multiple ending point"));
    }

    #[test]
    fn test_start_is_checked_before_end() {
        let err = peel_section("p", "nothing here").unwrap_err();
        assert!(err.to_string().contains("no starting point"));
    }

    #[test]
    fn test_end_before_start() {
        let err = peel_section("p", "References\n[1]\nResults\nbody\n").unwrap_err();
        assert_eq!(
            err,
            PeelError::OutOfOrder {
                paper: "p".to_string()
            }
        );
    }
}
