use std::collections::VecDeque;
use std::path::Path;

use crate::chunk::Chunk;

/// Character range `[start, end)` into a document.
type Span = (usize, usize);

#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Maximum characters carried over from one chunk into the next.
    pub chunk_overlap: usize,
    /// Tried in order; the empty separator splits between characters.
    pub separators: Vec<String>,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 100,
            separators: vec!["\n\n".to_string(), " ".to_string(), String::new()],
        }
    }
}

impl ChunkerConfig {
    pub fn with_sizes(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be greater than 0".to_string());
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            ));
        }
        if self.separators.is_empty() {
            return Err("at least one separator is required".to_string());
        }
        Ok(())
    }
}

/// Recursive character splitter: paragraphs first, then words, then
/// single characters.
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    pub fn chunk_text(&self, doc_id: &str, text: &str, source: &str) -> Vec<Chunk> {
        let chars: Vec<char> = text.chars().collect();
        let separators: Vec<Vec<char>> = self
            .config
            .separators
            .iter()
            .map(|s| s.chars().collect())
            .collect();

        let mut spans = Vec::new();
        self.split_span(&chars, (0, chars.len()), &separators, &mut spans);

        spans
            .into_iter()
            .map(|(start, end)| {
                Chunk::new(
                    doc_id.to_string(),
                    chars[start..end].iter().collect(),
                    source.to_string(),
                    (start, end),
                )
            })
            .collect()
    }

    /// Chunk `(path, content)` pairs. Each chunk's source is the file name.
    pub fn chunk_documents(&self, docs: &[(String, String)]) -> Vec<Chunk> {
        let mut all_chunks = Vec::new();

        for (path, content) in docs {
            let doc_id = crate::generate_doc_id(path);
            let source = Path::new(path)
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.clone());
            all_chunks.extend(self.chunk_text(&doc_id, content, &source));
        }

        all_chunks
    }

    fn split_span(
        &self,
        chars: &[char],
        span: Span,
        separators: &[Vec<char>],
        out: &mut Vec<Span>,
    ) {
        let (separator, remaining) = choose_separator(&chars[span.0..span.1], separators);
        let pieces = split_on(chars, span, separator);

        let mut fitting: Vec<Span> = Vec::new();
        for piece in pieces {
            if piece.1 - piece.0 < self.config.chunk_size {
                fitting.push(piece);
                continue;
            }

            if !fitting.is_empty() {
                self.merge(chars, &fitting, out);
                fitting.clear();
            }

            if remaining.is_empty() {
                push_trimmed(chars, piece, out);
            } else {
                self.split_span(chars, piece, remaining, out);
            }
        }

        if !fitting.is_empty() {
            self.merge(chars, &fitting, out);
        }
    }

    /// Greedily pack pieces into windows of at most `chunk_size` characters,
    /// carrying up to `chunk_overlap` characters of tail into the next window.
    fn merge(&self, chars: &[char], pieces: &[Span], out: &mut Vec<Span>) {
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;
        let mut window: VecDeque<Span> = VecDeque::new();

        for &(start, end) in pieces {
            if let (Some(&(first, _)), Some(&(_, last))) = (window.front(), window.back()) {
                if end - first > size {
                    push_trimmed(chars, (first, last), out);

                    while let Some(&(front, _)) = window.front() {
                        if last - front > overlap || end - front > size {
                            window.pop_front();
                        } else {
                            break;
                        }
                    }
                }
            }
            window.push_back((start, end));
        }

        if let (Some(&(first, _)), Some(&(_, last))) = (window.front(), window.back()) {
            push_trimmed(chars, (first, last), out);
        }
    }
}

fn choose_separator<'a>(text: &[char], separators: &'a [Vec<char>]) -> (&'a [char], &'a [Vec<char>]) {
    for (i, separator) in separators.iter().enumerate() {
        if separator.is_empty() {
            return (separator.as_slice(), &[]);
        }
        if text.windows(separator.len()).any(|w| w == separator.as_slice()) {
            return (separator.as_slice(), &separators[i + 1..]);
        }
    }
    match separators.last() {
        Some(last) => (last.as_slice(), &[]),
        None => (&[], &[]),
    }
}

/// Split `span` on `separator`, dropping separators and empty pieces.
fn split_on(chars: &[char], span: Span, separator: &[char]) -> Vec<Span> {
    let (start, end) = span;
    if separator.is_empty() {
        return (start..end).map(|i| (i, i + 1)).collect();
    }

    let mut pieces = Vec::new();
    let mut piece_start = start;
    let mut pos = start;
    while pos + separator.len() <= end {
        if &chars[pos..pos + separator.len()] == separator {
            if pos > piece_start {
                pieces.push((piece_start, pos));
            }
            pos += separator.len();
            piece_start = pos;
        } else {
            pos += 1;
        }
    }
    if piece_start < end {
        pieces.push((piece_start, end));
    }
    pieces
}

fn push_trimmed(chars: &[char], span: Span, out: &mut Vec<Span>) {
    let (mut start, mut end) = span;
    while start < end && chars[start].is_whitespace() {
        start += 1;
    }
    while end > start && chars[end - 1].is_whitespace() {
        end -= 1;
    }
    if start < end {
        out.push((start, end));
    }
}

/// Rebuild a document from its ordered chunks: overlapping characters are
/// taken once and a single space stands in for dropped separators.
pub fn reassemble(chunks: &[Chunk]) -> String {
    let mut text = String::new();
    let mut covered: Option<usize> = None;

    for chunk in chunks {
        let (start, end) = chunk.offset;
        match covered {
            None => text.push_str(&chunk.text),
            Some(prev_end) if start < prev_end => {
                text.extend(chunk.text.chars().skip(prev_end - start));
            }
            Some(prev_end) => {
                if start > prev_end {
                    text.push(' ');
                }
                text.push_str(&chunk.text);
            }
        }
        covered = Some(covered.map_or(end, |c| c.max(end)));
    }

    text
}
