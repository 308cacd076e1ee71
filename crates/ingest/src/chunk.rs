use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub doc_id: String,
    pub chunk_id: String,
    pub text: String,
    /// File name of the paper the chunk was cut from.
    pub source: String,
    pub offset: (usize, usize), // [start, end) character positions in the source text
}

impl Chunk {
    pub fn new(
        doc_id: String,
        text: String,
        source: String,
        offset: (usize, usize),
    ) -> Self {
        let chunk_id = Self::generate_chunk_id(&doc_id, &text, offset);

        Self {
            doc_id,
            chunk_id,
            text,
            source,
            offset,
        }
    }

    fn generate_chunk_id(doc_id: &str, text: &str, offset: (usize, usize)) -> String {
        let mut hasher = Sha256::new();
        hasher.update(doc_id.as_bytes());
        hasher.update(text.as_bytes());
        hasher.update(offset.0.to_string().as_bytes());
        hasher.update(offset.1.to_string().as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..16])
    }

    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.offset.1 - self.offset.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id_is_stable_and_position_sensitive() {
        let a = Chunk::new("d".into(), "text".into(), "p.txt".into(), (0, 4));
        let b = Chunk::new("d".into(), "text".into(), "p.txt".into(), (0, 4));
        let c = Chunk::new("d".into(), "text".into(), "p.txt".into(), (10, 14));

        assert_eq!(a.chunk_id, b.chunk_id);
        assert_ne!(a.chunk_id, c.chunk_id);
        assert_eq!(a.chunk_id.len(), 32);
        assert_eq!(a.char_len(), 4);
    }
}
