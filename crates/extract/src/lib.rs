pub mod llm;
pub mod normalizer;
pub mod prompt;
pub mod schema;

pub use llm::{ChatClient, ChatModel, ChatRequest, LlmError, Message, Role};
pub use normalizer::GraphNormalizer;
pub use schema::{GraphDocument, Node, PaperGraph, Relationship};

use anyhow::Context;
use async_trait::async_trait;
use indexmap::IndexMap;
use ingest::Chunk;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::schema::RawGraph;

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*```(?:json)?\s*(.*?)\s*```\s*$").expect("code fence pattern is valid")
});

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("LLM call failed: {0}")]
    Llm(#[from] LlmError),
    #[error("model returned an invalid graph: {0}")]
    InvalidGraph(String),
}

/// Destination for graphs pushed chunk by chunk.
#[async_trait]
pub trait GraphSink: Send + Sync {
    async fn add_graph_document(&self, doc: &GraphDocument) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
pub struct ExtractorOptions {
    pub max_tokens: u32,
    pub temperature: f32,
    /// Pause between consecutive model calls.
    pub delay: Duration,
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        Self {
            max_tokens: 2000,
            temperature: 0.0,
            delay: Duration::from_secs(1),
        }
    }
}

/// Result of extracting one paper's chunks.
#[derive(Debug, Default)]
pub struct PaperExtraction {
    pub graph: PaperGraph,
    pub succeeded: usize,
    /// (chunk_id, error message) for every dropped chunk.
    pub failed: Vec<(String, String)>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SinkReport {
    pub pushed: usize,
    pub extraction_failures: usize,
    pub push_failures: usize,
}

pub struct GraphExtractor<M> {
    llm: M,
    normalizer: GraphNormalizer,
    options: ExtractorOptions,
    calls_made: usize,
}

impl<M: ChatModel> GraphExtractor<M> {
    pub fn new(llm: M, options: ExtractorOptions) -> Self {
        Self {
            llm,
            normalizer: GraphNormalizer::new(),
            options,
            calls_made: 0,
        }
    }

    /// Extract entities and relations from one chunk
    pub async fn extract_chunk(&mut self, chunk: &Chunk) -> Result<GraphDocument, ExtractError> {
        if self.calls_made > 0 && !self.options.delay.is_zero() {
            tokio::time::sleep(self.options.delay).await;
        }
        self.calls_made += 1;

        let request = ChatRequest {
            messages: prompt::build_graph_messages(&chunk.text),
            max_tokens: self.options.max_tokens,
            temperature: self.options.temperature,
        };
        let answer = self.llm.complete(&request).await?;
        let raw = parse_graph(&answer)?;

        Ok(self.normalize(chunk, raw))
    }

    /// Extract every chunk of one paper, dropping chunks that fail.
    pub async fn extract_paper(&mut self, chunks: &[Chunk]) -> PaperExtraction {
        self.normalizer.reset();
        let mut extraction = PaperExtraction::default();

        for (i, chunk) in chunks.iter().enumerate() {
            info!(source = %chunk.source, chunk = i + 1, total = chunks.len(), "Extracting from chunk");
            match self.extract_chunk(chunk).await {
                Ok(doc) => {
                    extraction.graph.absorb(doc);
                    extraction.succeeded += 1;
                }
                Err(e) => {
                    error!(source = %chunk.source, chunk = i + 1, error = %e, "Error processing chunk");
                    extraction.failed.push((chunk.chunk_id.clone(), e.to_string()));
                }
            }
        }

        extraction
    }

    /// Extract all chunks grouped per paper.
    pub async fn extract_corpus(&mut self, chunks: &[Chunk]) -> IndexMap<String, PaperExtraction> {
        let mut papers = IndexMap::new();
        for (source, group) in ingest::group_by_source(chunks) {
            let extraction = self.extract_paper(&group).await;
            papers.insert(source, extraction);
        }
        papers
    }

    /// Push each chunk's graph into `sink` as soon as it is extracted.
    pub async fn extract_into(&mut self, chunks: &[Chunk], sink: &dyn GraphSink) -> SinkReport {
        let mut report = SinkReport::default();
        let mut current_source: Option<&str> = None;

        for (i, chunk) in chunks.iter().enumerate() {
            if current_source != Some(chunk.source.as_str()) {
                self.normalizer.reset();
                current_source = Some(chunk.source.as_str());
            }

            info!(source = %chunk.source, chunk = i + 1, total = chunks.len(), "Extracting from chunk");
            let doc = match self.extract_chunk(chunk).await {
                Ok(doc) => doc,
                Err(e) => {
                    error!(chunk = i + 1, error = %e, "Error processing chunk");
                    report.extraction_failures += 1;
                    continue;
                }
            };

            match sink.add_graph_document(&doc).await {
                Ok(()) => report.pushed += 1,
                Err(e) => {
                    error!(chunk = i + 1, error = %e, "Error storing chunk graph");
                    report.push_failures += 1;
                }
            }
        }

        report
    }

    fn normalize(&mut self, chunk: &Chunk, raw: RawGraph) -> GraphDocument {
        let mut nodes: Vec<Node> = Vec::new();
        for node in raw.nodes {
            let id = self.normalizer.node_id(&node.id);
            if nodes.iter().any(|n| n.id == id) {
                continue;
            }
            nodes.push(Node {
                id,
                node_type: self.normalizer.node_type(&node.node_type),
                properties: node.properties,
            });
        }

        let mut relationships = Vec::new();
        for rel in raw.relationships {
            let source = self.normalizer.node_id(&rel.source_node_id);
            let target = self.normalizer.node_id(&rel.target_node_id);

            // Endpoints the model forgot to list still become nodes.
            for (id, node_type) in [(&source, &rel.source_node_type), (&target, &rel.target_node_type)] {
                if !nodes.iter().any(|n| &n.id == id) {
                    warn!(node = %id, "Relationship endpoint missing from nodes");
                    nodes.push(Node {
                        id: id.clone(),
                        node_type: self.normalizer.node_type(node_type),
                        properties: Default::default(),
                    });
                }
            }

            relationships.push(Relationship {
                source,
                target,
                relation_type: self.normalizer.relationship_type(&rel.relation_type),
                properties: rel.properties,
            });
        }

        GraphDocument {
            chunk_id: chunk.chunk_id.clone(),
            source: chunk.source.clone(),
            text: chunk.text.clone(),
            nodes,
            relationships,
        }
    }
}

fn parse_graph(answer: &str) -> Result<RawGraph, ExtractError> {
    let body = CODE_FENCE
        .captures(answer)
        .and_then(|c| c.get(1))
        .map_or(answer, |m| m.as_str());

    serde_json::from_str(body).map_err(|e| ExtractError::InvalidGraph(e.to_string()))
}

/// Write `graph` to `<dir>/<paper stem>.json`.
pub async fn write_paper_graph(dir: &Path, source: &str, graph: &PaperGraph) -> anyhow::Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let stem = Path::new(source)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| source.to_string());
    let path = dir.join(format!("{stem}.json"));

    let json = serde_json::to_string_pretty(graph)?;
    tokio::fs::write(&path, json)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!(path = %path.display(), "Saved KG JSON");
    Ok(path)
}
