use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Literature-review pipeline: clean papers, chunk them, extract a
/// knowledge graph and prompt for contributing factors.
#[derive(Parser, Debug)]
#[command(name = "review", version, about)]
pub struct CliArgs {
    /// TOML configuration file (defaults are used when it does not exist)
    #[arg(long, global = true, env = "REVIEW_CONFIG", default_value = "review.toml")]
    pub config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract the Results section of every paper
    Clean(CleanArgs),
    /// Split cleaned papers into overlapping chunks
    Chunk(ChunkArgs),
    /// Extract a knowledge graph from stored chunks
    Graph(GraphArgs),
    /// Prompt the model for factors contributing to each outcome
    Factors(FactorsArgs),
}

#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Folder of .pdf / .txt papers
    #[arg(long)]
    pub input: Option<PathBuf>,

    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Remove detected tables from PDF pages
    #[arg(long)]
    pub strip_tables: bool,
}

#[derive(Args, Debug)]
pub struct ChunkArgs {
    #[arg(long)]
    pub input: Option<PathBuf>,

    #[arg(long)]
    pub output: Option<PathBuf>,

    #[arg(long)]
    pub chunk_size: Option<usize>,

    #[arg(long)]
    pub overlap: Option<usize>,

    /// Also write one flat text file per document
    #[arg(long)]
    pub text_dump: bool,
}

#[derive(Args, Debug)]
pub struct GraphArgs {
    /// Folder holding chunks.json
    #[arg(long)]
    pub chunks: Option<PathBuf>,

    /// Folder for per-paper JSON graphs
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Push each chunk's graph to Neo4j instead of writing JSON files
    #[arg(long)]
    pub neo4j: bool,

    /// Pause between model calls, in milliseconds
    #[arg(long)]
    pub delay_ms: Option<u64>,
}

#[derive(Args, Debug)]
pub struct FactorsArgs {
    #[arg(long, value_enum, default_value_t = TemplateArg::Raw)]
    pub template: TemplateArg,

    /// Folder holding chunks.json
    #[arg(long, conflicts_with = "input")]
    pub chunks: Option<PathBuf>,

    /// Folder of .txt files, each sent whole
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// JSON outcome definitions
    #[arg(long)]
    pub outcomes: Option<PathBuf>,

    /// Only use the definition of this phenomenon
    #[arg(long)]
    pub phenomenon: Option<String>,

    /// Write each input before the model's answer
    #[arg(long)]
    pub include_chunk: bool,

    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Maximum characters per consolidation batch (chain only)
    #[arg(long)]
    pub batch_chars: Option<usize>,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TemplateArg {
    Raw,
    Consolidation,
    Final,
    /// Raw extraction, batched consolidation, then a final consolidation
    Chain,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chunk_overrides() {
        let args = CliArgs::try_parse_from([
            "review",
            "chunk",
            "--chunk-size",
            "5000",
            "--overlap",
            "200",
            "--text-dump",
        ])
        .unwrap();

        assert_eq!(args.config, PathBuf::from("review.toml"));
        match args.command {
            Command::Chunk(chunk) => {
                assert_eq!(chunk.chunk_size, Some(5000));
                assert_eq!(chunk.overlap, Some(200));
                assert!(chunk.text_dump);
                assert!(chunk.input.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_factors() {
        let args = CliArgs::try_parse_from([
            "review",
            "--log-json",
            "factors",
            "--template",
            "chain",
            "--phenomenon",
            "Engagement",
            "--include-chunk",
        ])
        .unwrap();

        assert!(args.log_json);
        let Command::Factors(factors) = args.command else {
            panic!("expected factors command");
        };
        assert_eq!(factors.template, TemplateArg::Chain);
        assert_eq!(factors.phenomenon.as_deref(), Some("Engagement"));
        assert!(factors.include_chunk);
    }

    #[test]
    fn test_chunks_and_input_conflict() {
        let result = CliArgs::try_parse_from([
            "review", "factors", "--chunks", "chunks", "--input", "factors",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_stage_is_required() {
        assert!(CliArgs::try_parse_from(["review"]).is_err());
    }
}
