use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use extract::{GraphExtractor, write_paper_graph};
use factors::{
    ChainReport, PromptInput, PromptOrchestrator, Template, collect, write_summaries_to_txt,
};
use index::Neo4jIndexer;
use ingest::{ChunkStore, FileReader, PdfExtractor, TableMode};

use crate::cli::{ChunkArgs, CleanArgs, FactorsArgs, GraphArgs, TemplateArg};
use crate::config::AppConfig;

pub async fn run_clean(config: &AppConfig, args: CleanArgs) -> Result<()> {
    let input = args.input.unwrap_or_else(|| config.paths.pdfs.clone());
    let output = args.output.unwrap_or_else(|| config.paths.cleaned.clone());
    let mode = if args.strip_tables {
        TableMode::Strip
    } else {
        TableMode::Keep
    };

    let cleaned = ingest::clean_directory(&input, &output, &PdfExtractor::new(mode)).await?;

    let fallbacks: Vec<&str> = cleaned
        .iter()
        .filter(|p| p.is_fallback())
        .map(|p| p.name.as_str())
        .collect();
    if !fallbacks.is_empty() {
        warn!(papers = ?fallbacks, "Saved unprocessed text for papers without a clean Results section");
    }
    Ok(())
}

pub async fn run_chunk(config: &AppConfig, args: ChunkArgs) -> Result<()> {
    let input = args.input.unwrap_or_else(|| config.paths.cleaned.clone());
    let output = args.output.unwrap_or_else(|| config.paths.chunks.clone());

    let mut chunker_config = config.chunker_config();
    if let Some(size) = args.chunk_size {
        chunker_config.chunk_size = size;
    }
    if let Some(overlap) = args.overlap {
        chunker_config.chunk_overlap = overlap;
    }
    chunker_config.validate().map_err(anyhow::Error::msg)?;

    let chunks = ingest::chunk_directory(&input, chunker_config).await?;

    let store = ChunkStore::new(&output);
    let path = store.save(&chunks)?;
    info!(chunks = chunks.len(), path = %path.display(), "Saved chunks");

    if args.text_dump {
        let files = store.save_text_dump(&chunks)?;
        info!(files = files.len(), "Saved per-document text dumps");
    }
    Ok(())
}

pub async fn run_graph(config: &AppConfig, args: GraphArgs) -> Result<()> {
    let chunks_dir = args.chunks.unwrap_or_else(|| config.paths.chunks.clone());
    let output = args.output.unwrap_or_else(|| config.paths.graph.clone());

    let chunks = ChunkStore::new(&chunks_dir).load()?;
    info!(chunks = chunks.len(), "Loaded chunks");

    let mut options = config.extractor_options();
    if let Some(delay_ms) = args.delay_ms {
        options.delay = Duration::from_millis(delay_ms);
    }
    let mut extractor = GraphExtractor::new(config.chat_client()?, options);

    if args.neo4j {
        let indexer = Neo4jIndexer::connect(&config.neo4j_config()?).await?;
        indexer.init_schema().await?;

        let report = extractor.extract_into(&chunks, &indexer).await;
        let stats = indexer.get_stats().await?;
        info!(
            pushed = report.pushed,
            extraction_failures = report.extraction_failures,
            push_failures = report.push_failures,
            entities = stats.entity_count,
            relations = stats.relation_count,
            "Graph database updated"
        );
        return Ok(());
    }

    let papers = extractor.extract_corpus(&chunks).await;
    let mut failed = 0;
    for (source, extraction) in &papers {
        failed += extraction.failed.len();
        write_paper_graph(&output, source, &extraction.graph).await?;
    }
    info!(papers = papers.len(), failed_chunks = failed, "Graph extraction finished");
    Ok(())
}

pub async fn run_factors(config: &AppConfig, args: FactorsArgs) -> Result<()> {
    let outcomes_path = args.outcomes.unwrap_or_else(|| config.factors.outcomes.clone());
    let mut outcomes = factors::load_outcome_definitions(&outcomes_path)
        .await
        .with_context(|| format!("Failed to load outcome definitions from {}", outcomes_path.display()))?;
    if let Some(phenomenon) = &args.phenomenon {
        outcomes = factors::select(&outcomes, phenomenon)?;
    }
    if outcomes.is_empty() {
        return Err(factors::PromptError::MissingOutcomeDefinition.into());
    }

    let inputs = load_inputs(config, args.chunks, args.input).await?;
    let output = args
        .output
        .unwrap_or_else(|| config.paths.factors.join("response.txt"));

    let orchestrator = PromptOrchestrator::new(config.chat_client()?, outcomes)
        .with_max_tokens(args.max_tokens.unwrap_or(config.llm.max_tokens))
        .with_temperature(config.llm.temperature);

    let template = match args.template {
        TemplateArg::Raw => Template::RawExtraction,
        TemplateArg::Consolidation => Template::Consolidation,
        TemplateArg::Final => Template::FinalConsolidation,
        TemplateArg::Chain => {
            let batch_chars = args.batch_chars.unwrap_or(config.factors.batch_chars);
            let report = orchestrator.run_chain(&inputs, batch_chars).await?;

            write_chain_report(&report, &output, args.include_chunk).await?;

            info!(
                inputs = inputs.len(),
                skipped = report.skipped,
                batches = report.consolidated.len(),
                "Factor chain finished"
            );
            return Ok(());
        }
    };

    let policy = template.default_policy();
    let responses = orchestrator.generate_responses(template, &inputs, policy).await?;
    let failed = responses.iter().filter(|r| r.answer.is_err()).count();
    let lines = collect(responses, args.include_chunk, policy)?;
    write_summaries_to_txt(&lines, &output).await?;

    info!(template = template.name(), inputs = inputs.len(), failed, "Prompting finished");
    Ok(())
}

/// Raw answers go to `<stem>.raw.txt`, preceded by their inputs when
/// `include_chunk` is set, consolidated lists to `<stem>.consolidated.txt`
/// and the final summary to `output`.
async fn write_chain_report(report: &ChainReport, output: &Path, include_chunk: bool) -> Result<()> {
    write_summaries_to_txt(&report.raw_lines(include_chunk), &sibling(output, "raw")).await?;
    write_summaries_to_txt(&report.consolidated, &sibling(output, "consolidated")).await?;
    let summary: Vec<String> = report.final_summary.iter().cloned().collect();
    write_summaries_to_txt(&summary, output).await?;
    Ok(())
}

async fn load_inputs(
    config: &AppConfig,
    chunks: Option<PathBuf>,
    input: Option<PathBuf>,
) -> Result<Vec<PromptInput>> {
    if let Some(dir) = input {
        let files = FileReader::read_text_tree(&dir).await?;
        return Ok(files
            .into_iter()
            .map(|(path, text)| PromptInput::new(file_name(&path), text))
            .collect());
    }

    let dir = chunks.unwrap_or_else(|| config.paths.chunks.clone());
    let chunks = ChunkStore::new(&dir).load()?;
    Ok(chunks.iter().map(PromptInput::from).collect())
}

fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string())
}

/// `factors/response.txt` + "raw" -> `factors/response.raw.txt`
fn sibling(path: &Path, label: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "response".to_string());
    path.with_file_name(format!("{stem}.{label}.txt"))
}
