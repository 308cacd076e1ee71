pub mod error;
pub mod orchestrator;
pub mod outcome;
pub mod template;

pub use error::PromptError;
pub use orchestrator::{
    ChainReport, ChunkResponse, FailurePolicy, PromptInput, PromptOrchestrator, collect,
};
pub use outcome::{OutcomeDefinition, load_outcome_definitions, select};
pub use template::{NO_FACTORS_REPLY, Template};

use std::path::Path;
use tracing::info;

/// Write every text followed by a blank line, creating parent directories.
pub async fn write_summaries_to_txt(texts: &[String], path: &Path) -> Result<(), PromptError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| PromptError::io(parent, e))?;
    }

    let mut body = String::new();
    for text in texts {
        body.push_str(text);
        body.push_str("\n\n");
    }

    tokio::fs::write(path, body)
        .await
        .map_err(|e| PromptError::io(path, e))?;

    info!(path = %path.display(), entries = texts.len(), "Analyze results saved to text file");
    Ok(())
}
