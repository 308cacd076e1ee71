use extract::LlmError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("an outcome definition is required but none was configured")]
    MissingOutcomeDefinition,
    #[error("no outcome definition for phenomenon '{0}'")]
    UnknownPhenomenon(String),
    #[error("request for {chunk} failed: {source}")]
    Llm {
        chunk: String,
        #[source]
        source: LlmError,
    },
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid outcome definitions: {0}")]
    Json(#[from] serde_json::Error),
}

impl PromptError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
