use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub chunking: ChunkingConfig,
    pub llm: LlmConfig,
    pub graph: GraphConfig,
    pub neo4j: Neo4jSection,
    pub factors: FactorsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub pdfs: PathBuf,
    pub cleaned: PathBuf,
    pub chunks: PathBuf,
    pub graph: PathBuf,
    pub factors: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub delay_ms: u64,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Neo4jSection {
    pub uri: String,
    pub user: String,
    pub password_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FactorsConfig {
    pub outcomes: PathBuf,
    pub batch_chars: usize,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            pdfs: PathBuf::from("pdfs"),
            cleaned: PathBuf::from("cleaned_papers"),
            chunks: PathBuf::from("chunks"),
            graph: PathBuf::from("graph"),
            factors: PathBuf::from("factors"),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 100,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o".to_string(),
            max_tokens: 1000,
            temperature: 0.0,
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            delay_ms: 1000,
            max_tokens: 2000,
        }
    }
}

impl Default for Neo4jSection {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password_env: "NEO4J_PASSWORD".to_string(),
        }
    }
}

impl Default for FactorsConfig {
    fn default() -> Self {
        Self {
            outcomes: PathBuf::from("outcome_definition.json"),
            batch_chars: 5000,
        }
    }
}

impl AppConfig {
    /// Load `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn chunker_config(&self) -> ingest::ChunkerConfig {
        ingest::ChunkerConfig::with_sizes(self.chunking.chunk_size, self.chunking.chunk_overlap)
    }

    pub fn chat_client(&self) -> Result<extract::ChatClient> {
        Ok(extract::ChatClient::from_env(
            &self.llm.base_url,
            &self.llm.model,
            &self.llm.api_key_env,
        )?)
    }

    pub fn extractor_options(&self) -> extract::ExtractorOptions {
        extract::ExtractorOptions {
            max_tokens: self.graph.max_tokens,
            temperature: self.llm.temperature,
            delay: Duration::from_millis(self.graph.delay_ms),
        }
    }

    pub fn neo4j_config(&self) -> Result<index::Neo4jConfig> {
        let password = std::env::var(&self.neo4j.password_env)
            .with_context(|| format!("{} is not set", self.neo4j.password_env))?;

        Ok(index::Neo4jConfig {
            uri: self.neo4j.uri.clone(),
            user: self.neo4j.user.clone(),
            password,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.paths.cleaned, PathBuf::from("cleaned_papers"));
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.chunk_overlap, 100);
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.max_tokens, 1000);
        assert_eq!(config.graph.delay_ms, 1000);
        assert_eq!(config.factors.batch_chars, 5000);
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [chunking]
            chunk_size = 5000

            [llm]
            model = "gpt-4o-mini"
            "#,
        )
        .unwrap();

        assert_eq!(config.chunking.chunk_size, 5000);
        assert_eq!(config.chunking.chunk_overlap, 100);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.neo4j.user, "neo4j");
    }

    #[test]
    fn test_load_missing_and_invalid_files() {
        let dir = tempfile::tempdir().unwrap();

        let config = AppConfig::load(&dir.path().join("review.toml")).unwrap();
        assert_eq!(config.paths.pdfs, PathBuf::from("pdfs"));

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[chunking]\nchunk_size = \"big\"").unwrap();
        assert!(AppConfig::load(&bad).is_err());
    }

    #[test]
    fn test_derived_settings() {
        let mut config = AppConfig::default();
        config.graph.delay_ms = 250;
        config.neo4j.password_env = "REVIEW_TEST_UNSET_NEO4J_PASSWORD".into();

        assert_eq!(config.extractor_options().delay, Duration::from_millis(250));
        assert_eq!(config.chunker_config().chunk_size, 500);
        assert!(config.neo4j_config().is_err());
    }
}
