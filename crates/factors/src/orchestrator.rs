use extract::{ChatModel, ChatRequest, LlmError};
use ingest::Chunk;
use tracing::{info, warn};

use crate::error::PromptError;
use crate::outcome::OutcomeDefinition;
use crate::template::{NO_FACTORS_REPLY, Template};

/// One unit of text sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptInput {
    pub source: String,
    pub content: String,
}

impl PromptInput {
    pub fn new(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            content: content.into(),
        }
    }
}

impl From<&Chunk> for PromptInput {
    fn from(chunk: &Chunk) -> Self {
        Self::new(chunk.source.clone(), chunk.text.clone())
    }
}

/// The model's answer for one input, kept next to the input it came from.
#[derive(Debug)]
pub struct ChunkResponse {
    pub source: String,
    pub content: String,
    pub answer: Result<String, LlmError>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log and drop failed units.
    #[default]
    Skip,
    /// Stop at the first failed unit.
    Abort,
}

#[derive(Debug, Clone, Default)]
pub struct ChainReport {
    /// Content of each input whose raw extraction succeeded, parallel to `raw`.
    pub raw_inputs: Vec<String>,
    pub raw: Vec<String>,
    pub consolidated: Vec<String>,
    pub final_summary: Option<String>,
    /// Raw-extraction inputs whose request failed.
    pub skipped: usize,
}

impl ChainReport {
    /// Raw answers as output lines, each optionally preceded by its input.
    pub fn raw_lines(&self, include_chunk: bool) -> Vec<String> {
        if !include_chunk {
            return self.raw.clone();
        }
        self.raw_inputs
            .iter()
            .zip(&self.raw)
            .flat_map(|(input, answer)| [input.clone(), answer.clone()])
            .collect()
    }
}

pub struct PromptOrchestrator<M> {
    llm: M,
    outcomes: Vec<OutcomeDefinition>,
    max_tokens: u32,
    temperature: f32,
}

impl<M: ChatModel> PromptOrchestrator<M> {
    pub fn new(llm: M, outcomes: Vec<OutcomeDefinition>) -> Self {
        Self {
            llm,
            outcomes,
            max_tokens: 1000,
            temperature: 0.0,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn outcomes(&self) -> &[OutcomeDefinition] {
        &self.outcomes
    }

    /// Render `template` for every input and ask the model, one input at a
    /// time. Fails before any request if no outcome definition is configured.
    /// Under `FailurePolicy::Abort` the first failed request ends the batch and
    /// no further input is sent.
    pub async fn generate_responses(
        &self,
        template: Template,
        inputs: &[PromptInput],
        policy: FailurePolicy,
    ) -> Result<Vec<ChunkResponse>, PromptError> {
        if self.outcomes.is_empty() {
            return Err(PromptError::MissingOutcomeDefinition);
        }

        let mut responses = Vec::with_capacity(inputs.len());
        for (i, input) in inputs.iter().enumerate() {
            info!(template = template.name(), chunk = i, source = %input.source, "Processing chunk");

            let request = ChatRequest {
                messages: template.render(&input.content, &self.outcomes)?,
                max_tokens: self.max_tokens,
                temperature: self.temperature,
            };
            let answer = match self.llm.complete(&request).await {
                Err(source) if policy == FailurePolicy::Abort => {
                    return Err(PromptError::Llm {
                        chunk: input.source.clone(),
                        source,
                    });
                }
                answer => answer,
            };

            responses.push(ChunkResponse {
                source: input.source.clone(),
                content: input.content.clone(),
                answer,
            });
        }

        Ok(responses)
    }

    /// Raw extraction over every input, consolidation over batches of the
    /// useful answers, then one final consolidation.
    pub async fn run_chain(
        &self,
        inputs: &[PromptInput],
        batch_chars: usize,
    ) -> Result<ChainReport, PromptError> {
        let policy = Template::RawExtraction.default_policy();
        let responses = self
            .generate_responses(Template::RawExtraction, inputs, policy)
            .await?;
        let skipped = responses.iter().filter(|r| r.answer.is_err()).count();

        let mut report = ChainReport {
            skipped,
            ..ChainReport::default()
        };
        for pair in collect(responses, true, policy)?.chunks_exact(2) {
            report.raw_inputs.push(pair[0].clone());
            report.raw.push(pair[1].clone());
        }

        let useful: Vec<String> = report
            .raw
            .iter()
            .filter(|answer| !is_no_factors(answer))
            .cloned()
            .collect();
        if useful.is_empty() {
            warn!("No factors found in any chunk; skipping consolidation");
            return Ok(report);
        }

        let batches: Vec<PromptInput> = batch_texts(&useful, batch_chars)
            .into_iter()
            .enumerate()
            .map(|(i, batch)| PromptInput::new(format!("batch {}", i + 1), batch))
            .collect();
        info!(answers = useful.len(), batches = batches.len(), "Consolidating raw answers");

        let policy = Template::Consolidation.default_policy();
        let responses = self
            .generate_responses(Template::Consolidation, &batches, policy)
            .await?;
        report.consolidated = collect(responses, false, policy)?;

        let lists = report
            .consolidated
            .iter()
            .enumerate()
            .map(|(i, list)| format!("List {}:\n{}", i + 1, list))
            .collect::<Vec<_>>()
            .join("\n\n");
        let policy = Template::FinalConsolidation.default_policy();
        let responses = self
            .generate_responses(
                Template::FinalConsolidation,
                &[PromptInput::new("final", lists)],
                policy,
            )
            .await?;
        report.final_summary = collect(responses, false, policy)?.into_iter().next();

        Ok(report)
    }
}

/// Flatten responses to output lines, optionally putting each input's content
/// before its answer.
pub fn collect(
    responses: Vec<ChunkResponse>,
    include_chunk: bool,
    policy: FailurePolicy,
) -> Result<Vec<String>, PromptError> {
    let mut lines = Vec::new();

    for response in responses {
        let answer = match response.answer {
            Ok(answer) => answer,
            Err(source) => match policy {
                FailurePolicy::Abort => {
                    return Err(PromptError::Llm {
                        chunk: response.source,
                        source,
                    });
                }
                FailurePolicy::Skip => {
                    warn!(source = %response.source, error = %source, "Request failed, skipping chunk");
                    continue;
                }
            },
        };

        if include_chunk {
            lines.push(response.content);
        }
        lines.push(answer);
    }

    Ok(lines)
}

const SECTION_PREFIX: &str = "the factors contributing to ";

/// True when the answer is the no-factors reply, either on its own or as the
/// body of every per-phenomenon section. An answer with at least one section
/// listing real factors is kept.
fn is_no_factors(answer: &str) -> bool {
    let answer = answer.trim();
    if is_no_factors_reply(answer) {
        return true;
    }

    let mut sections = Vec::new();
    for line in answer.lines() {
        let line = line.trim();
        if line.to_lowercase().starts_with(SECTION_PREFIX) {
            let body = line.split_once(':').map_or("", |(_, body)| body);
            sections.push(body.trim().to_string());
        } else if let Some(body) = sections.last_mut() {
            body.push('\n');
            body.push_str(line);
        } else if !line.is_empty() {
            return false;
        }
    }

    !sections.is_empty() && sections.iter().all(|body| is_no_factors_reply(body.trim()))
}

fn is_no_factors_reply(text: &str) -> bool {
    let normalize = |t: &str| t.trim().trim_end_matches('.').to_lowercase();
    normalize(text) == normalize(NO_FACTORS_REPLY)
}

/// Greedily pack texts, joined by blank lines, into batches of at most
/// `max_chars` characters. A text longer than `max_chars` gets its own batch.
fn batch_texts(texts: &[String], max_chars: usize) -> Vec<String> {
    let mut batches = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for text in texts {
        let len = text.chars().count();
        if !current.is_empty() && current_len + 2 + len > max_chars {
            batches.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push_str("\n\n");
            current_len += 2;
        }
        current.push_str(text);
        current_len += len;
    }

    if !current.is_empty() {
        batches.push(current);
    }
    batches
}
