use extract::Message;

use crate::error::PromptError;
use crate::orchestrator::FailurePolicy;
use crate::outcome::OutcomeDefinition;

/// Fixed reply the raw-extraction prompt asks for when a chunk has nothing to offer.
pub const NO_FACTORS_REPLY: &str = "There are no related factors in this chunk.";

const EXTRACTION_SYSTEM: &str = "You are an assistant skilled at extracting and summarizing key \
factors from text. While you do not possess specific domain expertise, you excel in information \
retrieval from provided content.";

const CONSOLIDATION_SYSTEM: &str = "You are an expert assistant in academic text analysis and \
synthesis. You excel at consolidating semantically similar information and producing clear, \
concise, non-redundant summaries. Always aim to merge factors with similar meanings.";

const OUTPUT_FORMAT: &str = "Example output:
1. [Summary of consolidated factor 1]
   - Citations: N
   - Frequency: high frequency
2. [Summary of consolidated factor 2]
   - Citations: M
   - Frequency: common
3. [Summary of consolidated factor 3]
   - Citations: X
   - Frequency: less common";

const FREQUENCY_LABELS: &str = "   - 'high frequency' for the top 1-2 most cited factors
   - 'common' for factors in the middle
   - 'less common' for the least cited factors";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    /// Pull factors and their quoted evidence out of one chunk.
    RawExtraction,
    /// Merge a batch of raw answers into one ranked list.
    Consolidation,
    /// Merge several consolidated lists into the final ranking.
    FinalConsolidation,
}

impl Template {
    pub fn name(self) -> &'static str {
        match self {
            Template::RawExtraction => "raw extraction",
            Template::Consolidation => "consolidation",
            Template::FinalConsolidation => "final consolidation",
        }
    }

    /// Raw extraction tolerates per-chunk failures; consolidation does not.
    pub fn default_policy(self) -> FailurePolicy {
        match self {
            Template::RawExtraction => FailurePolicy::Skip,
            Template::Consolidation | Template::FinalConsolidation => FailurePolicy::Abort,
        }
    }

    pub fn render(
        self,
        content: &str,
        outcomes: &[OutcomeDefinition],
    ) -> Result<Vec<Message>, PromptError> {
        if outcomes.is_empty() {
            return Err(PromptError::MissingOutcomeDefinition);
        }

        let messages = match self {
            Template::RawExtraction => vec![
                Message::system(EXTRACTION_SYSTEM),
                Message::user(raw_extraction(content, outcomes)),
            ],
            Template::Consolidation => vec![
                Message::system(CONSOLIDATION_SYSTEM),
                Message::user(consolidation(content, outcomes)),
            ],
            Template::FinalConsolidation => vec![
                Message::system(CONSOLIDATION_SYSTEM),
                Message::user(final_consolidation(content, outcomes)),
            ],
        };
        Ok(messages)
    }
}

fn definitions(outcomes: &[OutcomeDefinition]) -> String {
    outcomes
        .iter()
        .map(|o| format!("- **{}**: {}", o.phenomenon, o.definition))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn phenomena(outcomes: &[OutcomeDefinition]) -> String {
    outcomes
        .iter()
        .map(|o| o.phenomenon.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn per_phenomenon_note(outcomes: &[OutcomeDefinition]) -> &'static str {
    if outcomes.len() > 1 {
        "Produce a separate numbered list for each phenomenon, headed by its name.\n"
    } else {
        ""
    }
}

fn raw_extraction(chunk: &str, outcomes: &[OutcomeDefinition]) -> String {
    let response_format = outcomes
        .iter()
        .map(|o| {
            format!(
                "The factors contributing to {0} are: (list all factors contributing to {0} only)",
                o.phenomenon
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are provided with context from a research study on digital mindfulness-based interventions. \
Your task is to identify factors in the context that contribute to each of the following phenomena individually:

{definitions}

Here is the context:
{chunk}

Your response should follow this format:
{response_format}

For each phenomenon, identify all relevant factors from the context. \
For each factor, quote the specific part of the context that describes how this factor contributes to this phenomenon. \
Citations are provided within the context, enclosed in brackets or parentheses and formatted as an integer or integers separated by commas. \
If there are multiple citations, they are separated by a semicolon ';'. Please copy these citations directly into your response. \
If no factors are evident, respond with '{NO_FACTORS_REPLY}'",
        definitions = definitions(outcomes),
    )
}

fn consolidation(paragraphs: &str, outcomes: &[OutcomeDefinition]) -> String {
    format!(
        "Task: Summarize and consolidate key factors from academic context paragraphs.

Context provided:
- Definitions:
{definitions}
- A set of context paragraphs. Each paragraph includes a quotation, a citation, and sometimes an explanation (which starts with ': ').

Instructions:
1. Read and understand the provided definitions and all context paragraphs below:
{paragraphs}

2. Identify all factors that contribute to {phenomena}. Merge factors that have similar meanings, even if expressed differently, into a single, clearly worded factor.
3. For each consolidated factor, count the number of unique citations that reference that factor. If a citation repeats for the same factor, count it only once.
4. Rank the consolidated factors from most to least cited (by unique citation count).
5. Assign a frequency label to each factor:
{FREQUENCY_LABELS}
6. Output a numbered list. For each factor, include:
   - A concise summary of the consolidated factor
   - The number of unique citations
   - The frequency label
{note}
{OUTPUT_FORMAT}

Guidelines:
- Merge similar factors; avoid redundancies.
- Make each summary clear and unique.",
        definitions = definitions(outcomes),
        phenomena = phenomena(outcomes),
        note = per_phenomenon_note(outcomes),
    )
}

fn final_consolidation(lists: &str, outcomes: &[OutcomeDefinition]) -> String {
    format!(
        "Task: Merge several consolidated factor lists into one final ranked list.

Definitions:
{definitions}

Each list below was produced from a different part of the literature and already gives, per factor, a summary, a unique citation count and a frequency label.

{lists}

Instructions:
1. Merge factors that describe the same contribution to {phenomena} across lists into a single, clearly worded factor.
2. Add up the citation counts of merged factors, counting a citation only once per factor.
3. Rank the merged factors from most to least cited.
4. Re-assign the frequency labels over the merged ranking:
{FREQUENCY_LABELS}
5. Output one numbered list with the summary, the number of unique citations and the frequency label of each factor.
{note}
{OUTPUT_FORMAT}",
        definitions = definitions(outcomes),
        phenomena = phenomena(outcomes),
        note = per_phenomenon_note(outcomes),
    )
}
