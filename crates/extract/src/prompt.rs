use crate::llm::Message;

const SYSTEM_PROMPT: &str = "You are a top-tier algorithm designed for extracting information in \
structured formats to build a knowledge graph. Capture as much information from the text as \
possible without sacrificing accuracy. Do not add any information that is not explicitly \
mentioned in the text.";

pub fn build_graph_messages(chunk_text: &str) -> Vec<Message> {
    vec![
        Message::system(SYSTEM_PROMPT),
        Message::user(build_extraction_prompt(chunk_text)),
    ]
}

pub fn build_extraction_prompt(chunk_text: &str) -> String {
    format!(
        r#"Extract a knowledge graph from the following text taken from the Results section of a study on digital mindfulness-based interventions.

INSTRUCTIONS:
1. Nodes are entities: interventions, outcomes, populations, measures, factors, concepts.
2. Relationships connect two nodes that the text explicitly links.
3. Output ONLY valid JSON, nothing else.
4. Use the exact schema below.

SCHEMA:
{{
  "nodes": [
    {{"id": "Human readable entity name", "type": "Basic entity type", "properties": {{}}}}
  ],
  "relationships": [
    {{"source_node_id": "...", "source_node_type": "...", "target_node_id": "...", "target_node_type": "...", "type": "RELATIONSHIP_TYPE", "properties": {{}}}}
  ]
}}

RULES:
- Node ids are names found in the text, never integers or generated ids.
- Use general node types (e.g. "Intervention" rather than "MobileMindfulnessIntervention").
- Relationship types are general and timeless, e.g. "IMPROVES", "REDUCES", "PREDICTS".
- Every relationship endpoint must appear in "nodes".
- Use the same id every time an entity is mentioned.
- Output ONLY the JSON object, no markdown, no explanations.

TEXT:
{}

JSON OUTPUT:"#,
        chunk_text
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;

    #[test]
    fn test_prompt_embeds_chunk() {
        let messages = build_graph_messages("Adherence predicted stress reduction.");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[1].content.contains("Adherence predicted stress reduction."));
        assert!(messages[1].content.contains("\"relationships\""));
    }
}
