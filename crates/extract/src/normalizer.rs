use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.,!?;:'’]").expect("punctuation pattern is valid"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Normalizes node ids and types so the same entity mentioned in different
/// chunks of one paper ends up with one spelling.
#[derive(Debug, Default)]
pub struct GraphNormalizer {
    /// Maps lookup key -> first spelling seen
    aliases: HashMap<String, String>,
}

impl GraphNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Title-case the id and reuse an earlier spelling that differs only by
    /// case or punctuation.
    pub fn node_id(&mut self, raw: &str) -> String {
        let display = title_case(&collapse(raw));
        let key = lookup_key(&display);

        self.aliases.entry(key).or_insert(display).clone()
    }

    pub fn node_type(&self, raw: &str) -> String {
        let collapsed = collapse(raw);
        let mut chars = collapsed.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
            None => "Unknown".to_string(),
        }
    }

    pub fn relationship_type(&self, raw: &str) -> String {
        collapse(raw).replace(' ', "_").to_uppercase()
    }

    pub fn aliases(&self) -> &HashMap<String, String> {
        &self.aliases
    }

    /// Forget every alias; called between papers.
    pub fn reset(&mut self) {
        self.aliases.clear();
    }
}

fn collapse(raw: &str) -> String {
    WHITESPACE.replace_all(raw.trim(), " ").to_string()
}

fn lookup_key(name: &str) -> String {
    PUNCTUATION.replace_all(&name.to_lowercase(), "").to_string()
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_ids_are_title_cased() {
        let mut normalizer = GraphNormalizer::new();

        assert_eq!(normalizer.node_id("perceived  stress"), "Perceived Stress");
        assert_eq!(normalizer.node_id("  HEADSPACE app "), "Headspace App");
    }

    #[test]
    fn test_alias_resolution() {
        let mut normalizer = GraphNormalizer::new();

        let n1 = normalizer.node_id("Self-compassion");
        let n2 = normalizer.node_id("self-compassion.");

        assert_eq!(n1, n2);
        assert_eq!(normalizer.aliases().len(), 1);

        normalizer.reset();
        assert!(normalizer.aliases().is_empty());
    }

    #[test]
    fn test_types() {
        let normalizer = GraphNormalizer::new();

        assert_eq!(normalizer.node_type("OUTCOME"), "Outcome");
        assert_eq!(normalizer.node_type(""), "Unknown");
        assert_eq!(normalizer.relationship_type("is associated with"), "IS_ASSOCIATED_WITH");
    }
}
