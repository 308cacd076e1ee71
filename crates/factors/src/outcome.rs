use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::PromptError;

/// A named phenomenon and the definition handed to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeDefinition {
    pub phenomenon: String,
    pub definition: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OutcomeFile {
    Many(Vec<OutcomeDefinition>),
    One(OutcomeDefinition),
}

/// Read `outcome_definition.json`. Both a list and a single object are accepted.
pub async fn load_outcome_definitions(path: &Path) -> Result<Vec<OutcomeDefinition>, PromptError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| PromptError::io(path, e))?;

    let outcomes = match serde_json::from_str(&raw)? {
        OutcomeFile::Many(list) => list,
        OutcomeFile::One(one) => vec![one],
    };

    tracing::debug!(path = %path.display(), count = outcomes.len(), "Loaded outcome definitions");
    Ok(outcomes)
}

/// Narrow `outcomes` to the one named `phenomenon` (case-insensitive).
pub fn select(
    outcomes: &[OutcomeDefinition],
    phenomenon: &str,
) -> Result<Vec<OutcomeDefinition>, PromptError> {
    outcomes
        .iter()
        .find(|o| o.phenomenon.eq_ignore_ascii_case(phenomenon.trim()))
        .map(|o| vec![o.clone()])
        .ok_or_else(|| PromptError::UnknownPhenomenon(phenomenon.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(name: &str) -> OutcomeDefinition {
        OutcomeDefinition {
            phenomenon: name.into(),
            definition: format!("definition of {name}"),
        }
    }

    #[tokio::test]
    async fn test_load_list_and_single_object() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("list.json");
        let single = dir.path().join("single.json");
        std::fs::write(
            &list,
            r#"[{"phenomenon":"Engagement","definition":"d1"},{"phenomenon":"Attrition","definition":"d2"}]"#,
        )
        .unwrap();
        std::fs::write(&single, r#"{"phenomenon":"Adherence","definition":"d3"}"#).unwrap();

        let many = load_outcome_definitions(&list).await.unwrap();
        assert_eq!(many.len(), 2);
        assert_eq!(many[1].phenomenon, "Attrition");

        let one = load_outcome_definitions(&single).await.unwrap();
        assert_eq!(one, vec![OutcomeDefinition { phenomenon: "Adherence".into(), definition: "d3".into() }]);
    }

    #[tokio::test]
    async fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = load_outcome_definitions(&dir.path().join("nope.json")).await;
        assert!(matches!(missing, Err(PromptError::Io { .. })));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, r#"{"phenomenon": 3}"#).unwrap();
        assert!(matches!(load_outcome_definitions(&bad).await, Err(PromptError::Json(_))));
    }

    #[test]
    fn test_select() {
        let outcomes = vec![outcome("Engagement"), outcome("Attrition")];

        let picked = select(&outcomes, "attrition").unwrap();
        assert_eq!(picked, vec![outcome("Attrition")]);

        let err = select(&outcomes, "Retention").unwrap_err();
        assert!(matches!(err, PromptError::UnknownPhenomenon(name) if name == "Retention"));
    }
}
