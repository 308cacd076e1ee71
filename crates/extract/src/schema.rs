use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub relation_type: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// Graph extracted from one chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    pub chunk_id: String,
    pub source: String,
    pub text: String,
    pub nodes: Vec<Node>,
    pub relationships: Vec<Relationship>,
}

/// Everything extracted from one paper, as written to `graph/<paper>.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaperGraph {
    pub entities: Vec<Node>,
    pub relations: Vec<Relationship>,
}

impl PaperGraph {
    pub fn absorb(&mut self, doc: GraphDocument) {
        self.entities.extend(doc.nodes);
        self.relations.extend(doc.relationships);
    }
}

/// The shape the model is asked to answer with.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawGraph {
    #[serde(default)]
    pub nodes: Vec<RawNode>,
    #[serde(default)]
    pub relationships: Vec<RawRelationship>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawNode {
    pub id: String,
    #[serde(rename = "type", default)]
    pub node_type: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawRelationship {
    pub source_node_id: String,
    #[serde(default)]
    pub source_node_type: String,
    pub target_node_id: String,
    #[serde(default)]
    pub target_node_type: String,
    #[serde(rename = "type")]
    pub relation_type: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paper_graph_json_shape() {
        let graph = PaperGraph {
            entities: vec![Node {
                id: "Mindfulness App".into(),
                node_type: "Intervention".into(),
                properties: Map::new(),
            }],
            relations: vec![Relationship {
                source: "Mindfulness App".into(),
                target: "Stress".into(),
                relation_type: "REDUCES".into(),
                properties: Map::new(),
            }],
        };

        let json = serde_json::to_value(&graph).unwrap();
        assert_eq!(json["entities"][0]["type"], "Intervention");
        assert_eq!(json["relations"][0]["source"], "Mindfulness App");
        assert_eq!(json["relations"][0]["type"], "REDUCES");
        assert!(json["relations"][0]["properties"].as_object().unwrap().is_empty());
    }
}
