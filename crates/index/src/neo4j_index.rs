use anyhow::{Context, Result};
use async_trait::async_trait;
use extract::{GraphDocument, GraphSink, Node, Relationship};
use neo4rs::{Graph, Query};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

const SCHEMA_STATEMENTS: [(&str, &str); 2] = [
    (
        "Entity.id",
        "CREATE INDEX entity_id_index IF NOT EXISTS FOR (e:Entity) ON (e.id)",
    ),
    (
        "Chunk.id",
        "CREATE INDEX chunk_id_index IF NOT EXISTS FOR (c:Chunk) ON (c.id)",
    ),
];

const MERGE_CHUNK: &str = r#"
MERGE (c:Chunk {id: $id})
SET c.source = $source,
    c.text = $text
"#;

const MERGE_ENTITY: &str = r#"
MERGE (e:Entity {id: $id})
SET e.type = $type,
    e.properties = $properties
WITH e
MATCH (c:Chunk {id: $chunk_id})
MERGE (c)-[:MENTIONS]->(e)
"#;

const ENSURE_ENTITY: &str = r#"
MERGE (e:Entity {id: $id})
ON CREATE SET e.type = 'Unknown', e.properties = '{}'
"#;

const MERGE_RELATION: &str = r#"
MATCH (source:Entity {id: $source_id})
MATCH (target:Entity {id: $target_id})
MERGE (source)-[r:RELATION {type: $relation_type}]->(target)
SET r.properties = $properties
"#;

#[derive(Debug, Clone)]
pub struct Neo4jConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
}

pub struct Neo4jIndexer {
    graph: Graph,
}

impl Neo4jIndexer {
    pub fn new(graph: Graph) -> Self {
        Self { graph }
    }

    pub async fn connect(config: &Neo4jConfig) -> Result<Self> {
        let graph = Graph::new(&config.uri, &config.user, &config.password)
            .await
            .with_context(|| format!("Failed to connect to Neo4j at {}", config.uri))?;

        info!(uri = %config.uri, "Connected to Neo4j");
        Ok(Self::new(graph))
    }

    /// Initialize schema: create indexes
    pub async fn init_schema(&self) -> Result<()> {
        for (target, statement) in SCHEMA_STATEMENTS {
            self.graph
                .run(Query::new(statement.to_string()))
                .await
                .with_context(|| format!("Failed to create index on {target}"))?;
        }

        info!("Neo4j indexes created");
        Ok(())
    }

    /// Store one chunk's graph. Every write is a MERGE, so pushing the same
    /// document twice leaves the store unchanged.
    pub async fn add_graph_document(&self, doc: &GraphDocument) -> Result<()> {
        let query = Query::new(MERGE_CHUNK.to_string())
            .param("id", doc.chunk_id.clone())
            .param("source", doc.source.clone())
            .param("text", doc.text.clone());
        self.graph.run(query).await.context("Failed to index chunk")?;

        for node in &doc.nodes {
            self.index_entity(&doc.chunk_id, node).await?;
        }

        for relationship in &doc.relationships {
            self.index_relation(relationship).await?;
        }

        debug!(
            chunk = %doc.chunk_id,
            nodes = doc.nodes.len(),
            relationships = doc.relationships.len(),
            "Indexed graph document"
        );
        Ok(())
    }

    async fn index_entity(&self, chunk_id: &str, node: &Node) -> Result<()> {
        let query = Query::new(MERGE_ENTITY.to_string())
            .param("id", node.id.clone())
            .param("type", node.node_type.clone())
            .param("properties", properties_json(&node.properties))
            .param("chunk_id", chunk_id.to_string());

        self.graph
            .run(query)
            .await
            .with_context(|| format!("Failed to index entity {}", node.id))
    }

    async fn index_relation(&self, relationship: &Relationship) -> Result<()> {
        self.ensure_entity_exists(&relationship.source).await?;
        self.ensure_entity_exists(&relationship.target).await?;

        let query = Query::new(MERGE_RELATION.to_string())
            .param("source_id", relationship.source.clone())
            .param("target_id", relationship.target.clone())
            .param("relation_type", relationship.relation_type.clone())
            .param("properties", properties_json(&relationship.properties));

        self.graph
            .run(query)
            .await
            .context("Failed to index relation")
    }

    /// Ensure an entity exists (minimal placeholder if not)
    async fn ensure_entity_exists(&self, entity_id: &str) -> Result<()> {
        let query = Query::new(ENSURE_ENTITY.to_string()).param("id", entity_id.to_string());

        self.graph
            .run(query)
            .await
            .context("Failed to ensure entity exists")
    }

    /// Get graph statistics
    pub async fn get_stats(&self) -> Result<GraphStats> {
        Ok(GraphStats {
            chunk_count: self.count("MATCH (c:Chunk) RETURN count(c) as count").await?,
            entity_count: self.count("MATCH (e:Entity) RETURN count(e) as count").await?,
            relation_count: self
                .count("MATCH ()-[r:RELATION]->() RETURN count(r) as count")
                .await?,
        })
    }

    async fn count(&self, cypher: &str) -> Result<usize> {
        let mut result = self.graph.execute(Query::new(cypher.to_string())).await?;
        let count = match result.next().await? {
            Some(row) => row.get::<i64>("count").unwrap_or(0) as usize,
            None => 0,
        };
        Ok(count)
    }
}

#[async_trait]
impl GraphSink for Neo4jIndexer {
    async fn add_graph_document(&self, doc: &GraphDocument) -> Result<()> {
        Neo4jIndexer::add_graph_document(self, doc).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub chunk_count: usize,
    pub entity_count: usize,
    pub relation_count: usize,
}

/// Neo4j properties cannot hold nested maps, so free-form model properties
/// are stored as one JSON string.
fn properties_json(properties: &Map<String, Value>) -> String {
    Value::Object(properties.clone()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_properties_are_flattened_to_json() {
        let mut properties = Map::new();
        properties.insert("effect_size".into(), Value::from(0.42));

        assert_eq!(properties_json(&properties), r#"{"effect_size":0.42}"#);
        assert_eq!(properties_json(&Map::new()), "{}");
    }

    #[test]
    fn test_writes_are_idempotent_merges() {
        for statement in [MERGE_CHUNK, MERGE_ENTITY, ENSURE_ENTITY, MERGE_RELATION] {
            assert!(statement.contains("MERGE"));
            assert!(!statement.contains("CREATE ("));
        }
        assert!(SCHEMA_STATEMENTS.iter().all(|(_, s)| s.contains("IF NOT EXISTS")));
    }

    #[test]
    fn test_stats_serialize() {
        let stats = GraphStats {
            chunk_count: 3,
            entity_count: 10,
            relation_count: 7,
        };
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["entity_count"], 10);
    }

    #[test]
    fn test_indexer_is_a_graph_sink() {
        fn assert_sink<T: GraphSink>() {}
        assert_sink::<Neo4jIndexer>();
    }
}
