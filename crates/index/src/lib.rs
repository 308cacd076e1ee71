pub mod neo4j_index;

pub use neo4j_index::{GraphStats, Neo4jConfig, Neo4jIndexer};
