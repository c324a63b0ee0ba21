//! The character relationship graph.

use super::character::{Character, RelationKind, Role};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default strength assigned to every extracted edge.
const DEFAULT_EDGE_STRENGTH: f64 = 1.0;

/// A node in the relationship graph: a snapshot of one character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub name: String,
    pub role: Role,
    pub importance: f64,
    pub traits: Vec<String>,
    pub backstory: String,
}

/// A directed edge between two characters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: RelationKind,
    pub strength: f64,
}

/// Aggregated relationship graph for one book.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipGraph {
    pub title: String,
    pub summary: String,
    /// Character name -> node snapshot.
    pub nodes: BTreeMap<String, GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl RelationshipGraph {
    /// Build the graph from the finalized character set.
    ///
    /// One node per character and one edge per (source, target, kind)
    /// triple found in any character's relationship mapping. Mutual
    /// relationships are NOT deduplicated: if A lists B and B lists A,
    /// two edges are emitted. Callers that want undirected semantics
    /// must dedupe.
    pub fn build(title: &str, characters: &[Character]) -> Self {
        let mut nodes = BTreeMap::new();
        for character in characters {
            nodes.insert(
                character.name.clone(),
                GraphNode {
                    name: character.name.clone(),
                    role: character.role,
                    importance: character.importance_score,
                    traits: character.personality_traits.clone(),
                    backstory: character.backstory.clone(),
                },
            );
        }

        let mut edges = Vec::new();
        for character in characters {
            for (other, kind) in &character.relationships {
                edges.push(GraphEdge {
                    source: character.name.clone(),
                    target: other.clone(),
                    kind: *kind,
                    strength: DEFAULT_EDGE_STRENGTH,
                });
            }
        }

        Self {
            title: title.to_string(),
            summary: format!("Character relationships in {title}"),
            nodes,
            edges,
        }
    }

    /// Add an edge discovered during play, if it is not already present.
    pub fn add_edge(&mut self, source: &str, target: &str, kind: RelationKind) {
        let exists = self
            .edges
            .iter()
            .any(|e| e.source == source && e.target == target && e.kind == kind);
        if !exists {
            self.edges.push(GraphEdge {
                source: source.to_string(),
                target: target.to_string(),
                kind,
                strength: DEFAULT_EDGE_STRENGTH,
            });
        }
    }

    /// Edges that involve the named character, in either direction.
    pub fn edges_for(&self, name: &str) -> Vec<&GraphEdge> {
        self.edges
            .iter()
            .filter(|e| e.source == name || e.target == name)
            .collect()
    }
}
