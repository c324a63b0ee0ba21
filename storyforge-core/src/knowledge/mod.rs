//! The knowledge base: structured world knowledge extracted from a book.
//!
//! Characters, events, locations, and the relationship graph together
//! form the durable "codex" the game loop consumes.

pub mod character;
pub mod event;
pub mod graph;

pub use character::{Character, RelationKind, Role};
pub use event::{Event, EventType, Tone, UNKNOWN_LOCATION};
pub use graph::{GraphEdge, GraphNode, RelationshipGraph};

/// Everything extracted from one book.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnowledgeBase {
    /// Book title.
    pub title: String,
    /// Characters in extraction order.
    pub characters: Vec<Character>,
    /// Events in timeline order.
    pub events: Vec<Event>,
    /// Deduplicated locations, in discovery order.
    pub locations: Vec<String>,
    /// Aggregated relationship graph.
    pub graph: RelationshipGraph,
}

impl KnowledgeBase {
    /// Look up a character by its unique name key.
    pub fn character(&self, name: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.name == name)
    }

    /// Mutable character lookup.
    pub fn character_mut(&mut self, name: &str) -> Option<&mut Character> {
        self.characters.iter_mut().find(|c| c.name == name)
    }

    /// Character names in extraction order.
    pub fn character_names(&self) -> Vec<String> {
        self.characters.iter().map(|c| c.name.clone()).collect()
    }

    /// Number of events mentioning the named character.
    pub fn events_involving(&self, name: &str) -> usize {
        self.events
            .iter()
            .filter(|e| e.characters_involved.iter().any(|c| c == name))
            .count()
    }
}
