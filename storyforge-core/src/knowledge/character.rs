//! Character records and the vocabulary used to classify them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A character's narrative role, ordered by precedence for tie-breaking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Protagonist,
    Antagonist,
    Supporting,
    Minor,
}

impl Role {
    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            Role::Protagonist => "protagonist",
            Role::Antagonist => "antagonist",
            Role::Supporting => "supporting",
            Role::Minor => "minor",
        }
    }

    /// Fixed weight used by the importance score.
    pub fn weight(&self) -> f64 {
        match self {
            Role::Protagonist => 10.0,
            Role::Antagonist => 8.0,
            Role::Supporting => 5.0,
            Role::Minor => 2.0,
        }
    }
}

/// Kind of relationship between two characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    Friend,
    Enemy,
    Family,
    Mentor,
    Romantic,
    /// Names co-occur but no relationship keyword matched.
    Acquaintance,
}

impl RelationKind {
    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            RelationKind::Friend => "friend",
            RelationKind::Enemy => "enemy",
            RelationKind::Family => "family",
            RelationKind::Mentor => "mentor",
            RelationKind::Romantic => "romantic",
            RelationKind::Acquaintance => "acquaintance",
        }
    }
}

/// A character extracted from a book.
///
/// The name is the unique key within a book. Records are created during
/// extraction and, once play begins, only `current_status` and
/// `relationships` change (through the world-state machine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    /// Unique key within the book.
    pub name: String,
    /// Full name if known; defaults to `name`.
    pub full_name: String,
    /// Alternative names, in discovery order.
    pub aliases: Vec<String>,
    /// Narrative role.
    pub role: Role,
    /// Brief description.
    pub description: String,
    /// Other character name -> relationship kind.
    pub relationships: BTreeMap<String, RelationKind>,
    /// Chapter of the first extracted event involving this character.
    pub first_appearance: u32,
    /// Up to 3 traits, in trait-table order.
    pub personality_traits: Vec<String>,
    /// Synthesized backstory text.
    pub backstory: String,
    /// Free-form status tag, mutated during play.
    pub current_status: String,
    /// Derived score; recomputed once after event extraction.
    pub importance_score: f64,
}

impl Character {
    /// Create a character with extraction defaults.
    pub fn new(name: impl Into<String>, role: Role) -> Self {
        let name = name.into();
        Self {
            full_name: name.clone(),
            name,
            aliases: Vec::new(),
            role,
            description: String::new(),
            relationships: BTreeMap::new(),
            first_appearance: 1,
            personality_traits: Vec::new(),
            backstory: String::new(),
            current_status: "active".to_string(),
            importance_score: 0.0,
        }
    }
}
