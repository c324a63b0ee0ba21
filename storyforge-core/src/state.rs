//! Game lifecycle and world state.

use crate::knowledge::{Event, KnowledgeBase, RelationKind, RelationshipGraph, UNKNOWN_LOCATION};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Choice counts at which narrative momentum steps up.
const MOMENTUM_ACCELERATING_AT: usize = 3;
const MOMENTUM_CLIMACTIC_AT: usize = 7;

/// Timeline-progress fractions at which the story arc advances.
const ARC_MIDDLE_AT: f64 = 0.3;
const ARC_CLIMAX_AT: f64 = 0.7;

/// Lifecycle phase of a game session.
///
/// Transitions are one-way: a session only moves forward through
/// `Initializing -> BookLoaded -> KnowledgeExtracted -> GameSetup ->
/// Playing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameState {
    Initializing,
    BookLoaded,
    KnowledgeExtracted,
    GameSetup,
    Playing,
}

impl GameState {
    pub fn name(&self) -> &'static str {
        match self {
            GameState::Initializing => "initializing",
            GameState::BookLoaded => "book_loaded",
            GameState::KnowledgeExtracted => "knowledge_extracted",
            GameState::GameSetup => "game_setup",
            GameState::Playing => "playing",
        }
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How fast the narrative is moving, derived from choices made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Momentum {
    Building,
    Accelerating,
    Climactic,
}

impl Momentum {
    /// Fewer than three choices is building, fewer than seven is
    /// accelerating, anything beyond is climactic.
    pub fn from_choice_count(count: usize) -> Self {
        if count < MOMENTUM_ACCELERATING_AT {
            Momentum::Building
        } else if count < MOMENTUM_CLIMACTIC_AT {
            Momentum::Accelerating
        } else {
            Momentum::Climactic
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Momentum::Building => "building",
            Momentum::Accelerating => "accelerating",
            Momentum::Climactic => "climactic",
        }
    }
}

/// Where the story stands on its arc, derived from timeline progress.
/// Ordered by narrative position, so later phases compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryArc {
    Beginning,
    Middle,
    Climax,
}

impl StoryArc {
    pub fn from_progress(progress: f64) -> Self {
        if progress < ARC_MIDDLE_AT {
            StoryArc::Beginning
        } else if progress < ARC_CLIMAX_AT {
            StoryArc::Middle
        } else {
            StoryArc::Climax
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StoryArc::Beginning => "beginning",
            StoryArc::Middle => "middle",
            StoryArc::Climax => "climax",
        }
    }
}

/// Live, mutable state of one character during play.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterState {
    pub status: String,
    pub location: String,
    pub emotional_state: String,
    /// Relationship snapshot taken at game start; play can mutate it.
    pub relationships: BTreeMap<String, RelationKind>,
    pub knowledge: Vec<String>,
    pub goals: Vec<String>,
}

/// One player decision in the choice history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceRecord {
    /// Timeline index the player was at when choosing.
    pub event_index: usize,
    /// Index into the offered choice list, absent for custom actions.
    pub choice_index: Option<usize>,
    /// Free-text action, absent when a listed choice was taken.
    pub custom_action: Option<String>,
    /// Logical clock: equals `event_index` at the time of the choice.
    pub timestamp: usize,
}

/// A divergence from the book's original timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deviation {
    pub event_index: usize,
    pub description: String,
}

/// The full mutable world: timeline position, character states,
/// choice history, and the derived pacing measures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    pub current_event_index: usize,
    pub current_chapter: u32,
    pub character_states: BTreeMap<String, CharacterState>,
    pub location_states: BTreeMap<String, serde_json::Value>,
    pub plot_elements: BTreeMap<String, serde_json::Value>,
    pub relationships: RelationshipGraph,
    pub modified_events: Vec<Deviation>,
    pub story_arc_position: StoryArc,
    pub player_choices_made: Vec<ChoiceRecord>,
    pub narrative_momentum: Momentum,
}

impl WorldState {
    /// Seed the world from a knowledge base at the given starting event.
    pub fn new(kb: &KnowledgeBase, starting_point: usize) -> Self {
        let mut character_states = BTreeMap::new();
        for character in &kb.characters {
            character_states.insert(
                character.name.clone(),
                CharacterState {
                    status: character.current_status.clone(),
                    location: UNKNOWN_LOCATION.to_string(),
                    emotional_state: "neutral".to_string(),
                    relationships: character.relationships.clone(),
                    knowledge: Vec::new(),
                    goals: Vec::new(),
                },
            );
        }

        let current_chapter = kb
            .events
            .get(starting_point)
            .map(|e| e.chapter)
            .unwrap_or(1);

        let mut world = Self {
            current_event_index: starting_point,
            current_chapter,
            character_states,
            location_states: BTreeMap::new(),
            plot_elements: BTreeMap::new(),
            relationships: kb.graph.clone(),
            modified_events: Vec::new(),
            story_arc_position: StoryArc::Beginning,
            player_choices_made: Vec::new(),
            narrative_momentum: Momentum::Building,
        };
        world.recompute_derived(kb.events.len());
        world
    }

    /// Fraction of the timeline consumed, in `[0, 1]`.
    pub fn progress(&self, total_events: usize) -> f64 {
        self.current_event_index as f64 / total_events.max(1) as f64
    }

    /// Append a choice to the history, stamped with the pre-advance
    /// event index.
    pub fn record_choice(&mut self, choice_index: Option<usize>, custom_action: Option<String>) {
        self.player_choices_made.push(ChoiceRecord {
            event_index: self.current_event_index,
            choice_index,
            custom_action,
            timestamp: self.current_event_index,
        });
    }

    /// Step forward along the timeline, clamped at its end, and track
    /// the chapter of the event now pointed at. Past the end the last
    /// chapter is kept.
    pub fn advance(&mut self, events: &[Event]) {
        self.current_event_index = (self.current_event_index + 1).min(events.len());
        if let Some(event) = events.get(self.current_event_index) {
            self.current_chapter = event.chapter;
        }
    }

    /// Recompute momentum and arc position from the current history and
    /// timeline position.
    pub fn recompute_derived(&mut self, total_events: usize) {
        self.narrative_momentum = Momentum::from_choice_count(self.player_choices_made.len());
        self.story_arc_position = StoryArc::from_progress(self.progress(total_events));
    }

    /// Condensed view of the world for output payloads.
    pub fn summary(&self, events: &[Event]) -> WorldSummary {
        let current = events.get(self.current_event_index);
        WorldSummary {
            current_event: self.current_event_index,
            total_events: events.len(),
            current_chapter: current.map(|e| e.chapter).unwrap_or(self.current_chapter),
            story_arc_position: self.story_arc_position,
            narrative_momentum: self.narrative_momentum,
            choices_made: self.player_choices_made.len(),
            current_location: current
                .map(|e| e.location.clone())
                .unwrap_or_else(|| UNKNOWN_LOCATION.to_string()),
            available_characters: current
                .map(|e| e.characters_involved.clone())
                .unwrap_or_default(),
        }
    }
}

/// Condensed world view returned from every turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSummary {
    pub current_event: usize,
    pub total_events: usize,
    pub current_chapter: u32,
    pub story_arc_position: StoryArc,
    pub narrative_momentum: Momentum,
    pub choices_made: usize,
    pub current_location: String,
    pub available_characters: Vec<String>,
}
