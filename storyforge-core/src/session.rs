//! The game session: lifecycle, setup, and the turn loop.
//!
//! A [`GameSession`] owns everything for one playthrough: the book
//! text, the extracted knowledge base, the live world state, and the
//! narrative engine. Lifecycle gates are enforced here; the phases only
//! ever move forward.

use crate::choices::{Choice, CHOICES_PER_TURN};
use crate::extract::{CharacterProfiler, EntityExtractor, EventExtractor, PersonRecognizer};
use crate::knowledge::{KnowledgeBase, RelationshipGraph};
use crate::narrative::{self, NarrativeEngine, StoryContext};
use crate::persist::{self, PersistError};
use crate::state::{CharacterState, Deviation, GameState, WorldState, WorldSummary};
use crate::{extract, segment};
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Events of history shown when a game starts.
const BACKSTORY_EVENTS: usize = 5;

/// Events of recent context handed to the narrative engine.
const RECENT_EVENTS: usize = 3;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    Input(String),

    #[error("invalid state: expected {expected}, session is {actual}")]
    InvalidState {
        expected: GameState,
        actual: GameState,
    },

    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Player-facing settings fixed at setup time.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSettings {
    /// Filled in from the knowledge base during setup.
    pub book_title: String,
    pub selected_character: String,
    /// Timeline index play begins at, clamped to the timeline.
    pub starting_point: usize,
    pub custom_setting: Option<String>,
    pub language: String,
    pub difficulty: String,
}

impl GameSettings {
    pub fn new(selected_character: impl Into<String>) -> Self {
        Self {
            book_title: String::new(),
            selected_character: selected_character.into(),
            starting_point: 0,
            custom_setting: None,
            language: "English".to_string(),
            difficulty: "normal".to_string(),
        }
    }

    pub fn starting_at(mut self, starting_point: usize) -> Self {
        self.starting_point = starting_point;
        self
    }

    pub fn with_custom_setting(mut self, setting: impl Into<String>) -> Self {
        self.custom_setting = Some(setting.into());
        self
    }

    pub fn in_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

/// What extraction found, returned from [`GameSession::load_book`].
#[derive(Debug, Clone, PartialEq)]
pub struct BookOverview {
    pub title: String,
    pub characters: usize,
    pub events: usize,
    pub locations: usize,
    pub character_names: Vec<String>,
}

/// Output of [`GameSession::start_game`].
#[derive(Debug, Clone, PartialEq)]
pub struct StartOutput {
    /// Character backstory plus recent history and the current scene.
    pub narration: String,
    pub choices: Vec<Choice>,
    pub world: WorldSummary,
}

/// Output of one processed turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub narration: String,
    pub consequence: String,
    pub next_choices: Vec<Choice>,
    pub world: WorldSummary,
    pub character: Option<CharacterState>,
}

/// One playthrough of one book.
pub struct GameSession {
    id: Uuid,
    state: GameState,
    book_text: String,
    book_title: String,
    kb: Option<KnowledgeBase>,
    world: Option<WorldState>,
    settings: Option<GameSettings>,
    narrative: NarrativeEngine,
    recognizer: Option<Box<dyn PersonRecognizer>>,
    kb_dir: Option<PathBuf>,
}

impl GameSession {
    /// Fresh session; narrative credentials are taken from the
    /// environment, degrading to rule-based narration without them.
    pub fn new() -> Self {
        Self::with_engine(NarrativeEngine::from_env())
    }

    /// Session with a specific narrative engine.
    pub fn with_engine(narrative: NarrativeEngine) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: GameState::Initializing,
            book_text: String::new(),
            book_title: String::new(),
            kb: None,
            world: None,
            settings: None,
            narrative,
            recognizer: None,
            kb_dir: None,
        }
    }

    /// Use an external PERSON recognizer for entity extraction.
    pub fn with_recognizer(mut self, recognizer: Box<dyn PersonRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    /// Persist the knowledge base and world state under `dir`.
    /// Auto-save failures are logged, never fatal to a turn.
    pub fn with_save_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.kb_dir = Some(dir.into());
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn knowledge_base(&self) -> Option<&KnowledgeBase> {
        self.kb.as_ref()
    }

    pub fn world(&self) -> Option<&WorldState> {
        self.world.as_ref()
    }

    /// Read-only status snapshot: the lifecycle phase and, once play
    /// has begun, the condensed world view. Safe to call in any phase.
    pub fn get_state(&self) -> (GameState, Option<WorldSummary>) {
        let summary = match (&self.kb, &self.world) {
            (Some(kb), Some(world)) => Some(world.summary(&kb.events)),
            _ => None,
        };
        (self.state, summary)
    }

    fn require_state(&self, expected: GameState) -> Result<(), EngineError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(EngineError::InvalidState {
                expected,
                actual: self.state,
            })
        }
    }

    /// Take in raw book text. `Initializing -> BookLoaded`.
    pub fn load_text(&mut self, text: &str) -> Result<(), EngineError> {
        self.require_state(GameState::Initializing)?;
        if text.trim().is_empty() {
            return Err(EngineError::Input("book text is empty".to_string()));
        }

        self.book_title = segment::extract_title(text);
        self.book_text = text.to_string();
        self.state = GameState::BookLoaded;
        tracing::info!(session = %self.id, title = %self.book_title, "book loaded");
        Ok(())
    }

    /// Run the extraction pipeline over the loaded book.
    /// `BookLoaded -> KnowledgeExtracted`.
    pub async fn extract_knowledge(&mut self) -> Result<BookOverview, EngineError> {
        self.require_state(GameState::BookLoaded)?;

        let chapters = segment::split_chapters(&self.book_text);

        let mut extractor = EntityExtractor::new();
        if let Some(recognizer) = self.recognizer.take() {
            extractor = extractor.with_recognizer(recognizer);
        }
        let candidates = extractor.extract(&self.book_text);

        let mut characters = CharacterProfiler::new(&self.book_title).profile(&candidates);
        let names: Vec<String> = characters.iter().map(|c| c.name.clone()).collect();

        let extracted = EventExtractor::new(&names).extract(&chapters);
        extract::score_importance(&mut characters, &extracted.events);
        let graph = RelationshipGraph::build(&self.book_title, &characters);

        let kb = KnowledgeBase {
            title: self.book_title.clone(),
            characters,
            events: extracted.events,
            locations: extracted.locations,
            graph,
        };

        let overview = BookOverview {
            title: kb.title.clone(),
            characters: kb.characters.len(),
            events: kb.events.len(),
            locations: kb.locations.len(),
            character_names: kb.character_names(),
        };

        if let Some(dir) = &self.kb_dir {
            if let Err(err) = persist::save_knowledge_base(dir, &kb).await {
                tracing::warn!(error = %err, "knowledge base auto-save failed");
            }
        }

        self.kb = Some(kb);
        self.state = GameState::KnowledgeExtracted;
        tracing::info!(
            session = %self.id,
            characters = overview.characters,
            events = overview.events,
            "knowledge extracted"
        );
        Ok(overview)
    }

    /// Load a book and extract its knowledge in one step.
    pub async fn load_book(&mut self, text: &str) -> Result<BookOverview, EngineError> {
        self.load_text(text)?;
        self.extract_knowledge().await
    }

    /// Fix the playthrough settings. `KnowledgeExtracted -> GameSetup`.
    ///
    /// An unknown character is rejected without a state transition.
    pub fn setup_game(&mut self, mut settings: GameSettings) -> Result<(), EngineError> {
        self.require_state(GameState::KnowledgeExtracted)?;
        let kb = self.kb.as_ref().ok_or_else(|| {
            EngineError::Input("no knowledge base extracted".to_string())
        })?;

        if kb.character(&settings.selected_character).is_none() {
            return Err(EngineError::Input(format!(
                "unknown character: {}",
                settings.selected_character
            )));
        }

        settings.book_title = kb.title.clone();
        settings.starting_point = settings.starting_point.min(kb.events.len());

        self.world = Some(WorldState::new(kb, settings.starting_point));
        self.settings = Some(settings);
        self.state = GameState::GameSetup;
        Ok(())
    }

    /// Begin play. `GameSetup -> Playing`. Returns the opening scene:
    /// backstory, recent history, the current situation, and the first
    /// choice set.
    pub async fn start_game(&mut self) -> Result<StartOutput, EngineError> {
        self.require_state(GameState::GameSetup)?;
        let (kb, world, settings) = self.parts()?;

        let name = settings.selected_character.clone();

        // Opening summary: title, setting, and who the player is.
        let mut narration = format!("Welcome to \"{}\"!\n\n", settings.book_title);
        narration.push_str(&format!("You are playing as {name}.\n"));
        narration.push_str(&format!(
            "Setting: {}\n",
            settings
                .custom_setting
                .as_deref()
                .unwrap_or("Original story setting")
        ));
        narration.push_str(&format!("Language: {}\n\n", settings.language));

        if let Some(character) = kb.character(&name) {
            if !character.personality_traits.is_empty() {
                narration.push_str(&format!(
                    "Character traits: {}\n",
                    character.personality_traits.join(", ")
                ));
            }
            if !character.relationships.is_empty() {
                let lines: Vec<String> = character
                    .relationships
                    .iter()
                    .map(|(other, kind)| format!("{other} ({})", kind.name()))
                    .collect();
                narration.push_str(&format!("Key relationships: {}\n", lines.join(", ")));
            }
            narration.push('\n');
            narration.push_str(&character.backstory);
            narration.push_str("\n\n");
        }

        let history: Vec<&str> = kb.events[..settings.starting_point.min(kb.events.len())]
            .iter()
            .filter(|e| e.characters_involved.iter().any(|n| n == &name))
            .map(|e| e.description.as_str())
            .collect();
        if !history.is_empty() {
            narration.push_str("Recently:\n");
            for description in history.iter().rev().take(BACKSTORY_EVENTS).rev() {
                narration.push_str(&format!("- {description}\n"));
            }
            narration.push('\n');
        }

        let current = kb.events.get(world.current_event_index);
        if let Some(event) = current {
            narration.push_str(&format!("You are at {}. {}", event.location, event.description));
        }

        let context = Self::story_context(kb, world, settings);
        let opening = self
            .narrative
            .continue_story("Set the opening scene and continue the story.", &context)
            .await;
        narration.push_str("\n\n");
        narration.push_str(&opening);

        let (kb, world, settings) = self.parts()?;
        let context = Self::story_context(kb, world, settings);
        let choices = self
            .narrative
            .generate_choices(kb.events.get(world.current_event_index), &name, &context)
            .await;
        let summary = world.summary(&kb.events);

        self.state = GameState::Playing;
        tracing::info!(session = %self.id, character = %name, "game started");
        Ok(StartOutput {
            narration,
            choices,
            world: summary,
        })
    }

    /// Process one player turn: either `choice_index` into the offered
    /// list or a free-text `custom_action`.
    ///
    /// Validation and narration happen before any state mutation, so a
    /// failed turn leaves the world untouched.
    pub async fn process_choice(
        &mut self,
        choice_index: Option<usize>,
        custom_action: Option<String>,
    ) -> Result<TurnOutcome, EngineError> {
        self.require_state(GameState::Playing)?;

        let custom_action = custom_action.filter(|a| !a.trim().is_empty());
        match (choice_index, &custom_action) {
            (None, None) => {
                return Err(EngineError::Input(
                    "either a choice index or a custom action is required".to_string(),
                ))
            }
            (Some(index), _) if index >= CHOICES_PER_TURN => {
                return Err(EngineError::Input(format!(
                    "choice index {index} out of range"
                )))
            }
            _ => {}
        }

        // Stage: compute narration and consequence against the
        // un-mutated world.
        let (kb, world, settings) = self.parts()?;
        let name = settings.selected_character.clone();
        let event = kb.events.get(world.current_event_index);
        let consequence = narrative::consequence_text(event, &name, custom_action.as_deref());

        let instruction = match &custom_action {
            Some(action) => format!("The player chose to: {action}. Continue the story."),
            None => format!(
                "The player chose: {}. Continue the story.",
                event
                    .map(|e| e.player_choice_potential.clone())
                    .unwrap_or_else(|| "to press on".to_string())
            ),
        };
        let context = Self::story_context(kb, world, settings);
        let narration = self.narrative.continue_story(&instruction, &context).await;

        // Commit: history and deviations, derived fields, then advance.
        let pre_index = self
            .world
            .as_ref()
            .map(|w| w.current_event_index)
            .unwrap_or(0);

        {
            let events = self
                .kb
                .as_ref()
                .map(|kb| kb.events.as_slice())
                .unwrap_or(&[]);
            if let Some(world) = self.world.as_mut() {
                world.record_choice(choice_index, custom_action.clone());
                if let Some(action) = &custom_action {
                    world.modified_events.push(Deviation {
                        event_index: pre_index,
                        description: format!("custom action: {action}"),
                    });
                }
                // Momentum and arc are derived at the pre-advance
                // position, matching the turn the player just played.
                world.recompute_derived(events.len());
                world.advance(events);
            }
        }
        if let Some(kb) = self.kb.as_mut() {
            if let Some(event) = kb.events.get_mut(pre_index) {
                event.consequences.push(consequence.clone());
            }
        }

        if let Some(dir) = self.kb_dir.clone() {
            if let Some(world) = self.world.as_ref() {
                if let Err(err) = persist::save_world_state(&dir, world).await {
                    tracing::warn!(error = %err, "world state auto-save failed");
                }
            }
        }

        let (kb, world, settings) = self.parts()?;
        let context = Self::story_context(kb, world, settings);
        let next_choices = self
            .narrative
            .generate_choices(
                kb.events.get(world.current_event_index),
                &settings.selected_character,
                &context,
            )
            .await;
        Ok(TurnOutcome {
            narration,
            consequence,
            next_choices,
            world: world.summary(&kb.events),
            character: world.character_states.get(&name).cloned(),
        })
    }

    /// Persist the knowledge base and world state to the save directory.
    pub async fn save(&self) -> Result<(), EngineError> {
        let dir = self
            .kb_dir
            .as_ref()
            .ok_or_else(|| EngineError::Input("no save directory configured".to_string()))?;
        if let Some(kb) = &self.kb {
            persist::save_knowledge_base(dir, kb).await?;
        }
        if let Some(world) = &self.world {
            persist::save_world_state(dir, world).await?;
        }
        Ok(())
    }

    fn parts(&self) -> Result<(&KnowledgeBase, &WorldState, &GameSettings), EngineError> {
        match (&self.kb, &self.world, &self.settings) {
            (Some(kb), Some(world), Some(settings)) => Ok((kb, world, settings)),
            _ => Err(EngineError::Input("session is not set up".to_string())),
        }
    }

    fn story_context(kb: &KnowledgeBase, world: &WorldState, settings: &GameSettings) -> StoryContext {
        let upto = world.current_event_index.min(kb.events.len());
        let recent_events = kb.events[..upto]
            .iter()
            .rev()
            .take(RECENT_EVENTS)
            .map(|e| e.description.clone())
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();

        let relationships = kb
            .character(&settings.selected_character)
            .map(|c| {
                c.relationships
                    .iter()
                    .map(|(other, kind)| format!("{other}: {}", kind.name()))
                    .collect()
            })
            .unwrap_or_default();

        StoryContext {
            book_title: settings.book_title.clone(),
            selected_character: settings.selected_character.clone(),
            story_arc: world.story_arc_position,
            momentum: world.narrative_momentum,
            recent_events,
            relationships,
            custom_setting: settings.custom_setting.clone(),
            language: settings.language.clone(),
        }
    }
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new()
    }
}
