//! Turn any book into an interactive story.
//!
//! The crate has two halves. The extraction pipeline
//! ([`segment`], [`extract`], [`knowledge`]) turns raw book text into a
//! structured knowledge base: characters with roles, traits, and
//! relationships; a timeline of events; locations; and a relationship
//! graph. The game half ([`state`], [`choices`], [`narrative`],
//! [`session`]) drives an interactive playthrough over that knowledge:
//! the player picks a character, makes choices each turn, and the
//! world state tracks how far the story has drifted from the book.
//!
//! [`session::GameSession`] is the entry point:
//!
//! ```no_run
//! use storyforge_core::{GameSession, GameSettings};
//!
//! # async fn run(book_text: &str) -> Result<(), storyforge_core::EngineError> {
//! let mut session = GameSession::new();
//! let overview = session.load_book(book_text).await?;
//! session.setup_game(GameSettings::new(&overview.character_names[0]))?;
//! let opening = session.start_game().await?;
//! println!("{}", opening.narration);
//! let turn = session.process_choice(Some(0), None).await?;
//! println!("{}", turn.narration);
//! # Ok(())
//! # }
//! ```

pub mod choices;
pub mod extract;
pub mod knowledge;
pub mod narrative;
pub mod persist;
pub mod segment;
pub mod session;
pub mod state;
pub mod testing;

pub use choices::{Choice, RiskLevel};
pub use knowledge::{Character, Event, EventType, KnowledgeBase, RelationKind, RelationshipGraph, Role, Tone};
pub use narrative::{NarrativeEngine, StoryContext};
pub use persist::PersistError;
pub use session::{BookOverview, EngineError, GameSession, GameSettings, StartOutput, TurnOutcome};
pub use state::{GameState, Momentum, StoryArc, WorldState, WorldSummary};
