//! Knowledge extraction pipeline: names, profiles, events.

pub mod entities;
pub mod events;
pub mod profile;

pub use entities::{EntityExtractor, NameCandidate, PersonRecognizer, RecognizerUnavailable, Span};
pub use events::{EventExtractor, ExtractedEvents};
pub use profile::{score_importance, CharacterProfiler};
