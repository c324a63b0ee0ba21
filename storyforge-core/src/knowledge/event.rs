//! Event records: discrete, ordered narrative units.

use serde::{Deserialize, Serialize};

/// Location sentinel used when no location pattern matches.
pub const UNKNOWN_LOCATION: &str = "Unknown location";

/// Kind of narrative content a paragraph was classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Dialogue,
    Conflict,
    Action,
    Internal,
    Description,
}

impl EventType {
    pub fn name(&self) -> &'static str {
        match self {
            EventType::Dialogue => "dialogue",
            EventType::Conflict => "conflict",
            EventType::Action => "action",
            EventType::Internal => "internal",
            EventType::Description => "description",
        }
    }
}

/// Emotional tone of a passage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Positive,
    Negative,
    Neutral,
}

/// A discrete narrative unit extracted from the source text.
///
/// Immutable once extracted, except for `consequences`, which the
/// world-state machine appends to during play.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Stable sequential id of the form `evt_NNN`.
    pub id: String,
    /// 1-based chapter number.
    pub chapter: u32,
    /// Order within the chapter.
    pub sequence: u32,
    pub event_type: EventType,
    /// Character keys present in the passage, in extraction order.
    pub characters_involved: Vec<String>,
    /// Detected location, or [`UNKNOWN_LOCATION`].
    pub location: String,
    /// Truncated narrative text.
    pub description: String,
    /// Populated during play as choices ripple forward.
    pub consequences: Vec<String>,
    pub emotional_tone: Tone,
    pub plot_significance: String,
    /// Human-readable hint at what a player could decide here.
    pub player_choice_potential: String,
    /// Full source passage.
    pub original_text: String,
}

impl Event {
    /// Format a sequential event id: `evt_001`, `evt_002`, ...
    pub fn format_id(sequence: u32) -> String {
        format!("evt_{sequence:03}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_id_format() {
        assert_eq!(Event::format_id(1), "evt_001");
        assert_eq!(Event::format_id(42), "evt_042");
        assert_eq!(Event::format_id(1000), "evt_1000");
    }

    #[test]
    fn test_event_type_serde() {
        let json = serde_json::to_string(&EventType::Dialogue).unwrap();
        assert_eq!(json, "\"dialogue\"");
        let tone: Tone = serde_json::from_str("\"neutral\"").unwrap();
        assert_eq!(tone, Tone::Neutral);
    }
}
