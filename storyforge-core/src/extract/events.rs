//! Event extraction: partitioning chapters into ordered narrative events.

use crate::knowledge::{Event, EventType, Tone, UNKNOWN_LOCATION};
use crate::segment::{self, Chapter};
use once_cell::sync::Lazy;
use regex::Regex;

/// Paragraphs at or below this length are skipped as non-events.
const MIN_PARAGRAPH_CHARS: usize = 50;

/// Event descriptions are truncated to this many characters.
const MAX_DESCRIPTION_CHARS: usize = 200;

/// Event-type keyword families, first match wins.
const EVENT_TYPE_RULES: &[(EventType, &[&str])] = &[
    (
        EventType::Dialogue,
        &["said", "asked", "replied", "whispered", "shouted"],
    ),
    (
        EventType::Conflict,
        &["fight", "battle", "attack", "conflict"],
    ),
    (
        EventType::Action,
        &["went", "walked", "ran", "moved", "traveled"],
    ),
    (
        EventType::Internal,
        &["felt", "thought", "remembered", "wondered"],
    ),
];

const POSITIVE_WORDS: &[&str] = &["happy", "joy", "smile", "laugh", "love", "hope", "excited"];
const NEGATIVE_WORDS: &[&str] = &["sad", "angry", "fear", "worried", "dark", "death", "pain"];

/// Location templates, in fixed priority order; group 1 is the place.
static LOCATION_RULES: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"in the ([A-Z][a-z]+ [A-Z][a-z]+)").unwrap(),
        Regex::new(r"at the ([A-Z][a-z]+)").unwrap(),
        Regex::new(r"in ([A-Z][a-z]+)").unwrap(),
        Regex::new(r"at ([A-Z][a-z]+)").unwrap(),
    ]
});

/// Events plus the location catalog discovered while extracting them.
#[derive(Debug, Clone, Default)]
pub struct ExtractedEvents {
    pub events: Vec<Event>,
    /// Deduplicated, in discovery order.
    pub locations: Vec<String>,
}

/// Partitions book text into ordered [`Event`] records.
pub struct EventExtractor<'a> {
    character_names: &'a [String],
}

impl<'a> EventExtractor<'a> {
    /// `character_names` must be in character-extraction order; it
    /// determines the order of each event's `characters_involved`.
    pub fn new(character_names: &'a [String]) -> Self {
        Self { character_names }
    }

    /// Extract events from chapters, assigning `evt_NNN` ids
    /// sequentially across the whole book.
    pub fn extract(&self, chapters: &[Chapter]) -> ExtractedEvents {
        let mut result = ExtractedEvents::default();
        let mut next_id = 1u32;

        for chapter in chapters {
            for (sequence, paragraph) in segment::split_paragraphs(&chapter.text)
                .into_iter()
                .enumerate()
            {
                if paragraph.chars().count() <= MIN_PARAGRAPH_CHARS {
                    continue;
                }

                let event =
                    self.event_from_paragraph(next_id, chapter.number, sequence as u32, paragraph);
                if let Some(location) = non_sentinel(&event.location) {
                    if !result.locations.iter().any(|l| l == location) {
                        result.locations.push(location.to_string());
                    }
                }
                result.events.push(event);
                next_id += 1;
            }
        }

        tracing::info!(events = result.events.len(), "extracted events");
        result
    }

    fn event_from_paragraph(
        &self,
        id: u32,
        chapter: u32,
        sequence: u32,
        text: &str,
    ) -> Event {
        let characters_involved: Vec<String> = self
            .character_names
            .iter()
            .filter(|name| text.contains(name.as_str()))
            .cloned()
            .collect();

        Event {
            id: Event::format_id(id),
            chapter,
            sequence,
            event_type: classify_event_type(text),
            location: detect_location(text),
            description: truncate_description(text),
            consequences: Vec::new(),
            emotional_tone: analyze_tone(text),
            plot_significance: "medium".to_string(),
            player_choice_potential: choice_potential(text, &characters_involved),
            original_text: text.to_string(),
            characters_involved,
        }
    }
}

/// First keyword family with a hit; anything else is description.
pub fn classify_event_type(text: &str) -> EventType {
    let lower = text.to_lowercase();
    for (event_type, keywords) in EVENT_TYPE_RULES {
        if keywords.iter().any(|k| lower.contains(k)) {
            return *event_type;
        }
    }
    EventType::Description
}

/// First location template that matches, else the sentinel.
pub fn detect_location(text: &str) -> String {
    for rule in LOCATION_RULES.iter() {
        if let Some(captures) = rule.captures(text) {
            if let Some(place) = captures.get(1) {
                return place.as_str().to_string();
            }
        }
    }
    UNKNOWN_LOCATION.to_string()
}

/// Compare positive and negative keyword presence counts.
pub fn analyze_tone(text: &str) -> Tone {
    let lower = text.to_lowercase();
    let positive = POSITIVE_WORDS.iter().filter(|w| lower.contains(*w)).count();
    let negative = NEGATIVE_WORDS.iter().filter(|w| lower.contains(*w)).count();

    match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => Tone::Positive,
        std::cmp::Ordering::Less => Tone::Negative,
        std::cmp::Ordering::Equal => Tone::Neutral,
    }
}

/// Human-readable hint at what the player could decide at this event.
fn choice_potential(text: &str, characters: &[String]) -> String {
    let Some(main) = characters.first() else {
        return "Observe the unfolding events".to_string();
    };

    let lower = text.to_lowercase();
    if lower.contains("said") || lower.contains("asked") {
        format!("Choose how {main} responds to the conversation")
    } else if lower.contains("fight") || lower.contains("battle") {
        format!("Decide {main}'s strategy in the conflict")
    } else if lower.contains("went") || lower.contains("moved") {
        format!("Choose where {main} goes next")
    } else {
        format!("Determine {main}'s next action")
    }
}

fn truncate_description(text: &str) -> String {
    if text.chars().count() > MAX_DESCRIPTION_CHARS {
        let truncated: String = text.chars().take(MAX_DESCRIPTION_CHARS).collect();
        format!("{truncated}...")
    } else {
        text.to_string()
    }
}

fn non_sentinel(location: &str) -> Option<&str> {
    (location != UNKNOWN_LOCATION).then_some(location)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapter(number: u32, text: &str) -> Chapter {
        Chapter {
            number,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_event_type_priority() {
        // "said" and "fight" both present: dialogue wins.
        assert_eq!(
            classify_event_type("He said they would fight at dawn."),
            EventType::Dialogue
        );
        assert_eq!(classify_event_type("They walked for hours."), EventType::Action);
        assert_eq!(
            classify_event_type("She remembered the old house."),
            EventType::Internal
        );
        assert_eq!(classify_event_type("The hills were green."), EventType::Description);
    }

    #[test]
    fn test_location_detection() {
        assert_eq!(detect_location("They met in the Great Hall today."), "Great Hall");
        assert_eq!(detect_location("She waited at the Tavern."), "Tavern");
        assert_eq!(detect_location("He lived in London."), "London");
        assert_eq!(detect_location("nothing here"), UNKNOWN_LOCATION);
    }

    #[test]
    fn test_tone_analysis() {
        assert_eq!(analyze_tone("They were happy and full of joy."), Tone::Positive);
        assert_eq!(analyze_tone("A dark fear settled over them."), Tone::Negative);
        assert_eq!(analyze_tone("The door opened."), Tone::Neutral);
    }

    #[test]
    fn test_ids_are_sequential_across_chapters() {
        let names = vec!["Alice".to_string()];
        let chapters = vec![
            chapter(1, "Alice walked along the river for a very long time that morning.\n\n\
                        Alice said that the journey would take them many days to finish."),
            chapter(2, "Alice felt the cold wind rising over the mountains around her."),
        ];

        let extracted = EventExtractor::new(&names).extract(&chapters);
        let ids: Vec<&str> = extracted.events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["evt_001", "evt_002", "evt_003"]);
        assert_eq!(extracted.events[2].chapter, 2);
    }

    #[test]
    fn test_short_paragraphs_skipped() {
        let names: Vec<String> = Vec::new();
        let chapters = vec![chapter(1, "Too short.\n\nAlso very short indeed.")];
        let extracted = EventExtractor::new(&names).extract(&chapters);
        assert!(extracted.events.is_empty());
    }

    #[test]
    fn test_characters_in_extraction_order() {
        let names = vec!["Zara".to_string(), "Adam".to_string()];
        let chapters = vec![chapter(
            1,
            "Adam and Zara walked together through the quiet streets of the town.",
        )];

        let extracted = EventExtractor::new(&names).extract(&chapters);
        assert_eq!(
            extracted.events[0].characters_involved,
            vec!["Zara".to_string(), "Adam".to_string()]
        );
    }

    #[test]
    fn test_description_truncated() {
        let names: Vec<String> = Vec::new();
        let long = "word ".repeat(100);
        let chapters = vec![chapter(1, &long)];
        let extracted = EventExtractor::new(&names).extract(&chapters);
        assert!(extracted.events[0].description.ends_with("..."));
        assert_eq!(
            extracted.events[0].description.chars().count(),
            MAX_DESCRIPTION_CHARS + 3
        );
        assert_eq!(extracted.events[0].original_text.trim(), long.trim());
    }

    #[test]
    fn test_location_catalog_deduplicated() {
        let names: Vec<String> = Vec::new();
        let chapters = vec![chapter(
            1,
            "They met at the Tavern and drank late into the cold evening.\n\n\
             Later they met at the Tavern again to plan the next day's march.",
        )];
        let extracted = EventExtractor::new(&names).extract(&chapters);
        assert_eq!(extracted.locations, vec!["Tavern".to_string()]);
    }
}
