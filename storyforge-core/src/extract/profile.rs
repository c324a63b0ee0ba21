//! Character profiling: role, traits, backstory, relationships,
//! importance.
//!
//! Every classifier here is an ordered keyword table evaluated against
//! the character's aggregated mention contexts. The heuristics are
//! intentionally approximate; they only need to produce a stable,
//! plausible profile for game state.

use crate::extract::entities::NameCandidate;
use crate::knowledge::{Character, Event, RelationKind, Role};
use once_cell::sync::Lazy;
use regex::Regex;

/// Role cue tables, scored independently. Listed in tie-break
/// precedence order: protagonist beats antagonist beats supporting.
const ROLE_RULES: &[(Role, &[&str])] = &[
    (
        Role::Protagonist,
        &["hero", "main", "journey", "quest", "adventure", "destiny"],
    ),
    (
        Role::Antagonist,
        &["villain", "enemy", "evil", "dark", "against", "oppose"],
    ),
    (
        Role::Supporting,
        &["friend", "ally", "help", "support", "companion"],
    ),
];

/// Trait table; matches are kept in declaration order, at most three.
const TRAIT_RULES: &[(&str, &[&str])] = &[
    ("brave", &["brave", "courageous", "fearless", "bold"]),
    ("kind", &["kind", "gentle", "compassionate", "caring"]),
    ("intelligent", &["smart", "clever", "wise", "brilliant"]),
    ("mysterious", &["mysterious", "secretive", "enigmatic"]),
    ("determined", &["determined", "persistent", "stubborn"]),
    ("humorous", &["funny", "witty", "humorous", "jokes"]),
];

/// Relationship-kind table, first match wins.
const RELATION_RULES: &[(RelationKind, &[&str])] = &[
    (
        RelationKind::Friend,
        &["friend", "ally", "companion", "together"],
    ),
    (
        RelationKind::Enemy,
        &["enemy", "rival", "against", "fight", "battle"],
    ),
    (
        RelationKind::Family,
        &["father", "mother", "brother", "sister", "son", "daughter"],
    ),
    (
        RelationKind::Mentor,
        &["teacher", "mentor", "guide", "master"],
    ),
    (
        RelationKind::Romantic,
        &["love", "beloved", "romance", "marry", "kiss"],
    ),
];

/// Backstory sentences shorter than this are discarded as noise.
const MIN_BACKSTORY_SENTENCE: usize = 20;

static SENTENCE_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+").unwrap());

/// Builds one [`Character`] record per extracted name candidate.
pub struct CharacterProfiler<'a> {
    book_title: &'a str,
}

impl<'a> CharacterProfiler<'a> {
    pub fn new(book_title: &'a str) -> Self {
        Self { book_title }
    }

    /// Profile candidates in extraction order.
    ///
    /// Relationship detection only looks backwards at already-profiled
    /// names, so edges from earlier characters to later ones appear on
    /// the later character's record.
    pub fn profile(&self, candidates: &[NameCandidate]) -> Vec<Character> {
        let mut characters: Vec<Character> = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let context = candidate.contexts.join(" ");
            let context_lower = context.to_lowercase();

            let mut character = Character::new(&candidate.name, classify_role(&context_lower));
            character.description = format!("Character from {}", self.book_title);
            character.personality_traits = extract_traits(&context_lower);
            character.backstory = synthesize_backstory(&candidate.name, &context, self.book_title);

            for known in &characters {
                if context.contains(known.name.as_str()) {
                    character
                        .relationships
                        .insert(known.name.clone(), classify_relation(&context_lower));
                }
            }

            characters.push(character);
        }

        characters
    }
}

/// Score each role's cue set; highest score wins, ties broken by table
/// precedence. No cues at all means a minor character.
pub fn classify_role(context_lower: &str) -> Role {
    let mut best = Role::Minor;
    let mut best_score = 0usize;

    for (role, keywords) in ROLE_RULES {
        let score = keywords
            .iter()
            .filter(|keyword| context_lower.contains(*keyword))
            .count();
        if score > best_score {
            best = *role;
            best_score = score;
        }
    }

    if best_score == 0 {
        Role::Minor
    } else {
        best
    }
}

/// Up to three traits, in table order.
pub fn extract_traits(context_lower: &str) -> Vec<String> {
    TRAIT_RULES
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| context_lower.contains(k)))
        .map(|(name, _)| name.to_string())
        .take(3)
        .collect()
}

/// Assemble a backstory from up to three sentences that mention the
/// character, with a templated lead-in. Falls back to a generic line.
pub fn synthesize_backstory(name: &str, context: &str, book_title: &str) -> String {
    let sentences: Vec<&str> = SENTENCE_SPLIT
        .split(context)
        .map(str::trim)
        .filter(|s| s.contains(name) && s.chars().count() > MIN_BACKSTORY_SENTENCE)
        .take(3)
        .collect();

    if sentences.is_empty() {
        format!("{name} is a character in {book_title} whose background unfolds throughout the story.")
    } else {
        format!(
            "{name} appears in the story with the following background: {}",
            sentences.join(" ")
        )
    }
}

/// First relationship-kind row with a keyword hit; co-occurrence with no
/// hit is an acquaintance.
pub fn classify_relation(context_lower: &str) -> RelationKind {
    for (kind, keywords) in RELATION_RULES {
        if keywords.iter().any(|k| context_lower.contains(k)) {
            return *kind;
        }
    }
    RelationKind::Acquaintance
}

/// Recompute importance scores and first appearances over the final
/// character and event sets.
///
/// A pure function of its inputs: running it twice on identical state
/// yields identical scores.
pub fn score_importance(characters: &mut [Character], events: &[Event]) {
    for character in characters.iter_mut() {
        let mention_count = events
            .iter()
            .filter(|e| e.characters_involved.iter().any(|n| n == &character.name))
            .count();

        character.importance_score = 0.4 * mention_count as f64
            + 0.3 * character.relationships.len() as f64
            + 0.3 * character.role.weight();

        character.first_appearance = events
            .iter()
            .find(|e| e.characters_involved.iter().any(|n| n == &character.name))
            .map(|e| e.chapter)
            .unwrap_or(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::{EventType, Tone};

    #[test]
    fn test_role_classification() {
        assert_eq!(classify_role("the hero began a great journey"), Role::Protagonist);
        assert_eq!(classify_role("an evil villain plotted"), Role::Antagonist);
        assert_eq!(classify_role("a loyal friend and companion"), Role::Supporting);
        assert_eq!(classify_role("a man walked by"), Role::Minor);
    }

    #[test]
    fn test_role_tie_precedence() {
        // One protagonist cue and one antagonist cue: precedence wins.
        assert_eq!(classify_role("the hero faced the villain"), Role::Protagonist);
    }

    #[test]
    fn test_trait_extraction_capped_and_ordered() {
        let context = "funny and witty, determined, mysterious, brave and kind";
        let traits = extract_traits(context);
        assert_eq!(traits, vec!["brave", "kind", "mysterious"]);
    }

    #[test]
    fn test_backstory_from_sentences() {
        let context = "Alice grew up beside the northern sea with her aunt. \
                       Short one. Alice studied the old maps for years.";
        let backstory = synthesize_backstory("Alice", context, "The Voyage");
        assert!(backstory.starts_with("Alice appears in the story"));
        assert!(backstory.contains("northern sea"));
        assert!(backstory.contains("old maps"));
        assert!(!backstory.contains("Short one"));
    }

    #[test]
    fn test_backstory_fallback() {
        let backstory = synthesize_backstory("Bob", "nothing relevant", "The Voyage");
        assert_eq!(
            backstory,
            "Bob is a character in The Voyage whose background unfolds throughout the story."
        );
    }

    #[test]
    fn test_relation_classification() {
        assert_eq!(classify_relation("they fought a battle"), RelationKind::Enemy);
        assert_eq!(classify_relation("her beloved"), RelationKind::Romantic);
        assert_eq!(classify_relation("they met once"), RelationKind::Acquaintance);
    }

    #[test]
    fn test_profile_relationships_look_backwards() {
        let candidates = vec![
            NameCandidate {
                name: "Alice".to_string(),
                mentions: 3,
                contexts: vec!["Alice said hello".to_string()],
                first_position: 0,
            },
            NameCandidate {
                name: "Bob".to_string(),
                mentions: 3,
                contexts: vec!["Bob and Alice were friends together".to_string()],
                first_position: 10,
            },
        ];

        let characters = CharacterProfiler::new("Test").profile(&candidates);
        assert!(characters[0].relationships.is_empty());
        assert_eq!(
            characters[1].relationships.get("Alice"),
            Some(&RelationKind::Friend)
        );
    }

    fn event_involving(chapter: u32, names: &[&str]) -> Event {
        Event {
            id: Event::format_id(1),
            chapter,
            sequence: 0,
            event_type: EventType::Description,
            characters_involved: names.iter().map(|n| n.to_string()).collect(),
            location: "Unknown location".to_string(),
            description: String::new(),
            consequences: Vec::new(),
            emotional_tone: Tone::Neutral,
            plot_significance: "medium".to_string(),
            player_choice_potential: String::new(),
            original_text: String::new(),
        }
    }

    #[test]
    fn test_importance_scoring_is_deterministic() {
        let mut characters = vec![Character::new("Alice", Role::Protagonist)];
        characters[0]
            .relationships
            .insert("Bob".to_string(), RelationKind::Friend);
        let events = vec![
            event_involving(1, &["Alice"]),
            event_involving(2, &["Alice", "Bob"]),
        ];

        score_importance(&mut characters, &events);
        let first = characters[0].importance_score;
        // 0.4 * 2 events + 0.3 * 1 relationship + 0.3 * 10 role weight
        assert!((first - (0.8 + 0.3 + 3.0)).abs() < 1e-9);
        assert_eq!(characters[0].first_appearance, 1);

        score_importance(&mut characters, &events);
        assert_eq!(characters[0].importance_score, first);
    }
}
