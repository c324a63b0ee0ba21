//! Character-name candidate extraction.
//!
//! Two interchangeable strategies: a pluggable PERSON-span recognizer
//! (an NER model behind the [`PersonRecognizer`] seam) and an ordered
//! table of regex rules. The recognizer being unavailable is not fatal;
//! extraction silently degrades to the pattern rules and logs it.

use crate::segment::floor_char_boundary;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use thiserror::Error;

/// Characters of context captured on each side of a mention.
const CONTEXT_WINDOW: usize = 100;

/// NER input is capped to bound model cost on large books.
const NER_CHAR_CAP: usize = 50_000;

/// Mentions required to promote a candidate to a character.
pub const DEFAULT_MIN_MENTIONS: u32 = 3;

/// Words that pattern rules match but never name a character.
const STOP_NAMES: &[&str] = &[
    "Chapter", "Book", "Part", "Section", "The", "And", "But", "When", "Where", "What", "How",
    "Why", "This", "That", "There", "Here", "Now", "Then",
];

/// Name-candidate rules, in fixed priority order. Rules either take the
/// whole match or capture group 1 as the name.
static NAME_RULES: Lazy<Vec<NameRule>> = Lazy::new(|| {
    vec![
        NameRule {
            label: "full-name",
            pattern: Regex::new(r"\b[A-Z][a-z]+ [A-Z][a-z]+\b").unwrap(),
            capture: None,
        },
        NameRule {
            label: "speech-verb",
            pattern: Regex::new(
                r"\b([A-Z][a-z]+)\s+(?:said|asked|replied|thought|felt|went|came|looked|smiled|laughed|cried|whispered|shouted)\b",
            )
            .unwrap(),
            capture: Some(1),
        },
        NameRule {
            label: "honorific",
            pattern: Regex::new(r"(?:Mr\.|Mrs\.|Ms\.|Dr\.|Professor)\s+[A-Z][a-z]+").unwrap(),
            capture: Some(0),
        },
    ]
});

struct NameRule {
    label: &'static str,
    pattern: Regex,
    /// Capture group holding the name; None means the whole match.
    capture: Option<usize>,
}

/// A byte span in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// Returned when a recognizer backend cannot serve requests.
#[derive(Debug, Error)]
#[error("entity recognizer unavailable")]
pub struct RecognizerUnavailable;

/// Seam for an external PERSON-entity recognizer.
pub trait PersonRecognizer: Send + Sync {
    /// Byte spans of PERSON mentions in `text`.
    fn person_spans(&self, text: &str) -> Result<Vec<Span>, RecognizerUnavailable>;
}

/// A deduplicated character-name candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameCandidate {
    pub name: String,
    /// Total mentions found.
    pub mentions: u32,
    /// One context window per mention, in text order.
    pub contexts: Vec<String>,
    /// Byte offset of the first mention (ordering key).
    pub first_position: usize,
}

/// Finds character-name candidates in book text.
pub struct EntityExtractor {
    recognizer: Option<Box<dyn PersonRecognizer>>,
    min_mentions: u32,
}

impl Default for EntityExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityExtractor {
    /// Pattern-rule extractor with the default mention threshold.
    pub fn new() -> Self {
        Self {
            recognizer: None,
            min_mentions: DEFAULT_MIN_MENTIONS,
        }
    }

    /// Prefer the given recognizer, falling back to patterns if it fails.
    pub fn with_recognizer(mut self, recognizer: Box<dyn PersonRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    /// Override the promotion threshold.
    pub fn with_min_mentions(mut self, min_mentions: u32) -> Self {
        self.min_mentions = min_mentions;
        self
    }

    /// Extract qualifying name candidates, ordered by first mention.
    ///
    /// Given identical text and strategy the output is identical:
    /// mentions are accumulated in text order and candidates keep their
    /// first-seen position as the sort key.
    pub fn extract(&self, text: &str) -> Vec<NameCandidate> {
        let mentions = match &self.recognizer {
            Some(recognizer) => {
                let capped = &text[..ner_cap(text)];
                match recognizer.person_spans(capped) {
                    Ok(spans) => spans
                        .into_iter()
                        .map(|span| (span.start, text[span.start..span.end].trim().to_string()))
                        .collect(),
                    Err(err) => {
                        tracing::warn!(error = %err, "NER unavailable; using pattern rules");
                        pattern_mentions(text)
                    }
                }
            }
            None => pattern_mentions(text),
        };

        let mut order: Vec<String> = Vec::new();
        let mut by_name: HashMap<String, NameCandidate> = HashMap::new();

        for (position, name) in mentions {
            if !is_valid_name(&name) {
                continue;
            }
            let context = context_window(text, position, position + name.len());
            match by_name.get_mut(&name) {
                Some(candidate) => {
                    candidate.mentions += 1;
                    candidate.contexts.push(context);
                }
                None => {
                    order.push(name.clone());
                    by_name.insert(
                        name.clone(),
                        NameCandidate {
                            name,
                            mentions: 1,
                            contexts: vec![context],
                            first_position: position,
                        },
                    );
                }
            }
        }

        let mut candidates: Vec<NameCandidate> = order
            .into_iter()
            .filter_map(|name| by_name.remove(&name))
            .filter(|candidate| candidate.mentions >= self.min_mentions)
            .collect();
        candidates.sort_by_key(|c| c.first_position);
        candidates
    }
}

/// All pattern-rule mentions as (byte position, name), in text order.
/// Matches from different rules are merged by position, rule priority
/// breaking ties, so accumulation order is deterministic.
fn pattern_mentions(text: &str) -> Vec<(usize, String)> {
    let mut mentions: Vec<(usize, usize, String)> = Vec::new();

    for (rule_index, rule) in NAME_RULES.iter().enumerate() {
        let before = mentions.len();
        for captures in rule.pattern.captures_iter(text) {
            let group = match rule.capture {
                Some(index) => captures.get(index),
                None => captures.get(0),
            };
            if let Some(m) = group {
                mentions.push((m.start(), rule_index, m.as_str().to_string()));
            }
        }
        tracing::debug!(rule = rule.label, matches = mentions.len() - before, "name rule applied");
    }

    mentions.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
    mentions
        .into_iter()
        .map(|(position, _, name)| (position, name))
        .collect()
}

/// Reject obvious false positives: stop words, degenerate lengths, and
/// strings with no letters.
pub fn is_valid_name(name: &str) -> bool {
    if STOP_NAMES.contains(&name) {
        return false;
    }
    let length = name.chars().count();
    if !(2..=30).contains(&length) {
        return false;
    }
    name.chars().any(|c| c.is_ascii_alphabetic())
}

/// A window of roughly `CONTEXT_WINDOW` characters around a mention.
fn context_window(text: &str, start: usize, end: usize) -> String {
    let from = floor_char_boundary(text, start.saturating_sub(CONTEXT_WINDOW));
    let to = floor_char_boundary(text, (end + CONTEXT_WINDOW).min(text.len()));
    text[from..to.max(from)].to_string()
}

/// Byte length of the first `NER_CHAR_CAP` characters.
fn ner_cap(text: &str) -> usize {
    text.char_indices()
        .nth(NER_CHAR_CAP)
        .map(|(index, _)| index)
        .unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name("Alice"));
        assert!(is_valid_name("Mr. Darcy"));
        assert!(!is_valid_name("Chapter"));
        assert!(!is_valid_name("The"));
        assert!(!is_valid_name("A"));
        assert!(!is_valid_name(&"x".repeat(31)));
        assert!(!is_valid_name("12"));
    }

    #[test]
    fn test_speech_verb_rule() {
        let text = "Alice said hello. Bob said hi. Alice said hello. \
                    Bob said hi. Alice said hello.";
        let candidates = EntityExtractor::new().extract(text);

        // Alice has 3 mentions, Bob only 2: the threshold drops Bob.
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "Alice");
        assert_eq!(candidates[0].mentions, 3);
        assert_eq!(candidates[0].contexts.len(), 3);
    }

    #[test]
    fn test_min_mentions_override() {
        let text = "Alice said hello. Bob said hi.";
        let candidates = EntityExtractor::new().with_min_mentions(1).extract(text);
        let names: Vec<_> = candidates.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Bob"]);
    }

    #[test]
    fn test_full_name_rule() {
        let text = "Harry Potter waved. Harry Potter ducked. Harry Potter ran.";
        let candidates = EntityExtractor::new().extract(text);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "Harry Potter");
    }

    #[test]
    fn test_honorific_rule() {
        let text = "Dr. Watson nodded. Dr. Watson frowned. Dr. Watson left.";
        let candidates = EntityExtractor::new().with_min_mentions(3).extract(text);
        assert!(candidates.iter().any(|c| c.name == "Dr. Watson"));
    }

    #[test]
    fn test_deterministic_ordering() {
        let text = "Zara said yes. Adam said no. Zara said yes. \
                    Adam said no. Zara said yes. Adam said no.";
        let first = EntityExtractor::new().extract(text);
        let second = EntityExtractor::new().extract(text);
        assert_eq!(first, second);
        // Zara appears first in the text, so she sorts first.
        assert_eq!(first[0].name, "Zara");
    }

    #[test]
    fn test_context_window_bounds() {
        let text = "Mira said nothing.";
        let candidates = EntityExtractor::new().with_min_mentions(1).extract(text);
        assert_eq!(candidates.len(), 1);
        // Window is clamped to the text bounds.
        assert!(candidates[0].contexts[0].contains("Mira said"));
    }

    struct FailingRecognizer;
    impl PersonRecognizer for FailingRecognizer {
        fn person_spans(&self, _text: &str) -> Result<Vec<Span>, RecognizerUnavailable> {
            Err(RecognizerUnavailable)
        }
    }

    struct FixedRecognizer(Vec<Span>);
    impl PersonRecognizer for FixedRecognizer {
        fn person_spans(&self, _text: &str) -> Result<Vec<Span>, RecognizerUnavailable> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_recognizer_failure_falls_back_to_patterns() {
        let text = "Alice said hello. Alice said hi. Alice said hey.";
        let candidates = EntityExtractor::new()
            .with_recognizer(Box::new(FailingRecognizer))
            .extract(text);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "Alice");
    }

    #[test]
    fn test_recognizer_spans_used() {
        let text = "Gandalf spoke. Gandalf rose. Gandalf left.";
        let spans = vec![
            Span { start: 0, end: 7 },
            Span { start: 15, end: 22 },
            Span { start: 29, end: 36 },
        ];
        let candidates = EntityExtractor::new()
            .with_recognizer(Box::new(FixedRecognizer(spans)))
            .extract(text);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "Gandalf");
        assert_eq!(candidates[0].mentions, 3);
    }
}
