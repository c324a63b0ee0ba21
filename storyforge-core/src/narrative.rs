//! Narrative generation.
//!
//! The engine prefers a live model behind the [`llama`] client; without
//! credentials, or when a call fails, it degrades to a deterministic
//! rule-based library so a turn always produces prose.

use crate::choices::{self, Choice, CHOICES_PER_TURN};
use crate::knowledge::{Event, EventType};
use crate::state::{Momentum, StoryArc};
use serde::{Deserialize, Serialize};

/// Token and temperature settings for choice generation.
const CHOICE_MAX_TOKENS: usize = 400;
const CHOICE_TEMPERATURE: f32 = 0.8;

/// Typed context handed to the model on every narrative request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryContext {
    pub book_title: String,
    pub selected_character: String,
    pub story_arc: StoryArc,
    pub momentum: Momentum,
    /// Descriptions of the most recent timeline events, oldest first.
    pub recent_events: Vec<String>,
    /// One human-readable line per relationship of the player character.
    pub relationships: Vec<String>,
    pub custom_setting: Option<String>,
    pub language: String,
}

enum Backend {
    Llama(llama::Llama),
    Rules,
}

/// Produces story continuations for the game loop.
pub struct NarrativeEngine {
    backend: Backend,
}

impl NarrativeEngine {
    /// Model-backed engine using credentials from the environment,
    /// degrading to the rule-based backend when they are absent.
    pub fn from_env() -> Self {
        match llama::Llama::from_env() {
            Ok(client) => Self {
                backend: Backend::Llama(client),
            },
            Err(err) => {
                tracing::warn!(error = %err, "no model credentials; using rule-based narration");
                Self::rules()
            }
        }
    }

    /// Engine that never leaves the deterministic rule-based backend.
    pub fn rules() -> Self {
        Self {
            backend: Backend::Rules,
        }
    }

    /// Engine backed by a specific client.
    pub fn with_client(client: llama::Llama) -> Self {
        Self {
            backend: Backend::Llama(client),
        }
    }

    /// Continue the story per `instruction`. Never fails: transport or
    /// parse errors fall back to the rule-based library.
    pub async fn continue_story(&self, instruction: &str, context: &StoryContext) -> String {
        match &self.backend {
            Backend::Llama(client) => {
                let request = llama::Request::new(build_prompt(instruction, context));
                match client.complete(request).await {
                    Ok(text) => text,
                    Err(err) => {
                        tracing::warn!(error = %err, "model call failed; using rule-based narration");
                        rule_based_continuation(instruction, context)
                    }
                }
            }
            Backend::Rules => rule_based_continuation(instruction, context),
        }
    }

    /// Three choices for the current timeline position.
    ///
    /// The model-backed path asks for a JSON choice array; any
    /// transport failure, unparseable body, or wrong-sized result falls
    /// back to the deterministic template table. Past the end of the
    /// timeline (`event` is `None`) the templates are used directly.
    pub async fn generate_choices(
        &self,
        event: Option<&Event>,
        character: &str,
        context: &StoryContext,
    ) -> Vec<Choice> {
        if let (Backend::Llama(client), Some(event)) = (&self.backend, event) {
            let request = llama::Request::new(build_choice_prompt(event, character, context))
                .with_max_completion_tokens(CHOICE_MAX_TOKENS)
                .with_temperature(CHOICE_TEMPERATURE);
            match client.complete(request).await {
                Ok(text) => match parse_choices(&text) {
                    Some(parsed) => return parsed,
                    None => {
                        tracing::warn!("unparseable choice response; using templates")
                    }
                },
                Err(err) => {
                    tracing::warn!(error = %err, "choice generation failed; using templates")
                }
            }
        }
        choices::choices_for_event(event, character)
    }
}

fn build_choice_prompt(event: &Event, character: &str, context: &StoryContext) -> String {
    format!(
        "Generate 3 meaningful choice options for {character} in this situation:\n\
         \n\
         Event: {}\n\
         Location: {}\n\
         Event type: {}\n\
         Story phase: {}\n\
         \n\
         Each choice should fit the character and situation, carry a \
         different risk level (Low/Medium/High), and lead to a distinct \
         outcome.\n\
         \n\
         Respond in JSON format:\n\
         {{\"choices\": [{{\"title\": \"...\", \"action\": \"...\", \
         \"risk_level\": \"Low\", \"outcome\": \"...\"}}]}}",
        event.description,
        event.location,
        event.event_type.name(),
        context.story_arc.name(),
    )
}

#[derive(Deserialize)]
struct ChoiceEnvelope {
    choices: Vec<Choice>,
}

/// Pull a choice array out of model output. Accepts the documented
/// `{"choices": [...]}` envelope or a bare array, with surrounding
/// prose tolerated. Anything but exactly three choices is rejected.
fn parse_choices(text: &str) -> Option<Vec<Choice>> {
    let start = text.find(|c| c == '{' || c == '[')?;
    let end = text.rfind(|c| c == '}' || c == ']')?;
    let body = text.get(start..=end)?;

    let parsed = match serde_json::from_str::<ChoiceEnvelope>(body) {
        Ok(envelope) => envelope.choices,
        Err(_) => serde_json::from_str::<Vec<Choice>>(body).ok()?,
    };
    (parsed.len() == CHOICES_PER_TURN).then_some(parsed)
}

fn build_prompt(instruction: &str, context: &StoryContext) -> String {
    let mut prompt = format!(
        "You are narrating an interactive story based on \"{}\".\n\
         The player controls {}. The story is in its {} phase with {} momentum.\n\
         Respond in {}.\n",
        context.book_title,
        context.selected_character,
        context.story_arc.name(),
        context.momentum.name(),
        context.language,
    );
    if let Some(setting) = &context.custom_setting {
        prompt.push_str(&format!("Setting twist: {setting}\n"));
    }
    if !context.recent_events.is_empty() {
        prompt.push_str("Recent events:\n");
        for event in &context.recent_events {
            prompt.push_str(&format!("- {event}\n"));
        }
    }
    if !context.relationships.is_empty() {
        prompt.push_str(&format!(
            "{}'s relationships:\n",
            context.selected_character
        ));
        for line in &context.relationships {
            prompt.push_str(&format!("- {line}\n"));
        }
    }
    prompt.push_str(&format!("\n{instruction}"));
    prompt
}

/// Keyword-keyed continuation library. The instruction text selects
/// the template; the context fills it in.
fn rule_based_continuation(instruction: &str, context: &StoryContext) -> String {
    let lower = instruction.to_lowercase();
    let name = &context.selected_character;

    if lower.contains("character") || lower.contains("backstory") {
        format!(
            "{name} pauses to reflect on the road that led here. Every step through \
             {} has left its mark, and the people met along the way are never far \
             from mind.",
            context.book_title
        )
    } else if lower.contains("choice") || lower.contains("decision") {
        format!(
            "{name} weighs the options carefully. Each path carries its own promise \
             and its own price, and there is no turning back once the decision is made."
        )
    } else if lower.contains("story") || lower.contains("continue") {
        format!(
            "The story presses on. {name} moves forward through the {} of the tale, \
             aware that events are gathering {} momentum with every passing moment.",
            context.story_arc.name(),
            context.momentum.name()
        )
    } else {
        format!(
            "{name} takes a breath and acts. The world of {} shifts in quiet ways in \
             response, and what happens next belongs to no book.",
            context.book_title
        )
    }
}

/// Deterministic consequence line for a processed choice.
///
/// `event` is the event the choice was made at, or `None` when play has
/// moved beyond the recorded timeline.
pub fn consequence_text(event: Option<&Event>, character: &str, custom_action: Option<&str>) -> String {
    if let Some(action) = custom_action {
        return format!(
            "{character}'s decision to {action} sends the story down a path the book never took."
        );
    }

    match event.map(|e| e.event_type) {
        Some(EventType::Dialogue) => {
            format!("The conversation shifts as {character} makes their position known.")
        }
        Some(EventType::Conflict) => {
            format!("The outcome of the confrontation now rests on {character}'s shoulders.")
        }
        Some(EventType::Action) => {
            format!("{character}'s move changes where the journey leads next.")
        }
        Some(EventType::Internal) => {
            format!("Something settles inside {character}; a resolve that will shape what follows.")
        }
        Some(EventType::Description) => {
            format!("{character} takes in the scene, and the story quietly bends around the moment.")
        }
        None => {
            format!("Beyond the book's final page, {character}'s choices alone now write the story.")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::Tone;

    fn context() -> StoryContext {
        StoryContext {
            book_title: "The Voyage".to_string(),
            selected_character: "Alice".to_string(),
            story_arc: StoryArc::Beginning,
            momentum: Momentum::Building,
            recent_events: vec!["Alice left the harbor.".to_string()],
            relationships: vec!["Bob: friend".to_string()],
            custom_setting: None,
            language: "English".to_string(),
        }
    }

    #[test]
    fn test_prompt_includes_context() {
        let prompt = build_prompt("Continue the story.", &context());
        assert!(prompt.contains("The Voyage"));
        assert!(prompt.contains("Alice"));
        assert!(prompt.contains("left the harbor"));
        assert!(prompt.contains("Bob: friend"));
        assert!(prompt.ends_with("Continue the story."));
    }

    #[test]
    fn test_rule_based_keys() {
        let ctx = context();
        assert!(rule_based_continuation("Tell me about this character", &ctx)
            .contains("road that led here"));
        assert!(rule_based_continuation("Describe the choice", &ctx).contains("weighs the options"));
        assert!(rule_based_continuation("Continue the story", &ctx).contains("presses on"));
        assert!(rule_based_continuation("something else", &ctx).contains("takes a breath"));
    }

    #[tokio::test]
    async fn test_rules_engine_always_produces_prose() {
        let engine = NarrativeEngine::rules();
        let text = engine.continue_story("Continue the story.", &context()).await;
        assert!(!text.is_empty());
    }

    #[test]
    fn test_parse_choices_envelope() {
        let text = r#"Here are your options:
            {"choices": [
                {"title": "A", "action": "do a", "risk_level": "Low", "outcome": "a"},
                {"title": "B", "action": "do b", "risk_level": "Medium", "outcome": "b"},
                {"title": "C", "action": "do c", "risk_level": "High", "outcome": "c"}
            ]}"#;
        let parsed = parse_choices(text).unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].title, "A");
        assert_eq!(parsed[2].risk_level, crate::choices::RiskLevel::High);
    }

    #[test]
    fn test_parse_choices_bare_array() {
        let text = r#"[
            {"title": "A", "action": "a", "risk_level": "low", "outcome": "a"},
            {"title": "B", "action": "b", "risk_level": "medium", "outcome": "b"},
            {"title": "C", "action": "c", "risk_level": "high", "outcome": "c"}
        ]"#;
        assert_eq!(parse_choices(text).unwrap().len(), 3);
    }

    #[test]
    fn test_parse_choices_rejects_bad_shapes() {
        assert!(parse_choices("no json here").is_none());
        assert!(parse_choices("{\"choices\": []}").is_none());
        assert!(parse_choices(
            r#"{"choices": [{"title": "only", "action": "one", "risk_level": "low", "outcome": "o"}]}"#
        )
        .is_none());
        assert!(parse_choices("{\"choices\": [1, 2, 3]}").is_none());
    }

    #[tokio::test]
    async fn test_rules_backend_uses_templates() {
        let event = Event {
            id: Event::format_id(1),
            chapter: 1,
            sequence: 0,
            event_type: EventType::Dialogue,
            characters_involved: Vec::new(),
            location: "Unknown location".to_string(),
            description: "They spoke.".to_string(),
            consequences: Vec::new(),
            emotional_tone: Tone::Neutral,
            plot_significance: "medium".to_string(),
            player_choice_potential: String::new(),
            original_text: String::new(),
        };

        let engine = NarrativeEngine::rules();
        let choices = engine.generate_choices(Some(&event), "Alice", &context()).await;
        assert_eq!(choices.len(), 3);
        assert_eq!(choices[0].title, "Engage in Conversation");
    }

    #[test]
    fn test_consequence_templates() {
        let event = Event {
            id: Event::format_id(1),
            chapter: 1,
            sequence: 0,
            event_type: EventType::Conflict,
            characters_involved: Vec::new(),
            location: "Unknown location".to_string(),
            description: String::new(),
            consequences: Vec::new(),
            emotional_tone: Tone::Neutral,
            plot_significance: "medium".to_string(),
            player_choice_potential: String::new(),
            original_text: String::new(),
        };

        assert!(consequence_text(Some(&event), "Alice", None).contains("confrontation"));
        assert!(consequence_text(None, "Alice", None).contains("final page"));
        assert!(
            consequence_text(Some(&event), "Alice", Some("scale the wall"))
                .contains("scale the wall")
        );
    }
}
