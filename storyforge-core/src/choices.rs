//! Player choice generation.
//!
//! Choices come from one parameterized template table keyed by the
//! current event's type; past the end of the timeline a dynamic set is
//! offered instead. Every set has exactly three entries.

use crate::knowledge::{Event, EventType};
use serde::{Deserialize, Serialize};

/// Choices offered per turn.
pub const CHOICES_PER_TURN: usize = 3;

/// Aliases accept the capitalized spellings model output tends to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[serde(alias = "Low")]
    Low,
    #[serde(alias = "Medium")]
    Medium,
    #[serde(alias = "High")]
    High,
}

impl RiskLevel {
    pub fn name(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

/// One option presented to the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub title: String,
    pub action: String,
    pub risk_level: RiskLevel,
    pub outcome: String,
}

struct ChoiceTemplate {
    title: &'static str,
    /// `{name}` is replaced with the player character's name.
    action: &'static str,
    risk_level: RiskLevel,
    outcome: &'static str,
}

impl ChoiceTemplate {
    fn render(&self, name: &str) -> Choice {
        Choice {
            title: self.title.to_string(),
            action: self.action.replace("{name}", name),
            risk_level: self.risk_level,
            outcome: self.outcome.replace("{name}", name),
        }
    }
}

const DIALOGUE_CHOICES: [ChoiceTemplate; CHOICES_PER_TURN] = [
    ChoiceTemplate {
        title: "Engage in Conversation",
        action: "{name} speaks up and joins the conversation directly",
        risk_level: RiskLevel::Medium,
        outcome: "The discussion shifts toward {name}'s concerns",
    },
    ChoiceTemplate {
        title: "Listen Carefully",
        action: "{name} stays quiet and absorbs every word",
        risk_level: RiskLevel::Low,
        outcome: "{name} learns something the others did not intend to reveal",
    },
    ChoiceTemplate {
        title: "Challenge the Speaker",
        action: "{name} openly questions what is being said",
        risk_level: RiskLevel::High,
        outcome: "Tension rises and loyalties are tested",
    },
];

const CONFLICT_CHOICES: [ChoiceTemplate; CHOICES_PER_TURN] = [
    ChoiceTemplate {
        title: "Face the Challenge",
        action: "{name} confronts the threat head on",
        risk_level: RiskLevel::High,
        outcome: "The conflict comes to a decisive moment",
    },
    ChoiceTemplate {
        title: "Seek Peaceful Resolution",
        action: "{name} looks for common ground before things escalate",
        risk_level: RiskLevel::Medium,
        outcome: "A fragile truce becomes possible",
    },
    ChoiceTemplate {
        title: "Retreat and Regroup",
        action: "{name} withdraws to safety to plan a better approach",
        risk_level: RiskLevel::Low,
        outcome: "{name} survives to fight another day, at a cost",
    },
];

const GENERIC_CHOICES: [ChoiceTemplate; CHOICES_PER_TURN] = [
    ChoiceTemplate {
        title: "Take Initiative",
        action: "{name} acts first and sets the pace of events",
        risk_level: RiskLevel::Medium,
        outcome: "Events begin to bend around {name}'s decisions",
    },
    ChoiceTemplate {
        title: "Follow Others",
        action: "{name} lets someone else take the lead for now",
        risk_level: RiskLevel::Low,
        outcome: "{name} keeps options open while others commit",
    },
    ChoiceTemplate {
        title: "Explore Alternatives",
        action: "{name} searches for a path nobody has considered",
        risk_level: RiskLevel::Medium,
        outcome: "An unexpected opportunity comes into view",
    },
];

/// Offered once play has moved past the book's recorded timeline.
const DYNAMIC_CHOICES: [ChoiceTemplate; CHOICES_PER_TURN] = [
    ChoiceTemplate {
        title: "Forge a New Path",
        action: "{name} strikes out into territory the story never covered",
        risk_level: RiskLevel::High,
        outcome: "The story becomes entirely {name}'s own",
    },
    ChoiceTemplate {
        title: "Seek Resolution",
        action: "{name} works to bring the remaining threads to a close",
        risk_level: RiskLevel::Medium,
        outcome: "Old debts and promises come due",
    },
    ChoiceTemplate {
        title: "Explore Consequences",
        action: "{name} takes stock of everything the journey has changed",
        risk_level: RiskLevel::Low,
        outcome: "The weight of past choices becomes clear",
    },
];

/// Three choices for the given timeline position.
///
/// `event` is the event at the player's current index, or `None` when
/// play has run past the recorded timeline.
pub fn choices_for_event(event: Option<&Event>, character_name: &str) -> Vec<Choice> {
    let templates: &[ChoiceTemplate; CHOICES_PER_TURN] = match event {
        Some(event) => match event.event_type {
            EventType::Dialogue => &DIALOGUE_CHOICES,
            EventType::Conflict => &CONFLICT_CHOICES,
            _ => &GENERIC_CHOICES,
        },
        None => &DYNAMIC_CHOICES,
    };

    templates.iter().map(|t| t.render(character_name)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::Tone;

    fn event_of_type(event_type: EventType) -> Event {
        Event {
            id: Event::format_id(1),
            chapter: 1,
            sequence: 0,
            event_type,
            characters_involved: Vec::new(),
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
    fn test_always_three_choices() {
        for event_type in [
            EventType::Dialogue,
            EventType::Conflict,
            EventType::Action,
            EventType::Internal,
            EventType::Description,
        ] {
            let event = event_of_type(event_type);
            assert_eq!(choices_for_event(Some(&event), "Alice").len(), CHOICES_PER_TURN);
        }
        assert_eq!(choices_for_event(None, "Alice").len(), CHOICES_PER_TURN);
    }

    #[test]
    fn test_dialogue_set() {
        let event = event_of_type(EventType::Dialogue);
        let choices = choices_for_event(Some(&event), "Alice");
        assert_eq!(choices[0].title, "Engage in Conversation");
        assert_eq!(choices[1].risk_level, RiskLevel::Low);
        assert!(choices[0].action.contains("Alice"));
    }

    #[test]
    fn test_conflict_set() {
        let event = event_of_type(EventType::Conflict);
        let choices = choices_for_event(Some(&event), "Bob");
        assert_eq!(choices[0].title, "Face the Challenge");
        assert_eq!(choices[0].risk_level, RiskLevel::High);
    }

    #[test]
    fn test_non_dialogue_non_conflict_gets_generic_set() {
        for event_type in [EventType::Action, EventType::Internal, EventType::Description] {
            let event = event_of_type(event_type);
            let choices = choices_for_event(Some(&event), "Alice");
            assert_eq!(choices[0].title, "Take Initiative");
        }
    }

    #[test]
    fn test_past_timeline_gets_dynamic_set() {
        let choices = choices_for_event(None, "Alice");
        assert_eq!(choices[0].title, "Forge a New Path");
        assert!(choices.iter().all(|c| !c.action.contains("{name}")));
    }
}
