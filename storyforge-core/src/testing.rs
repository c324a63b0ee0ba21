//! Shared fixtures for unit and integration tests.

use crate::narrative::NarrativeEngine;
use crate::session::{GameSession, GameSettings};

/// A small book the extraction pipeline handles predictably: a title,
/// two chapters, and two characters with enough mentions to qualify.
pub fn sample_book() -> String {
    "The Crystal Road\n\
     \n\
     Chapter 1\n\
     \n\
     Alice said the journey to the mountains would begin at dawn, and the \
     hero set out on the quest with hope in her heart.\n\
     \n\
     Bob said he would follow Alice anywhere, for they were friends and \
     companions on this quest together.\n\
     \n\
     Alice asked the old woman about the road ahead, and the answer she \
     received was not a kind one.\n\
     \n\
     Chapter 2\n\
     \n\
     Bob said the battle at the river could not be avoided, for the enemy \
     waited for them in the dark.\n\
     \n\
     Alice felt the fear rising inside her but remembered why the quest \
     mattered so much to everyone at home.\n\
     \n\
     Bob thought about home while they walked in Hollow and the night \
     closed in around them.\n"
        .to_string()
}

/// A session with the sample book loaded, knowledge extracted, and
/// setup complete for the named character. Uses rule-based narration so
/// tests never touch the network.
pub async fn session_at_setup(character: &str) -> GameSession {
    let mut session = GameSession::with_engine(NarrativeEngine::rules());
    session
        .load_book(&sample_book())
        .await
        .expect("sample book should load");
    session
        .setup_game(GameSettings::new(character))
        .expect("sample character should exist");
    session
}

/// A session already in play for the named character.
pub async fn playing_session(character: &str) -> GameSession {
    let mut session = session_at_setup(character).await;
    session.start_game().await.expect("game should start");
    session
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::GameState;

    #[tokio::test]
    async fn test_sample_book_yields_both_characters() {
        let mut session = GameSession::with_engine(NarrativeEngine::rules());
        let overview = session.load_book(&sample_book()).await.unwrap();

        assert_eq!(overview.title, "The Crystal Road");
        assert_eq!(
            overview.character_names,
            vec!["Alice".to_string(), "Bob".to_string()]
        );
        assert!(overview.events > 0);
    }

    #[tokio::test]
    async fn test_playing_session_is_playing() {
        let session = playing_session("Alice").await;
        assert_eq!(session.state(), GameState::Playing);
    }
}
