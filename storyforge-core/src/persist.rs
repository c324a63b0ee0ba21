//! Knowledge-base and world-state persistence.
//!
//! Everything lands as pretty-printed JSON in one directory. Writes go
//! through a temp-file-then-rename step so a crash mid-write never
//! leaves a truncated file behind.

use crate::knowledge::{Character, Event, KnowledgeBase, RelationshipGraph, UNKNOWN_LOCATION};
use crate::state::WorldState;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CHARACTERS_FILE: &str = "characters.json";
pub const EVENTS_FILE: &str = "events.json";
pub const RELATIONSHIPS_FILE: &str = "relationships.json";
pub const WORLD_STATE_FILE: &str = "world_state.json";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Write `contents` to `path` atomically: write a sibling `.tmp` file,
/// then rename it over the target.
async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), PersistError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, contents).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Save the extracted knowledge base into `dir` as three JSON files:
/// characters, events, and the relationship graph.
pub async fn save_knowledge_base(dir: &Path, kb: &KnowledgeBase) -> Result<(), PersistError> {
    tokio::fs::create_dir_all(dir).await?;

    // Characters are keyed by name on disk for stable diffs.
    let characters: BTreeMap<&str, &Character> = kb
        .characters
        .iter()
        .map(|c| (c.name.as_str(), c))
        .collect();

    write_atomic(
        &dir.join(CHARACTERS_FILE),
        serde_json::to_vec_pretty(&characters)?.as_slice(),
    )
    .await?;
    write_atomic(
        &dir.join(EVENTS_FILE),
        serde_json::to_vec_pretty(&kb.events)?.as_slice(),
    )
    .await?;
    write_atomic(
        &dir.join(RELATIONSHIPS_FILE),
        serde_json::to_vec_pretty(&kb.graph)?.as_slice(),
    )
    .await?;

    tracing::info!(dir = %dir.display(), "knowledge base saved");
    Ok(())
}

/// Load a knowledge base previously written by [`save_knowledge_base`].
///
/// Characters come back sorted by name; the extraction order is not
/// preserved on disk. Locations are rebuilt from the event records.
pub async fn load_knowledge_base(dir: &Path) -> Result<KnowledgeBase, PersistError> {
    let characters: BTreeMap<String, Character> =
        serde_json::from_slice(&tokio::fs::read(dir.join(CHARACTERS_FILE)).await?)?;
    let events: Vec<Event> =
        serde_json::from_slice(&tokio::fs::read(dir.join(EVENTS_FILE)).await?)?;
    let graph: RelationshipGraph =
        serde_json::from_slice(&tokio::fs::read(dir.join(RELATIONSHIPS_FILE)).await?)?;

    let mut locations: Vec<String> = Vec::new();
    for event in &events {
        if event.location != UNKNOWN_LOCATION && !locations.contains(&event.location) {
            locations.push(event.location.clone());
        }
    }

    Ok(KnowledgeBase {
        title: graph.title.clone(),
        characters: characters.into_values().collect(),
        events,
        locations,
        graph,
    })
}

/// Save the live world state into `dir`.
pub async fn save_world_state(dir: &Path, world: &WorldState) -> Result<(), PersistError> {
    tokio::fs::create_dir_all(dir).await?;
    write_atomic(
        &dir.join(WORLD_STATE_FILE),
        serde_json::to_vec_pretty(world)?.as_slice(),
    )
    .await?;
    tracing::debug!(dir = %dir.display(), "world state saved");
    Ok(())
}

/// Load a world state previously written by [`save_world_state`].
pub async fn load_world_state(dir: &Path) -> Result<WorldState, PersistError> {
    Ok(serde_json::from_slice(
        &tokio::fs::read(dir.join(WORLD_STATE_FILE)).await?,
    )?)
}
