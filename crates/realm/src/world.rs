//! The in-memory world advanced by the simulation loop.

use crate::accounts::CharacterRecord;
use async_trait::async_trait;
use game_server::{EntityId, World, WorldError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// A player character placed in the world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerEntity {
    pub vid: EntityId,
    pub character_id: u32,
    pub name: String,
    pub class: u16,
    pub empire: u8,
    pub x: u32,
    pub y: u32,
    pub rotation: u8,
    /// Milliseconds spent in the world
    pub online_ms: u64,
}

/// Holds every live entity behind one lock, so despawns and simulation steps
/// never interleave.
#[derive(Debug)]
pub struct InMemoryWorld {
    entities: RwLock<HashMap<EntityId, PlayerEntity>>,
    next_vid: AtomicU32,
    steps: AtomicU64,
}

impl Default for InMemoryWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryWorld {
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(HashMap::new()),
            next_vid: AtomicU32::new(0),
            steps: AtomicU64::new(0),
        }
    }

    /// Places `character` at its stored position and returns its vid.
    pub async fn spawn_player(&self, character: &CharacterRecord) -> PlayerEntity {
        let vid = EntityId(self.next_vid.fetch_add(1, Ordering::Relaxed) + 1);
        let entity = PlayerEntity {
            vid,
            character_id: character.id,
            name: character.name.clone(),
            class: character.class,
            empire: character.empire,
            x: character.x,
            y: character.y,
            rotation: 0,
            online_ms: 0,
        };
        self.entities.write().await.insert(vid, entity.clone());
        debug!("🧍 Spawned {} as entity {}", character.name, vid);
        entity
    }

    pub async fn move_player(&self, vid: EntityId, x: u32, y: u32, rotation: u8) -> Result<(), WorldError> {
        let mut entities = self.entities.write().await;
        let entity = entities.get_mut(&vid).ok_or(WorldError::EntityNotFound(vid))?;
        entity.x = x;
        entity.y = y;
        entity.rotation = rotation;
        Ok(())
    }

    pub async fn get(&self, vid: EntityId) -> Option<PlayerEntity> {
        self.entities.read().await.get(&vid).cloned()
    }

    pub async fn len(&self) -> usize {
        self.entities.read().await.len()
    }

    /// Number of simulation steps run so far.
    pub fn steps(&self) -> u64 {
        self.steps.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl World for InMemoryWorld {
    async fn despawn_entity(&self, entity: EntityId) -> Result<(), WorldError> {
        match self.entities.write().await.remove(&entity) {
            Some(player) => {
                debug!("Despawned {} (entity {})", player.name, entity);
                Ok(())
            }
            None => Err(WorldError::EntityNotFound(entity)),
        }
    }

    async fn update_step(&self, step: Duration) {
        let step_ms = step.as_millis() as u64;
        for entity in self.entities.write().await.values_mut() {
            entity.online_ms += step_ms;
        }
        self.steps.fetch_add(1, Ordering::Relaxed);
    }
}
