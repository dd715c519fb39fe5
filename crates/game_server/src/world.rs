//! The world collaborator seen from the network core.
//!
//! The core never simulates anything itself. It only needs to remove a
//! connection's entity when the connection goes away and to advance the world
//! once per fixed step.

use crate::error::WorldError;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// Handle to an entity owned by the world. Connections hold it without owning
/// the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Implemented by the game's world.
///
/// Implementations serialize access to their entity collection so a despawn
/// issued during connection teardown never overlaps a simulation step.
#[async_trait]
pub trait World: Send + Sync {
    /// Removes an entity. Awaited before the owning connection is dropped.
    async fn despawn_entity(&self, entity: EntityId) -> Result<(), WorldError>;

    /// Advances the world by exactly `step`.
    async fn update_step(&self, step: Duration);
}
