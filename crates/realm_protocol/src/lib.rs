//! # Realm Protocol
//!
//! The packet set spoken between the realm client and the game server.
//!
//! Inbound and outbound tags live in separate spaces, so `0x03` is
//! [`ChatIncoming`] from the client and [`CharacterMoveOut`] from the server.
//! [`registry`] compiles every message into one [`SchemaRegistry`].

pub mod inbound;
pub mod outbound;
pub mod records;

pub use inbound::{
    CharacterMove, ChatIncoming, CreateCharacter, EnterGame, ItemMove, ItemUse, QuickBarAdd,
    SelectCharacter, TargetChange, TokenLogin,
};
pub use outbound::{
    CharacterDetails, CharacterMoveOut, Characters, ChatOutgoing, LoginFailed, Phase, QuickBarAdded,
    RemoveCharacter, SetItem, SpawnCharacter, TargetOut,
};
pub use records::{CharacterSlot, ItemBonus, QuickSlot};

use realm_codec::{SchemaBuildError, SchemaRegistry};
use tracing::info;

/// Builds the registry holding every realm message.
pub fn registry() -> Result<SchemaRegistry, SchemaBuildError> {
    let mut builder = SchemaRegistry::builder();

    builder.register::<TokenLogin>()?;
    builder.register::<CreateCharacter>()?;
    builder.register::<SelectCharacter>()?;
    builder.register::<EnterGame>()?;
    builder.register::<CharacterMove>()?;
    builder.register::<ChatIncoming>()?;
    builder.register::<QuickBarAdd>()?;
    builder.register::<TargetChange>()?;
    builder.register::<ItemMove>()?;
    builder.register::<ItemUse>()?;

    builder.register::<Phase>()?;
    builder.register::<LoginFailed>()?;
    builder.register::<Characters>()?;
    builder.register::<CharacterDetails>()?;
    builder.register::<SpawnCharacter>()?;
    builder.register::<RemoveCharacter>()?;
    builder.register::<CharacterMoveOut>()?;
    builder.register::<ChatOutgoing>()?;
    builder.register::<SetItem>()?;
    builder.register::<QuickBarAdded>()?;
    builder.register::<TargetOut>()?;

    let registry = builder.build();
    info!("📐 Registered {} realm message schemas", registry.len());
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use realm_codec::Direction;

    #[test]
    fn registry_builds_both_tag_spaces() {
        let registry = registry().unwrap();
        assert_eq!(registry.schemas(Direction::Inbound).count(), 10);
        assert_eq!(registry.schemas(Direction::Outbound).count(), 11);

        let chat = registry.lookup(0x03, Direction::Inbound).unwrap();
        assert!(chat.describes::<ChatIncoming>());
        let moved = registry.lookup(0x03, Direction::Outbound).unwrap();
        assert!(moved.describes::<CharacterMoveOut>());
    }

    #[test]
    fn fixed_sizes_include_tag_and_sequence() {
        let registry = registry().unwrap();
        let size = |tag, direction| registry.lookup(tag, direction).unwrap().fixed_size;

        assert_eq!(size(0x15, Direction::Outbound), 54);
        assert_eq!(size(0x6d, Direction::Inbound), 1 + 31 + 4 + 16);
        assert_eq!(size(0x07, Direction::Inbound), 1 + 1 + 3 + 12);
        assert_eq!(size(0x0a, Direction::Inbound), 1);
        assert_eq!(size(0x0b, Direction::Inbound), 1 + 1 + 2);
        assert_eq!(size(0x3d, Direction::Inbound), 1 + 1 + 4);
        assert_eq!(size(0xfd, Direction::Outbound), 2);
    }
}
