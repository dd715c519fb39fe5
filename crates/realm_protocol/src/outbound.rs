//! Messages sent by the server.

use crate::records::{CharacterSlot, ItemBonus, QuickSlot};
use realm_codec::{packet, FixedStr};

packet! {
    /// Tells the client which phase its connection is in now.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Phase(tag = 0xfd, direction = Outbound) {
        0 => pub phase: u8,
    }
}

packet! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct LoginFailed(tag = 0x07, direction = Outbound) {
        0 => pub status: FixedStr<9>,
    }
}

packet! {
    /// The character selection screen: four slots with their guilds.
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct Characters(tag = 0x20, direction = Outbound) {
        0 => pub characters: [CharacterSlot; 4],
        1 => pub guild_ids: [u32; 4],
        2 => pub guild_names: [FixedStr<13>; 4],
    }
}

packet! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct CharacterDetails(tag = 0x71, direction = Outbound) {
        0 => pub vid: u32,
        1 => pub class: u16,
        2 => pub name: FixedStr<25>,
        3 => pub x: u32,
        4 => pub y: u32,
        5 => pub z: u32,
        6 => pub empire: u8,
        7 => pub skill_group: u8,
    }
}

packet! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SpawnCharacter(tag = 0x01, direction = Outbound) {
        0 => pub vid: u32,
        1 => pub angle: u32,
        2 => pub x: u32,
        3 => pub y: u32,
        4 => pub z: u32,
        5 => pub character_type: u8,
        6 => pub class: u16,
        7 => pub move_speed: u8,
        8 => pub attack_speed: u8,
        9 => pub state: u8,
        10 => pub affects: [u32; 2],
    }
}

packet! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RemoveCharacter(tag = 0x02, direction = Outbound) {
        0 => pub vid: u32,
    }
}

packet! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CharacterMoveOut(tag = 0x03, direction = Outbound) {
        0 => pub movement_type: u8,
        1 => pub argument: u8,
        2 => pub rotation: u8,
        3 => pub vid: u32,
        4 => pub x: u32,
        5 => pub y: u32,
        6 => pub time: u32,
        7 => pub duration: u32,
    }
}

packet! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ChatOutgoing(tag = 0x04, direction = Outbound) {
        0 => pub message_type: u8,
        1 => pub vid: u32,
        2 => pub empire: u8,
        3 => pub message: FixedStr<64>,
    }
}

packet! {
    /// Places an item into an inventory window slot.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct SetItem(tag = 0x15, direction = Outbound) {
        0 => pub window: u8,
        1 => pub position: u16,
        2 => pub item_id: u32,
        3 => pub count: u8,
        4 => pub flags: u32,
        5 => pub anti_flags: u32,
        6 => pub highlight: u32,
        7 => pub sockets: [u32; 3],
        8 => pub bonuses: [ItemBonus; 7],
    }
}

packet! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct QuickBarAdded(tag = 0x1c, direction = Outbound) {
        0 => pub position: u8,
        1 => pub slot: QuickSlot,
    }
}

packet! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TargetOut(tag = 0x3f, direction = Outbound) {
        0 => pub target_vid: u32,
        1 => pub percentage: u8,
    }
}
