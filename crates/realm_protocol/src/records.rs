//! Records embedded in several packets.

use realm_codec::{record, FixedStr};

record! {
    /// One bonus line of an item.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct ItemBonus {
        0 => pub bonus_id: u8,
        1 => pub value: u16,
    }
}

record! {
    /// What a quick bar slot points at.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct QuickSlot {
        0 => pub kind: u8,
        1 => pub position: u8,
    }
}

record! {
    /// A character as shown on the selection screen.
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct CharacterSlot {
        0 => pub id: u32,
        1 => pub name: FixedStr<25>,
        2 => pub class: u8,
        3 => pub level: u8,
        4 => pub playtime: u32,
        5 => pub st: u8,
        6 => pub ht: u8,
        7 => pub dx: u8,
        8 => pub iq: u8,
        9 => pub body_part: u16,
        10 => pub name_change: u8,
        11 => pub hair_part: u16,
        12 => pub x: u32,
        13 => pub y: u32,
        14 => pub skill_group: u8,
    }
}
