//! Messages sent by the client.

use crate::records::QuickSlot;
use realm_codec::{packet, FixedStr};

packet! {
    /// Login with a username and the key handed out by the auth server.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct TokenLogin(tag = 0x6d, direction = Inbound) {
        0 => pub username: FixedStr<31>,
        1 => pub key: u32,
        2 => pub xtea_keys: [u32; 4],
    }
}

packet! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct CreateCharacter(tag = 0x04, direction = Inbound) {
        0 => pub slot: u8,
        1 => pub name: FixedStr<25>,
        2 => pub class: u16,
        3 => pub appearance: u8,
        4 => pub unknown: [u8; 4],
    }
}

packet! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SelectCharacter(tag = 0x06, direction = Inbound) {
        0 => pub slot: u8,
    }
}

packet! {
    /// Sent once the client finished loading the map.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EnterGame(tag = 0x0a, direction = Inbound) {}
}

packet! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CharacterMove(tag = 0x07, direction = Inbound, sequenced = true) {
        0 => pub movement_type: u8,
        1 => pub argument: u8,
        2 => pub rotation: u8,
        3 => pub x: u32,
        4 => pub y: u32,
        5 => pub time: u32,
    }
}

packet! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ChatIncoming(tag = 0x03, direction = Inbound) {
        0 => pub message_type: u8,
        1 => pub message: FixedStr<64>,
    }
}

packet! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ItemUse(tag = 0x0b, direction = Inbound) {
        0 => pub window: u8,
        1 => pub position: u16,
    }
}

packet! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct QuickBarAdd(tag = 0x10, direction = Inbound) {
        0 => pub position: u8,
        1 => pub slot: QuickSlot,
    }
}

packet! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TargetChange(tag = 0x3d, direction = Inbound, sequenced = true) {
        0 => pub target_vid: u32,
    }
}

packet! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ItemMove(tag = 0x0d, direction = Inbound) {
        0 => pub from_window: u8,
        1 => pub from_position: u16,
        2 => pub to_window: u8,
        3 => pub to_position: u16,
        4 => pub count: u8,
    }
}
