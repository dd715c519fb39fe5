//! Account and character storage.
//!
//! The realm server only needs to resolve a login key to an account and to
//! list or create that account's characters. [`InMemoryAccounts`] keeps all of
//! it in memory, seeded from the configuration file.

use crate::config::AccountSettings;
use async_trait::async_trait;
use dashmap::DashMap;
use game_server::AccountId;
use realm_protocol::CharacterSlot;
use std::sync::atomic::{AtomicU32, Ordering};
use thiserror::Error;
use tracing::info;

/// Character slots per account.
pub const SLOTS: usize = 4;

/// Spawn position of new characters.
const START_POSITION: (u32, u32) = (958_870, 272_788);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    #[error("Slot {0} does not exist")]
    InvalidSlot(u8),

    #[error("Slot {0} is already taken")]
    SlotTaken(u8),

    #[error("Character name must not be empty")]
    EmptyName,
}

/// A stored character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterRecord {
    pub id: u32,
    pub name: String,
    pub class: u16,
    pub level: u8,
    pub playtime: u32,
    pub empire: u8,
    pub skill_group: u8,
    pub x: u32,
    pub y: u32,
}

impl CharacterRecord {
    /// How the character is shown on the selection screen.
    pub fn to_slot(&self) -> CharacterSlot {
        CharacterSlot {
            id: self.id,
            name: self.name.as_str().into(),
            class: self.class as u8,
            level: self.level,
            playtime: self.playtime,
            st: 6,
            ht: 4,
            dx: 3,
            iq: 3,
            body_part: 0,
            name_change: 0,
            hair_part: 0,
            x: self.x,
            y: self.y,
            skill_group: self.skill_group,
        }
    }
}

/// Backing store for accounts and characters.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Resolves a login to an account, `None` when the key is wrong.
    async fn authenticate(&self, username: &str, key: u32) -> Option<AccountId>;

    /// The account's character slots, in slot order.
    async fn characters(&self, account: AccountId) -> Vec<Option<CharacterRecord>>;

    async fn create_character(
        &self,
        account: AccountId,
        slot: u8,
        name: &str,
        class: u16,
    ) -> Result<CharacterRecord, AccountError>;
}

struct Account {
    id: AccountId,
    key: u32,
}

/// Account store kept entirely in memory.
#[derive(Default)]
pub struct InMemoryAccounts {
    accounts: DashMap<String, Account>,
    characters: DashMap<AccountId, Vec<Option<CharacterRecord>>>,
    next_character_id: AtomicU32,
}

impl InMemoryAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: &[AccountSettings]) -> Self {
        let store = Self::new();
        for account in settings {
            store.add_account(&account.username, account.key);
        }
        info!("👤 Loaded {} accounts", store.accounts.len());
        store
    }

    pub fn add_account(&self, username: &str, key: u32) -> AccountId {
        let id = AccountId::new();
        self.accounts.insert(username.to_string(), Account { id, key });
        self.characters.insert(id, vec![None; SLOTS]);
        id
    }
}

#[async_trait]
impl AccountStore for InMemoryAccounts {
    async fn authenticate(&self, username: &str, key: u32) -> Option<AccountId> {
        self.accounts
            .get(username)
            .filter(|account| account.key == key)
            .map(|account| account.id)
    }

    async fn characters(&self, account: AccountId) -> Vec<Option<CharacterRecord>> {
        self.characters
            .get(&account)
            .map(|slots| slots.clone())
            .unwrap_or_else(|| vec![None; SLOTS])
    }

    async fn create_character(
        &self,
        account: AccountId,
        slot: u8,
        name: &str,
        class: u16,
    ) -> Result<CharacterRecord, AccountError> {
        if name.is_empty() {
            return Err(AccountError::EmptyName);
        }
        let index = slot as usize;
        if index >= SLOTS {
            return Err(AccountError::InvalidSlot(slot));
        }

        let mut slots = self.characters.entry(account).or_insert_with(|| vec![None; SLOTS]);
        if slots[index].is_some() {
            return Err(AccountError::SlotTaken(slot));
        }

        let record = CharacterRecord {
            id: self.next_character_id.fetch_add(1, Ordering::Relaxed) + 1,
            name: name.to_string(),
            class,
            level: 1,
            playtime: 0,
            empire: 1,
            skill_group: 0,
            x: START_POSITION.0,
            y: START_POSITION.1,
        };
        slots[index] = Some(record.clone());
        Ok(record)
    }
}
