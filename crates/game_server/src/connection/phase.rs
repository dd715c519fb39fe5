//! Connection phases and phase sets used for dispatch gating.

use std::fmt;
use std::ops::BitOr;

/// Where a connection is in its session lifecycle.
///
/// Handlers move connections forward; `Closing` is entered once teardown
/// starts and is never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Phase {
    /// Waiting for the client to present its login token
    Authenticating = 0,
    /// Account bound, character list sent
    LoggedIn = 1,
    /// A character has been chosen and is being loaded
    CharacterSelect = 2,
    /// The character's entity is live in the world
    InWorld = 3,
    Closing = 4,
}

impl Phase {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub const fn from_u8(value: u8) -> Option<Phase> {
        match value {
            0 => Some(Phase::Authenticating),
            1 => Some(Phase::LoggedIn),
            2 => Some(Phase::CharacterSelect),
            3 => Some(Phase::InWorld),
            4 => Some(Phase::Closing),
            _ => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Authenticating => "authenticating",
            Phase::LoggedIn => "logged-in",
            Phase::CharacterSelect => "character-select",
            Phase::InWorld => "in-world",
            Phase::Closing => "closing",
        };
        f.write_str(name)
    }
}

/// A set of phases a handler accepts messages in.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct PhaseSet(u8);

impl PhaseSet {
    pub const EMPTY: PhaseSet = PhaseSet(0);

    /// Every phase except `Closing`.
    pub const ACTIVE: PhaseSet = PhaseSet::of(&[
        Phase::Authenticating,
        Phase::LoggedIn,
        Phase::CharacterSelect,
        Phase::InWorld,
    ]);

    pub const fn of(phases: &[Phase]) -> PhaseSet {
        let mut bits = 0u8;
        let mut i = 0;
        while i < phases.len() {
            bits |= 1 << phases[i].as_u8();
            i += 1;
        }
        PhaseSet(bits)
    }

    pub const fn with(self, phase: Phase) -> PhaseSet {
        PhaseSet(self.0 | 1 << phase.as_u8())
    }

    pub const fn contains(self, phase: Phase) -> bool {
        self.0 & (1 << phase.as_u8()) != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl From<Phase> for PhaseSet {
    fn from(phase: Phase) -> Self {
        PhaseSet::EMPTY.with(phase)
    }
}

impl BitOr for Phase {
    type Output = PhaseSet;

    fn bitor(self, rhs: Phase) -> PhaseSet {
        PhaseSet::from(self).with(rhs)
    }
}

impl BitOr<Phase> for PhaseSet {
    type Output = PhaseSet;

    fn bitor(self, rhs: Phase) -> PhaseSet {
        self.with(rhs)
    }
}

impl fmt::Debug for PhaseSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phases = (0..=Phase::Closing.as_u8())
            .filter_map(Phase::from_u8)
            .filter(|phase| self.contains(*phase));
        f.debug_set().entries(phases).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_contains_members_only() {
        let set = Phase::LoggedIn | Phase::CharacterSelect;
        assert!(set.contains(Phase::LoggedIn));
        assert!(set.contains(Phase::CharacterSelect));
        assert!(!set.contains(Phase::InWorld));
        assert!(!set.contains(Phase::Closing));
    }

    #[test]
    fn active_excludes_closing() {
        assert!(PhaseSet::ACTIVE.contains(Phase::Authenticating));
        assert!(PhaseSet::ACTIVE.contains(Phase::InWorld));
        assert!(!PhaseSet::ACTIVE.contains(Phase::Closing));
    }

    #[test]
    fn phase_bytes_round_trip() {
        for byte in 0..=4 {
            assert_eq!(Phase::from_u8(byte).map(Phase::as_u8), Some(byte));
        }
        assert_eq!(Phase::from_u8(5), None);
    }
}
