//! Arena Phases
//!
//! The five lifecycle phases and the lock-free slot an arena keeps them in.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle phase of an arena.
///
/// Normal progression is Choosing → Waiting → InGame → Ending → Killing.
/// Waiting may skip straight to Killing when the match cannot start.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Phase {
    /// No template bound yet.
    Choosing = 0,
    /// Accepting participants until the waiting timer runs out.
    Waiting = 1,
    /// Match running.
    InGame = 2,
    /// Match decided, announcing the result.
    Ending = 3,
    /// Tearing down. Terminal.
    Killing = 4,
}

impl Phase {
    /// All phases in lifecycle order.
    pub const ALL: [Phase; 5] = [
        Phase::Choosing,
        Phase::Waiting,
        Phase::InGame,
        Phase::Ending,
        Phase::Killing,
    ];

    /// Human-facing name.
    pub fn display_name(self) -> &'static str {
        match self {
            Phase::Choosing => "Choosing",
            Phase::Waiting => "Waiting",
            Phase::InGame => "In Game",
            Phase::Ending => "Ending",
            Phase::Killing => "Killing",
        }
    }

    /// Killing is the only phase an arena never leaves.
    pub fn is_terminal(self) -> bool {
        self == Phase::Killing
    }

    /// Is `next` a legal step out of this phase?
    ///
    /// Every phase moves one step forward or straight to Killing. Killing
    /// goes nowhere.
    pub fn can_transition_to(self, next: Phase) -> bool {
        matches!(
            (self, next),
            (Phase::Choosing, Phase::Waiting)
                | (Phase::Waiting, Phase::InGame)
                | (Phase::InGame, Phase::Ending)
                | (Phase::Choosing | Phase::Waiting | Phase::InGame | Phase::Ending, Phase::Killing)
        )
    }

    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Phase::Choosing),
            1 => Some(Phase::Waiting),
            2 => Some(Phase::InGame),
            3 => Some(Phase::Ending),
            4 => Some(Phase::Killing),
            _ => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

const NO_PHASE: u8 = u8::MAX;

/// Atomic optional phase.
#[derive(Debug)]
pub struct PhaseCell(AtomicU8);

impl PhaseCell {
    /// Create a slot holding `phase`.
    pub fn new(phase: Option<Phase>) -> Self {
        Self(AtomicU8::new(encode(phase)))
    }

    /// Current value.
    pub fn get(&self) -> Option<Phase> {
        Phase::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Overwrite the value.
    pub fn set(&self, phase: Option<Phase>) {
        self.0.store(encode(phase), Ordering::Release);
    }

    /// Swap in `phase`, returning what was there.
    pub fn replace(&self, phase: Phase) -> Option<Phase> {
        Phase::from_u8(self.0.swap(phase as u8, Ordering::AcqRel))
    }

    /// Empty the slot, returning what was there.
    pub fn take(&self) -> Option<Phase> {
        Phase::from_u8(self.0.swap(NO_PHASE, Ordering::AcqRel))
    }
}

impl Default for PhaseCell {
    fn default() -> Self {
        Self::new(None)
    }
}

fn encode(phase: Option<Phase>) -> u8 {
    phase.map(|p| p as u8).unwrap_or(NO_PHASE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names() {
        assert_eq!(Phase::InGame.display_name(), "In Game");
        assert_eq!(Phase::Waiting.to_string(), "Waiting");
    }

    #[test]
    fn test_lifecycle_order() {
        for pair in Phase::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert!(Phase::Killing.is_terminal());
        assert!(!Phase::Ending.is_terminal());
    }

    #[test]
    fn test_legal_transitions() {
        let legal: Vec<(Phase, Phase)> = Phase::ALL
            .iter()
            .flat_map(|&from| Phase::ALL.iter().map(move |&to| (from, to)))
            .filter(|&(from, to)| from.can_transition_to(to))
            .collect();

        assert_eq!(
            legal,
            vec![
                (Phase::Choosing, Phase::Waiting),
                (Phase::Choosing, Phase::Killing),
                (Phase::Waiting, Phase::InGame),
                (Phase::Waiting, Phase::Killing),
                (Phase::InGame, Phase::Ending),
                (Phase::InGame, Phase::Killing),
                (Phase::Ending, Phase::Killing),
            ]
        );
    }

    #[test]
    fn test_cell_take_and_replace() {
        let cell = PhaseCell::default();
        assert_eq!(cell.get(), None);

        assert_eq!(cell.replace(Phase::Waiting), None);
        assert_eq!(cell.replace(Phase::Killing), Some(Phase::Waiting));
        assert_eq!(cell.take(), Some(Phase::Killing));
        assert_eq!(cell.take(), None);

        cell.set(Some(Phase::InGame));
        assert_eq!(cell.get(), Some(Phase::InGame));
    }
}
