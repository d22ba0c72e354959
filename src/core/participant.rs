//! Participant Identity
//!
//! Participants are identified by a 16-byte id, either random or derived from
//! the username the host knows them by.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

// =============================================================================
// PARTICIPANT ID
// =============================================================================

/// Unique participant identifier (16 bytes, UUID-compatible).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub struct ParticipantId(pub [u8; 16]);

impl ParticipantId {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Random v4 id.
    pub fn random() -> Self {
        Self(*uuid::Uuid::new_v4().as_bytes())
    }

    /// Stable id for a host username.
    ///
    /// The same name always maps to the same id, so a participant who
    /// reconnects is recognized by every arena.
    pub fn from_name(name: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"minigame-arena-participant:");
        hasher.update(name.as_bytes());
        let hash = hasher.finalize();

        let mut id = [0u8; 16];
        id.copy_from_slice(&hash[..16]);
        Self(id)
    }

    /// Create from UUID string.
    pub fn from_uuid_str(s: &str) -> Option<Self> {
        uuid::Uuid::parse_str(s).ok().map(|u| Self(*u.as_bytes()))
    }

    /// Convert to UUID string.
    pub fn to_uuid_string(&self) -> String {
        uuid::Uuid::from_bytes(self.0).to_string()
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// First four bytes as hex, for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short())
    }
}

// =============================================================================
// PARTICIPANT STATUS
// =============================================================================

/// Whether a participant is still in the match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ParticipantStatus {
    /// Still playing.
    Active = 0,
    /// Out of the match; stays in the arena as an observer.
    Eliminated = 1,
}

/// Status slot that only ever moves from Active to Eliminated.
#[derive(Debug)]
pub struct StatusCell(AtomicU8);

impl StatusCell {
    /// New slot in the Active state.
    pub fn new() -> Self {
        Self(AtomicU8::new(ParticipantStatus::Active as u8))
    }

    /// Current status.
    pub fn get(&self) -> ParticipantStatus {
        match self.0.load(Ordering::Acquire) {
            0 => ParticipantStatus::Active,
            _ => ParticipantStatus::Eliminated,
        }
    }

    /// Is the participant still playing?
    pub fn is_active(&self) -> bool {
        self.get() == ParticipantStatus::Active
    }

    /// Mark eliminated. Returns true only for the call that made the change.
    pub fn eliminate(&self) -> bool {
        self.0
            .compare_exchange(
                ParticipantStatus::Active as u8,
                ParticipantStatus::Eliminated as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}

impl Default for StatusCell {
    fn default() -> Self {
        Self::new()
    }
}
