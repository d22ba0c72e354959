//! Host Interface
//!
//! Everything a game asks of the surrounding server: moving participants,
//! resetting them, talking to them. World and entity mechanics live on the
//! other side of this trait.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::ParticipantId;

/// A location in a host world.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct Position {
    /// East/west.
    pub x: f64,
    /// Height.
    pub y: f64,
    /// North/south.
    pub z: f64,
    /// Horizontal facing, degrees.
    #[serde(default)]
    pub yaw: f32,
    /// Vertical facing, degrees.
    #[serde(default)]
    pub pitch: f32,
}

impl Position {
    /// Position facing straight ahead.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    /// Same position with a facing.
    pub const fn facing(self, yaw: f32, pitch: f32) -> Self {
        Self { yaw, pitch, ..self }
    }
}

/// Operations the host performs on behalf of a game.
///
/// Calls are fire-and-forget: a host that cannot honor one logs it.
pub trait ParticipantHost: Send + Sync {
    /// Prepare a private world instance for `arena`.
    fn open_arena(&self, arena: &str);

    /// Release the world instance of `arena`.
    fn close_arena(&self, arena: &str);

    /// Move a participant into the arena world.
    fn teleport(&self, participant: ParticipantId, arena: &str, position: Position);

    /// Restore health and hunger.
    fn reset_state(&self, participant: ParticipantId);

    /// Switch a participant to an invisible observer.
    fn set_observer(&self, participant: ParticipantId);

    /// Put an item in a slot.
    fn give_item(&self, participant: ParticipantId, slot: u8, item: &str);

    /// Empty the inventory.
    fn clear_inventory(&self, participant: ParticipantId);

    /// Send a chat line.
    fn send_message(&self, participant: ParticipantId, message: &str);

    /// Send a participant back to the lobby world.
    fn return_to_lobby(&self, participant: ParticipantId);

    /// Name shown to other participants. Hosts without a name directory
    /// fall back to the full id, matching [`GameStatus`](super::GameStatus).
    fn display_name(&self, participant: ParticipantId) -> String {
        participant.to_uuid_string()
    }
}

/// Host that only logs what it was asked to do.
///
/// Used by the standalone server, where no world is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingHost;

impl ParticipantHost for TracingHost {
    fn open_arena(&self, arena: &str) {
        info!(arena, "World instance opened");
    }

    fn close_arena(&self, arena: &str) {
        info!(arena, "World instance closed");
    }

    fn teleport(&self, participant: ParticipantId, arena: &str, position: Position) {
        debug!(
            participant = %participant,
            arena,
            x = position.x,
            y = position.y,
            z = position.z,
            "Teleport"
        );
    }

    fn reset_state(&self, participant: ParticipantId) {
        debug!(participant = %participant, "Reset health and hunger");
    }

    fn set_observer(&self, participant: ParticipantId) {
        debug!(participant = %participant, "Now observing");
    }

    fn give_item(&self, participant: ParticipantId, slot: u8, item: &str) {
        debug!(participant = %participant, slot, item, "Give item");
    }

    fn clear_inventory(&self, participant: ParticipantId) {
        debug!(participant = %participant, "Clear inventory");
    }

    fn send_message(&self, participant: ParticipantId, message: &str) {
        info!(participant = %participant, "{}", message);
    }

    fn return_to_lobby(&self, participant: ParticipantId) {
        debug!(participant = %participant, "Back to lobby");
    }
}
