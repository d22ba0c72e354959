//! Lifecycle Driver
//!
//! Entry, poll and exit behavior of each phase. The arena's tick calls
//! exactly one of: `exit` + `enter` (a transition was pending) or `poll`.
//! Transitions requested from inside these hooks land in the pending slot
//! and are applied on the next tick.

use std::sync::Arc;
use tracing::error;

use super::{Arena, Phase};
use crate::game::Game;

/// The bound game, or `None` after scheduling Killing.
///
/// Outside Choosing and Killing a missing game means the arena was set up
/// wrong; it is logged and torn down.
fn game_or_kill(arena: &Arena, phase: Phase) -> Option<Arc<dyn Game>> {
    match arena.game() {
        Ok(game) => Some(game),
        Err(err) => {
            error!(
                arena = %arena.name(),
                phase = %phase,
                error = %err,
                "No game bound, killing arena"
            );
            arena.schedule(Phase::Killing);
            None
        }
    }
}

/// Run `phase`'s entry hook.
pub(crate) fn enter(arena: &Arena, phase: Phase) {
    match phase {
        Phase::Choosing => {}
        Phase::Waiting => {
            if let Some(game) = game_or_kill(arena, phase) {
                if arena.start_timer(game.waiting_duration()) {
                    game.on_waiting_start();
                }
            }
        }
        Phase::InGame => {
            if let Some(game) = game_or_kill(arena, phase) {
                game.on_in_game_start();
            }
        }
        Phase::Ending => {
            if let Some(game) = game_or_kill(arena, phase) {
                if arena.start_timer(game.ending_duration()) {
                    game.on_ending_start();
                }
            }
        }
        Phase::Killing => {
            if let Ok(game) = arena.game() {
                game.clear();
            }
            arena.mark_for_removal();
        }
    }
}

/// Run `phase`'s per-tick check.
pub(crate) fn poll(arena: &Arena, phase: Phase) {
    match phase {
        Phase::Choosing | Phase::Killing => {}
        Phase::Waiting => {
            if !arena.timer_expired() {
                return;
            }
            if let Some(game) = game_or_kill(arena, phase) {
                if game.can_start() {
                    arena.schedule(Phase::InGame);
                } else {
                    arena.schedule(Phase::Killing);
                }
            }
        }
        Phase::InGame => {
            if let Some(game) = game_or_kill(arena, phase) {
                if game.is_in_game_over() {
                    arena.schedule(Phase::Ending);
                }
            }
        }
        Phase::Ending => {
            if arena.timer_expired() {
                arena.schedule(Phase::Killing);
            }
        }
    }
}

/// Run `phase`'s exit hook. `next` is the phase being entered.
pub(crate) fn exit(arena: &Arena, phase: Phase, next: Phase) {
    if phase != Phase::Waiting {
        return;
    }
    if let Ok(game) = arena.game() {
        if next == Phase::InGame {
            game.on_waiting_end();
        } else {
            game.on_failed_waiting_end();
        }
    }
}
