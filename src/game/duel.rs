//! Duel (Last One Standing)
//!
//! Participants spawn around the arena with a kit; eliminated participants
//! become observers. The first poll that sees at most one participant still
//! playing decides the match: one survivor wins, zero survivors means a draw.
//! That decision is final. Eliminations arriving afterwards change nothing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, error, info};

use super::host::{ParticipantHost, Position};
use super::roster::Roster;
use super::{ArenaView, EliminationOutcome, Game, GameStatus, JoinRejection, JoinResponse};
use crate::arena::Phase;
use crate::core::{ParticipantId, ParticipantStatus};
use crate::template::{Template, TemplateError};

// =============================================================================
// SETTINGS
// =============================================================================

/// Duel template settings.
///
/// Capacity is the number of spawn points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DuelSettings {
    /// Template id.
    pub id: String,
    /// Name shown in menus.
    pub display_name: String,
    /// Participants needed for the match to start.
    pub min_players: usize,
    /// Waiting phase length.
    pub waiting_seconds: u64,
    /// Ending phase length.
    pub ending_seconds: u64,
    /// Where joining participants are placed.
    pub join_position: Position,
    /// Spawn points, assigned round-robin in join order.
    pub spawns: Vec<Position>,
    /// Items given at match start, by slot.
    pub kit: BTreeMap<u8, String>,
    /// Announcement when someone wins. `{winner}` is replaced.
    pub winner_message: String,
    /// Announcement when nobody survives.
    pub no_winner_message: String,
    /// Sent when Waiting ends without enough participants.
    pub not_enough_players_message: String,
}

impl Default for DuelSettings {
    fn default() -> Self {
        Self {
            id: "duel".to_string(),
            display_name: "Duel".to_string(),
            min_players: 2,
            waiting_seconds: 30,
            ending_seconds: 5,
            join_position: Position::new(0.5, 65.0, 0.5),
            spawns: vec![
                Position::new(10.5, 65.0, 0.5).facing(90.0, 0.0),
                Position::new(-9.5, 65.0, 0.5).facing(-90.0, 0.0),
            ],
            kit: BTreeMap::from([
                (0, "stone_sword".to_string()),
                (1, "bow".to_string()),
                (2, "arrow".to_string()),
            ]),
            winner_message: "{winner} won the duel!".to_string(),
            no_winner_message: "Nobody survived the duel.".to_string(),
            not_enough_players_message: "Not enough players joined, the duel is cancelled."
                .to_string(),
        }
    }
}

impl DuelSettings {
    /// Total seats.
    pub fn capacity(&self) -> usize {
        self.spawns.len()
    }

    /// Waiting phase length.
    pub fn waiting_duration(&self) -> Duration {
        Duration::from_secs(self.waiting_seconds)
    }

    /// Ending phase length.
    pub fn ending_duration(&self) -> Duration {
        Duration::from_secs(self.ending_seconds)
    }

    /// Reject settings no match could run with.
    pub fn validate(&self) -> Result<(), TemplateError> {
        let invalid = |reason: &str| TemplateError::Invalid {
            id: self.id.clone(),
            reason: reason.to_string(),
        };

        if self.id.trim().is_empty() {
            return Err(invalid("empty template id"));
        }
        if self.spawns.is_empty() {
            return Err(invalid("no spawn points"));
        }
        if self.min_players == 0 {
            return Err(invalid("min_players must be at least 1"));
        }
        if self.min_players > self.capacity() {
            return Err(invalid("min_players exceeds the number of spawn points"));
        }
        Ok(())
    }
}

// =============================================================================
// TEMPLATE
// =============================================================================

/// Creates a [`DuelGame`] per arena.
pub struct DuelTemplate {
    settings: Arc<DuelSettings>,
    host: Arc<dyn ParticipantHost>,
}

impl DuelTemplate {
    /// Validate `settings` and build the template.
    pub fn new(
        settings: DuelSettings,
        host: Arc<dyn ParticipantHost>,
    ) -> Result<Self, TemplateError> {
        settings.validate()?;
        Ok(Self {
            settings: Arc::new(settings),
            host,
        })
    }

    /// Template settings.
    pub fn settings(&self) -> &DuelSettings {
        &self.settings
    }
}

impl Template for DuelTemplate {
    fn id(&self) -> &str {
        &self.settings.id
    }

    fn display_name(&self) -> &str {
        &self.settings.display_name
    }

    fn capacity(&self) -> usize {
        self.settings.capacity()
    }

    fn create_game(&self, arena: ArenaView) -> Result<Arc<dyn Game>, TemplateError> {
        Ok(Arc::new(DuelGame::new(
            self.settings.clone(),
            self.host.clone(),
            arena,
        )))
    }
}

// =============================================================================
// GAME
// =============================================================================

/// One duel match.
pub struct DuelGame {
    settings: Arc<DuelSettings>,
    host: Arc<dyn ParticipantHost>,
    arena: ArenaView,
    roster: Roster,
    /// Eliminations hold it shared; the finish decision holds it exclusively.
    outcome_gate: RwLock<()>,
    finished: AtomicBool,
    winner: OnceLock<ParticipantId>,
    survivors_at_finish: OnceLock<usize>,
    cleared: AtomicBool,
}

impl DuelGame {
    /// New match bound to `arena`. Opens the arena's world instance.
    pub fn new(
        settings: Arc<DuelSettings>,
        host: Arc<dyn ParticipantHost>,
        arena: ArenaView,
    ) -> Self {
        host.open_arena(arena.name());
        Self {
            roster: Roster::new(settings.capacity()),
            settings,
            host,
            arena,
            outcome_gate: RwLock::new(()),
            finished: AtomicBool::new(false),
            winner: OnceLock::new(),
            survivors_at_finish: OnceLock::new(),
            cleared: AtomicBool::new(false),
        }
    }

    /// Template settings.
    pub fn settings(&self) -> &DuelSettings {
        &self.settings
    }

    /// Has the match been decided?
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// The winner, once decided. `None` after a draw.
    pub fn winner(&self) -> Option<ParticipantId> {
        self.winner.get().copied()
    }

    /// Participants still playing when the match was decided.
    pub fn survivors_at_finish(&self) -> Option<usize> {
        self.survivors_at_finish.get().copied()
    }

    /// Has `clear` run?
    pub fn is_cleared(&self) -> bool {
        self.cleared.load(Ordering::Acquire)
    }

    /// Participants still playing, in join order.
    pub fn alive(&self) -> Vec<ParticipantId> {
        self.roster.alive()
    }

    /// Status of a seated participant.
    pub fn status_of(&self, participant: ParticipantId) -> Option<ParticipantStatus> {
        self.roster.status(participant)
    }

    /// Spawn point of the participant who joined `index`-th.
    pub fn spawn_for(&self, index: usize) -> Option<Position> {
        let spawns = &self.settings.spawns;
        if spawns.is_empty() {
            return None;
        }
        spawns.get(index % spawns.len()).copied()
    }

    /// Should the host let this participant take damage?
    pub fn accepts_damage(&self, participant: ParticipantId) -> bool {
        !self.is_finished()
            && self.arena.phase() == Phase::InGame
            && self.roster.status(participant) == Some(ParticipantStatus::Active)
    }

    /// A participant fell out of the world.
    ///
    /// They are put back at the join position; during the match this also
    /// eliminates them. `None` if they are not in this arena.
    pub fn on_out_of_bounds(&self, participant: ParticipantId) -> Option<EliminationOutcome> {
        if !self.roster.contains(participant) {
            return None;
        }
        self.host
            .teleport(participant, self.arena.name(), self.settings.join_position);

        match self.arena.phase() {
            Phase::InGame => Some(self.eliminate(participant)),
            _ => Some(EliminationOutcome::NotInGame),
        }
    }

    /// Decide the match if at most one participant is still playing.
    fn check_winner(&self) {
        if self.is_finished() {
            return;
        }

        let _gate = self
            .outcome_gate
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let alive = self.roster.alive();
        if alive.len() > 1 {
            return;
        }
        if self
            .finished
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        if let [sole] = alive.as_slice() {
            let recorded = self.winner.set(*sole).is_ok();
            debug_assert!(recorded, "duel winner recorded twice");
            if !recorded {
                error!(arena = %self.arena.name(), "Winner already recorded");
            }
        }
        let _ = self.survivors_at_finish.set(alive.len());

        info!(
            arena = %self.arena.name(),
            survivors = alive.len(),
            winner = ?self.winner().map(|w| w.to_string()),
            "Duel decided"
        );
    }

    fn announce(&self, message: &str) {
        for participant in self.roster.in_join_order() {
            self.host.send_message(participant, message);
        }
    }
}

impl Game for DuelGame {
    fn template_id(&self) -> &str {
        &self.settings.id
    }

    fn join(&self, participant: ParticipantId) -> JoinResponse {
        if self.arena.phase() != Phase::Waiting {
            return JoinResponse::Rejected(JoinRejection::WrongPhase);
        }

        let response = JoinResponse::from(self.roster.admit(participant));
        match response {
            JoinResponse::Accepted => {
                self.host
                    .teleport(participant, self.arena.name(), self.settings.join_position);
                self.host.reset_state(participant);
                debug!(
                    arena = %self.arena.name(),
                    participant = %participant,
                    seats = self.roster.len(),
                    capacity = self.roster.capacity(),
                    "Participant joined"
                );
            }
            JoinResponse::Rejected(reason) => {
                debug!(
                    arena = %self.arena.name(),
                    participant = %participant,
                    %reason,
                    "Join rejected"
                );
            }
        }
        response
    }

    fn leave(&self, participant: ParticipantId) -> bool {
        if !self.roster.contains(participant) {
            return false;
        }

        // Mid-match the seat stays so the departure counts as a defeat.
        if self.arena.phase() == Phase::InGame {
            self.eliminate(participant);
        } else {
            self.roster.remove(participant);
        }

        self.host.clear_inventory(participant);
        self.host.return_to_lobby(participant);
        info!(arena = %self.arena.name(), participant = %participant, "Participant left");
        true
    }

    fn eliminate(&self, participant: ParticipantId) -> EliminationOutcome {
        if self.arena.phase() != Phase::InGame {
            return EliminationOutcome::NotInGame;
        }

        let outcome = {
            let _gate = self
                .outcome_gate
                .read()
                .unwrap_or_else(PoisonError::into_inner);

            if self.is_finished() {
                debug!(
                    arena = %self.arena.name(),
                    participant = %participant,
                    "Elimination after the duel was decided"
                );
                return EliminationOutcome::MatchFinished;
            }

            match self.roster.eliminate(participant) {
                None => EliminationOutcome::NotParticipant,
                Some(false) => EliminationOutcome::AlreadyEliminated,
                Some(true) => EliminationOutcome::Eliminated,
            }
        };

        // Host calls run outside the gate; a host may report further
        // eliminations from inside them.
        if outcome == EliminationOutcome::Eliminated {
            self.host.reset_state(participant);
            self.host.clear_inventory(participant);
            self.host.set_observer(participant);
            info!(
                arena = %self.arena.name(),
                participant = %participant,
                "Participant eliminated"
            );
        }
        outcome
    }

    fn participants(&self) -> Vec<ParticipantId> {
        self.roster.in_join_order()
    }

    fn waiting_duration(&self) -> Duration {
        self.settings.waiting_duration()
    }

    fn ending_duration(&self) -> Duration {
        self.settings.ending_duration()
    }

    fn on_waiting_start(&self) {
        info!(
            arena = %self.arena.name(),
            capacity = self.roster.capacity(),
            waiting_secs = self.settings.waiting_seconds,
            "Waiting for participants"
        );
    }

    fn can_start(&self) -> bool {
        self.roster.len() >= self.settings.min_players
    }

    fn on_waiting_end(&self) {
        self.roster.seal();
    }

    fn on_failed_waiting_end(&self) {
        self.roster.seal();
        self.announce(&self.settings.not_enough_players_message);
        info!(
            arena = %self.arena.name(),
            seats = self.roster.len(),
            needed = self.settings.min_players,
            "Not enough participants"
        );
    }

    fn on_in_game_start(&self) {
        let participants = self.roster.in_join_order();
        for (index, participant) in participants.iter().enumerate() {
            for (slot, item) in &self.settings.kit {
                self.host.give_item(*participant, *slot, item);
            }
            if let Some(spawn) = self.spawn_for(index) {
                self.host.teleport(*participant, self.arena.name(), spawn);
            }
        }
        info!(
            arena = %self.arena.name(),
            participants = participants.len(),
            "Duel started"
        );
    }

    fn is_in_game_over(&self) -> bool {
        self.check_winner();
        self.survivors_at_finish.get().is_some()
    }

    fn on_ending_start(&self) {
        let message = match self.winner() {
            Some(winner) => self
                .settings
                .winner_message
                .replace("{winner}", &self.host.display_name(winner)),
            None => self.settings.no_winner_message.clone(),
        };

        for participant in self.roster.in_join_order() {
            self.host.clear_inventory(participant);
            self.host.send_message(participant, &message);
        }
    }

    fn clear(&self) {
        if self.cleared.swap(true, Ordering::AcqRel) {
            return;
        }

        let participants = self.roster.in_join_order();
        for participant in &participants {
            self.host.clear_inventory(*participant);
            self.host.return_to_lobby(*participant);
        }
        self.roster.seal();
        self.roster.clear();
        self.host.close_arena(self.arena.name());

        info!(
            arena = %self.arena.name(),
            returned = participants.len(),
            "Duel cleared"
        );
    }

    fn status(&self) -> GameStatus {
        GameStatus {
            arena: self.arena.name().to_string(),
            template: self.settings.id.clone(),
            phase: self.arena.phase().display_name().to_string(),
            players: self.roster.len(),
            max_players: self.roster.capacity(),
            alive: self.roster.alive().len(),
            owner: self.arena.owner().map(|o| o.to_uuid_string()),
            time_left_ms: u64::try_from(self.arena.timer().remaining().as_millis())
                .unwrap_or(u64::MAX),
            winner: self.winner().map(|w| w.to_uuid_string()),
        }
    }
}
