//! Game Contract
//!
//! A [`Game`] is the match logic a template installs into one arena. The
//! lifecycle driver calls its hooks from the arena's tick; host events
//! (joins, kills, disconnects) may call into it from any thread, so every
//! hook takes `&self` and games keep their state in atomics and concurrent
//! maps.
//!
//! ## Hook order
//!
//! ```text
//! Waiting  enter: on_waiting_start        poll: can_start (on timer expiry)
//!          exit:  on_waiting_end          (next phase is InGame)
//!                 on_failed_waiting_end   (anything else)
//! InGame   enter: on_in_game_start        poll: is_in_game_over
//! Ending   enter: on_ending_start
//! Killing  enter: clear
//! ```

pub mod duel;
pub mod host;
pub mod roster;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::arena::{Phase, PhaseCell};
use crate::core::ParticipantId;
use crate::feature::{OwnerFeature, TimerFeature};

pub use duel::{DuelGame, DuelSettings, DuelTemplate};
pub use host::{ParticipantHost, Position, TracingHost};
pub use roster::{Admission, Roster};

// =============================================================================
// JOIN / ELIMINATION RESULTS
// =============================================================================

/// Why a join was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum JoinRejection {
    /// Every seat is taken.
    #[error("the arena is full")]
    ArenaFull,
    /// The arena is not accepting participants.
    #[error("the arena is not waiting for players")]
    WrongPhase,
    /// Already seated in this arena.
    #[error("already in this arena")]
    AlreadyJoined,
    /// Eliminated from this match.
    #[error("eliminated participants cannot rejoin")]
    Eliminated,
}

/// Answer to a join request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinResponse {
    /// Seat taken.
    Accepted,
    /// Refused, with the reason.
    Rejected(JoinRejection),
}

impl JoinResponse {
    /// Was the join accepted?
    pub fn is_accepted(&self) -> bool {
        matches!(self, JoinResponse::Accepted)
    }
}

impl From<Admission> for JoinResponse {
    fn from(admission: Admission) -> Self {
        match admission {
            Admission::Admitted => JoinResponse::Accepted,
            Admission::Full => JoinResponse::Rejected(JoinRejection::ArenaFull),
            Admission::Closed => JoinResponse::Rejected(JoinRejection::WrongPhase),
            Admission::AlreadyJoined => JoinResponse::Rejected(JoinRejection::AlreadyJoined),
            Admission::Eliminated => JoinResponse::Rejected(JoinRejection::Eliminated),
        }
    }
}

/// What an elimination signal did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EliminationOutcome {
    /// Participant is now out.
    Eliminated,
    /// Participant was already out.
    AlreadyEliminated,
    /// Match already decided; nothing changed.
    MatchFinished,
    /// Arena is not in game.
    NotInGame,
    /// Participant is not in this arena.
    NotParticipant,
}

// =============================================================================
// ARENA VIEW
// =============================================================================

/// What a game may see of the arena it is bound to.
#[derive(Debug, Clone)]
pub struct ArenaView {
    name: Arc<str>,
    phase: Arc<PhaseCell>,
    timer: Arc<TimerFeature>,
    owner: Option<Arc<OwnerFeature>>,
}

impl ArenaView {
    /// Assemble a view.
    pub fn new(
        name: Arc<str>,
        phase: Arc<PhaseCell>,
        timer: Arc<TimerFeature>,
        owner: Option<Arc<OwnerFeature>>,
    ) -> Self {
        Self {
            name,
            phase,
            timer,
            owner,
        }
    }

    /// Arena name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase.get().unwrap_or(Phase::Choosing)
    }

    /// The arena's countdown.
    pub fn timer(&self) -> &TimerFeature {
        &self.timer
    }

    /// Arena owner, if recorded.
    pub fn owner(&self) -> Option<ParticipantId> {
        self.owner.as_ref().and_then(|o| o.owner())
    }
}

// =============================================================================
// STATUS
// =============================================================================

/// Read-only summary of an arena's match, for boards and menus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStatus {
    /// Arena name.
    pub arena: String,
    /// Template the game came from.
    pub template: String,
    /// Phase display name.
    pub phase: String,
    /// Seats taken.
    pub players: usize,
    /// Total seats.
    pub max_players: usize,
    /// Participants still playing.
    pub alive: usize,
    /// Arena owner (uuid form).
    pub owner: Option<String>,
    /// Countdown left, milliseconds.
    pub time_left_ms: u64,
    /// Winner (uuid form), once decided.
    pub winner: Option<String>,
}

// =============================================================================
// GAME
// =============================================================================

/// Match logic bound to one arena.
pub trait Game: Send + Sync {
    /// Template this game was created from.
    fn template_id(&self) -> &str;

    /// A participant asks to join.
    fn join(&self, participant: ParticipantId) -> JoinResponse;

    /// A participant leaves (or disconnects). Returns false if they were not here.
    fn leave(&self, participant: ParticipantId) -> bool;

    /// External kill/defeat signal.
    fn eliminate(&self, participant: ParticipantId) -> EliminationOutcome;

    /// Seated participants, in join order.
    fn participants(&self) -> Vec<ParticipantId>;

    /// How long Waiting lasts.
    fn waiting_duration(&self) -> Duration;

    /// How long Ending lasts.
    fn ending_duration(&self) -> Duration;

    /// Entered Waiting.
    fn on_waiting_start(&self) {}

    /// Enough participants to start once the waiting timer runs out?
    fn can_start(&self) -> bool;

    /// Leaving Waiting for InGame.
    fn on_waiting_end(&self) {}

    /// Leaving Waiting for anything but InGame.
    fn on_failed_waiting_end(&self) {}

    /// Entered InGame.
    fn on_in_game_start(&self) {}

    /// Polled every InGame tick.
    fn is_in_game_over(&self) -> bool;

    /// Entered Ending.
    fn on_ending_start(&self) {}

    /// Release everything. Runs on Killing entry, whichever phase came before.
    fn clear(&self);

    /// Current summary.
    fn status(&self) -> GameStatus;
}

// =============================================================================
// TEST KIT
// =============================================================================

#[cfg(test)]
pub(crate) mod testkit {
    //! Scripted game and recording host shared by the unit tests.

    use super::*;
    use crate::template::{Template, TemplateError};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    pub fn pid(n: u8) -> ParticipantId {
        ParticipantId::new([n; 16])
    }

    /// How many times each hook ran.
    #[derive(Debug, Default)]
    pub struct HookCounts {
        pub waiting_start: AtomicUsize,
        pub waiting_end: AtomicUsize,
        pub failed_waiting_end: AtomicUsize,
        pub in_game_start: AtomicUsize,
        pub in_game_polls: AtomicUsize,
        pub ending_start: AtomicUsize,
        pub clear: AtomicUsize,
    }

    impl HookCounts {
        pub fn get(counter: &AtomicUsize) -> usize {
            counter.load(Ordering::SeqCst)
        }
    }

    /// Game whose decisions are flipped by the test.
    pub struct ScriptedGame {
        pub template: String,
        pub counts: HookCounts,
        pub start_ok: AtomicBool,
        pub over: AtomicBool,
        pub waiting: Duration,
        pub ending: Duration,
        pub hooks: Mutex<Vec<&'static str>>,
        participants: Mutex<Vec<ParticipantId>>,
    }

    impl ScriptedGame {
        pub fn new(template: &str) -> Self {
            Self {
                template: template.to_string(),
                counts: HookCounts::default(),
                start_ok: AtomicBool::new(true),
                over: AtomicBool::new(false),
                waiting: Duration::from_secs(2),
                ending: Duration::from_secs(1),
                hooks: Mutex::new(Vec::new()),
                participants: Mutex::new(Vec::new()),
            }
        }

        fn record(&self, hook: &'static str, counter: &AtomicUsize) {
            counter.fetch_add(1, Ordering::SeqCst);
            self.hooks.lock().unwrap().push(hook);
        }

        pub fn hook_log(&self) -> Vec<&'static str> {
            self.hooks.lock().unwrap().clone()
        }
    }

    impl Game for ScriptedGame {
        fn template_id(&self) -> &str {
            &self.template
        }

        fn join(&self, participant: ParticipantId) -> JoinResponse {
            let mut participants = self.participants.lock().unwrap();
            if participants.contains(&participant) {
                return JoinResponse::Rejected(JoinRejection::AlreadyJoined);
            }
            participants.push(participant);
            JoinResponse::Accepted
        }

        fn leave(&self, participant: ParticipantId) -> bool {
            let mut participants = self.participants.lock().unwrap();
            let before = participants.len();
            participants.retain(|p| *p != participant);
            participants.len() != before
        }

        fn eliminate(&self, _participant: ParticipantId) -> EliminationOutcome {
            EliminationOutcome::NotInGame
        }

        fn participants(&self) -> Vec<ParticipantId> {
            self.participants.lock().unwrap().clone()
        }

        fn waiting_duration(&self) -> Duration {
            self.waiting
        }

        fn ending_duration(&self) -> Duration {
            self.ending
        }

        fn on_waiting_start(&self) {
            self.record("waiting_start", &self.counts.waiting_start);
        }

        fn can_start(&self) -> bool {
            self.start_ok.load(Ordering::SeqCst)
        }

        fn on_waiting_end(&self) {
            self.record("waiting_end", &self.counts.waiting_end);
        }

        fn on_failed_waiting_end(&self) {
            self.record("failed_waiting_end", &self.counts.failed_waiting_end);
        }

        fn on_in_game_start(&self) {
            self.record("in_game_start", &self.counts.in_game_start);
        }

        fn is_in_game_over(&self) -> bool {
            self.counts.in_game_polls.fetch_add(1, Ordering::SeqCst);
            self.over.load(Ordering::SeqCst)
        }

        fn on_ending_start(&self) {
            self.record("ending_start", &self.counts.ending_start);
        }

        fn clear(&self) {
            self.record("clear", &self.counts.clear);
        }

        fn status(&self) -> GameStatus {
            GameStatus {
                arena: String::new(),
                template: self.template.clone(),
                phase: String::new(),
                players: self.participants().len(),
                max_players: usize::MAX,
                alive: self.participants().len(),
                owner: None,
                time_left_ms: 0,
                winner: None,
            }
        }
    }

    /// Template handing out one shared scripted game.
    pub struct ScriptedTemplate {
        pub id: String,
        pub game: Arc<ScriptedGame>,
    }

    impl ScriptedTemplate {
        pub fn new(id: &str) -> Self {
            Self {
                id: id.to_string(),
                game: Arc::new(ScriptedGame::new(id)),
            }
        }
    }

    impl Template for ScriptedTemplate {
        fn id(&self) -> &str {
            &self.id
        }

        fn display_name(&self) -> &str {
            &self.id
        }

        fn capacity(&self) -> usize {
            usize::MAX
        }

        fn create_game(&self, _arena: ArenaView) -> Result<Arc<dyn Game>, TemplateError> {
            Ok(self.game.clone())
        }
    }

    /// One call made on the host.
    #[derive(Debug, Clone, PartialEq)]
    pub enum HostAction {
        Open(String),
        Close(String),
        Teleport(ParticipantId, Position),
        Reset(ParticipantId),
        Observe(ParticipantId),
        GiveItem(ParticipantId, u8, String),
        ClearInventory(ParticipantId),
        Message(ParticipantId, String),
        Lobby(ParticipantId),
    }

    /// Host that records every call.
    #[derive(Debug, Default)]
    pub struct RecordingHost {
        pub actions: Mutex<Vec<HostAction>>,
        pub names: Mutex<Vec<(ParticipantId, String)>>,
    }

    impl RecordingHost {
        pub fn name(&self, participant: ParticipantId, name: &str) {
            self.names.lock().unwrap().push((participant, name.to_string()));
        }

        pub fn actions(&self) -> Vec<HostAction> {
            self.actions.lock().unwrap().clone()
        }

        pub fn messages_to(&self, participant: ParticipantId) -> Vec<String> {
            self.actions()
                .into_iter()
                .filter_map(|a| match a {
                    HostAction::Message(p, m) if p == participant => Some(m),
                    _ => None,
                })
                .collect()
        }

        pub fn count(&self, pred: impl Fn(&HostAction) -> bool) -> usize {
            self.actions().iter().filter(|a| pred(a)).count()
        }

        fn push(&self, action: HostAction) {
            self.actions.lock().unwrap().push(action);
        }
    }

    impl ParticipantHost for RecordingHost {
        fn open_arena(&self, arena: &str) {
            self.push(HostAction::Open(arena.to_string()));
        }

        fn close_arena(&self, arena: &str) {
            self.push(HostAction::Close(arena.to_string()));
        }

        fn teleport(&self, participant: ParticipantId, _arena: &str, position: Position) {
            self.push(HostAction::Teleport(participant, position));
        }

        fn reset_state(&self, participant: ParticipantId) {
            self.push(HostAction::Reset(participant));
        }

        fn set_observer(&self, participant: ParticipantId) {
            self.push(HostAction::Observe(participant));
        }

        fn give_item(&self, participant: ParticipantId, slot: u8, item: &str) {
            self.push(HostAction::GiveItem(participant, slot, item.to_string()));
        }

        fn clear_inventory(&self, participant: ParticipantId) {
            self.push(HostAction::ClearInventory(participant));
        }

        fn send_message(&self, participant: ParticipantId, message: &str) {
            self.push(HostAction::Message(participant, message.to_string()));
        }

        fn return_to_lobby(&self, participant: ParticipantId) {
            self.push(HostAction::Lobby(participant));
        }

        fn display_name(&self, participant: ParticipantId) -> String {
            self.names
                .lock()
                .unwrap()
                .iter()
                .find(|(p, _)| *p == participant)
                .map(|(_, name)| name.clone())
                .unwrap_or_else(|| participant.to_uuid_string())
        }
    }
}
