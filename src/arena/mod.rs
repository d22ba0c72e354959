//! Arena
//!
//! One isolated match instance. An arena owns its feature registry and its
//! lifecycle state; everything else (timer, owner, the game itself) is a
//! feature looked up by type.
//!
//! ## Tick
//!
//! ```text
//! tick ──► pending transition? ──yes──► exit(current, next)
//!                  │                    current = next
//!                  │                    enter(next)
//!                  no
//!                  └──────────────────► poll(current)
//! ```
//!
//! Transition requests made while a tick runs are stored as pending and
//! applied by the following tick, so an entry hook always completes before
//! the phase it entered is polled.

pub mod lifecycle;
pub mod phase;

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::core::ParticipantId;
use crate::feature::{FeatureError, FeatureRegistry, GameFeature, OwnerFeature, TimerFeature};
use crate::game::{ArenaView, EliminationOutcome, Game, GameStatus, JoinResponse};
use crate::template::{TemplateError, TemplateRegistry};

pub use phase::{Phase, PhaseCell};

// =============================================================================
// ERRORS
// =============================================================================

/// Arena errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArenaError {
    /// No template chosen yet.
    #[error("arena {0} has no game bound")]
    NotReady(String),

    /// A template was already chosen.
    #[error("arena {0} already has a game bound")]
    AlreadyBound(String),

    /// Operation not allowed in the current phase.
    #[error("arena {arena} is in phase {actual}, expected {expected}")]
    WrongPhase {
        /// Arena name.
        arena: String,
        /// Phase the operation needs.
        expected: Phase,
        /// Phase the arena is in.
        actual: Phase,
    },

    /// Killing is never left.
    #[error("arena {0} is being killed")]
    Terminal(String),

    /// The requested phase does not follow the current one.
    #[error("arena {arena} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Arena name.
        arena: String,
        /// Current phase.
        from: Phase,
        /// Requested phase.
        to: Phase,
    },

    /// The arena was already removed from its manager.
    #[error("arena {0} was removed")]
    Removed(String),

    /// A capability is missing.
    #[error(transparent)]
    Feature(#[from] FeatureError),

    /// The template could not produce a game.
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// What a tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStatus {
    /// No transition was pending; the phase was polled.
    Polled(Phase),
    /// A pending transition was applied.
    Transitioned {
        /// Phase left.
        from: Phase,
        /// Phase entered.
        to: Phase,
    },
    /// Another tick of this arena is still running.
    Busy,
    /// The arena was removed; nothing ran.
    Removed,
}

/// Clears the in-tick flag even if a hook panics.
struct TickGuard<'a>(&'a AtomicBool);

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// =============================================================================
// ARENA
// =============================================================================

/// One match instance.
pub struct Arena {
    name: Arc<str>,
    created_at: DateTime<Utc>,
    features: FeatureRegistry,
    phase: Arc<PhaseCell>,
    pending: PhaseCell,
    in_tick: AtomicBool,
    removal_requested: AtomicBool,
    removed: AtomicBool,
    ticks: AtomicU64,
}

impl Arena {
    /// New arena in Choosing, carrying `features`.
    pub fn new(name: impl Into<Arc<str>>, features: FeatureRegistry) -> Self {
        Self {
            name: name.into(),
            created_at: Utc::now(),
            features,
            phase: Arc::new(PhaseCell::new(Some(Phase::Choosing))),
            pending: PhaseCell::default(),
            in_tick: AtomicBool::new(false),
            removal_requested: AtomicBool::new(false),
            removed: AtomicBool::new(false),
            ticks: AtomicU64::new(0),
        }
    }

    /// Unique name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creation time.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase.get().unwrap_or(Phase::Choosing)
    }

    /// Transition waiting for the next tick.
    pub fn pending_phase(&self) -> Option<Phase> {
        self.pending.get()
    }

    /// Ticks run so far.
    pub fn tick_count(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    // -------------------------------------------------------------------------
    // Features
    // -------------------------------------------------------------------------

    /// Attached capabilities.
    pub fn features(&self) -> &FeatureRegistry {
        &self.features
    }

    /// Look a capability up by type.
    pub fn feature<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, FeatureError> {
        self.features.get::<T>()
    }

    /// The bound game.
    pub fn game(&self) -> Result<Arc<dyn Game>, ArenaError> {
        self.feature::<GameFeature>()?
            .game()
            .ok_or_else(|| ArenaError::NotReady(self.name.to_string()))
    }

    /// Has a template been chosen?
    pub fn is_ready(&self) -> bool {
        self.feature::<GameFeature>()
            .map(|binding| binding.is_ready())
            .unwrap_or(false)
    }

    /// Id of the chosen template.
    pub fn template_id(&self) -> Option<String> {
        self.feature::<GameFeature>()
            .ok()
            .and_then(|binding| binding.template_id().map(str::to_string))
    }

    /// Recorded owner.
    pub fn owner(&self) -> Option<ParticipantId> {
        self.feature::<OwnerFeature>().ok().and_then(|o| o.owner())
    }

    /// What a game gets to see of this arena.
    pub fn view(&self) -> Result<ArenaView, FeatureError> {
        Ok(ArenaView::new(
            self.name.clone(),
            self.phase.clone(),
            self.feature::<TimerFeature>()?,
            self.feature::<OwnerFeature>().ok(),
        ))
    }

    // -------------------------------------------------------------------------
    // Template binding
    // -------------------------------------------------------------------------

    /// Choose a template: create its game, bind it and request Waiting.
    pub fn select_template(
        &self,
        templates: &TemplateRegistry,
        template_id: &str,
    ) -> Result<Arc<dyn Game>, ArenaError> {
        let actual = self.phase();
        if actual != Phase::Choosing {
            return Err(ArenaError::WrongPhase {
                arena: self.name.to_string(),
                expected: Phase::Choosing,
                actual,
            });
        }

        let binding = self.feature::<GameFeature>()?;
        if binding.is_ready() {
            return Err(ArenaError::AlreadyBound(self.name.to_string()));
        }

        let template = templates.resolve(template_id)?;
        let game = template.create_game(self.view()?)?;
        if !binding.bind(template.id(), game.clone()) {
            game.clear();
            return Err(ArenaError::AlreadyBound(self.name.to_string()));
        }

        self.request_transition(Phase::Waiting)?;
        info!(arena = %self.name, template = %template.id(), "Template chosen");
        Ok(game)
    }

    // -------------------------------------------------------------------------
    // Participants
    // -------------------------------------------------------------------------

    /// Forward a join to the bound game.
    pub fn join(&self, participant: ParticipantId) -> Result<JoinResponse, ArenaError> {
        Ok(self.game()?.join(participant))
    }

    /// Forward a leave to the bound game.
    pub fn leave(&self, participant: ParticipantId) -> bool {
        self.game()
            .map(|game| game.leave(participant))
            .unwrap_or(false)
    }

    /// Forward a kill/defeat signal to the bound game.
    pub fn eliminate(&self, participant: ParticipantId) -> Result<EliminationOutcome, ArenaError> {
        Ok(self.game()?.eliminate(participant))
    }

    /// Is the participant seated here?
    pub fn contains(&self, participant: ParticipantId) -> bool {
        self.game()
            .map(|game| game.participants().contains(&participant))
            .unwrap_or(false)
    }

    /// Summary of the bound game.
    pub fn status(&self) -> Option<GameStatus> {
        self.game().ok().map(|game| game.status())
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Ask for a transition at the next tick. A later request overwrites an
    /// earlier one that has not been applied yet.
    ///
    /// Only forward steps and early Killing are accepted, see
    /// [`Phase::can_transition_to`].
    pub fn request_transition(&self, next: Phase) -> Result<(), ArenaError> {
        if self.is_removed() {
            error!(arena = %self.name, next = %next, "Transition requested on a removed arena");
            return Err(ArenaError::Removed(self.name.to_string()));
        }
        let current = self.phase();
        if current.is_terminal() {
            warn!(arena = %self.name, next = %next, "Transition requested while killing");
            return Err(ArenaError::Terminal(self.name.to_string()));
        }
        if !current.can_transition_to(next) {
            warn!(arena = %self.name, from = %current, to = %next, "Invalid transition requested");
            return Err(ArenaError::InvalidTransition {
                arena: self.name.to_string(),
                from: current,
                to: next,
            });
        }

        if let Some(previous) = self.pending.replace(next) {
            debug!(arena = %self.name, %previous, %next, "Pending transition replaced");
        }
        Ok(())
    }

    /// Request from inside the lifecycle, where failures are only logged.
    pub(crate) fn schedule(&self, next: Phase) {
        if let Err(err) = self.request_transition(next) {
            debug!(arena = %self.name, error = %err, "Transition not scheduled");
        }
    }

    /// Advance the lifecycle by one step.
    ///
    /// Applies the pending transition if there is one, polls the current
    /// phase otherwise. Never runs concurrently with itself.
    pub fn tick(&self) -> TickStatus {
        if self.is_removed() {
            return TickStatus::Removed;
        }
        if self.in_tick.swap(true, Ordering::Acquire) {
            warn!(arena = %self.name, "Tick skipped, previous tick still running");
            return TickStatus::Busy;
        }
        let _guard = TickGuard(&self.in_tick);

        self.ticks.fetch_add(1, Ordering::Relaxed);
        let current = self.phase();

        match self.pending.take() {
            // A request checked against the previous phase can land after a
            // tick moved on.
            Some(next) if !current.can_transition_to(next) => {
                error!(arena = %self.name, from = %current, to = %next, "Dropping invalid transition");
                lifecycle::poll(self, current);
                TickStatus::Polled(current)
            }
            Some(next) => {
                lifecycle::exit(self, current, next);
                self.phase.set(Some(next));
                info!(arena = %self.name, from = %current, to = %next, "Phase changed");
                lifecycle::enter(self, next);
                TickStatus::Transitioned {
                    from: current,
                    to: next,
                }
            }
            None => {
                lifecycle::poll(self, current);
                TickStatus::Polled(current)
            }
        }
    }

    fn timer_or_kill(&self) -> Option<Arc<TimerFeature>> {
        match self.feature::<TimerFeature>() {
            Ok(timer) => Some(timer),
            Err(err) => {
                error!(arena = %self.name, error = %err, "No timer attached, killing arena");
                self.schedule(Phase::Killing);
                None
            }
        }
    }

    pub(crate) fn start_timer(&self, duration: Duration) -> bool {
        match self.timer_or_kill() {
            Some(timer) => {
                timer.start(duration);
                true
            }
            None => false,
        }
    }

    pub(crate) fn timer_expired(&self) -> bool {
        self.timer_or_kill()
            .map(|timer| timer.expired())
            .unwrap_or(false)
    }

    // -------------------------------------------------------------------------
    // Removal
    // -------------------------------------------------------------------------

    pub(crate) fn mark_for_removal(&self) {
        if !self.removal_requested.swap(true, Ordering::AcqRel) {
            debug!(arena = %self.name, "Removal requested");
        }
    }

    /// Has the arena finished Killing and asked to be removed?
    pub fn removal_requested(&self) -> bool {
        self.removal_requested.load(Ordering::Acquire)
    }

    pub(crate) fn mark_removed(&self) {
        self.removed.store(true, Ordering::Release);
    }

    /// Has the manager removed this arena?
    pub fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("name", &self.name)
            .field("phase", &self.phase())
            .field("pending", &self.pending_phase())
            .field("template", &self.template_id())
            .field("removed", &self.is_removed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Clock, ManualClock};
    use crate::feature::{default_providers, FeatureProvider, OwnerProvider, TimerProvider};
    use crate::game::testkit::{pid, HookCounts, RecordingHost, ScriptedGame, ScriptedTemplate};
    use crate::game::{DuelSettings, DuelTemplate, JoinRejection, Position};

    struct Fixture {
        arena: Arena,
        clock: Arc<ManualClock>,
        templates: TemplateRegistry,
        game: Arc<ScriptedGame>,
    }

    fn build_arena(providers: Vec<Box<dyn FeatureProvider>>) -> Arena {
        let mut registry = FeatureRegistry::new("arena-test");
        for provider in providers {
            provider.attach(&mut registry);
        }
        Arena::new("arena-test", registry)
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new());
        let shared: Arc<dyn Clock> = clock.clone();
        let arena = build_arena(default_providers(shared));
        let templates = TemplateRegistry::new();
        let template = ScriptedTemplate::new("scripted");
        let game = template.game.clone();
        templates.register(Arc::new(template));
        Fixture {
            arena,
            clock,
            templates,
            game,
        }
    }

    /// Tick once per second of clock time until `phase` is current.
    fn tick_until(f: &Fixture, phase: Phase, limit: usize) -> Vec<Phase> {
        let mut seen = vec![f.arena.phase()];
        for _ in 0..limit {
            if f.arena.phase() == phase {
                break;
            }
            f.arena.tick();
            f.clock.advance(Duration::from_secs(1));
            if seen.last() != Some(&f.arena.phase()) {
                seen.push(f.arena.phase());
            }
        }
        seen
    }

    #[test]
    fn test_starts_in_choosing_and_idles() {
        let f = fixture();
        assert_eq!(f.arena.phase(), Phase::Choosing);
        assert_eq!(f.arena.tick(), TickStatus::Polled(Phase::Choosing));
        assert_eq!(f.arena.tick(), TickStatus::Polled(Phase::Choosing));
        assert!(!f.arena.is_ready());
        assert_eq!(
            f.arena.join(pid(1)),
            Err(ArenaError::NotReady("arena-test".to_string()))
        );
    }

    #[test]
    fn test_select_template_defers_waiting() {
        let f = fixture();
        f.arena.select_template(&f.templates, "scripted").unwrap();

        assert!(f.arena.is_ready());
        assert_eq!(f.arena.template_id().as_deref(), Some("scripted"));
        assert_eq!(f.arena.phase(), Phase::Choosing);
        assert_eq!(f.arena.pending_phase(), Some(Phase::Waiting));

        assert_eq!(
            f.arena.tick(),
            TickStatus::Transitioned {
                from: Phase::Choosing,
                to: Phase::Waiting
            }
        );
        assert_eq!(HookCounts::get(&f.game.counts.waiting_start), 1);
    }

    #[test]
    fn test_select_template_errors() {
        let f = fixture();
        assert!(matches!(
            f.arena.select_template(&f.templates, "missing"),
            Err(ArenaError::Template(TemplateError::NotFound(_)))
        ));

        f.arena.select_template(&f.templates, "scripted").unwrap();
        assert_eq!(
            f.arena.select_template(&f.templates, "scripted").err(),
            Some(ArenaError::AlreadyBound("arena-test".to_string()))
        );

        f.arena.tick();
        assert!(matches!(
            f.arena.select_template(&f.templates, "scripted"),
            Err(ArenaError::WrongPhase {
                expected: Phase::Choosing,
                actual: Phase::Waiting,
                ..
            })
        ));
    }

    #[test]
    fn test_successful_match_phase_order() {
        let f = fixture();
        f.arena.select_template(&f.templates, "scripted").unwrap();

        let seen = tick_until(&f, Phase::InGame, 20);
        assert_eq!(seen, vec![Phase::Choosing, Phase::Waiting, Phase::InGame]);

        f.game.over.store(true, Ordering::SeqCst);
        let seen = tick_until(&f, Phase::Killing, 20);
        assert_eq!(seen, vec![Phase::InGame, Phase::Ending, Phase::Killing]);
        assert!(f.arena.removal_requested());

        assert_eq!(
            f.game.hook_log(),
            vec![
                "waiting_start",
                "waiting_end",
                "in_game_start",
                "ending_start",
                "clear"
            ]
        );
    }

    #[test]
    fn test_failed_start_skips_to_killing() {
        let f = fixture();
        f.game.start_ok.store(false, Ordering::SeqCst);
        f.arena.select_template(&f.templates, "scripted").unwrap();

        let seen = tick_until(&f, Phase::Killing, 20);
        assert_eq!(seen, vec![Phase::Choosing, Phase::Waiting, Phase::Killing]);
        assert_eq!(
            f.game.hook_log(),
            vec!["waiting_start", "failed_waiting_end", "clear"]
        );
    }

    #[test]
    fn test_waiting_lasts_for_timer() {
        let f = fixture();
        f.arena.select_template(&f.templates, "scripted").unwrap();
        f.arena.tick();
        assert_eq!(f.arena.phase(), Phase::Waiting);

        // 2 second countdown
        assert_eq!(f.arena.tick(), TickStatus::Polled(Phase::Waiting));
        assert_eq!(f.arena.pending_phase(), None);
        f.clock.advance(Duration::from_secs(2));
        assert_eq!(f.arena.tick(), TickStatus::Polled(Phase::Waiting));
        assert_eq!(f.arena.pending_phase(), Some(Phase::InGame));
        assert_eq!(f.arena.phase(), Phase::Waiting);
    }

    #[test]
    fn test_entry_hooks_run_once_per_entry() {
        let f = fixture();
        f.arena.select_template(&f.templates, "scripted").unwrap();
        tick_until(&f, Phase::InGame, 20);

        for _ in 0..10 {
            f.arena.tick();
        }
        assert_eq!(HookCounts::get(&f.game.counts.waiting_start), 1);
        assert_eq!(HookCounts::get(&f.game.counts.in_game_start), 1);
        assert_eq!(HookCounts::get(&f.game.counts.in_game_polls), 10);
    }

    #[test]
    fn test_killing_is_terminal() {
        let f = fixture();
        f.arena.request_transition(Phase::Killing).unwrap();
        f.arena.tick();
        assert_eq!(f.arena.phase(), Phase::Killing);
        assert!(f.arena.removal_requested());
        assert_eq!(
            f.arena.request_transition(Phase::Waiting),
            Err(ArenaError::Terminal("arena-test".to_string()))
        );
        assert_eq!(f.arena.tick(), TickStatus::Polled(Phase::Killing));
        assert_eq!(HookCounts::get(&f.game.counts.clear), 0);
    }

    #[test]
    fn test_overlapping_tick_is_busy() {
        let f = fixture();
        f.arena.select_template(&f.templates, "scripted").unwrap();

        f.arena.in_tick.store(true, Ordering::SeqCst);
        assert_eq!(f.arena.tick(), TickStatus::Busy);
        assert_eq!(f.arena.pending_phase(), Some(Phase::Waiting));

        f.arena.in_tick.store(false, Ordering::SeqCst);
        assert!(matches!(f.arena.tick(), TickStatus::Transitioned { .. }));
        assert!(!f.arena.in_tick.load(Ordering::SeqCst));
    }

    #[test]
    fn test_removed_arena_does_nothing() {
        let f = fixture();
        f.arena.mark_removed();
        assert_eq!(f.arena.tick(), TickStatus::Removed);
        assert_eq!(
            f.arena.request_transition(Phase::Waiting),
            Err(ArenaError::Removed("arena-test".to_string()))
        );
        assert_eq!(f.arena.tick_count(), 0);
    }

    #[test]
    fn test_later_request_overwrites_pending() {
        let f = fixture();
        f.arena.select_template(&f.templates, "scripted").unwrap();
        f.arena.request_transition(Phase::Killing).unwrap();

        assert_eq!(
            f.arena.tick(),
            TickStatus::Transitioned {
                from: Phase::Choosing,
                to: Phase::Killing
            }
        );
        assert_eq!(HookCounts::get(&f.game.counts.waiting_start), 0);
        assert_eq!(HookCounts::get(&f.game.counts.clear), 1);
    }

    #[test]
    fn test_out_of_order_requests_rejected() {
        let f = fixture();
        f.arena.select_template(&f.templates, "scripted").unwrap();
        f.arena.tick();
        assert_eq!(f.arena.phase(), Phase::Waiting);

        // Same phase again
        assert_eq!(
            f.arena.request_transition(Phase::Waiting),
            Err(ArenaError::InvalidTransition {
                arena: "arena-test".to_string(),
                from: Phase::Waiting,
                to: Phase::Waiting,
            })
        );
        // Skipping InGame
        assert!(matches!(
            f.arena.request_transition(Phase::Ending),
            Err(ArenaError::InvalidTransition { to: Phase::Ending, .. })
        ));
        // Backwards
        assert!(matches!(
            f.arena.request_transition(Phase::Choosing),
            Err(ArenaError::InvalidTransition { to: Phase::Choosing, .. })
        ));

        assert_eq!(f.arena.pending_phase(), None);
        assert_eq!(f.arena.tick(), TickStatus::Polled(Phase::Waiting));
        assert_eq!(HookCounts::get(&f.game.counts.waiting_start), 1);
        assert!(f.game.hook_log().iter().all(|hook| *hook != "failed_waiting_end"));
    }

    #[test]
    fn test_stale_pending_transition_dropped() {
        let f = fixture();
        f.arena.select_template(&f.templates, "scripted").unwrap();
        f.arena.tick();

        // A Waiting request that was valid from Choosing lands late.
        f.arena.pending.replace(Phase::Waiting);
        assert_eq!(f.arena.tick(), TickStatus::Polled(Phase::Waiting));
        assert_eq!(f.arena.pending_phase(), None);
        assert_eq!(HookCounts::get(&f.game.counts.waiting_start), 1);
    }

    #[test]
    fn test_ending_only_moves_to_killing() {
        let f = fixture();
        f.arena.select_template(&f.templates, "scripted").unwrap();
        tick_until(&f, Phase::InGame, 20);
        f.game.over.store(true, Ordering::SeqCst);
        tick_until(&f, Phase::Ending, 20);

        for phase in [Phase::Choosing, Phase::Waiting, Phase::InGame, Phase::Ending] {
            assert!(matches!(
                f.arena.request_transition(phase),
                Err(ArenaError::InvalidTransition { from: Phase::Ending, .. })
            ));
        }
        f.arena.request_transition(Phase::Killing).unwrap();
        assert_eq!(
            f.arena.tick(),
            TickStatus::Transitioned {
                from: Phase::Ending,
                to: Phase::Killing
            }
        );
    }

    #[test]
    fn test_missing_game_kills_arena() {
        let f = fixture();
        f.arena.request_transition(Phase::Waiting).unwrap();
        f.arena.tick();
        assert_eq!(f.arena.phase(), Phase::Waiting);
        assert_eq!(f.arena.pending_phase(), Some(Phase::Killing));

        f.arena.tick();
        assert_eq!(f.arena.phase(), Phase::Killing);
        assert!(f.arena.removal_requested());
    }

    #[test]
    fn test_view_requires_timer() {
        let arena = build_arena(vec![Box::new(OwnerProvider)]);
        assert!(matches!(
            arena.view(),
            Err(FeatureError::CapabilityNotFound { .. })
        ));

        let templates = TemplateRegistry::new();
        templates.register(Arc::new(ScriptedTemplate::new("scripted")));
        assert!(matches!(
            arena.select_template(&templates, "scripted"),
            Err(ArenaError::Feature(_))
        ));
    }

    #[test]
    fn test_view_without_owner() {
        let clock = Arc::new(ManualClock::new());
        let shared: Arc<dyn Clock> = clock.clone();
        let arena = build_arena(vec![Box::new(TimerProvider::new(shared))]);
        let view = arena.view().unwrap();
        assert_eq!(view.owner(), None);
        assert_eq!(view.name(), "arena-test");
    }

    #[test]
    fn test_duel_through_arena() {
        let clock = Arc::new(ManualClock::new());
        let shared: Arc<dyn Clock> = clock.clone();
        let arena = build_arena(default_providers(shared));
        arena
            .feature::<OwnerFeature>()
            .unwrap()
            .set_owner(pid(0));

        let host = Arc::new(RecordingHost::default());
        let templates = TemplateRegistry::new();
        let settings = DuelSettings {
            waiting_seconds: 5,
            ending_seconds: 2,
            spawns: vec![Position::new(1.0, 65.0, 1.0); 3],
            ..Default::default()
        };
        templates.register(Arc::new(DuelTemplate::new(settings, host.clone()).unwrap()));

        arena.select_template(&templates, "duel").unwrap();
        assert_eq!(
            arena.join(pid(0)).unwrap(),
            JoinResponse::Rejected(JoinRejection::WrongPhase)
        );
        arena.tick();

        for n in 0..3 {
            assert!(arena.join(pid(n)).unwrap().is_accepted());
        }
        assert_eq!(
            arena.join(pid(3)).unwrap(),
            JoinResponse::Rejected(JoinRejection::ArenaFull)
        );

        clock.advance(Duration::from_secs(5));
        arena.tick();
        arena.tick();
        assert_eq!(arena.phase(), Phase::InGame);
        assert_eq!(
            arena.join(pid(4)).unwrap(),
            JoinResponse::Rejected(JoinRejection::WrongPhase)
        );

        assert_eq!(arena.eliminate(pid(0)).unwrap(), EliminationOutcome::Eliminated);
        assert_eq!(arena.eliminate(pid(2)).unwrap(), EliminationOutcome::Eliminated);
        arena.tick();
        arena.tick();
        assert_eq!(arena.phase(), Phase::Ending);

        let status = arena.status().unwrap();
        assert_eq!(status.winner, Some(pid(1).to_uuid_string()));
        assert_eq!(status.owner, Some(pid(0).to_uuid_string()));
        assert_eq!(status.time_left_ms, 2_000);

        clock.advance(Duration::from_secs(2));
        arena.tick();
        arena.tick();
        assert_eq!(arena.phase(), Phase::Killing);
        assert!(arena.removal_requested());
        assert!(!arena.contains(pid(1)));
    }
}
