//! Arena Manager
//!
//! Catalog of live arenas. Creates arenas with their features attached,
//! routes joins and leaves, and removes arenas once they have been killed.
//! Lifecycle events are published on a broadcast channel so schedulers and
//! boards can follow along.

pub mod scheduler;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::arena::{Arena, ArenaError, Phase, TickStatus};
use crate::core::{EngineConfig, ParticipantId};
use crate::feature::{FeatureProvider, FeatureRegistry, OwnerFeature};
use crate::game::JoinResponse;
use crate::template::TemplateRegistry;

pub use scheduler::ArenaScheduler;

/// Capacity of the arena event channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Manager errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManagerError {
    /// The manager is not initialized or was cleared.
    #[error("arena manager is closed")]
    Closed,

    /// No arena with this name.
    #[error("arena not found: {0}")]
    ArenaNotFound(String),

    /// The arena has no template yet.
    #[error("arena not ready: {0}")]
    ArenaNotReady(String),

    /// Removal asked for an arena that has not finished Killing.
    #[error("arena {arena} is still running (phase {phase})")]
    ArenaStillRunning {
        /// Arena name.
        arena: String,
        /// Its current phase.
        phase: Phase,
    },

    /// Arena-level failure.
    #[error(transparent)]
    Arena(#[from] ArenaError),
}

/// Arena catalog change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArenaEvent {
    /// An arena was created.
    Created(String),
    /// An arena was removed.
    Removed(String),
}

/// Owns every live arena.
pub struct ArenaManager {
    config: EngineConfig,
    templates: Arc<TemplateRegistry>,
    providers: Vec<Box<dyn FeatureProvider>>,
    arenas: DashMap<String, Arc<Arena>>,
    open: AtomicBool,
    events: broadcast::Sender<ArenaEvent>,
}

impl ArenaManager {
    /// Create a closed manager. Call [`ArenaManager::init`] before use.
    pub fn new(
        config: EngineConfig,
        templates: Arc<TemplateRegistry>,
        providers: Vec<Box<dyn FeatureProvider>>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config,
            templates,
            providers,
            arenas: DashMap::new(),
            open: AtomicBool::new(false),
            events,
        }
    }

    /// Start accepting arenas.
    pub fn init(&self) {
        if !self.open.swap(true, Ordering::AcqRel) {
            info!(
                templates = self.templates.len(),
                providers = self.providers.len(),
                "Arena manager initialized"
            );
        }
    }

    /// Is the manager accepting arenas?
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Stop accepting arenas and tear down every live one.
    pub fn clear(&self) {
        self.open.store(false, Ordering::Release);

        let names: Vec<String> = self.arenas.iter().map(|e| e.key().clone()).collect();
        for name in &names {
            if let Some((_, arena)) = self.arenas.remove(name) {
                if let Ok(game) = arena.game() {
                    game.clear();
                }
                self.retire(&arena);
            }
        }
        info!(arenas = names.len(), "Arena manager cleared");
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Template catalog.
    pub fn templates(&self) -> &Arc<TemplateRegistry> {
        &self.templates
    }

    /// Follow arena creations and removals.
    pub fn subscribe(&self) -> broadcast::Receiver<ArenaEvent> {
        self.events.subscribe()
    }

    // -------------------------------------------------------------------------
    // Creation / removal
    // -------------------------------------------------------------------------

    /// Create an arena in Choosing with every provider's feature attached.
    pub fn create_arena(&self) -> Result<Arc<Arena>, ManagerError> {
        if !self.is_open() {
            return Err(ManagerError::Closed);
        }

        let arena = loop {
            let name = format!("{}-{}", self.config.name_prefix, Uuid::new_v4());
            match self.arenas.entry(name) {
                Entry::Occupied(taken) => {
                    warn!(arena = %taken.key(), "Arena name collision, retrying");
                }
                Entry::Vacant(slot) => {
                    let arena = Arc::new(self.build_arena(slot.key()));
                    slot.insert(arena.clone());
                    break arena;
                }
            }
        };

        info!(arena = %arena.name(), "Arena created");
        let _ = self.events.send(ArenaEvent::Created(arena.name().to_string()));
        Ok(arena)
    }

    /// Create an arena, record its owner and bind a template in one step.
    ///
    /// If the template cannot be bound the arena is discarded.
    pub fn create_arena_with_template(
        &self,
        template_id: &str,
        owner: Option<ParticipantId>,
    ) -> Result<Arc<Arena>, ManagerError> {
        let arena = self.create_arena()?;

        if let Some(owner) = owner {
            match arena.feature::<OwnerFeature>() {
                Ok(feature) => {
                    feature.set_owner(owner);
                }
                Err(err) => warn!(arena = %arena.name(), error = %err, "Owner not recorded"),
            }
        }

        if let Err(err) = arena.select_template(&self.templates, template_id) {
            warn!(
                arena = %arena.name(),
                template = template_id,
                error = %err,
                "Template binding failed, discarding arena"
            );
            if self.arenas.remove(arena.name()).is_some() {
                self.retire(&arena);
            }
            return Err(err.into());
        }

        Ok(arena)
    }

    /// Remove an arena that has finished Killing.
    pub fn remove_arena(&self, name: &str) -> Result<Arc<Arena>, ManagerError> {
        let arena = self
            .get_arena(name)
            .ok_or_else(|| ManagerError::ArenaNotFound(name.to_string()))?;

        if !arena.removal_requested() {
            error!(arena = name, phase = %arena.phase(), "Removal before Killing completed");
            return Err(ManagerError::ArenaStillRunning {
                arena: name.to_string(),
                phase: arena.phase(),
            });
        }

        match self.arenas.remove(name) {
            Some((_, removed)) => {
                self.retire(&removed);
                Ok(removed)
            }
            None => Err(ManagerError::ArenaNotFound(name.to_string())),
        }
    }

    fn build_arena(&self, name: &str) -> Arena {
        let mut features = FeatureRegistry::new(name);
        for provider in &self.providers {
            provider.attach(&mut features);
        }
        Arena::new(name, features)
    }

    fn retire(&self, arena: &Arena) {
        arena.mark_removed();
        info!(arena = %arena.name(), ticks = arena.tick_count(), "Arena removed");
        let _ = self.events.send(ArenaEvent::Removed(arena.name().to_string()));
    }

    // -------------------------------------------------------------------------
    // Lookup
    // -------------------------------------------------------------------------

    /// Arena by name.
    pub fn get_arena(&self, name: &str) -> Option<Arc<Arena>> {
        self.arenas.get(name).map(|entry| entry.value().clone())
    }

    /// Every live arena, sorted by name.
    pub fn arenas(&self) -> Vec<Arc<Arena>> {
        let mut arenas: Vec<Arc<Arena>> = self.arenas.iter().map(|e| e.value().clone()).collect();
        arenas.sort_by(|a, b| a.name().cmp(b.name()));
        arenas
    }

    /// Number of live arenas.
    pub fn arena_count(&self) -> usize {
        self.arenas.len()
    }

    /// Arenas with a template bound, sorted by name.
    pub fn ready_arenas(&self) -> Vec<Arc<Arena>> {
        self.arenas()
            .into_iter()
            .filter(|arena| arena.is_ready())
            .collect()
    }

    /// Names of ready arenas starting with `prefix`. A blank prefix lists all.
    pub fn suggest(&self, prefix: &str) -> Vec<String> {
        let prefix = prefix.trim();
        self.ready_arenas()
            .into_iter()
            .map(|arena| arena.name().to_string())
            .filter(|name| prefix.is_empty() || name.starts_with(prefix))
            .collect()
    }

    /// A ready arena by name.
    pub fn find_joinable(&self, name: &str) -> Result<Arc<Arena>, ManagerError> {
        let arena = self
            .get_arena(name)
            .ok_or_else(|| ManagerError::ArenaNotFound(name.to_string()))?;
        if !arena.is_ready() {
            return Err(ManagerError::ArenaNotReady(name.to_string()));
        }
        Ok(arena)
    }

    /// The arena a participant is seated in.
    pub fn arena_of(&self, participant: ParticipantId) -> Option<Arc<Arena>> {
        self.ready_arenas()
            .into_iter()
            .find(|arena| arena.contains(participant))
    }

    // -------------------------------------------------------------------------
    // Participants
    // -------------------------------------------------------------------------

    /// Join the named arena.
    pub fn join(
        &self,
        name: &str,
        participant: ParticipantId,
    ) -> Result<JoinResponse, ManagerError> {
        let arena = self.find_joinable(name)?;
        let response = arena.join(participant)?;
        debug!(arena = name, participant = %participant, ?response, "Join routed");
        Ok(response)
    }

    /// Leave whichever arena the participant is in. Returns its name.
    pub fn leave(&self, participant: ParticipantId) -> Option<String> {
        let arena = self.arena_of(participant)?;
        if arena.leave(participant) {
            Some(arena.name().to_string())
        } else {
            None
        }
    }

    // -------------------------------------------------------------------------
    // Ticking
    // -------------------------------------------------------------------------

    /// Tick one arena and remove it if it finished Killing.
    pub fn tick_arena(&self, arena: &Arena) -> TickStatus {
        let status = arena.tick();
        if arena.removal_requested() && !arena.is_removed() {
            if let Err(err) = self.remove_arena(arena.name()) {
                debug!(arena = %arena.name(), error = %err, "Arena already gone");
            }
        }
        status
    }

    /// Tick every live arena once. Returns how many were ticked.
    pub fn tick_all(&self) -> usize {
        let arenas = self.arenas();
        for arena in &arenas {
            self.tick_arena(arena);
        }
        arenas.len()
    }
}
