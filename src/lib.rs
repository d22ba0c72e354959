//! # Minigame Arena
//!
//! Multi-tenant orchestration engine for short competitive minigames.
//! Many isolated arenas run side by side, each driven through a fixed
//! lifecycle by a periodic tick.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      MINIGAME ARENA                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Shared primitives                         │
//! │  ├── clock.rs    - Monotonic and manual time sources         │
//! │  ├── config.rs   - Engine configuration (env driven)         │
//! │  └── participant.rs - Participant ids and status             │
//! │                                                              │
//! │  feature/        - Per-arena capabilities, looked up by type │
//! │  ├── timer.rs    - Phase countdown                           │
//! │  ├── owner.rs    - Arena creator                             │
//! │  └── binding.rs  - Template → game binding                   │
//! │                                                              │
//! │  template/       - Game blueprint catalog                    │
//! │                                                              │
//! │  game/           - Game contract and games                   │
//! │  ├── host.rs     - Host world interface                      │
//! │  ├── roster.rs   - Capacity-bounded participant set          │
//! │  └── duel.rs     - Last-one-standing duel                    │
//! │                                                              │
//! │  arena/          - One match instance                        │
//! │  ├── phase.rs    - Lifecycle phases                          │
//! │  └── lifecycle.rs- Entry / poll / exit hooks                 │
//! │                                                              │
//! │  manager/        - Arena catalog                             │
//! │  └── scheduler.rs- Shared or per-arena tick loops            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lifecycle
//!
//! ```text
//! Choosing ──► Waiting ──► InGame ──► Ending ──► Killing ──► removed
//!                 │                                 ▲
//!                 └──── not enough participants ────┘
//! ```
//!
//! Transitions requested during a tick take effect on the next tick.
//! Joins, eliminations and leaves may arrive from any thread while arenas
//! tick; games keep their state in atomics and concurrent maps.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod arena;
pub mod core;
pub mod feature;
pub mod game;
pub mod manager;
pub mod template;

// Re-export commonly used types
pub use crate::arena::{Arena, ArenaError, Phase, TickStatus};
pub use crate::core::{Clock, EngineConfig, ManualClock, ParticipantId, SchedulingMode, SystemClock};
pub use crate::feature::{default_providers, FeatureError, FeatureProvider, FeatureRegistry};
pub use crate::game::{
    DuelSettings, DuelTemplate, EliminationOutcome, Game, GameStatus, JoinRejection, JoinResponse,
    ParticipantHost,
};
pub use crate::manager::{ArenaEvent, ArenaManager, ArenaScheduler, ManagerError};
pub use crate::template::{Template, TemplateError, TemplateRegistry};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
