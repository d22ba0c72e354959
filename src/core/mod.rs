//! Core primitives.
//!
//! Time sources, participant identity and engine configuration shared by
//! every other module.

pub mod clock;
pub mod config;
pub mod participant;

// Re-export core types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{EngineConfig, SchedulingMode, DEFAULT_NAME_PREFIX, DEFAULT_TICK_PERIOD_MS};
pub use participant::{ParticipantId, ParticipantStatus, StatusCell};
