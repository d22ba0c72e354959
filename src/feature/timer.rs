//! Countdown timer capability.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{FeatureProvider, FeatureRegistry};
use crate::core::clock::{to_micros, Clock};

/// Countdown used by the Waiting and Ending phases.
///
/// A timer that was never started reads as expired.
#[derive(Debug)]
pub struct TimerFeature {
    clock: Arc<dyn Clock>,
    deadline_micros: AtomicU64,
    starts: AtomicU32,
}

impl TimerFeature {
    /// Timer reading `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            deadline_micros: AtomicU64::new(0),
            starts: AtomicU32::new(0),
        }
    }

    /// (Re)start the countdown.
    pub fn start(&self, duration: Duration) {
        let deadline = self.clock.now().saturating_add(duration);
        self.deadline_micros
            .store(to_micros(deadline), Ordering::Release);
        self.starts.fetch_add(1, Ordering::Relaxed);
    }

    /// Time left before expiry.
    pub fn remaining(&self) -> Duration {
        Duration::from_micros(self.deadline_micros.load(Ordering::Acquire))
            .saturating_sub(self.clock.now())
    }

    /// Has the countdown run out?
    pub fn expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// How many times the timer was started.
    pub fn start_count(&self) -> u32 {
        self.starts.load(Ordering::Relaxed)
    }
}

/// Attaches a [`TimerFeature`] reading a shared clock.
#[derive(Debug)]
pub struct TimerProvider {
    clock: Arc<dyn Clock>,
}

impl TimerProvider {
    /// Provider handing `clock` to every timer it creates.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl FeatureProvider for TimerProvider {
    fn attach(&self, registry: &mut FeatureRegistry) {
        registry.attach(TimerFeature::new(self.clock.clone()));
    }
}
