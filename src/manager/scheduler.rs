//! Arena Scheduler
//!
//! Drives arena ticks on the tokio runtime. In shared mode one loop ticks
//! every arena in turn; in dedicated mode every arena gets its own periodic
//! task, spawned when the manager announces the arena and stopped once the
//! arena is removed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use super::{ArenaEvent, ArenaManager};
use crate::arena::{Arena, TickStatus};
use crate::core::SchedulingMode;

/// Periodic driver for a manager's arenas.
pub struct ArenaScheduler {
    manager: Arc<ArenaManager>,
    shutdown_tx: broadcast::Sender<()>,
}

impl ArenaScheduler {
    /// Scheduler for `manager`, using the manager's config.
    pub fn new(manager: Arc<ArenaManager>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            manager,
            shutdown_tx,
        }
    }

    /// Start ticking. The handle completes after [`ArenaScheduler::shutdown`].
    pub fn spawn(&self) -> JoinHandle<()> {
        let manager = self.manager.clone();
        let period = manager.config().tick_period;

        match manager.config().scheduling {
            SchedulingMode::Shared => {
                let shutdown_rx = self.shutdown_tx.subscribe();
                tokio::spawn(run_shared_loop(manager, period, shutdown_rx))
            }
            SchedulingMode::Dedicated => {
                let shutdown_tx = self.shutdown_tx.clone();
                tokio::spawn(run_dispatch_loop(manager, period, shutdown_tx))
            }
        }
    }

    /// Stop every loop this scheduler started.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Tick all arenas from one loop.
#[instrument(skip_all, fields(period_ms = period.as_millis() as u64))]
async fn run_shared_loop(
    manager: Arc<ArenaManager>,
    period: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut tick_interval = interval(period);
    tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!("Shared arena loop started");

    loop {
        tokio::select! {
            _ = tick_interval.tick() => {
                manager.tick_all();
            }
            _ = shutdown_rx.recv() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }
}

/// Spawn and reap one loop per arena as arenas come and go.
#[instrument(skip_all, fields(period_ms = period.as_millis() as u64))]
async fn run_dispatch_loop(
    manager: Arc<ArenaManager>,
    period: Duration,
    shutdown_tx: broadcast::Sender<()>,
) {
    let mut events = manager.subscribe();
    let mut shutdown_rx = shutdown_tx.subscribe();
    let mut loops: HashMap<String, JoinHandle<()>> = HashMap::new();

    // Arenas created before the scheduler started.
    for arena in manager.arenas() {
        ensure_loop(&mut loops, &manager, arena, period, &shutdown_tx);
    }
    info!(arenas = loops.len(), "Dedicated arena dispatch started");

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(ArenaEvent::Created(name)) => {
                        if let Some(arena) = manager.get_arena(&name) {
                            ensure_loop(&mut loops, &manager, arena, period, &shutdown_tx);
                        }
                    }
                    Ok(ArenaEvent::Removed(name)) => {
                        loops.remove(&name);
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "Arena events lagged, resyncing");
                        loops.retain(|_, handle| !handle.is_finished());
                        for arena in manager.arenas() {
                            ensure_loop(&mut loops, &manager, arena, period, &shutdown_tx);
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    for (_, handle) in loops.drain() {
        handle.abort();
        let _ = handle.await;
    }
}

fn ensure_loop(
    loops: &mut HashMap<String, JoinHandle<()>>,
    manager: &Arc<ArenaManager>,
    arena: Arc<Arena>,
    period: Duration,
    shutdown_tx: &broadcast::Sender<()>,
) {
    if loops.contains_key(arena.name()) || arena.is_removed() {
        return;
    }
    let name = arena.name().to_string();
    let handle = tokio::spawn(run_arena_loop(
        manager.clone(),
        arena,
        period,
        shutdown_tx.subscribe(),
    ));
    loops.insert(name, handle);
}

/// Tick a single arena until it is removed.
#[instrument(skip_all, fields(arena = %arena.name()))]
async fn run_arena_loop(
    manager: Arc<ArenaManager>,
    arena: Arc<Arena>,
    period: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut tick_interval = interval(period);
    tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tick_interval.tick() => {
                if manager.tick_arena(&arena) == TickStatus::Removed || arena.is_removed() {
                    break;
                }
            }
            _ = shutdown_rx.recv() => break,
        }
    }
    debug!(ticks = arena.tick_count(), "Arena loop stopped");
}
