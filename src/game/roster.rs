//! Participant Roster
//!
//! Capacity-bounded set of participants with per-participant status.
//! Seats are reserved with a single atomic counter so concurrent joins
//! never overshoot capacity. Sealing the roster stops admission for good.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::core::{ParticipantId, ParticipantStatus, StatusCell};

const SEALED: usize = 1 << (usize::BITS - 1);

/// Result of an admission attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// Seat taken.
    Admitted,
    /// Every seat is taken.
    Full,
    /// Roster sealed; admission is over.
    Closed,
    /// Already holds a seat.
    AlreadyJoined,
    /// Was eliminated from this match.
    Eliminated,
}

#[derive(Debug)]
struct Member {
    order: u64,
    status: StatusCell,
}

/// Participants of one match.
#[derive(Debug)]
pub struct Roster {
    members: DashMap<ParticipantId, Member>,
    seats: AtomicUsize,
    capacity: usize,
    sequence: AtomicU64,
}

impl Roster {
    /// Empty roster with `capacity` seats.
    pub fn new(capacity: usize) -> Self {
        Self {
            members: DashMap::new(),
            seats: AtomicUsize::new(0),
            capacity,
            sequence: AtomicU64::new(0),
        }
    }

    /// Try to take a seat.
    pub fn admit(&self, participant: ParticipantId) -> Admission {
        match self.members.entry(participant) {
            Entry::Occupied(existing) => {
                if existing.get().status.is_active() {
                    Admission::AlreadyJoined
                } else {
                    Admission::Eliminated
                }
            }
            Entry::Vacant(slot) => {
                let capacity = self.capacity;
                let reserved = self.seats.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                    (n & SEALED == 0 && n < capacity).then_some(n + 1)
                });

                match reserved {
                    Ok(_) => {
                        slot.insert(Member {
                            order: self.sequence.fetch_add(1, Ordering::Relaxed),
                            status: StatusCell::new(),
                        });
                        Admission::Admitted
                    }
                    Err(n) if n & SEALED != 0 => Admission::Closed,
                    Err(_) => Admission::Full,
                }
            }
        }
    }

    /// Give a seat back. Returns false if the participant held none.
    pub fn remove(&self, participant: ParticipantId) -> bool {
        if self.members.remove(&participant).is_some() {
            self.seats.fetch_sub(1, Ordering::AcqRel);
            true
        } else {
            false
        }
    }

    /// Stop admission. Seats already reserved stay valid.
    pub fn seal(&self) {
        self.seats.fetch_or(SEALED, Ordering::AcqRel);
    }

    /// Is admission over?
    pub fn is_sealed(&self) -> bool {
        self.seats.load(Ordering::Acquire) & SEALED != 0
    }

    /// Mark a participant eliminated.
    ///
    /// `None` if they hold no seat, `Some(true)` if this call eliminated
    /// them, `Some(false)` if they already were.
    pub fn eliminate(&self, participant: ParticipantId) -> Option<bool> {
        self.members
            .get(&participant)
            .map(|member| member.status.eliminate())
    }

    /// Status of a seated participant.
    pub fn status(&self, participant: ParticipantId) -> Option<ParticipantStatus> {
        self.members.get(&participant).map(|m| m.status.get())
    }

    /// Does the participant hold a seat?
    pub fn contains(&self, participant: ParticipantId) -> bool {
        self.members.contains_key(&participant)
    }

    /// Seated participants, in join order.
    pub fn in_join_order(&self) -> Vec<ParticipantId> {
        self.sorted(|_| true)
    }

    /// Participants still playing, in join order.
    pub fn alive(&self) -> Vec<ParticipantId> {
        self.sorted(StatusCell::is_active)
    }

    /// Seats taken.
    pub fn len(&self) -> usize {
        self.seats.load(Ordering::Acquire) & !SEALED
    }

    /// No seats taken?
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total seats.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every participant. The sealed flag is kept.
    pub fn clear(&self) {
        self.members.clear();
        self.seats.fetch_and(SEALED, Ordering::AcqRel);
    }

    fn sorted(&self, keep: impl Fn(&StatusCell) -> bool) -> Vec<ParticipantId> {
        let mut members: Vec<(u64, ParticipantId)> = self
            .members
            .iter()
            .filter(|entry| keep(&entry.value().status))
            .map(|entry| (entry.value().order, *entry.key()))
            .collect();
        members.sort_unstable();
        members.into_iter().map(|(_, id)| id).collect()
    }
}
