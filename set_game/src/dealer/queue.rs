//! Seats waiting for the dealer to judge their selection.

use std::{
    collections::VecDeque,
    sync::{Condvar, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use crate::game::entities::SeatId;

#[derive(Debug, Default)]
struct Pending {
    seats: VecDeque<SeatId>,
    nudged: bool,
}

/// FIFO of seats awaiting a verdict. Many producers, one consumer.
#[derive(Debug, Default)]
pub struct ValidationQueue {
    pending: Mutex<Pending>,
    available: Condvar,
}

impl ValidationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn pending(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `seat` unless it is already waiting. Returns whether it was added.
    pub fn enqueue(&self, seat: SeatId) -> bool {
        let mut pending = self.pending();
        if pending.seats.contains(&seat) {
            log::warn!("Seat {seat} is already waiting for a verdict");
            return false;
        }
        pending.seats.push_back(seat);
        drop(pending);

        self.available.notify_one();
        true
    }

    /// Wait up to `timeout` for the next seat. Returns `None` on timeout or
    /// when [`nudge`](Self::nudge) wakes the consumer with nothing queued.
    pub fn poll(&self, timeout: Duration) -> Option<SeatId> {
        let deadline = Instant::now() + timeout;
        let mut pending = self.pending();
        loop {
            if let Some(seat) = pending.seats.pop_front() {
                return Some(seat);
            }
            if std::mem::take(&mut pending.nudged) {
                return None;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            pending = self
                .available
                .wait_timeout(pending, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Drop `seat` from the queue. Returns whether it was waiting.
    pub fn remove(&self, seat: SeatId) -> bool {
        let mut pending = self.pending();
        let before = pending.seats.len();
        pending.seats.retain(|&s| s != seat);
        before != pending.seats.len()
    }

    /// Wake the consumer so it can service something other than the queue.
    pub fn nudge(&self) {
        self.pending().nudged = true;
        self.available.notify_all();
    }

    pub fn contains(&self, seat: SeatId) -> bool {
        self.pending().seats.contains(&seat)
    }

    pub fn len(&self) -> usize {
        self.pending().seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending().seats.is_empty()
    }
}
