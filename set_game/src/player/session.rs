//! Per-seat selection state machine.
//!
//! A session collects tentative moves until it holds `feature_size` of them,
//! queues itself for judgment, blocks until the dealer hands back a verdict,
//! serves the resulting freeze, and starts collecting again:
//!
//! ```text
//! Collecting -> AwaitingVerdict -> Resolved(Scored | Penalized | Invalidated) -> Collecting
//! ```
//!
//! `Terminated` is reachable from every phase. All fields are guarded by the
//! session's own lock; the dealer writes verdicts, admissibility and freeze
//! durations under that same lock.

use std::{
    sync::{
        Arc, Condvar, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use super::ai::AiGate;
use crate::{
    dealer::queue::ValidationQueue,
    display::{DisplayEvent, DisplaySink},
    game::{
        board::Board,
        entities::{Card, SeatId, SessionPhase, SlotIndex, Verdict},
    },
};

/// Granularity of the published freeze countdown
pub const FREEZE_TICK: Duration = Duration::from_secs(1);

/// A completed selection as it looked when the session queued itself
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Submission {
    /// Board generation at submission time
    pub generation: u64,
    /// Each selected slot and the card it held
    pub picks: Vec<(SlotIndex, Option<Card>)>,
}

/// Point-in-time copy of a session's state
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Seat the session plays for
    pub seat: SeatId,
    /// Whether moves come from a person rather than an AI worker
    pub human: bool,
    /// Where the session stands in its selection cycle
    pub phase: SessionPhase,
    /// Selected slots, oldest first
    pub pending: Vec<SlotIndex>,
    /// Whether a new selection may be added
    pub admissible: bool,
    /// Sets collected so far
    pub score: u32,
    /// Freeze the session must serve after its last verdict
    pub suspend_for: Duration,
}

#[derive(Debug)]
struct SessionState {
    phase: SessionPhase,
    pending: Vec<SlotIndex>,
    admissible: bool,
    score: u32,
    suspend_for: Duration,
    submission: Option<Submission>,
}

impl SessionState {
    fn wants_moves(&self, feature_size: usize) -> bool {
        self.phase == SessionPhase::Collecting
            && (self.pending.len() < feature_size || !self.admissible)
    }
}

/// One seat's moves, score and freeze state, shared by its input source and
/// the dealer
pub struct PlayerSession {
    seat: SeatId,
    human: bool,
    feature_size: usize,
    state: Mutex<SessionState>,
    changed: Condvar,
    terminated: AtomicBool,
    board: Arc<Board>,
    queue: Arc<ValidationQueue>,
    display: Arc<dyn DisplaySink>,
    /// Park/resume handshake with this seat's AI worker, if any
    ai: Option<Arc<AiGate>>,
}

impl PlayerSession {
    /// Create a collecting session; computer seats get an [`AiGate`]
    pub fn new(
        seat: SeatId,
        human: bool,
        feature_size: usize,
        board: Arc<Board>,
        queue: Arc<ValidationQueue>,
        display: Arc<dyn DisplaySink>,
    ) -> Self {
        Self {
            seat,
            human,
            feature_size,
            state: Mutex::new(SessionState {
                phase: SessionPhase::Collecting,
                pending: Vec::with_capacity(feature_size),
                admissible: true,
                score: 0,
                suspend_for: Duration::ZERO,
                submission: None,
            }),
            changed: Condvar::new(),
            terminated: AtomicBool::new(false),
            board,
            queue,
            display,
            ai: (!human).then(|| Arc::new(AiGate::new())),
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, state: MutexGuard<'a, SessionState>) -> MutexGuard<'a, SessionState> {
        self.changed
            .wait(state)
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Get the seat id
    pub fn seat(&self) -> SeatId {
        self.seat
    }

    /// Whether a person plays this seat
    pub fn is_human(&self) -> bool {
        self.human
    }

    /// Board this seat plays on
    pub fn board(&self) -> &Arc<Board> {
        &self.board
    }

    /// Park/resume handshake for computer seats, `None` for humans
    pub fn ai_gate(&self) -> Option<&Arc<AiGate>> {
        self.ai.as_ref()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    /// Get the current score
    pub fn score(&self) -> u32 {
        self.state().score
    }

    /// Copy the session state under its lock
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state();
        SessionSnapshot {
            seat: self.seat,
            human: self.human,
            phase: state.phase,
            pending: state.pending.clone(),
            admissible: state.admissible,
            score: state.score,
            suspend_for: state.suspend_for,
        }
    }

    /// Wake the session thread so it re-examines its state
    pub fn notify(&self) {
        drop(self.state());
        self.changed.notify_all();
    }

    /// Select `slot`, or deselect it if already selected.
    ///
    /// Ignored while the dealer is (re)dealing, when the slot holds no card,
    /// and outside the `Collecting` phase. A new selection additionally needs
    /// the session to be admissible and below `feature_size` moves. Returns
    /// whether anything changed.
    pub fn toggle_move(&self, slot: SlotIndex) -> bool {
        if self.is_terminated() || !self.board.placement_stable() {
            return false;
        }
        if self.board.card_at(slot).is_none() {
            return false;
        }

        let mut state = self.state();
        if state.phase != SessionPhase::Collecting {
            return false;
        }

        let toggled = if let Some(pos) = state.pending.iter().position(|&s| s == slot) {
            state.pending.remove(pos);
            self.board.remove_token(self.seat, slot);
            state.admissible = true;
            true
        } else if state.admissible
            && state.pending.len() < self.feature_size
            && self.board.place_token(self.seat, slot)
        {
            state.pending.push(slot);
            true
        } else {
            false
        };
        drop(state);

        if toggled {
            self.changed.notify_all();
        }
        toggled
    }

    /// Whether the AI worker should keep generating moves
    pub fn wants_moves(&self) -> bool {
        !self.is_terminated() && self.state().wants_moves(self.feature_size)
    }

    fn ready_to_submit(&self, state: &SessionState) -> bool {
        !self.is_terminated()
            && state.phase == SessionPhase::Collecting
            && state.admissible
            && state.pending.len() == self.feature_size
            && self.ai.as_ref().is_none_or(|gate| gate.is_parked())
    }

    fn submit(&self, state: &mut SessionState) {
        let generation = self.board.generation();
        let picks = state
            .pending
            .iter()
            .map(|&slot| (slot, self.board.card_at(slot)))
            .collect();
        state.submission = Some(Submission { generation, picks });
        state.phase = SessionPhase::AwaitingVerdict;
        self.queue.enqueue(self.seat);
        log::debug!("Seat {} submitted slots {:?}", self.seat, state.pending);
    }

    /// Queue the current selection if it is complete. Returns whether it was queued.
    pub fn try_submit(&self) -> bool {
        let mut state = self.state();
        if !self.ready_to_submit(&state) {
            return false;
        }
        self.submit(&mut state);
        true
    }

    /// The selection the dealer should judge, if one is outstanding
    pub fn submission(&self) -> Option<Submission> {
        let state = self.state();
        match state.phase {
            SessionPhase::AwaitingVerdict => state.submission.clone(),
            _ => None,
        }
    }

    /// Block until a complete selection is queued. Returns false on termination.
    fn wait_until_submitted(&self) -> bool {
        let mut state = self.state();
        loop {
            if self.is_terminated() {
                return false;
            }
            if self.ready_to_submit(&state) {
                self.submit(&mut state);
                return true;
            }
            if let Some(gate) = &self.ai {
                if state.wants_moves(self.feature_size)
                    && self.board.accepts_moves()
                    && gate.is_parked()
                {
                    gate.resume();
                }
            }
            state = self.wait(state);
        }
    }

    /// Block until the dealer resolves the outstanding submission. `None` on termination.
    pub fn await_verdict(&self) -> Option<Verdict> {
        let mut state = self.state();
        while state.phase == SessionPhase::AwaitingVerdict && !self.is_terminated() {
            state = self.wait(state);
        }
        match state.phase {
            SessionPhase::Resolved(verdict) if !self.is_terminated() => Some(verdict),
            _ => None,
        }
    }

    /// Count the freeze down, then return to `Collecting`.
    ///
    /// A penalized session drops its tokens and is re-admitted once the freeze
    /// is over.
    pub fn serve_freeze(&self, verdict: Verdict) {
        let mut state = self.state();
        let deadline = Instant::now() + state.suspend_for;
        loop {
            if self.is_terminated() {
                break;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            self.display
                .publish(DisplayEvent::freeze(self.seat, remaining));
            state = self
                .changed
                .wait_timeout(state, remaining.min(FREEZE_TICK))
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        self.display
            .publish(DisplayEvent::freeze(self.seat, Duration::ZERO));

        if self.is_terminated() {
            return;
        }

        if verdict == Verdict::Penalized {
            self.clear_tokens(&mut state);
            state.admissible = true;
        }
        state.phase = SessionPhase::Collecting;
        state.suspend_for = Duration::ZERO;
        state.submission = None;
        drop(state);

        self.changed.notify_all();
        if let Some(gate) = &self.ai {
            gate.resume();
        }
    }

    /// Session thread body. Returns after [`terminate`](Self::terminate).
    pub fn run(&self) {
        log::info!(
            "Seat {} starting ({})",
            self.seat,
            if self.human { "human" } else { "computer" }
        );

        while self.wait_until_submitted() {
            match self.await_verdict() {
                Some(verdict) => self.serve_freeze(verdict),
                None => break,
            }
        }

        self.retire();
        log::info!("Seat {} terminated", self.seat);
    }

    fn retire(&self) {
        self.queue.remove(self.seat);

        let mut state = self.state();
        self.clear_tokens(&mut state);
        state.phase = SessionPhase::Terminated;
        state.submission = None;
        drop(state);

        self.changed.notify_all();
        if let Some(gate) = &self.ai {
            gate.terminate();
        }
    }

    /// Apply the dealer's judgment. Returns the session's score afterwards.
    pub(crate) fn apply_verdict(&self, verdict: Verdict, freeze: Duration) -> u32 {
        let mut state = self.state();
        if state.phase != SessionPhase::AwaitingVerdict {
            log::warn!(
                "Seat {} is {} and cannot take a {verdict} verdict",
                self.seat,
                state.phase
            );
            return state.score;
        }

        match verdict {
            Verdict::Scored => {
                state.score += 1;
                self.display.publish(DisplayEvent::Score {
                    seat: self.seat,
                    score: state.score,
                });
                state.suspend_for = freeze;
            }
            Verdict::Penalized => {
                state.admissible = false;
                self.queue.remove(self.seat);
                state.suspend_for = freeze;
            }
            Verdict::Invalidated => {
                self.clear_tokens(&mut state);
                state.admissible = true;
                state.suspend_for = Duration::ZERO;
            }
        }
        state.phase = SessionPhase::Resolved(verdict);
        state.submission = None;
        let score = state.score;
        drop(state);

        self.changed.notify_all();
        score
    }

    /// Drop `slot` from the selection because its card left the grid.
    pub(crate) fn remove_slot(&self, slot: SlotIndex) -> bool {
        let mut state = self.state();
        let Some(pos) = state.pending.iter().position(|&s| s == slot) else {
            return false;
        };
        state.pending.remove(pos);
        self.board.remove_token(self.seat, slot);
        state.admissible = true;
        drop(state);

        self.changed.notify_all();
        true
    }

    /// Drop the whole selection, e.g. when the grid is reshuffled
    pub fn remove_all_tokens(&self) {
        let mut state = self.state();
        self.clear_tokens(&mut state);
        drop(state);
        self.changed.notify_all();
    }

    fn clear_tokens(&self, state: &mut SessionState) {
        for slot in state.pending.drain(..) {
            self.board.remove_token(self.seat, slot);
        }
    }

    /// Allow new selections again
    pub fn readmit(&self) {
        self.state().admissible = true;
        self.changed.notify_all();
    }

    /// Ask the session (and its AI worker) to stop. Wakes every blocked wait.
    pub fn terminate(&self) {
        self.terminated.store(true, Ordering::Release);
        self.notify();
        if let Some(gate) = &self.ai {
            gate.terminate();
        }
    }
}
