//! Computer-driven move generation.

use rand::Rng;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use super::session::PlayerSession;

#[derive(Debug, Default)]
struct GateState {
    parked: bool,
    terminated: bool,
}

/// Park/resume handshake between an AI worker and its session.
///
/// The worker acknowledges that it has stopped generating moves by parking;
/// the session reads that acknowledgment before queueing itself and is the only
/// party that resumes the worker.
#[derive(Debug, Default)]
pub struct AiGate {
    state: Mutex<GateState>,
    resumed: Condvar,
}

impl AiGate {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_parked(&self) -> bool {
        self.state().parked
    }

    /// Worker side: record that no more moves are coming until resumed
    pub fn acknowledge_park(&self) {
        let mut state = self.state();
        if !state.terminated {
            state.parked = true;
        }
    }

    /// Worker side: block while parked. Returns false once terminated.
    pub fn wait_for_resume(&self) -> bool {
        let mut state = self.state();
        while state.parked && !state.terminated {
            state = self
                .resumed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        !state.terminated
    }

    /// Session side: let the worker generate moves again
    pub fn resume(&self) {
        self.state().parked = false;
        self.resumed.notify_all();
    }

    pub fn terminate(&self) {
        let mut state = self.state();
        state.terminated = true;
        state.parked = false;
        drop(state);
        self.resumed.notify_all();
    }
}

/// Presses uniformly random dealt slots on behalf of a computer seat
pub struct AiWorker {
    session: Arc<PlayerSession>,
    gate: Arc<AiGate>,
}

impl AiWorker {
    /// `None` for human seats, which have no gate.
    pub fn new(session: Arc<PlayerSession>) -> Option<Self> {
        let gate = session.ai_gate()?.clone();
        Some(Self { session, gate })
    }

    /// Worker thread body. Returns once the session terminates.
    ///
    /// Parks whenever the session wants no moves or the board takes none,
    /// e.g. while the dealer is dealing.
    pub fn run(&self) {
        let seat = self.session.seat();
        log::info!("Computer for seat {seat} starting");

        let board = self.session.board().clone();
        let mut rng = rand::rng();
        while !self.session.is_terminated() {
            if self.session.wants_moves() && board.accepts_moves() {
                let dealt = board.dealt();
                if !dealt.is_empty() {
                    let (slot, _) = dealt[rng.random_range(0..dealt.len())];
                    self.session.toggle_move(slot);
                }
                continue;
            }

            self.gate.acknowledge_park();
            self.session.notify();
            if !self.gate.wait_for_resume() {
                break;
            }
        }

        log::info!("Computer for seat {seat} terminated");
    }
}
