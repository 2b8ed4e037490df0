//! Starting, stopping and joining a running game.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
};

use crate::{
    config::GameConfig,
    dealer::{Dealer, GameOutcome, ValidationQueue},
    display::DisplaySink,
    errors::{GameError, Result},
    game::{
        board::Board,
        entities::{SeatId, SlotIndex},
        oracle::{FeatureOracle, SetOracle},
    },
    player::PlayerSession,
};

/// Threads joined newest first, so each worker outlives everything it
/// depends on.
#[derive(Debug, Default)]
pub struct WorkerStack {
    workers: Vec<(String, JoinHandle<()>)>,
}

impl WorkerStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a named worker thread.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Spawn`] if the OS refuses to create the thread.
    pub fn spawn<F>(&mut self, name: impl Into<String>, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let name = name.into();
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(f)
            .map_err(|source| GameError::Spawn {
                name: name.clone(),
                source,
            })?;
        log::debug!("Spawned {name}");
        self.workers.push((name, handle));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Join every worker in reverse spawn order. Returns the names of
    /// workers that panicked.
    pub fn join_all(&mut self) -> Vec<String> {
        let mut panicked = Vec::new();
        while let Some((name, handle)) = self.workers.pop() {
            match handle.join() {
                Ok(()) => log::debug!("Joined {name}"),
                Err(_) => {
                    log::error!("{name} panicked");
                    panicked.push(name);
                }
            }
        }
        panicked
    }
}

/// Game-wide shutdown flag
#[derive(Debug, Default)]
pub struct GameControl {
    terminated: AtomicBool,
}

impl GameControl {
    pub fn request_shutdown(&self) {
        if !self.terminated.swap(true, Ordering::AcqRel) {
            log::info!("Shutdown requested");
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }
}

/// Cloneable handle that can stop a game from anywhere, e.g. a signal handler
#[derive(Clone)]
pub struct ShutdownTrigger {
    control: Arc<GameControl>,
    queue: Arc<ValidationQueue>,
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        self.control.request_shutdown();
        self.queue.nudge();
    }
}

/// A game running on its own dealer thread
pub struct GameHandle {
    board: Arc<Board>,
    sessions: Vec<Arc<PlayerSession>>,
    trigger: ShutdownTrigger,
    dealer: Option<JoinHandle<Result<GameOutcome>>>,
}

impl GameHandle {
    /// Start a game judged by the standard feature rules.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is invalid or the dealer thread cannot start.
    pub fn start(config: GameConfig, display: Arc<dyn DisplaySink>) -> Result<Self> {
        let oracle = Arc::new(FeatureOracle::new(config.feature_size, config.feature_count));
        Self::start_with_oracle(config, oracle, display)
    }

    /// Start a game judged by `oracle`.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is invalid or the dealer thread cannot start.
    pub fn start_with_oracle(
        config: GameConfig,
        oracle: Arc<dyn SetOracle>,
        display: Arc<dyn DisplaySink>,
    ) -> Result<Self> {
        let control = Arc::new(GameControl::default());
        let dealer = Dealer::new(config, oracle, display, control.clone())?;

        let board = dealer.board().clone();
        let sessions = dealer.sessions().to_vec();
        let trigger = ShutdownTrigger {
            control,
            queue: dealer.queue().clone(),
        };

        let handle = thread::Builder::new()
            .name("dealer".to_string())
            .spawn(move || dealer.run())
            .map_err(|source| GameError::Spawn {
                name: "dealer".to_string(),
                source,
            })?;

        Ok(Self {
            board,
            sessions,
            trigger,
            dealer: Some(handle),
        })
    }

    pub fn board(&self) -> &Arc<Board> {
        &self.board
    }

    pub fn sessions(&self) -> &[Arc<PlayerSession>] {
        &self.sessions
    }

    /// # Errors
    ///
    /// Returns [`GameError::UnknownSeat`] if no session sits at `seat`.
    pub fn session(&self, seat: SeatId) -> Result<&Arc<PlayerSession>> {
        self.sessions.get(seat).ok_or(GameError::UnknownSeat(seat))
    }

    /// Forward a key press for `seat`. Returns whether the selection changed.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownSeat`] if no session sits at `seat`.
    pub fn toggle_move(&self, seat: SeatId, slot: SlotIndex) -> Result<bool> {
        Ok(self.session(seat)?.toggle_move(slot))
    }

    pub fn shutdown_trigger(&self) -> ShutdownTrigger {
        self.trigger.clone()
    }

    pub fn shutdown(&self) {
        self.trigger.trigger();
    }

    /// Whether the dealer thread has returned
    pub fn is_finished(&self) -> bool {
        self.dealer.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait for the game to end and collect the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::AlreadyJoined`] on a second call,
    /// [`GameError::WorkerPanicked`] if the dealer panicked, or whatever the
    /// dealer itself returned.
    pub fn join(&mut self) -> Result<GameOutcome> {
        let handle = self.dealer.take().ok_or(GameError::AlreadyJoined)?;
        handle
            .join()
            .map_err(|_| GameError::WorkerPanicked("dealer".to_string()))?
    }
}

impl Drop for GameHandle {
    fn drop(&mut self) {
        if self.dealer.is_some() {
            self.shutdown();
            if let Err(err) = self.join() {
                log::error!("Game ended with an error: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_workers_named_and_joined() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut workers = WorkerStack::new();
        for name in ["first", "second", "third"] {
            let seen = seen.clone();
            workers
                .spawn(name, move || {
                    let current = thread::current().name().map(str::to_string);
                    seen.lock().unwrap().push(current);
                })
                .unwrap();
        }
        assert_eq!(workers.len(), 3);

        assert!(workers.join_all().is_empty());
        assert!(workers.is_empty());

        let mut seen = seen.lock().unwrap().clone();
        seen.sort();
        assert_eq!(
            seen,
            vec![
                Some("first".to_string()),
                Some("second".to_string()),
                Some("third".to_string())
            ]
        );
    }

    #[test]
    fn test_panicked_worker_reported() {
        let mut workers = WorkerStack::new();
        workers.spawn("calm", || {}).unwrap();
        workers.spawn("doomed", || panic!("boom")).unwrap();
        assert_eq!(workers.join_all(), vec!["doomed".to_string()]);
    }

    #[test]
    fn test_shutdown_flag() {
        let control = GameControl::default();
        assert!(!control.is_terminated());
        control.request_shutdown();
        control.request_shutdown();
        assert!(control.is_terminated());
    }
}
