//! # Set Game
//!
//! A concurrent engine for the Set card game: several players race to spot
//! sets of cards on a shared grid while a single dealer judges their picks.
//!
//! ## Architecture
//!
//! Every participant runs on its own thread:
//!
//! - **Dealer**: owns the deck and the grid, judges queued selections one at
//!   a time, refills the grid and forces reshuffles
//! - **Player sessions**: one per seat, collecting moves until a selection is
//!   complete, then waiting for a verdict and serving its freeze
//! - **Computer workers**: feed random moves into a computer seat's session
//! - **Turn clock**: counts down to a forced reshuffle, or shows elapsed time
//!
//! Threads are started in dependency order and joined in reverse.
//!
//! ## Core Modules
//!
//! - [`game`]: cards, the shared board and set legality
//! - [`player`]: per-seat sessions and computer workers
//! - [`dealer`]: the coordinator, its validation queue and the turn clock
//! - [`lifecycle`]: starting, stopping and joining a game
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use set_game::{GameConfig, GameHandle, LogDisplay};
//!
//! let mut game = GameHandle::start(GameConfig::default(), Arc::new(LogDisplay)).unwrap();
//! game.shutdown();
//! let outcome = game.join().unwrap();
//! println!("Winners: {:?}", outcome.winners);
//! ```

pub mod config;
pub mod dealer;
pub mod display;
pub mod errors;
pub mod game;
pub mod lifecycle;
pub mod player;

pub use config::{ConfigError, GameConfig};
pub use dealer::{ClockMode, Dealer, GameOutcome, Leaderboard, TurnClock, ValidationQueue};
pub use display::{DisplayEvent, DisplaySink, EventRecorder, LogDisplay};
pub use errors::{GameError, Result};
pub use game::{Board, Card, FeatureOracle, SeatId, SessionPhase, SetOracle, SlotIndex, Verdict};
pub use lifecycle::{GameControl, GameHandle, ShutdownTrigger, WorkerStack};
pub use player::{AiWorker, PlayerSession, SessionSnapshot};
