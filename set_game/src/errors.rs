//! Error types for the game engine.

use thiserror::Error;

use crate::{config::ConfigError, game::entities::SeatId};

/// Errors surfaced at the engine's API boundary
#[derive(Debug, Error)]
pub enum GameError {
    /// Configuration rejected before the game started
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The OS refused to start a worker thread
    #[error("Failed to spawn {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// A worker thread panicked instead of returning
    #[error("Worker {0} panicked")]
    WorkerPanicked(String),

    /// No session sits at this seat
    #[error("Unknown seat: {0}")]
    UnknownSeat(SeatId),

    /// The game was already joined
    #[error("Game already joined")]
    AlreadyJoined,
}

/// Result type for game operations
pub type Result<T> = std::result::Result<T, GameError>;
