//! Game entities and the collaborators the engine plays on.
//!
//! - [`entities`]: cards, seats, slots, verdicts and session phases
//! - [`board`]: the shared grid of dealt cards and player tokens
//! - [`oracle`]: set legality

pub mod board;
pub mod entities;
pub mod oracle;

pub use board::Board;
pub use entities::{Card, SeatId, SessionPhase, SlotIndex, Verdict};
pub use oracle::{FeatureOracle, SetOracle};
