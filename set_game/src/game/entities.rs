use serde::{Deserialize, Serialize};
use std::fmt;

/// Seat index, starting from 0. Humans take the lowest seats.
pub type SeatId = usize;

/// Grid slot index in row-major order.
pub type SlotIndex = usize;

/// A card identifier in `0..deck_size`. The card's features are the digits of
/// the id written in base `feature_size`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Card(pub u32);

impl Card {
    /// Feature values of this card, least significant feature first.
    pub fn features(self, feature_size: usize, feature_count: usize) -> Vec<u32> {
        let base = feature_size as u32;
        let mut id = self.0;
        let mut features = Vec::with_capacity(feature_count);
        for _ in 0..feature_count {
            features.push(id % base);
            id /= base;
        }
        features
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The coordinator's judgment on a submitted selection.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Verdict {
    /// The selection was a legal set.
    Scored,
    /// The selection was not a legal set.
    Penalized,
    /// A selected card left the grid before the selection was judged.
    Invalidated,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Scored => "scored",
            Self::Penalized => "penalized",
            Self::Invalidated => "invalidated",
        };
        write!(f, "{repr}")
    }
}

/// Where a session is in its collect / judge / freeze cycle.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum SessionPhase {
    Collecting,
    AwaitingVerdict,
    Resolved(Verdict),
    Terminated,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Collecting => write!(f, "collecting"),
            Self::AwaitingVerdict => write!(f, "awaiting verdict"),
            Self::Resolved(verdict) => write!(f, "resolved ({verdict})"),
            Self::Terminated => write!(f, "terminated"),
        }
    }
}
