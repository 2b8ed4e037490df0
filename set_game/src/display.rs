//! Display sink for everything the game wants a player to see.
//!
//! The engine never renders anything itself. It publishes [`DisplayEvent`]s to
//! a [`DisplaySink`], which may log them, record them, or forward them to a UI.

use serde::Serialize;
use std::{
    fmt,
    sync::{Mutex, PoisonError},
    time::Duration,
};

use crate::game::entities::{Card, SeatId, SlotIndex};

/// Everything the engine publishes for display
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DisplayEvent {
    PlaceCard { card: Card, slot: SlotIndex },
    RemoveCard { slot: SlotIndex },
    PlaceToken { seat: SeatId, slot: SlotIndex },
    RemoveToken { seat: SeatId, slot: SlotIndex },
    Countdown { remaining_ms: u64, warn: bool },
    Elapsed { elapsed_ms: u64 },
    Freeze { seat: SeatId, remaining_ms: u64 },
    Score { seat: SeatId, score: u32 },
    Winners { seats: Vec<SeatId> },
}

impl DisplayEvent {
    pub fn countdown(remaining: Duration, warn: bool) -> Self {
        Self::Countdown {
            remaining_ms: millis(remaining),
            warn,
        }
    }

    pub fn elapsed(elapsed: Duration) -> Self {
        Self::Elapsed {
            elapsed_ms: millis(elapsed),
        }
    }

    pub fn freeze(seat: SeatId, remaining: Duration) -> Self {
        Self::Freeze {
            seat,
            remaining_ms: millis(remaining),
        }
    }

    /// Periodic clock and freeze updates, as opposed to state changes
    pub fn is_tick(&self) -> bool {
        matches!(
            self,
            Self::Countdown { .. } | Self::Elapsed { .. } | Self::Freeze { .. }
        )
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl fmt::Display for DisplayEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlaceCard { card, slot } => write!(f, "card {card} placed on slot {slot}"),
            Self::RemoveCard { slot } => write!(f, "slot {slot} cleared"),
            Self::PlaceToken { seat, slot } => write!(f, "seat {seat} marked slot {slot}"),
            Self::RemoveToken { seat, slot } => write!(f, "seat {seat} unmarked slot {slot}"),
            Self::Countdown { remaining_ms, warn } => {
                let marker = if *warn { " (hurry!)" } else { "" };
                write!(f, "reshuffle in {remaining_ms}ms{marker}")
            }
            Self::Elapsed { elapsed_ms } => write!(f, "{elapsed_ms}ms since last reshuffle"),
            Self::Freeze { seat, remaining_ms } => {
                write!(f, "seat {seat} frozen for {remaining_ms}ms")
            }
            Self::Score { seat, score } => write!(f, "seat {seat} has {score} point(s)"),
            Self::Winners { seats } => {
                let seats: Vec<String> = seats.iter().map(ToString::to_string).collect();
                write!(f, "winner(s): seat {}", seats.join(", seat "))
            }
        }
    }
}

/// Receives display events from any game thread
pub trait DisplaySink: Send + Sync {
    fn publish(&self, event: DisplayEvent);
}

/// Renders display events through the `log` facade
#[derive(Clone, Copy, Debug, Default)]
pub struct LogDisplay;

impl DisplaySink for LogDisplay {
    fn publish(&self, event: DisplayEvent) {
        match event {
            DisplayEvent::Score { .. } | DisplayEvent::Winners { .. } => log::info!("{event}"),
            ref tick if tick.is_tick() => log::trace!("{event}"),
            _ => log::debug!("{event}"),
        }
    }
}

/// Keeps every published event in memory
#[derive(Debug, Default)]
pub struct EventRecorder {
    events: Mutex<Vec<DisplayEvent>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every event published so far
    pub fn events(&self) -> Vec<DisplayEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Events matching `filter`, in publication order
    pub fn matching(&self, filter: impl Fn(&DisplayEvent) -> bool) -> Vec<DisplayEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|event| filter(event))
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl DisplaySink for EventRecorder {
    fn publish(&self, event: DisplayEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
