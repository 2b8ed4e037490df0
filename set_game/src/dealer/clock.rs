//! Turn clock driving forced reshuffles and the countdown display.
//!
//! The clock runs on its own thread in one of two modes, fixed at startup:
//!
//! - **Countdown**: counts down to a deadline measured from the start of the
//!   current epoch. When it reaches zero the clock asks the dealer for a forced
//!   reshuffle and wakes it.
//! - **Stopwatch**: reports the time elapsed since the last reshuffle and never
//!   asks for a reshuffle on its own.
//!
//! The clock never touches the deck or grid. The dealer reads
//! [`TurnClock::reshuffle_requested`], reshuffles, and calls
//! [`TurnClock::restart`], which clears the request and resets the epoch under
//! the same lock the clock ticks under.

use enum_dispatch::enum_dispatch;
use std::{
    fmt,
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use super::queue::ValidationQueue;
use crate::{
    config::GameConfig,
    display::{DisplayEvent, DisplaySink},
};

/// How often the clock publishes
pub const CLOCK_TICK: Duration = Duration::from_millis(10);

/// What one tick of the clock observed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerEvent {
    Countdown { remaining: Duration, warn: bool },
    Expired,
    Elapsed(Duration),
}

impl TimerEvent {
    pub fn to_display(self) -> DisplayEvent {
        match self {
            Self::Countdown { remaining, warn } => DisplayEvent::countdown(remaining, warn),
            Self::Expired => DisplayEvent::countdown(Duration::ZERO, true),
            Self::Elapsed(elapsed) => DisplayEvent::elapsed(elapsed),
        }
    }
}

/// One mode's reading of the time since the epoch started
#[enum_dispatch]
pub trait ClockStrategy {
    fn tick(&self, since_epoch: Duration) -> TimerEvent;

    /// Final value published when the clock shuts down
    fn settle(&self) -> DisplayEvent;
}

/// Bounded countdown to a forced reshuffle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Countdown {
    pub timeout: Duration,
    pub warning: Duration,
}

impl ClockStrategy for Countdown {
    fn tick(&self, since_epoch: Duration) -> TimerEvent {
        let remaining = self.timeout.saturating_sub(since_epoch);
        if remaining.is_zero() {
            TimerEvent::Expired
        } else {
            TimerEvent::Countdown {
                remaining,
                warn: remaining <= self.warning,
            }
        }
    }

    fn settle(&self) -> DisplayEvent {
        DisplayEvent::countdown(Duration::ZERO, false)
    }
}

/// Unbounded elapsed-time display
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stopwatch;

impl ClockStrategy for Stopwatch {
    fn tick(&self, since_epoch: Duration) -> TimerEvent {
        TimerEvent::Elapsed(since_epoch)
    }

    fn settle(&self) -> DisplayEvent {
        DisplayEvent::elapsed(Duration::ZERO)
    }
}

#[enum_dispatch(ClockStrategy)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockMode {
    Countdown,
    Stopwatch,
}

impl ClockMode {
    pub fn from_config(config: &GameConfig) -> Self {
        if config.turn_timeout_millis > 0 {
            Self::Countdown(Countdown {
                timeout: Duration::from_millis(config.turn_timeout_millis),
                warning: Duration::from_millis(config.turn_timeout_warning_millis),
            })
        } else {
            Self::Stopwatch(Stopwatch)
        }
    }

    pub fn is_stopwatch(&self) -> bool {
        matches!(self, Self::Stopwatch(_))
    }
}

impl fmt::Display for ClockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Countdown(countdown) => {
                write!(f, "countdown {}ms", countdown.timeout.as_millis())
            }
            Self::Stopwatch(_) => write!(f, "stopwatch"),
        }
    }
}

#[derive(Debug)]
struct Epoch {
    started: Instant,
    reshuffle_requested: bool,
    terminated: bool,
}

/// Background timer shared between its own thread and the dealer
pub struct TurnClock {
    mode: ClockMode,
    epoch: Mutex<Epoch>,
    wake: Condvar,
    display: Arc<dyn DisplaySink>,
    dealer_inbox: Arc<ValidationQueue>,
}

impl TurnClock {
    pub fn new(
        mode: ClockMode,
        display: Arc<dyn DisplaySink>,
        dealer_inbox: Arc<ValidationQueue>,
    ) -> Self {
        Self {
            mode,
            epoch: Mutex::new(Epoch {
                started: Instant::now(),
                reshuffle_requested: false,
                terminated: false,
            }),
            wake: Condvar::new(),
            display,
            dealer_inbox,
        }
    }

    fn epoch(&self) -> MutexGuard<'_, Epoch> {
        self.epoch.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn mode(&self) -> ClockMode {
        self.mode
    }

    /// Start a new epoch and forget any pending reshuffle request
    pub fn restart(&self) {
        let mut epoch = self.epoch();
        epoch.started = Instant::now();
        epoch.reshuffle_requested = false;
    }

    /// True once a countdown has expired and the dealer has not yet restarted the clock
    pub fn reshuffle_requested(&self) -> bool {
        self.epoch().reshuffle_requested
    }

    pub fn terminate(&self) {
        self.epoch().terminated = true;
        self.wake.notify_all();
    }

    /// Clock thread body. Returns after [`terminate`](Self::terminate).
    pub fn run(&self) {
        log::info!("Turn clock starting ({})", self.mode);

        let mut epoch = self.epoch();
        while !epoch.terminated {
            let event = self.mode.tick(epoch.started.elapsed());
            let fire = event == TimerEvent::Expired && !epoch.reshuffle_requested;
            if fire {
                epoch.reshuffle_requested = true;
            }
            drop(epoch);

            self.display.publish(event.to_display());
            if fire {
                log::debug!("Turn timed out, requesting a reshuffle");
                self.dealer_inbox.nudge();
            }

            epoch = self.epoch();
            if epoch.terminated {
                break;
            }
            epoch = self
                .wake
                .wait_timeout(epoch, CLOCK_TICK)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        drop(epoch);

        self.display.publish(self.mode.settle());
        log::info!("Turn clock terminated");
    }
}
