//! Game configuration models.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::dealer::clock::ClockMode;

/// Configuration error types
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration for {field}: {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Game configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Number of cards that make up a candidate set (default: 3)
    pub feature_size: usize,

    /// Number of features encoded in each card id (default: 4)
    pub feature_count: usize,

    /// Grid rows
    pub rows: usize,

    /// Grid columns
    pub columns: usize,

    /// Card ids run from 0 to `deck_size - 1`
    pub deck_size: usize,

    /// Seats driven by external input
    pub human_players: usize,

    /// Seats driven by an AI worker
    pub computer_players: usize,

    /// Countdown until a forced reshuffle. Zero selects stopwatch mode.
    pub turn_timeout_millis: u64,

    /// Countdown values at or below this are flagged as a warning
    pub turn_timeout_warning_millis: u64,

    /// Freeze applied after a legal set
    pub point_freeze_millis: u64,

    /// Freeze applied after an illegal set
    pub penalty_freeze_millis: u64,

    /// Delay between refilling individual slots after a legal set
    pub table_delay_millis: u64,

    /// Log the legal sets on the grid after every deal
    pub hints: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            feature_size: 3,
            feature_count: 4,
            rows: 3,
            columns: 4,
            deck_size: 81,
            human_players: 0,
            computer_players: 2,
            turn_timeout_millis: 60_000,
            turn_timeout_warning_millis: 5_000,
            point_freeze_millis: 1_000,
            penalty_freeze_millis: 3_000,
            table_delay_millis: 100,
            hints: false,
        }
    }
}

impl GameConfig {
    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns the first field found to be out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feature_size < 2 {
            return Err(ConfigError::invalid("feature_size", "Must be at least 2"));
        }

        if self.feature_count == 0 {
            return Err(ConfigError::invalid(
                "feature_count",
                "Must be greater than 0",
            ));
        }

        if self.table_size() == 0 {
            return Err(ConfigError::invalid(
                "rows/columns",
                "Grid must have at least one slot",
            ));
        }

        if self.table_size() < self.feature_size {
            return Err(ConfigError::invalid(
                "rows/columns",
                format!("Grid must hold at least {} cards", self.feature_size),
            ));
        }

        if self.players() == 0 {
            return Err(ConfigError::invalid(
                "human_players/computer_players",
                "Need at least one seat",
            ));
        }

        if self.deck_size == 0 {
            return Err(ConfigError::invalid("deck_size", "Must be greater than 0"));
        }

        match self.max_deck_size() {
            Some(max) if self.deck_size > max => {
                return Err(ConfigError::invalid(
                    "deck_size",
                    format!(
                        "Must be at most {max} ({}^{} distinct cards)",
                        self.feature_size, self.feature_count
                    ),
                ));
            }
            _ => {}
        }

        if u32::try_from(self.deck_size).is_err() {
            return Err(ConfigError::invalid(
                "deck_size",
                format!("Must be at most {}", u32::MAX),
            ));
        }

        if self.turn_timeout_millis > 0
            && self.turn_timeout_warning_millis > self.turn_timeout_millis
        {
            return Err(ConfigError::invalid(
                "turn_timeout_warning_millis",
                format!(
                    "Must not exceed the turn timeout ({})",
                    self.turn_timeout_millis
                ),
            ));
        }

        Ok(())
    }

    /// Number of grid slots
    pub fn table_size(&self) -> usize {
        self.rows * self.columns
    }

    /// Total number of seats
    pub fn players(&self) -> usize {
        self.human_players + self.computer_players
    }

    /// Humans take the lowest seat ids
    pub fn is_human(&self, seat: usize) -> bool {
        seat < self.human_players
    }

    /// Distinct cards expressible with the configured features, `None` on overflow
    pub fn max_deck_size(&self) -> Option<usize> {
        u32::try_from(self.feature_count)
            .ok()
            .and_then(|count| self.feature_size.checked_pow(count))
    }

    pub fn clock_mode(&self) -> ClockMode {
        ClockMode::from_config(self)
    }

    pub fn point_freeze(&self) -> Duration {
        Duration::from_millis(self.point_freeze_millis)
    }

    pub fn penalty_freeze(&self) -> Duration {
        Duration::from_millis(self.penalty_freeze_millis)
    }

    pub fn table_delay(&self) -> Duration {
        Duration::from_millis(self.table_delay_millis)
    }
}
