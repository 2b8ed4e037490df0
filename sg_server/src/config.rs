//! Server configuration management.
//!
//! Consolidates all environment variable reads and applies command-line
//! overrides on top.

use set_game::GameConfig;

/// Command-line values that take precedence over the environment
#[derive(Debug, Clone, Copy, Default)]
pub struct Overrides {
    pub humans: Option<usize>,
    pub bots: Option<usize>,
    pub timeout_ms: Option<u64>,
    pub hints: bool,
}

/// Complete server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Game rules and timings
    pub game: GameConfig,
    /// Print display events as JSON lines instead of log records
    pub json: bool,
}

impl ServerConfig {
    /// Load configuration from `SET_*` environment variables, then apply
    /// `overrides`.
    ///
    /// # Errors
    ///
    /// Returns error if the resulting game configuration is invalid
    pub fn from_env(overrides: Overrides, json: bool) -> Result<Self, ConfigError> {
        let defaults = GameConfig::default();

        let game = GameConfig {
            feature_size: parse_env_or("SET_FEATURE_SIZE", defaults.feature_size),
            feature_count: parse_env_or("SET_FEATURE_COUNT", defaults.feature_count),
            rows: parse_env_or("SET_ROWS", defaults.rows),
            columns: parse_env_or("SET_COLUMNS", defaults.columns),
            deck_size: parse_env_or("SET_DECK_SIZE", defaults.deck_size),
            human_players: overrides
                .humans
                .unwrap_or_else(|| parse_env_or("SET_HUMAN_PLAYERS", defaults.human_players)),
            computer_players: overrides.bots.unwrap_or_else(|| {
                parse_env_or("SET_COMPUTER_PLAYERS", defaults.computer_players)
            }),
            turn_timeout_millis: overrides.timeout_ms.unwrap_or_else(|| {
                parse_env_or("SET_TURN_TIMEOUT_MILLIS", defaults.turn_timeout_millis)
            }),
            turn_timeout_warning_millis: parse_env_or(
                "SET_TURN_TIMEOUT_WARNING_MILLIS",
                defaults.turn_timeout_warning_millis,
            ),
            point_freeze_millis: parse_env_or(
                "SET_POINT_FREEZE_MILLIS",
                defaults.point_freeze_millis,
            ),
            penalty_freeze_millis: parse_env_or(
                "SET_PENALTY_FREEZE_MILLIS",
                defaults.penalty_freeze_millis,
            ),
            table_delay_millis: parse_env_or("SET_TABLE_DELAY_MILLIS", defaults.table_delay_millis),
            hints: overrides.hints || parse_env_or("SET_HINTS", defaults.hints),
        };

        let config = ServerConfig { game, json };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.game.validate().map_err(|err| match err {
            set_game::ConfigError::Invalid { field, reason } => ConfigError::Invalid {
                var: env_var_for(&field),
                reason,
            },
        })
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Environment variable(s) behind a `GameConfig` field name
fn env_var_for(field: &str) -> String {
    field
        .split('/')
        .map(|name| format!("SET_{}", name.to_uppercase()))
        .collect::<Vec<_>>()
        .join("/")
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 6] = [
        "SET_ROWS",
        "SET_COLUMNS",
        "SET_HUMAN_PLAYERS",
        "SET_COMPUTER_PLAYERS",
        "SET_TURN_TIMEOUT_MILLIS",
        "SET_HINTS",
    ];

    fn clear_env() {
        for var in VARS {
            // SAFETY: tests touching the environment are serialized
            unsafe { std::env::remove_var(var) };
        }
    }

    fn set_env(key: &str, value: &str) {
        // SAFETY: tests touching the environment are serialized
        unsafe { std::env::set_var(key, value) };
    }

    #[test]
    #[serial]
    fn test_defaults_without_environment() {
        clear_env();
        let config = ServerConfig::from_env(Overrides::default(), false).unwrap();
        assert_eq!(config.game.table_size(), 12);
        assert_eq!(config.game.computer_players, 2);
        assert!(!config.json);
    }

    #[test]
    #[serial]
    fn test_environment_read() {
        clear_env();
        set_env("SET_ROWS", "2");
        set_env("SET_COLUMNS", "5");
        set_env("SET_HINTS", "true");
        let config = ServerConfig::from_env(Overrides::default(), true).unwrap();
        assert_eq!(config.game.table_size(), 10);
        assert!(config.game.hints);
        assert!(config.json);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_unparsable_value_falls_back() {
        clear_env();
        set_env("SET_ROWS", "many");
        let config = ServerConfig::from_env(Overrides::default(), false).unwrap();
        assert_eq!(config.game.rows, 3);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_overrides_beat_environment() {
        clear_env();
        set_env("SET_HUMAN_PLAYERS", "4");
        set_env("SET_TURN_TIMEOUT_MILLIS", "9000");
        let overrides = Overrides {
            humans: Some(1),
            bots: Some(0),
            timeout_ms: Some(0),
            hints: false,
        };
        let config = ServerConfig::from_env(overrides, false).unwrap();
        assert_eq!(config.game.human_players, 1);
        assert_eq!(config.game.computer_players, 0);
        assert!(config.game.clock_mode().is_stopwatch());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_game_names_variable() {
        clear_env();
        let overrides = Overrides {
            humans: Some(0),
            bots: Some(0),
            ..Overrides::default()
        };
        let err = ServerConfig::from_env(overrides, false).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("SET_HUMAN_PLAYERS/SET_COMPUTER_PLAYERS"), "{msg}");
    }

    #[test]
    fn test_env_var_for() {
        assert_eq!(env_var_for("deck_size"), "SET_DECK_SIZE");
        assert_eq!(env_var_for("rows/columns"), "SET_ROWS/SET_COLUMNS");
    }
}
