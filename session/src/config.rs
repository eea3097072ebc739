use core::time::Duration;
use duelsweeper_core::GameConfig;
use serde::{Deserialize, Serialize};

use crate::*;

/// Participants a room admits; a later joiner evicts itself.
pub const ROOM_CAPACITY: usize = 2;

const fn default_pacing_ms() -> u64 {
    100
}

const fn default_grace_ms() -> u64 {
    100
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub room_id: String,
    /// Wait before each `send` and `judge` broadcast.
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
    /// Wait before tearing the channel down after a match ends.
    #[serde(default = "default_grace_ms")]
    pub grace_ms: u64,
}

impl SessionConfig {
    pub fn new(room_id: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            pacing_ms: default_pacing_ms(),
            grace_ms: default_grace_ms(),
        }
    }

    pub const fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub const fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }
}

/// Everything needed to set up one match, usually read from TOML:
///
/// ```toml
/// seed = 42
///
/// [game]
/// rows = 16
/// cols = 16
/// mines = 40
///
/// [session]
/// room_id = "lobby-7"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchConfig {
    #[serde(default)]
    pub game: GameConfig,
    /// Without a session the match is played solo.
    #[serde(default)]
    pub session: Option<SessionConfig>,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl MatchConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.game.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duelsweeper_core::GameError;

    #[test]
    fn full_config() {
        let config = MatchConfig::from_toml_str(
            r#"
            seed = 42

            [game]
            rows = 16
            cols = 30
            mines = 99

            [session]
            room_id = "lobby-7"
            grace_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.seed, Some(42));
        assert_eq!(config.game, GameConfig::expert());
        let session = config.session.unwrap();
        assert_eq!(session.room_id, "lobby-7");
        assert_eq!(session.pacing(), Duration::from_millis(100));
        assert_eq!(session.grace(), Duration::from_millis(250));
    }

    #[test]
    fn empty_config_is_solo_beginner() {
        let config = MatchConfig::from_toml_str("").unwrap();

        assert_eq!(config, MatchConfig::default());
        assert_eq!(config.game, GameConfig::beginner());
        assert!(config.session.is_none());
    }

    #[test]
    fn mine_bound_is_enforced_on_load() {
        let err = MatchConfig::from_toml_str(
            r#"
            [game]
            rows = 3
            cols = 3
            mines = 1
            "#,
        )
        .unwrap_err();

        assert!(matches!(err, SessionError::Game(GameError::TooManyMines)));
    }

    #[test]
    fn session_needs_room() {
        let err = MatchConfig::from_toml_str("[session]\npacing_ms = 5\n").unwrap_err();

        assert!(matches!(err, SessionError::Config(_)));
    }
}
