//! Coordinator configuration.

use std::time::Duration;

use quizwire_clock::RoundClock;
use quizwire_protocol::RoomSettings;

/// Settings shared by every room a coordinator creates.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Settings for rooms whose creator overrides nothing.
    pub default_settings: RoomSettings,

    /// Pause before the next round when rounds advance automatically.
    pub inter_round_pause: Duration,

    /// How many generated codes to try before giving up on `create_room`.
    pub max_code_attempts: usize,

    /// Capacity of each room actor's command channel.
    pub channel_size: usize,

    /// How often a running countdown re-checks its remaining time.
    pub clock_tick: Duration,

    /// Nickname given to a creator that did not send one.
    pub default_host_nickname: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            default_settings: RoomSettings::default(),
            inter_round_pause: Duration::from_secs(5),
            max_code_attempts: 16,
            channel_size: 64,
            clock_tick: RoundClock::DEFAULT_TICK,
            default_host_nickname: "Host".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinator_config_default() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.default_settings.max_players, 8);
        assert_eq!(config.default_settings.round_seconds, 30);
        assert_eq!(config.default_settings.total_rounds, 10);
        assert_eq!(config.inter_round_pause, Duration::from_secs(5));
        assert_eq!(config.max_code_attempts, 16);
        assert_eq!(config.clock_tick, Duration::from_secs(1));
    }
}
