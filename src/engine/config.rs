// Game rules and their defaults.

use std::time::Duration;

use crate::rate_limit::{CooldownLimit, SQUEAK_MAX_EVENTS, SQUEAK_WINDOW};

use super::traps::TrapOdds;

/// Text that counts as a squeak (compared case-insensitively after trimming).
pub const SQUEAK_TRIGGER: &str = "squeak";

/// Replies picked at random for every squeak.
pub const ACKNOWLEDGEMENTS: [&str; 7] = [
    "Squeak!",
    "-# Squeak",
    "squeak",
    "squeak!",
    "SQUEAK!",
    "SQUEAK",
    "Squeak",
];

pub const COMMAND_PREFIX: &str = "!";

// Per-command cooldown
pub const COMMAND_MAX_USES: usize = 3;
pub const COMMAND_WINDOW: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    pub command_prefix: String,
    pub squeak_trigger: String,
    pub acknowledgements: Vec<String>,
    /// Location ids or names where squeaks score and traps live. Empty means everywhere.
    pub scoring_locations: Vec<String>,
    pub odds: TrapOdds,
    pub squeak_limit: CooldownLimit,
    pub command_limit: CooldownLimit,
    /// Traps older than this are removed and refunded. None keeps them forever.
    pub trap_ttl: Option<Duration>,
}

impl GameConfig {
    pub fn is_squeak(&self, text: &str) -> bool {
        text.trim().eq_ignore_ascii_case(&self.squeak_trigger)
    }

    pub fn is_scoring_location(&self, location_id: &str, location_name: &str) -> bool {
        self.scoring_locations.is_empty()
            || self
                .scoring_locations
                .iter()
                .any(|l| l == location_id || (!location_name.is_empty() && l == location_name))
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            command_prefix: COMMAND_PREFIX.to_string(),
            squeak_trigger: SQUEAK_TRIGGER.to_string(),
            acknowledgements: ACKNOWLEDGEMENTS.iter().map(|s| s.to_string()).collect(),
            scoring_locations: Vec::new(),
            odds: TrapOdds::default(),
            squeak_limit: CooldownLimit::new(SQUEAK_MAX_EVENTS, SQUEAK_WINDOW),
            command_limit: CooldownLimit::new(COMMAND_MAX_USES, COMMAND_WINDOW),
            trap_ttl: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_squeak_is_exact_word() {
        let config = GameConfig::default();
        assert!(config.is_squeak("squeak"));
        assert!(config.is_squeak("  SQUEAK \n"));
        assert!(!config.is_squeak("squeak squeak"));
        assert!(!config.is_squeak("squeaky"));
    }

    #[test]
    fn test_scoring_locations() {
        let mut config = GameConfig::default();
        assert!(config.is_scoring_location("any", ""));

        config.scoring_locations = vec!["123".into(), "squeak-zone".into()];
        assert!(config.is_scoring_location("123", "general"));
        assert!(config.is_scoring_location("999", "squeak-zone"));
        assert!(!config.is_scoring_location("999", "general"));
        assert!(!config.is_scoring_location("999", ""));
    }
}
