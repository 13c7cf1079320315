// Application configuration, loaded from environment variables and CLI flags.

use std::time::Duration;

use crate::engine::config::GameConfig;
use crate::engine::server::DEFAULT_PERSIST_TIMEOUT;
use crate::engine::traps::DisarmPenalty;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Database URL (SQLite connection string).
    pub database_url: String,
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Upper bound on one ledger flush.
    pub persist_timeout: Duration,
    /// Game rules.
    pub game: GameConfig,
}

impl Config {
    /// Load configuration from environment variables and CLI arguments.
    ///
    /// Environment variables:
    /// - `DATABASE_URL` - SQLite connection string (default: `sqlite:squeakbot.db?mode=rwc`)
    /// - `PORT` - HTTP server port (default: 8080)
    /// - `SQUEAK_PREFIX` - command prefix (default: `!`)
    /// - `SQUEAK_LOCATIONS` - comma-separated location ids or names where squeaks count
    ///   (default: everywhere)
    /// - `SQUEAK_TRAP_TRIGGER_CHANCE` - chance per trap per squeak, 0..=1 (default: 0.3)
    /// - `SQUEAK_DISARM_MISHAP_CHANCE` - chance a correct disarm still goes off (default: 0.05)
    /// - `SQUEAK_DISARM_PENALTY` - `full` or `half` wager lost on a wrong guess (default: full)
    /// - `SQUEAK_TRAP_TTL_SECS` - expire and refund traps after this long (default: never)
    /// - `SQUEAK_PERSIST_TIMEOUT_MS` - ledger flush timeout (default: 5000)
    ///
    /// CLI flags:
    /// - `--port <PORT>` - Override the port
    pub fn load() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self::from_sources(&args, |key| std::env::var(key).ok())
    }

    /// Build a config from CLI args and an environment lookup.
    pub fn from_sources(args: &[String], env: impl Fn(&str) -> Option<String>) -> Self {
        let database_url =
            env("DATABASE_URL").unwrap_or_else(|| "sqlite:squeakbot.db?mode=rwc".to_string());

        // Port: CLI flag --port takes precedence, then env var, then default
        let port = Self::parse_cli_value(args, "--port")
            .and_then(|v| v.parse().ok())
            .or_else(|| env("PORT").and_then(|v| v.parse().ok()))
            .unwrap_or(8080);

        let persist_timeout = env("SQUEAK_PERSIST_TIMEOUT_MS")
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_PERSIST_TIMEOUT);

        let mut game = GameConfig::default();
        if let Some(prefix) = env("SQUEAK_PREFIX").filter(|p| !p.trim().is_empty()) {
            game.command_prefix = prefix.trim().to_string();
        }
        if let Some(locations) = env("SQUEAK_LOCATIONS") {
            game.scoring_locations = locations
                .split(',')
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(chance) = env("SQUEAK_TRAP_TRIGGER_CHANCE").and_then(|v| parse_chance(&v)) {
            game.odds.trigger = chance;
        }
        if let Some(chance) = env("SQUEAK_DISARM_MISHAP_CHANCE").and_then(|v| parse_chance(&v)) {
            game.odds.mishap = chance;
        }
        if let Some(penalty) = env("SQUEAK_DISARM_PENALTY") {
            game.odds.penalty = match penalty.trim().to_ascii_lowercase().as_str() {
                "half" => DisarmPenalty::HalfWager,
                "full" => DisarmPenalty::FullWager,
                other => {
                    tracing::warn!("Unknown SQUEAK_DISARM_PENALTY '{other}', using full");
                    DisarmPenalty::FullWager
                }
            };
        }
        game.trap_ttl = env("SQUEAK_TRAP_TTL_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs);

        Config {
            database_url,
            port,
            persist_timeout,
            game,
        }
    }

    /// Parse a CLI flag value like `--port 8080`.
    fn parse_cli_value(args: &[String], flag: &str) -> Option<String> {
        args.windows(2).find_map(|pair| {
            if pair[0] == flag {
                Some(pair[1].clone())
            } else {
                None
            }
        })
    }
}

/// A probability in `0.0..=1.0`; anything else is ignored.
fn parse_chance(raw: &str) -> Option<f64> {
    match raw.trim().parse::<f64>() {
        Ok(p) if (0.0..=1.0).contains(&p) => Some(p),
        _ => {
            tracing::warn!("Ignoring invalid probability '{raw}'");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(args: &[&str], vars: &[(&str, &str)]) -> Config {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_sources(&args, |key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&["squeakbot"], &[]);
        assert_eq!(config.database_url, "sqlite:squeakbot.db?mode=rwc");
        assert_eq!(config.port, 8080);
        assert_eq!(config.persist_timeout, DEFAULT_PERSIST_TIMEOUT);
        assert_eq!(config.game, GameConfig::default());
    }

    #[test]
    fn test_cli_port_beats_env() {
        let config = load(&["squeakbot", "--port", "9000"], &[("PORT", "7000")]);
        assert_eq!(config.port, 9000);

        let config = load(&["squeakbot"], &[("PORT", "7000")]);
        assert_eq!(config.port, 7000);
    }

    #[test]
    fn test_game_overrides() {
        let config = load(
            &["squeakbot"],
            &[
                ("SQUEAK_PREFIX", "?"),
                ("SQUEAK_LOCATIONS", " 123, squeak-zone ,,"),
                ("SQUEAK_TRAP_TRIGGER_CHANCE", "1"),
                ("SQUEAK_DISARM_MISHAP_CHANCE", "2.5"),
                ("SQUEAK_DISARM_PENALTY", "half"),
                ("SQUEAK_TRAP_TTL_SECS", "3600"),
            ],
        );
        assert_eq!(config.game.command_prefix, "?");
        assert_eq!(config.game.scoring_locations, vec!["123", "squeak-zone"]);
        assert_eq!(config.game.odds.trigger, 1.0);
        // Out of range, default kept
        assert_eq!(config.game.odds.mishap, 0.05);
        assert_eq!(config.game.odds.penalty, DisarmPenalty::HalfWager);
        assert_eq!(config.game.trap_ttl, Some(Duration::from_secs(3600)));
    }
}
