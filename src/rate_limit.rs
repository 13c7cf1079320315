// Sliding-window cooldowns for squeaks and bot commands.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::engine::command::CommandKind;

/// Maximum squeaks scored per user inside one window.
pub const SQUEAK_MAX_EVENTS: usize = 5;
/// Trailing window for squeak scoring.
pub const SQUEAK_WINDOW: Duration = Duration::from_secs(60);

/// What a cooldown entry counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CooldownKind {
    /// Scored squeaks in a scoring location.
    Squeak,
    /// Invocations of one bot command. Each command has its own window.
    Command(CommandKind),
}

impl std::fmt::Display for CooldownKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CooldownKind::Squeak => write!(f, "squeaks"),
            CooldownKind::Command(kind) => write!(f, "uses of !{}", kind.name()),
        }
    }
}

/// Limit for one cooldown kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownLimit {
    pub max_events: usize,
    pub window: Duration,
}

impl CooldownLimit {
    pub const fn new(max_events: usize, window: Duration) -> Self {
        Self { max_events, window }
    }
}

/// Error returned when a cooldown is exceeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitError {
    pub kind: CooldownKind,
    pub max: usize,
    pub window: Duration,
    /// Time until the oldest entry in the window expires.
    pub retry_after: Duration,
}

impl std::fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Round up so "try again in 0s" never shows.
        let secs = self.retry_after.as_secs() + u64::from(self.retry_after.subsec_nanos() > 0);
        write!(
            f,
            "Slow down! Max {} {} per {}s, try again in {}s.",
            self.max,
            self.kind,
            self.window.as_secs(),
            secs.max(1)
        )
    }
}

/// Key for the cooldown map: (user_id, kind).
type CooldownKey = (String, CooldownKind);

/// Per-user sliding-window rate limiter.
///
/// Not synchronized on its own: the engine owning it is serialized per event,
/// which makes prune-check-append a single step for every user.
#[derive(Debug, Clone)]
pub struct CooldownTracker {
    squeak: CooldownLimit,
    command: CooldownLimit,
    entries: HashMap<CooldownKey, Vec<Instant>>,
}

impl CooldownTracker {
    pub fn new(squeak: CooldownLimit, command: CooldownLimit) -> Self {
        Self {
            squeak,
            command,
            entries: HashMap::new(),
        }
    }

    pub fn limit(&self, kind: CooldownKind) -> CooldownLimit {
        match kind {
            CooldownKind::Squeak => self.squeak,
            CooldownKind::Command(_) => self.command,
        }
    }

    /// Record a scored squeak for `user_id` at `now` if the window allows it.
    pub fn record_and_check(&mut self, user_id: &str, now: Instant) -> bool {
        self.check_limit(user_id, CooldownKind::Squeak, now).is_ok()
    }

    /// Check the window for `(user_id, kind)`.
    /// If within limits, records the event at `now` and returns Ok(()).
    /// If exceeded, nothing is recorded and the error carries a retry hint.
    pub fn check_limit(
        &mut self,
        user_id: &str,
        kind: CooldownKind,
        now: Instant,
    ) -> Result<(), RateLimitError> {
        let limit = self.limit(kind);
        let entries = self
            .entries
            .entry((user_id.to_string(), kind))
            .or_default();

        entries.retain(|t| now.saturating_duration_since(*t) < limit.window);

        if entries.len() >= limit.max_events {
            let retry_after = entries
                .first()
                .map(|oldest| limit.window.saturating_sub(now.saturating_duration_since(*oldest)))
                .unwrap_or(limit.window);
            return Err(RateLimitError {
                kind,
                max: limit.max_events,
                window: limit.window,
                retry_after,
            });
        }

        entries.push(now);
        Ok(())
    }

    /// Get the number of entries still inside the window (for testing/diagnostics).
    pub fn current_count(&mut self, user_id: &str, kind: CooldownKind, now: Instant) -> usize {
        let window = self.limit(kind).window;
        match self.entries.get_mut(&(user_id.to_string(), kind)) {
            Some(entries) => {
                entries.retain(|t| now.saturating_duration_since(*t) < window);
                entries.len()
            }
            None => 0,
        }
    }
}

impl Default for CooldownTracker {
    fn default() -> Self {
        Self::new(
            CooldownLimit::new(SQUEAK_MAX_EVENTS, SQUEAK_WINDOW),
            CooldownLimit::new(3, Duration::from_secs(10)),
        )
    }
}
