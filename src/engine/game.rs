// The squeak game: turns one inbound event into ledger changes and replies.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::metrics;
use crate::rate_limit::{CooldownKind, CooldownTracker};

use super::command::{split_prefixed, Command, CommandKind};
use super::config::GameConfig;
use super::error::GameError;
use super::event::{Action, ChatMessage, CommandInvocation, InboundEvent, Response};
use super::ledger::UserLedger;
use super::traps::{DisarmOutcome, TrapRegistry};

/// Reaction left on a squeak that sprung a trap.
const TRAP_SYMBOL: &str = "🪤";

/// Who sent an event and where.
struct Origin<'a> {
    user_id: &'a str,
    user_name: String,
    location_id: &'a str,
    location_name: &'a str,
}

/// All game state. Every method takes `&mut self`, so whoever owns the engine
/// serializes events; nothing here is shared.
pub struct GameEngine<R: Rng = StdRng> {
    config: GameConfig,
    ledger: UserLedger,
    cooldowns: CooldownTracker,
    traps: TrapRegistry,
    rng: R,
}

impl GameEngine<StdRng> {
    pub fn new(config: GameConfig, ledger: UserLedger) -> Self {
        Self::with_rng(config, ledger, StdRng::from_entropy())
    }
}

impl<R: Rng> GameEngine<R> {
    pub fn with_rng(config: GameConfig, ledger: UserLedger, rng: R) -> Self {
        let cooldowns = CooldownTracker::new(config.squeak_limit, config.command_limit);
        metrics::KNOWN_USERS.set(ledger.len() as i64);
        Self {
            config,
            ledger,
            cooldowns,
            traps: TrapRegistry::new(),
            rng,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn ledger(&self) -> &UserLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut UserLedger {
        &mut self.ledger
    }

    pub fn traps(&self) -> &TrapRegistry {
        &self.traps
    }

    pub fn handle_event(&mut self, event: &InboundEvent, now: Instant) -> Response {
        let mut response = Response::default();
        self.expire_traps(now, &mut response);

        match event {
            InboundEvent::Message(msg) => self.on_message(msg, now, &mut response),
            InboundEvent::Command(cmd) => {
                let origin = self.origin(
                    &cmd.sender_id,
                    &cmd.sender_display_name,
                    &cmd.location_id,
                    &cmd.location_name,
                );
                self.on_command(&origin, &cmd.command_name, &cmd.args, now, &mut response);
            }
        }

        metrics::ACTIVE_TRAPS.set(self.traps.len() as i64);
        metrics::KNOWN_USERS.set(self.ledger.len() as i64);
        response
    }

    pub fn handle_message(&mut self, msg: &ChatMessage, now: Instant) -> Response {
        self.handle_event(&InboundEvent::Message(msg.clone()), now)
    }

    pub fn handle_command(&mut self, cmd: &CommandInvocation, now: Instant) -> Response {
        self.handle_event(&InboundEvent::Command(cmd.clone()), now)
    }

    fn on_message(&mut self, msg: &ChatMessage, now: Instant, response: &mut Response) {
        let origin = self.origin(
            &msg.sender_id,
            &msg.sender_display_name,
            &msg.location_id,
            &msg.location_name,
        );

        if let Some((name, args)) = split_prefixed(&self.config.command_prefix, &msg.text) {
            self.on_command(&origin, name, &args, now, response);
        } else if self.config.is_squeak(&msg.text) {
            self.on_squeak(&origin, now, response);
        }
    }

    fn on_squeak(&mut self, origin: &Origin<'_>, now: Instant, response: &mut Response) {
        if !self.config.acknowledgements.is_empty() {
            let i = self.rng.gen_range(0..self.config.acknowledgements.len());
            let phrase = self.config.acknowledgements[i].clone();
            response.send(origin.location_id, phrase);
        }

        self.touch_user(origin, response);

        if !self
            .config
            .is_scoring_location(origin.location_id, origin.location_name)
        {
            return;
        }

        if let Err(e) = self
            .cooldowns
            .check_limit(origin.user_id, CooldownKind::Squeak, now)
        {
            tracing::warn!("Squeak from {} rate limited", origin.user_name);
            metrics::RATE_LIMITED_TOTAL.with_label_values(&["squeak"]).inc();
            response.reply(e.to_string());
            return;
        }

        let fired = self.traps.maybe_trigger(
            &mut self.ledger,
            &mut self.rng,
            self.config.odds.trigger,
            origin.user_id,
            &origin.user_name,
            origin.location_id,
        );
        response.mutated = true;

        match fired {
            Some(fired) => {
                metrics::TRAPS_TRIGGERED_TOTAL.inc();
                response.react(TRAP_SYMBOL);
                response.send(
                    origin.location_id,
                    format!(
                        "{} has trapped {} in a mouse trap! They lose {} squeaks!",
                        fired.trap.owner_name, fired.victim_name, fired.taken
                    ),
                );
            }
            None => {
                self.ledger.adjust_score(origin.user_id, 1);
                metrics::SQUEAKS_SCORED_TOTAL.inc();
            }
        }
    }

    fn on_command(
        &mut self,
        origin: &Origin<'_>,
        name: &str,
        args: &[String],
        now: Instant,
        response: &mut Response,
    ) {
        let Some(kind) = CommandKind::from_name(name) else {
            tracing::debug!("Ignoring unknown command {name}");
            return;
        };
        metrics::COMMANDS_TOTAL.with_label_values(&[kind.name()]).inc();

        self.touch_user(origin, response);

        let result = self
            .cooldowns
            .check_limit(origin.user_id, CooldownKind::Command(kind), now)
            .map_err(GameError::from)
            .and_then(|()| Command::parse(kind, args))
            .and_then(|command| self.run_command(origin, command, now, response));

        if let Err(e) = result {
            if let GameError::RateLimited(_) = e {
                metrics::RATE_LIMITED_TOTAL
                    .with_label_values(&[kind.name()])
                    .inc();
            }
            tracing::debug!("!{} from {} rejected: {}", kind.name(), origin.user_name, e);
            response.reply(e.to_string());
        }
    }

    fn run_command(
        &mut self,
        origin: &Origin<'_>,
        command: Command,
        now: Instant,
        response: &mut Response,
    ) -> Result<(), GameError> {
        match command {
            Command::SqCount => {
                let score = self.ledger.score(origin.user_id);
                response.reply(format!("You have squeaked {score} times!"));
            }
            Command::SqLeaderboard { size } => {
                response.send(origin.location_id, self.leaderboard_text(size));
            }
            Command::SeeTraps => {
                let traps = self.traps.list_at(origin.location_id);
                let text = if traps.is_empty() {
                    "There are no traps set here!".to_string()
                } else {
                    let lines: Vec<String> = traps
                        .iter()
                        .map(|t| format!("{} has a trap set!", t.owner_name))
                        .collect();
                    format!("Current traps:\n{}", lines.join("\n"))
                };
                response.send(origin.location_id, text);
            }
            Command::SetTrap { cost } => {
                if !self
                    .config
                    .is_scoring_location(origin.location_id, origin.location_name)
                {
                    return Err(GameError::NotScoringLocation);
                }
                self.traps.set_trap(
                    &mut self.ledger,
                    origin.user_id,
                    &origin.user_name,
                    cost,
                    origin.location_id,
                    now,
                )?;
                metrics::TRAPS_SET_TOTAL.inc();
                response.mutated = true;
                // Hide the stake from everyone else
                response.actions.push(Action::Delete);
                response.send(
                    origin.location_id,
                    format!("{} has set a mouse trap!", origin.user_name),
                );
            }
            Command::DisarmTrap { wager } => {
                let outcome = self.traps.disarm(
                    &mut self.ledger,
                    &mut self.rng,
                    &self.config.odds,
                    origin.user_id,
                    &origin.user_name,
                    origin.location_id,
                    wager,
                )?;
                response.mutated = true;
                let (label, text) = match outcome {
                    DisarmOutcome::Failed { required, penalty } => (
                        "failed",
                        format!(
                            "Failed to disarm the trap! You need to provide the cost of the trap minus 2 ({required}). You lose {penalty} squeaks for this failed attempt."
                        ),
                    ),
                    DisarmOutcome::Mishap { trap, lost } => (
                        "mishap",
                        format!(
                            "Snap! {}'s trap went off while {} was disarming it. {} squeaks go to {}!",
                            trap.owner_name, origin.user_name, lost, trap.owner_name
                        ),
                    ),
                    DisarmOutcome::CleanDisarm { trap } => (
                        "clean",
                        format!(
                            "{} has disarmed {}'s trap! The trap is no longer active.",
                            origin.user_name, trap.owner_name
                        ),
                    ),
                };
                metrics::DISARMS_TOTAL.with_label_values(&[label]).inc();
                response.send(origin.location_id, text);
            }
        }
        Ok(())
    }

    fn leaderboard_text(&self, size: usize) -> String {
        let top = self.ledger.top_n(size);
        if top.is_empty() {
            return "Nobody has squeaked yet!".to_string();
        }
        let lines: Vec<String> = top
            .iter()
            .enumerate()
            .map(|(i, u)| format!("{}. {}: {} squeaks", i + 1, u.display_name, u.score))
            .collect();
        format!("Squeak leaderboard:\n{}", lines.join("\n"))
    }

    /// Resolve who is acting. Without a display name the stored one (or the id) is used.
    fn origin<'a>(
        &self,
        user_id: &'a str,
        display_name: &str,
        location_id: &'a str,
        location_name: &'a str,
    ) -> Origin<'a> {
        let user_name = if !display_name.is_empty() {
            display_name.to_string()
        } else {
            self.ledger
                .get(user_id)
                .map(|u| u.display_name.clone())
                .unwrap_or_else(|| user_id.to_string())
        };
        Origin {
            user_id,
            user_name,
            location_id,
            location_name,
        }
    }

    /// Create or rename the sender's record.
    fn touch_user(&mut self, origin: &Origin<'_>, response: &mut Response) {
        let changed = match self.ledger.get(origin.user_id) {
            Some(user) => user.display_name != origin.user_name,
            None => true,
        };
        if changed {
            self.ledger.get_or_create(origin.user_id, &origin.user_name);
            response.mutated = true;
        }
    }

    fn expire_traps(&mut self, now: Instant, response: &mut Response) {
        let Some(ttl) = self.config.trap_ttl else {
            return;
        };
        for trap in self.traps.expire(&mut self.ledger, now, ttl) {
            metrics::TRAPS_EXPIRED_TOTAL.inc();
            response.mutated = true;
            response.send(
                &trap.location_id,
                format!(
                    "{}'s trap rusted away. {} squeaks returned.",
                    trap.owner_name, trap.cost
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn engine(trigger: f64, mishap: f64) -> GameEngine<StdRng> {
        let mut config = GameConfig::default();
        config.odds.trigger = trigger;
        config.odds.mishap = mishap;
        config.scoring_locations = vec!["L".into()];
        GameEngine::with_rng(config, UserLedger::new(), StdRng::seed_from_u64(1))
    }

    fn say(user: &str, location: &str, text: &str) -> ChatMessage {
        ChatMessage {
            sender_id: user.into(),
            sender_display_name: user.into(),
            location_id: location.into(),
            location_name: String::new(),
            text: text.into(),
        }
    }

    #[test]
    fn test_squeak_acknowledged_and_scored() {
        let mut game = engine(0.0, 0.0);
        let response = game.handle_message(&say("a", "L", "Squeak"), Instant::now());

        assert_eq!(response.actions.len(), 1);
        let ack = response.texts()[0];
        assert!(game.config().acknowledgements.iter().any(|a| a == ack));
        assert!(response.mutated);
        assert_eq!(game.ledger().score("a"), 1);
    }

    #[test]
    fn test_squeak_outside_scoring_location_only_acknowledged() {
        let mut game = engine(0.0, 0.0);
        let response = game.handle_message(&say("a", "elsewhere", "squeak"), Instant::now());

        assert_eq!(response.actions.len(), 1);
        assert_eq!(game.ledger().score("a"), 0);
        // The record is still created on first sight
        assert!(game.ledger().contains("a"));
    }

    #[test]
    fn test_ordinary_text_ignored() {
        let mut game = engine(0.0, 0.0);
        let response = game.handle_message(&say("a", "L", "hello there"), Instant::now());
        assert!(response.actions.is_empty());
        assert!(!response.mutated);
        assert!(!game.ledger().contains("a"));
    }

    #[test]
    fn test_sixth_squeak_rate_limited() {
        let mut game = engine(0.0, 0.0);
        let now = Instant::now();
        for _ in 0..5 {
            game.handle_message(&say("a", "L", "squeak"), now);
        }
        let response = game.handle_message(&say("a", "L", "squeak"), now);

        assert_eq!(response.actions.len(), 2);
        assert!(response.texts()[1].starts_with("Slow down!"));
        assert_eq!(game.ledger().score("a"), 5);

        let later = game.handle_message(&say("a", "L", "squeak"), now + Duration::from_secs(60));
        assert_eq!(later.actions.len(), 1);
        assert_eq!(game.ledger().score("a"), 6);
    }

    #[test]
    fn test_prefixed_text_runs_command() {
        let mut game = engine(0.0, 0.0);
        game.ledger_mut().get_or_create("a", "a");
        game.ledger_mut().adjust_score("a", 4);

        let response = game.handle_message(&say("a", "L", "!sqcount"), Instant::now());
        assert_eq!(
            response.actions,
            vec![Action::Reply {
                text: "You have squeaked 4 times!".into()
            }]
        );
    }

    #[test]
    fn test_unknown_command_ignored() {
        let mut game = engine(0.0, 0.0);
        let response = game.handle_message(&say("a", "L", "!dance"), Instant::now());
        assert!(response.actions.is_empty());
    }

    #[test]
    fn test_command_cooldown() {
        let mut game = engine(0.0, 0.0);
        let now = Instant::now();
        for _ in 0..3 {
            game.handle_message(&say("a", "L", "!seetraps"), now);
        }
        let response = game.handle_message(&say("a", "L", "!seetraps"), now);
        assert!(response.texts()[0].starts_with("Slow down! Max 3 uses of !seetraps"));

        // Other commands are unaffected
        let response = game.handle_message(&say("a", "L", "!sqcount"), now);
        assert_eq!(response.texts()[0], "You have squeaked 0 times!");
    }

    #[test]
    fn test_settrap_deletes_message_and_announces() {
        let mut game = engine(0.0, 0.0);
        game.ledger_mut().get_or_create("a", "a");
        game.ledger_mut().adjust_score("a", 10);

        let response = game.handle_message(&say("a", "L", "!settrap 6"), Instant::now());
        assert_eq!(
            response.actions,
            vec![
                Action::Delete,
                Action::Send {
                    location_id: "L".into(),
                    text: "a has set a mouse trap!".into()
                }
            ]
        );
        assert_eq!(game.ledger().score("a"), 4);
    }

    #[test]
    fn test_settrap_errors_reply_without_state_change() {
        let mut game = engine(0.0, 0.0);
        game.ledger_mut().get_or_create("a", "a");
        game.ledger_mut().adjust_score("a", 10);
        let now = Instant::now();

        let response = game.handle_message(&say("a", "L", "!settrap 2"), now);
        assert_eq!(
            response.texts(),
            vec!["You need to set a trap with at least 5 squeaks!"]
        );

        let response = game.handle_message(&say("a", "elsewhere", "!settrap"), now);
        assert_eq!(response.texts(), vec![GameError::NotScoringLocation.to_string()]);

        let response = game.handle_message(&say("a", "L", "!settrap lots"), now);
        assert_eq!(response.texts(), vec!["`lots` is not a valid trap cost."]);

        assert_eq!(game.ledger().score("a"), 10);
        assert!(game.traps().is_empty());
    }

    #[test]
    fn test_leaderboard() {
        let mut game = engine(0.0, 0.0);
        let response = game.handle_message(&say("a", "L", "!sqleaderboard"), Instant::now());
        assert_eq!(response.texts(), vec!["Nobody has squeaked yet!"]);

        for (id, score) in [("b", 3), ("c", 9)] {
            game.ledger_mut().get_or_create(id, id);
            game.ledger_mut().adjust_score(id, score);
        }
        let response = game.handle_message(&say("a", "L", "!sqleaderboard 2"), Instant::now());
        assert_eq!(
            response.texts(),
            vec!["Squeak leaderboard:\n1. c: 9 squeaks\n2. b: 3 squeaks"]
        );
    }

    #[test]
    fn test_seetraps_lists_owners_at_location() {
        let mut game = engine(0.0, 0.0);
        for id in ["a", "b"] {
            game.ledger_mut().get_or_create(id, id);
            game.ledger_mut().adjust_score(id, 10);
        }
        let now = Instant::now();
        game.handle_message(&say("a", "L", "!settrap"), now);
        game.handle_message(&say("b", "L", "!settrap 7"), now);

        let response = game.handle_message(&say("c", "L", "!seetraps"), now);
        assert_eq!(
            response.texts(),
            vec!["Current traps:\na has a trap set!\nb has a trap set!"]
        );

        let response = game.handle_message(&say("c", "M", "!seetraps"), now);
        assert_eq!(response.texts(), vec!["There are no traps set here!"]);
    }

    #[test]
    fn test_trap_expiry_refunds_and_announces() {
        let mut game = engine(0.0, 0.0);
        game.config.trap_ttl = Some(Duration::from_secs(3600));
        game.ledger_mut().get_or_create("a", "a");
        game.ledger_mut().adjust_score("a", 10);
        let t0 = Instant::now();
        game.handle_message(&say("a", "L", "!settrap"), t0);
        assert_eq!(game.ledger().score("a"), 5);

        let response = game.handle_message(&say("b", "M", "hi"), t0 + Duration::from_secs(3600));
        assert_eq!(
            response.actions,
            vec![Action::Send {
                location_id: "L".into(),
                text: "a's trap rusted away. 5 squeaks returned.".into()
            }]
        );
        assert!(response.mutated);
        assert_eq!(game.ledger().score("a"), 10);
        assert!(game.traps().is_empty());
    }

    #[test]
    fn test_command_invocation_event() {
        let mut game = engine(0.0, 0.0);
        let cmd = CommandInvocation {
            command_name: "disarmtrap".into(),
            args: vec![],
            sender_id: "a".into(),
            sender_display_name: String::new(),
            location_id: "L".into(),
            location_name: String::new(),
        };
        let response = game.handle_command(&cmd, Instant::now());
        assert_eq!(
            response.texts(),
            vec!["Tell me how many squeaks to wager, e.g. `!disarmtrap 3`."]
        );
        // Falls back to the id when no display name is given
        assert_eq!(game.ledger().get("a").unwrap().display_name, "a");
    }
}
