// Bot commands: recognition and argument parsing.

use super::error::GameError;

/// Default stake for `settrap` when no cost is given.
pub const DEFAULT_TRAP_COST: u64 = 5;
/// Default and maximum leaderboard length.
pub const DEFAULT_LEADERBOARD_SIZE: usize = 10;
pub const MAX_LEADERBOARD_SIZE: usize = 25;

/// Which command was invoked, without arguments. Used as a cooldown key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    SqCount,
    SqLeaderboard,
    SetTrap,
    DisarmTrap,
    SeeTraps,
}

impl CommandKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sqcount" => Some(CommandKind::SqCount),
            "sqleaderboard" => Some(CommandKind::SqLeaderboard),
            "settrap" => Some(CommandKind::SetTrap),
            "disarmtrap" => Some(CommandKind::DisarmTrap),
            "seetraps" => Some(CommandKind::SeeTraps),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CommandKind::SqCount => "sqcount",
            CommandKind::SqLeaderboard => "sqleaderboard",
            CommandKind::SetTrap => "settrap",
            CommandKind::DisarmTrap => "disarmtrap",
            CommandKind::SeeTraps => "seetraps",
        }
    }
}

/// A recognized command with parsed arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SqCount,
    SqLeaderboard { size: usize },
    SetTrap { cost: u64 },
    DisarmTrap { wager: u64 },
    SeeTraps,
}

impl Command {
    /// Parse arguments for an already recognized command. Extra arguments are ignored.
    pub fn parse(kind: CommandKind, args: &[String]) -> Result<Self, GameError> {
        let first = args.first().map(String::as_str);
        match kind {
            CommandKind::SqCount => Ok(Command::SqCount),
            CommandKind::SeeTraps => Ok(Command::SeeTraps),
            CommandKind::SqLeaderboard => {
                let size = match first {
                    Some(raw) => parse_number::<usize>(raw, "leaderboard size")?,
                    None => DEFAULT_LEADERBOARD_SIZE,
                };
                Ok(Command::SqLeaderboard {
                    size: size.clamp(1, MAX_LEADERBOARD_SIZE),
                })
            }
            CommandKind::SetTrap => {
                let cost = match first {
                    Some(raw) => parse_number(raw, "trap cost")?,
                    None => DEFAULT_TRAP_COST,
                };
                Ok(Command::SetTrap { cost })
            }
            CommandKind::DisarmTrap => match first {
                Some(raw) => Ok(Command::DisarmTrap {
                    wager: parse_number(raw, "wager")?,
                }),
                None => Err(GameError::Invalid(
                    "Tell me how many squeaks to wager, e.g. `!disarmtrap 3`.".to_string(),
                )),
            },
        }
    }
}

fn parse_number<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T, GameError> {
    raw.trim()
        .parse()
        .map_err(|_| GameError::Invalid(format!("`{raw}` is not a valid {what}.")))
}

/// Split a prefixed chat line like `!settrap 7` into a command name and arguments.
/// Returns None when the text does not start with `prefix` or has no command name.
pub fn split_prefixed<'a>(prefix: &str, text: &'a str) -> Option<(&'a str, Vec<String>)> {
    let rest = text.trim_start().strip_prefix(prefix)?;
    let mut words = rest.split_whitespace();
    let name = words.next()?;
    Some((name, words.map(str::to_string).collect()))
}
