// Player-facing game errors.

use thiserror::Error;

use crate::rate_limit::RateLimitError;

/// Errors surfaced to the player as a chat message. None of them changes state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// Malformed command argument.
    #[error("{0}")]
    Invalid(String),

    #[error("You need to {action} with at least {min} squeaks!")]
    BelowMinimum { action: &'static str, min: u64 },

    #[error("You need at least {needed} squeaks for that, but you only have {available}.")]
    InsufficientFunds { needed: u64, available: u64 },

    #[error("You already have a trap set!")]
    AlreadyTrapped,

    #[error("There are no traps here you can disarm!")]
    NoEligibleTrap,

    #[error("Traps only work where squeaks count. Try a squeaking channel!")]
    NotScoringLocation,

    #[error("{0}")]
    RateLimited(RateLimitError),
}

impl From<RateLimitError> for GameError {
    fn from(err: RateLimitError) -> Self {
        GameError::RateLimited(err)
    }
}
