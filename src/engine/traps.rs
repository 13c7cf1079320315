// Mouse traps: escrowed stakes scoped to one location.

use std::time::{Duration, Instant};

use rand::Rng;

use super::error::GameError;
use super::ledger::{signed, UserLedger};

/// Smallest stake a trap can be set with.
pub const MIN_TRAP_COST: u64 = 5;
/// Smallest wager accepted by `disarm`.
pub const MIN_DISARM: u64 = 3;
/// The correct wager is the trap cost minus this.
pub const DISARM_DISCOUNT: u64 = 2;

/// An active trap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trap {
    pub owner_id: String,
    pub owner_name: String,
    pub cost: u64,
    pub location_id: String,
    pub set_at: Instant,
}

impl Trap {
    /// The wager that disarms this trap.
    pub fn required_wager(&self) -> u64 {
        self.cost.saturating_sub(DISARM_DISCOUNT)
    }
}

/// A trap that went off on a squeaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggeredTrap {
    pub trap: Trap,
    pub victim_id: String,
    pub victim_name: String,
    /// Squeaks actually removed, which is less than the cost when the victim was short.
    pub taken: u64,
}

/// How a wrong wager is punished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisarmPenalty {
    /// Lose the whole wager.
    #[default]
    FullWager,
    /// Lose half the wager, rounded down.
    HalfWager,
}

impl DisarmPenalty {
    pub fn apply(self, wager: u64) -> u64 {
        match self {
            DisarmPenalty::FullWager => wager,
            DisarmPenalty::HalfWager => wager / 2,
        }
    }
}

/// Result of a disarm attempt that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisarmOutcome {
    /// Wrong wager. The trap stays and the disarmer paid `penalty`.
    Failed { required: u64, penalty: u64 },
    /// The trap went off while disarming: the wager went to the trap owner.
    Mishap { trap: Trap, lost: u64 },
    /// Trap removed, nothing paid.
    CleanDisarm { trap: Trap },
}

/// Odds used when resolving traps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrapOdds {
    /// Chance that a single eligible trap fires on a squeak.
    pub trigger: f64,
    /// Chance that a correct disarm still sets the trap off.
    pub mishap: f64,
    pub penalty: DisarmPenalty,
}

impl Default for TrapOdds {
    fn default() -> Self {
        Self {
            trigger: 0.30,
            mishap: 0.05,
            penalty: DisarmPenalty::FullWager,
        }
    }
}

/// Active traps in the order they were set.
#[derive(Debug, Clone, Default)]
pub struct TrapRegistry {
    traps: Vec<Trap>,
}

impl TrapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.traps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traps.is_empty()
    }

    /// The trap owned by `owner_id`, wherever it is.
    pub fn owned_by(&self, owner_id: &str) -> Option<&Trap> {
        self.traps.iter().find(|t| t.owner_id == owner_id)
    }

    /// Traps at `location_id`, oldest first.
    pub fn list_at(&self, location_id: &str) -> Vec<&Trap> {
        self.traps
            .iter()
            .filter(|t| t.location_id == location_id)
            .collect()
    }

    /// Index of the oldest trap at `location_id` not owned by `excluded_owner`.
    pub fn first_eligible(&self, location_id: &str, excluded_owner: &str) -> Option<usize> {
        self.traps
            .iter()
            .position(|t| t.location_id == location_id && t.owner_id != excluded_owner)
    }

    /// Set a trap, escrowing `cost` from the owner's score.
    pub fn set_trap(
        &mut self,
        ledger: &mut UserLedger,
        owner_id: &str,
        owner_name: &str,
        cost: u64,
        location_id: &str,
        now: Instant,
    ) -> Result<Trap, GameError> {
        if cost < MIN_TRAP_COST {
            return Err(GameError::BelowMinimum {
                action: "set a trap",
                min: MIN_TRAP_COST,
            });
        }
        if self.owned_by(owner_id).is_some() {
            return Err(GameError::AlreadyTrapped);
        }
        let available = ledger.score(owner_id);
        if available < cost {
            return Err(GameError::InsufficientFunds {
                needed: cost,
                available,
            });
        }

        ledger.adjust_score(owner_id, -signed(cost));
        let trap = Trap {
            owner_id: owner_id.to_string(),
            owner_name: owner_name.to_string(),
            cost,
            location_id: location_id.to_string(),
            set_at: now,
        };
        self.traps.push(trap.clone());
        tracing::info!(
            "{} set a {}-squeak trap in {}",
            owner_name,
            cost,
            location_id
        );
        Ok(trap)
    }

    /// Roll every eligible trap at `location_id` in order; the first one that
    /// wins its roll fires, is removed, and takes its cost from the victim.
    pub fn maybe_trigger<R: Rng>(
        &mut self,
        ledger: &mut UserLedger,
        rng: &mut R,
        trigger_chance: f64,
        victim_id: &str,
        victim_name: &str,
        location_id: &str,
    ) -> Option<TriggeredTrap> {
        let index = self.traps.iter().position(|t| {
            t.location_id == location_id
                && t.owner_id != victim_id
                && rng.gen_bool(trigger_chance)
        })?;

        let trap = self.traps.remove(index);
        let before = ledger.score(victim_id);
        let after = ledger.adjust_score(victim_id, -signed(trap.cost));
        tracing::info!(
            "{}'s trap caught {} in {} ({} squeaks burned)",
            trap.owner_name,
            victim_name,
            location_id,
            before - after
        );
        Some(TriggeredTrap {
            trap,
            victim_id: victim_id.to_string(),
            victim_name: victim_name.to_string(),
            taken: before - after,
        })
    }

    /// Try to disarm the oldest trap at `location_id` that `disarmer_id` does not own.
    pub fn disarm<R: Rng>(
        &mut self,
        ledger: &mut UserLedger,
        rng: &mut R,
        odds: &TrapOdds,
        disarmer_id: &str,
        disarmer_name: &str,
        location_id: &str,
        wager: u64,
    ) -> Result<DisarmOutcome, GameError> {
        if wager < MIN_DISARM {
            return Err(GameError::BelowMinimum {
                action: "disarm a trap",
                min: MIN_DISARM,
            });
        }
        let available = ledger.score(disarmer_id);
        if available < wager {
            return Err(GameError::InsufficientFunds {
                needed: wager,
                available,
            });
        }
        let index = self
            .first_eligible(location_id, disarmer_id)
            .ok_or(GameError::NoEligibleTrap)?;

        let required = self.traps[index].required_wager();
        if wager != required {
            let penalty = odds.penalty.apply(wager);
            ledger.adjust_score(disarmer_id, -signed(penalty));
            tracing::info!(
                "{} failed to disarm a trap in {} (wagered {}, lost {})",
                disarmer_name,
                location_id,
                wager,
                penalty
            );
            return Ok(DisarmOutcome::Failed { required, penalty });
        }

        let trap = self.traps.remove(index);
        if rng.gen_bool(odds.mishap) {
            ledger.adjust_score(disarmer_id, -signed(wager));
            ledger.adjust_score(&trap.owner_id, signed(wager));
            tracing::info!(
                "{}'s trap went off on {} while disarming ({} squeaks to the owner)",
                trap.owner_name,
                disarmer_name,
                wager
            );
            Ok(DisarmOutcome::Mishap { trap, lost: wager })
        } else {
            tracing::info!("{} disarmed {}'s trap", disarmer_name, trap.owner_name);
            Ok(DisarmOutcome::CleanDisarm { trap })
        }
    }

    /// Remove traps older than `ttl` and refund their escrow to the owners.
    pub fn expire(&mut self, ledger: &mut UserLedger, now: Instant, ttl: Duration) -> Vec<Trap> {
        let (expired, active): (Vec<Trap>, Vec<Trap>) = std::mem::take(&mut self.traps)
            .into_iter()
            .partition(|t| now.saturating_duration_since(t.set_at) >= ttl);
        self.traps = active;

        for trap in &expired {
            ledger.adjust_score(&trap.owner_id, signed(trap.cost));
            tracing::info!(
                "{}'s trap in {} expired, {} squeaks refunded",
                trap.owner_name,
                trap.location_id,
                trap.cost
            );
        }
        expired
    }
}
