// Per-user squeak balances.

use std::collections::HashMap;

use serde::Serialize;

use crate::db::{Database, StoreError};

/// One player's record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: String,
    pub display_name: String,
    pub score: u64,
}

/// All user records, kept in arrival order.
///
/// Arrival order is what breaks leaderboard ties, and it survives a reload
/// because the store hands records back in insertion order.
#[derive(Debug, Clone, Default)]
pub struct UserLedger {
    users: Vec<User>,
    index: HashMap<String, usize>,
}

impl UserLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ledger from previously persisted records, in their stored order.
    pub fn from_records(records: Vec<User>) -> Self {
        let mut ledger = Self::new();
        for user in records {
            if ledger.index.contains_key(&user.id) {
                tracing::warn!("Duplicate user record {} ignored on load", user.id);
                continue;
            }
            ledger.index.insert(user.id.clone(), ledger.users.len());
            ledger.users.push(user);
        }
        ledger
    }

    /// Restore every record from the store.
    pub async fn load(db: &Database) -> Result<Self, StoreError> {
        let records = db.load_all().await?;
        tracing::info!("Loaded {} user records", records.len());
        Ok(Self::from_records(records))
    }

    /// Flush all records to the store.
    pub async fn persist(&self, db: &Database) -> Result<(), StoreError> {
        db.upsert_all(&self.users).await
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&User> {
        self.index.get(id).map(|&i| &self.users[i])
    }

    /// Current score, 0 for unknown users.
    pub fn score(&self, id: &str) -> u64 {
        self.get(id).map(|u| u.score).unwrap_or(0)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Fetch a user, creating it with a zero score on first sight.
    /// A changed display name is written through to the existing record.
    pub fn get_or_create(&mut self, id: &str, display_name: &str) -> &User {
        let i = match self.index.get(id) {
            Some(&i) => {
                let user = &mut self.users[i];
                if user.display_name != display_name && !display_name.is_empty() {
                    tracing::debug!(
                        "User {} renamed from {} to {}",
                        id,
                        user.display_name,
                        display_name
                    );
                    user.display_name = display_name.to_string();
                }
                i
            }
            None => {
                let i = self.users.len();
                self.users.push(User {
                    id: id.to_string(),
                    display_name: display_name.to_string(),
                    score: 0,
                });
                self.index.insert(id.to_string(), i);
                i
            }
        };
        &self.users[i]
    }

    /// Add `delta` to a user's score, clamping at zero. Returns the new score.
    /// Unknown users are created with their id as display name.
    pub fn adjust_score(&mut self, id: &str, delta: i64) -> u64 {
        if !self.contains(id) {
            self.get_or_create(id, id);
        }
        let i = self.index[id];
        let user = &mut self.users[i];
        user.score = if delta >= 0 {
            user.score.saturating_add(delta.unsigned_abs())
        } else {
            user.score.saturating_sub(delta.unsigned_abs())
        };
        user.score
    }

    /// Highest scores first; equal scores keep arrival order.
    pub fn top_n(&self, n: usize) -> Vec<&User> {
        let mut ranked: Vec<&User> = self.users.iter().collect();
        // sort_by is stable, so ties stay in arrival order
        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        ranked.truncate(n);
        ranked
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }
}

/// Convert a squeak amount to a signed delta, saturating at `i64::MAX`.
pub fn signed(amount: u64) -> i64 {
    i64::try_from(amount).unwrap_or(i64::MAX)
}
