// Game server: owns the engine behind one lock and flushes the ledger after each event.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::db::{Database, StoreError};
use crate::metrics;

use super::event::{Action, InboundEvent};
use super::game::GameEngine;

pub const DEFAULT_PERSIST_TIMEOUT: Duration = Duration::from_secs(5);

/// Serializes every event through a single engine.
///
/// The lock is held across the flush so that no two events interleave
/// their mutations or their writes.
pub struct SqueakServer {
    engine: Mutex<GameEngine>,
    db: Arc<Database>,
    persist_timeout: Duration,
}

impl SqueakServer {
    pub fn new(engine: GameEngine, db: Arc<Database>, persist_timeout: Duration) -> Self {
        Self {
            engine: Mutex::new(engine),
            db,
            persist_timeout,
        }
    }

    /// Process one event and return the actions for the platform to perform.
    /// Never fails: game errors are already chat text, store errors are logged.
    pub async fn handle_event(&self, event: InboundEvent) -> Vec<Action> {
        let mut engine = self.engine.lock().await;

        let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
            engine.handle_event(&event, Instant::now())
        }));
        let response = match result {
            Ok(response) => response,
            Err(_) => {
                metrics::EVENT_PANICS_TOTAL.inc();
                tracing::error!(
                    "Handling event from {} panicked; event dropped",
                    event.sender_id()
                );
                return Vec::new();
            }
        };

        if response.mutated {
            if let Err(e) = self.persist(&engine).await {
                // In-memory state stays authoritative; the next mutation retries the flush.
                metrics::PERSIST_FAILURES_TOTAL.inc();
                tracing::error!("Failed to persist ledger: {e}");
            }
        }

        response.actions
    }

    async fn persist(&self, engine: &GameEngine) -> Result<(), StoreError> {
        let timer = metrics::PERSIST_DURATION_SECONDS.start_timer();
        let result =
            tokio::time::timeout(self.persist_timeout, engine.ledger().persist(&self.db)).await;
        timer.observe_duration();
        result.map_err(|_| StoreError::Timeout(self.persist_timeout))?
    }

    /// Score of one user, for diagnostics and tests.
    pub async fn score(&self, user_id: &str) -> u64 {
        self.engine.lock().await.ledger().score(user_id)
    }
}
