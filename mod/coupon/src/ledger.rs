use std::sync::Arc;

use coupond_core::{ServiceError, now_epoch};
use coupond_sql::{SQLStore, Value};

/// SQL schema for the claim ledger.
///
/// One row per identity; `claimed_at` is unix seconds. A row is *live*
/// while `claimed_at > now - window`; expired rows are ignored by every
/// read and physically removed by the sweeper.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS claims (
    identity    TEXT PRIMARY KEY,
    claimed_at  INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_claims_at ON claims(claimed_at);
";

/// Durable, self-expiring record of which identities hold a live claim.
///
/// This is the sole authority on "has this identity claimed recently".
/// The browser cookie the claim endpoint sets is a UX hint only and is
/// never read back.
pub struct ClaimLedger {
    db: Arc<dyn SQLStore>,
    window_secs: i64,
}

impl ClaimLedger {
    /// Create the ledger and initialise its schema.
    pub fn new(db: Arc<dyn SQLStore>, window_secs: i64) -> Result<Self, ServiceError> {
        db.exec(SCHEMA, &[])
            .map_err(|e| ServiceError::Storage(format!("claim ledger schema init: {e}")))?;
        Ok(Self { db, window_secs })
    }

    /// The claim window in seconds.
    pub fn window_secs(&self) -> i64 {
        self.window_secs
    }

    /// Whether `identity` holds a live claim; returns seconds until its
    /// expiry if so. Expired records never show up here.
    pub fn active_claim(&self, identity: &str) -> Result<Option<i64>, ServiceError> {
        let now = now_epoch();
        let rows = self
            .db
            .query(
                "SELECT claimed_at FROM claims WHERE identity = ?1 AND claimed_at > ?2",
                &[
                    Value::Text(identity.to_string()),
                    Value::Integer(now - self.window_secs),
                ],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        Ok(rows
            .first()
            .and_then(|r| r.get_i64("claimed_at"))
            .map(|at| (self.window_secs - (now - at)).max(0)))
    }

    /// Atomically record a claim unless a live one already exists.
    ///
    /// Single conditional upsert: inserts a fresh record, refreshes an
    /// expired one, or changes nothing when a live record is present —
    /// in which case this returns `false`. This statement is the
    /// linearization point for "one claim per identity per window":
    /// two concurrent first-time claims from the same identity cannot
    /// both see `true`.
    pub fn try_record(&self, identity: &str) -> Result<bool, ServiceError> {
        let now = now_epoch();
        let affected = self
            .db
            .exec(
                "INSERT INTO claims (identity, claimed_at) VALUES (?1, ?2) \
                 ON CONFLICT(identity) DO UPDATE SET claimed_at = excluded.claimed_at \
                 WHERE claims.claimed_at <= ?3",
                &[
                    Value::Text(identity.to_string()),
                    Value::Integer(now),
                    Value::Integer(now - self.window_secs),
                ],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        Ok(affected > 0)
    }

    /// Compensating delete for a claim that could not be honored
    /// (recorded, then the pool turned out to be exhausted).
    pub fn release(&self, identity: &str) -> Result<(), ServiceError> {
        self.db
            .exec(
                "DELETE FROM claims WHERE identity = ?1",
                &[Value::Text(identity.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Physically remove expired records. Returns how many were dropped.
    ///
    /// Correctness never depends on this — every read filters by the
    /// cutoff — it only keeps the table from growing without bound.
    pub fn purge_expired(&self) -> Result<u64, ServiceError> {
        let cutoff = now_epoch() - self.window_secs;
        self.db
            .exec(
                "DELETE FROM claims WHERE claimed_at <= ?1",
                &[Value::Integer(cutoff)],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))
    }

    /// Number of live claim records (dashboard).
    pub fn active_count(&self) -> Result<u64, ServiceError> {
        let cutoff = now_epoch() - self.window_secs;
        let rows = self
            .db
            .query(
                "SELECT COUNT(*) AS cnt FROM claims WHERE claimed_at > ?1",
                &[Value::Integer(cutoff)],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        Ok(rows.first().and_then(|r| r.get_i64("cnt")).unwrap_or(0) as u64)
    }
}
