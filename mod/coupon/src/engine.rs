use std::sync::Arc;

use tracing::{debug, info};

use coupond_core::ServiceError;
use coupond_sql::SQLStore;

use crate::ledger::ClaimLedger;
use crate::model::{ClaimOutcome, Coupon, CouponStats, StatusFilter};
use crate::store::CouponStore;

/// The claim engine — end-to-end claim protocol over the ledger and pool.
///
/// Per claim request:
/// 1. Record the identity in the ledger (atomic insert-if-absent).
///    A live record already there → `Rejected` with the remaining time.
/// 2. Allocate one coupon (atomic find-and-update).
///    Pool empty → release the just-recorded identity and `Exhausted`.
/// 3. Otherwise → `Allocated`.
///
/// Recording *before* allocating makes the ledger upsert the single
/// decision point for duplicate identities: a losing duplicate never
/// reaches allocation, so no coupon can leak to it. Each step runs
/// once; storage faults fail the request and the client may retry the
/// whole claim.
pub struct ClaimEngine {
    pool: CouponStore,
    ledger: ClaimLedger,
}

impl ClaimEngine {
    /// Create an engine with both stores sharing one backing database.
    pub fn new(db: Arc<dyn SQLStore>, claim_window_secs: i64) -> Result<Self, ServiceError> {
        Ok(Self {
            pool: CouponStore::new(Arc::clone(&db))?,
            ledger: ClaimLedger::new(db, claim_window_secs)?,
        })
    }

    /// The claim window in seconds (also the marker cookie max-age).
    pub fn claim_window_secs(&self) -> i64 {
        self.ledger.window_secs()
    }

    // =======================================================================
    // Claim protocol
    // =======================================================================

    /// Attempt to claim one coupon for `identity`.
    pub fn claim(&self, identity: &str) -> Result<ClaimOutcome, ServiceError> {
        if !self.ledger.try_record(identity)? {
            // The record may expire between the upsert and this read;
            // report zero remaining rather than inventing a window.
            let remaining = self.ledger.active_claim(identity)?.unwrap_or(0);
            debug!(identity, remaining, "claim rejected: identity within window");
            return Ok(ClaimOutcome::Rejected {
                retry_after_secs: remaining,
            });
        }

        match self.pool.allocate_one()? {
            Some(coupon) => {
                info!(identity, code = %coupon.code, "coupon allocated");
                Ok(ClaimOutcome::Allocated(coupon))
            }
            None => {
                // The identity was recorded before we learned the pool
                // was empty; roll that back so exhaustion does not
                // start a claim window.
                self.ledger.release(identity)?;
                debug!(identity, "claim failed: pool exhausted");
                Ok(ClaimOutcome::Exhausted)
            }
        }
    }

    // =======================================================================
    // Administration / reporting
    // =======================================================================

    /// Create a batch of coupons. `None` means the default of one;
    /// oversized requests are clamped by the pool.
    pub fn create_coupons(&self, count: Option<u32>) -> Result<Vec<Coupon>, ServiceError> {
        let created = self.pool.insert_batch(count.unwrap_or(1))?;
        info!(count = created.len(), "coupons created");
        Ok(created)
    }

    /// List coupons with an optional claim-status filter.
    pub fn list(&self, filter: StatusFilter) -> Result<Vec<Coupon>, ServiceError> {
        self.pool.list(filter)
    }

    /// Aggregate counts over the pool and the ledger.
    pub fn stats(&self) -> Result<CouponStats, ServiceError> {
        Ok(CouponStats {
            total: self.pool.count(StatusFilter::All)?,
            claimed: self.pool.count(StatusFilter::Claimed)?,
            unclaimed: self.pool.count(StatusFilter::Unclaimed)?,
            active_claim_count: self.ledger.active_count()?,
        })
    }

    /// Drop expired ledger records (driven by the background sweeper).
    pub fn purge_expired(&self) -> Result<u64, ServiceError> {
        self.ledger.purge_expired()
    }
}
