use std::sync::Arc;

use coupond_core::{ServiceError, new_code};
use coupond_sql::{Row, SQLStore, Value};

use crate::model::{Coupon, StatusFilter};

/// SQL schema for the coupon pool.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS coupons (
    code        TEXT PRIMARY KEY,
    is_claimed  INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_coupons_claimed ON coupons(is_claimed);
";

/// Maximum coupons created per batch, regardless of the requested count.
/// Larger requests are clamped silently, not rejected.
pub const MAX_BATCH: u32 = 100;

/// Persistent storage for coupons, backed by SQLStore (SQLite).
pub struct CouponStore {
    db: Arc<dyn SQLStore>,
}

impl CouponStore {
    /// Create a new CouponStore and initialise the schema.
    pub fn new(db: Arc<dyn SQLStore>) -> Result<Self, ServiceError> {
        db.exec(SCHEMA, &[])
            .map_err(|e| ServiceError::Storage(format!("coupon schema init: {e}")))?;
        Ok(Self { db })
    }

    // -----------------------------------------------------------------------
    // Creation
    // -----------------------------------------------------------------------

    /// Insert `count` freshly generated unclaimed coupons (clamped to
    /// [`MAX_BATCH`]). Returns the created set. A unique-constraint hit
    /// on a generated code surfaces as a storage fault; it is not
    /// expected to happen.
    pub fn insert_batch(&self, count: u32) -> Result<Vec<Coupon>, ServiceError> {
        let count = count.min(MAX_BATCH);
        let mut created = Vec::with_capacity(count as usize);

        for _ in 0..count {
            let code = new_code();
            self.db
                .exec(
                    "INSERT INTO coupons (code, is_claimed) VALUES (?1, 0)",
                    &[Value::Text(code.clone())],
                )
                .map_err(|e| ServiceError::Storage(e.to_string()))?;
            created.push(Coupon {
                code,
                is_claimed: false,
            });
        }

        Ok(created)
    }

    // -----------------------------------------------------------------------
    // Allocation
    // -----------------------------------------------------------------------

    /// Atomically allocate the oldest unclaimed coupon.
    ///
    /// One find-and-update statement: under concurrent callers every
    /// coupon is handed out at most once, with no window in which two
    /// callers see the same row unclaimed. Returns `None` (not an
    /// error) when the pool is exhausted.
    ///
    /// Allocation follows insertion order (rowid) — documented
    /// behavior, though only the atomicity is a guarantee.
    pub fn allocate_one(&self) -> Result<Option<Coupon>, ServiceError> {
        let rows = self
            .db
            .query(
                "UPDATE coupons SET is_claimed = 1 \
                 WHERE code = (SELECT code FROM coupons WHERE is_claimed = 0 \
                               ORDER BY rowid LIMIT 1) \
                 RETURNING code, is_claimed",
                &[],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        rows.first().map(row_to_coupon).transpose()
    }

    // -----------------------------------------------------------------------
    // List / Query
    // -----------------------------------------------------------------------

    /// List coupons with an optional claim-status filter, in insertion order.
    pub fn list(&self, filter: StatusFilter) -> Result<Vec<Coupon>, ServiceError> {
        let (sql, params) = filtered(
            "SELECT code, is_claimed FROM coupons",
            " ORDER BY rowid",
            filter,
        );
        let rows = self
            .db
            .query(&sql, &params)
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        rows.iter().map(row_to_coupon).collect()
    }

    /// Count coupons matching the filter.
    pub fn count(&self, filter: StatusFilter) -> Result<u64, ServiceError> {
        let (sql, params) = filtered("SELECT COUNT(*) AS cnt FROM coupons", "", filter);
        let rows = self
            .db
            .query(&sql, &params)
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        Ok(rows.first().and_then(|r| r.get_i64("cnt")).unwrap_or(0) as u64)
    }
}

fn filtered(select: &str, suffix: &str, filter: StatusFilter) -> (String, Vec<Value>) {
    match filter {
        StatusFilter::All => (format!("{select}{suffix}"), vec![]),
        StatusFilter::Claimed => (
            format!("{select} WHERE is_claimed = ?1{suffix}"),
            vec![Value::Integer(1)],
        ),
        StatusFilter::Unclaimed => (
            format!("{select} WHERE is_claimed = ?1{suffix}"),
            vec![Value::Integer(0)],
        ),
    }
}

fn row_to_coupon(row: &Row) -> Result<Coupon, ServiceError> {
    let code = row
        .get_str("code")
        .ok_or_else(|| ServiceError::Storage("missing code column".into()))?;
    Ok(Coupon {
        code: code.to_string(),
        is_claimed: row.get_bool("is_claimed").unwrap_or(false),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use coupond_sql::SqliteStore;

    fn test_store() -> CouponStore {
        let db = Arc::new(SqliteStore::open_in_memory().unwrap());
        CouponStore::new(db).unwrap()
    }

    #[test]
    fn batch_creates_unique_unclaimed_codes() {
        let store = test_store();
        let created = store.insert_batch(10).unwrap();
        assert_eq!(created.len(), 10);
        assert!(created.iter().all(|c| !c.is_claimed));

        let mut codes: Vec<_> = created.iter().map(|c| c.code.clone()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), 10);
    }

    #[test]
    fn batch_is_clamped_not_rejected() {
        let store = test_store();
        let created = store.insert_batch(500).unwrap();
        assert_eq!(created.len(), MAX_BATCH as usize);
        assert_eq!(store.count(StatusFilter::All).unwrap(), MAX_BATCH as u64);
    }

    #[test]
    fn batch_of_zero_creates_nothing() {
        let store = test_store();
        assert!(store.insert_batch(0).unwrap().is_empty());
        assert_eq!(store.count(StatusFilter::All).unwrap(), 0);
    }

    #[test]
    fn allocate_marks_claimed_and_returns_post_update() {
        let store = test_store();
        store.insert_batch(1).unwrap();

        let coupon = store.allocate_one().unwrap().unwrap();
        assert!(coupon.is_claimed);
        assert_eq!(store.count(StatusFilter::Unclaimed).unwrap(), 0);
        assert_eq!(store.count(StatusFilter::Claimed).unwrap(), 1);
    }

    #[test]
    fn allocate_follows_insertion_order() {
        let store = test_store();
        let created = store.insert_batch(3).unwrap();

        let first = store.allocate_one().unwrap().unwrap();
        let second = store.allocate_one().unwrap().unwrap();
        assert_eq!(first.code, created[0].code);
        assert_eq!(second.code, created[1].code);
    }

    #[test]
    fn allocate_from_empty_pool_is_none() {
        let store = test_store();
        assert!(store.allocate_one().unwrap().is_none());

        store.insert_batch(1).unwrap();
        assert!(store.allocate_one().unwrap().is_some());
        // Exhausted again — and the pool is left fully claimed.
        assert!(store.allocate_one().unwrap().is_none());
        assert_eq!(store.count(StatusFilter::Claimed).unwrap(), 1);
    }

    #[test]
    fn never_allocates_the_same_coupon_twice() {
        let store = test_store();
        store.insert_batch(20).unwrap();

        let mut codes = Vec::new();
        while let Some(coupon) = store.allocate_one().unwrap() {
            codes.push(coupon.code);
        }
        assert_eq!(codes.len(), 20);
        let mut deduped = codes.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), codes.len());
    }

    #[test]
    fn list_with_filter() {
        let store = test_store();
        store.insert_batch(3).unwrap();
        store.allocate_one().unwrap();

        assert_eq!(store.list(StatusFilter::All).unwrap().len(), 3);
        assert_eq!(store.list(StatusFilter::Claimed).unwrap().len(), 1);
        assert_eq!(store.list(StatusFilter::Unclaimed).unwrap().len(), 2);
    }
}
