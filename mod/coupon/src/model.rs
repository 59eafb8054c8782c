use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Coupon — the core data model, maps 1:1 to SQL columns
// ---------------------------------------------------------------------------

/// A single-use coupon.
///
/// `code` is immutable and unique for the lifetime of the pool;
/// `is_claimed` transitions false → true exactly once, atomically,
/// when the coupon is allocated to a claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub code: String,
    pub is_claimed: bool,
}

// ---------------------------------------------------------------------------
// StatusFilter
// ---------------------------------------------------------------------------

/// Claim-status filter for list/count queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Claimed,
    Unclaimed,
    All,
}

impl StatusFilter {
    /// Parse a `?status=` query value.
    ///
    /// Anything other than `claimed`/`unclaimed` (including absence)
    /// means "no filter" — the dashboard sends arbitrary strings here.
    pub fn parse(s: Option<&str>) -> Self {
        match s {
            Some("claimed") => Self::Claimed,
            Some("unclaimed") => Self::Unclaimed,
            _ => Self::All,
        }
    }
}

// ---------------------------------------------------------------------------
// ClaimOutcome
// ---------------------------------------------------------------------------

/// Result of a claim attempt, as seen by the HTTP layer.
///
/// Rejection and exhaustion are expected outcomes, not errors — the
/// handler maps them to 429/404 with their specific payloads, while
/// `ServiceError` covers the fatal paths.
#[derive(Debug, Clone)]
pub enum ClaimOutcome {
    /// A coupon was allocated and bound to this request.
    Allocated(Coupon),
    /// The identity already holds a live claim record.
    Rejected {
        /// Seconds until the live record expires.
        retry_after_secs: i64,
    },
    /// No unclaimed coupons remain in the pool.
    Exhausted,
}

// ---------------------------------------------------------------------------
// API request / response types
// ---------------------------------------------------------------------------

/// Body for `POST /coupon/create`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCouponsRequest {
    /// Number of coupons to create. Defaults to 1 when absent; an
    /// explicit 0 creates nothing; values above the batch cap are
    /// clamped server-side, not rejected.
    #[serde(default)]
    pub count: Option<u32>,
}

/// Query parameters for `GET /coupon/`.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub status: Option<String>,
}

/// Aggregate counts for the admin dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponStats {
    pub total: u64,
    pub claimed: u64,
    pub unclaimed: u64,
    /// Live claim records currently blocking repeat claims.
    pub active_claim_count: u64,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coupon_wire_shape() {
        let coupon = Coupon {
            code: "abc-123".into(),
            is_claimed: true,
        };
        let json = serde_json::to_string(&coupon).unwrap();
        assert!(json.contains("\"isClaimed\":true"));
        let back: Coupon = serde_json::from_str(&json).unwrap();
        assert_eq!(back, coupon);
    }

    #[test]
    fn status_filter_parse() {
        assert_eq!(StatusFilter::parse(Some("claimed")), StatusFilter::Claimed);
        assert_eq!(StatusFilter::parse(Some("unclaimed")), StatusFilter::Unclaimed);
        assert_eq!(StatusFilter::parse(Some("bogus")), StatusFilter::All);
        assert_eq!(StatusFilter::parse(None), StatusFilter::All);
    }

    #[test]
    fn create_request_defaults() {
        let req: CreateCouponsRequest = serde_json::from_str("{}").unwrap();
        assert!(req.count.is_none());

        let req: CreateCouponsRequest = serde_json::from_str(r#"{"count":25}"#).unwrap();
        assert_eq!(req.count, Some(25));
    }

    #[test]
    fn stats_wire_shape() {
        let stats = CouponStats {
            total: 10,
            claimed: 4,
            unclaimed: 6,
            active_claim_count: 3,
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["activeClaimCount"], 3);
        assert_eq!(json["unclaimed"], 6);
    }
}
