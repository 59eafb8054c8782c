mod coupons;

use std::sync::Arc;

use axum::Router;

use crate::engine::ClaimEngine;

/// Build the complete coupon module router.
///
/// Routes (nested under `/coupon` by the binary):
/// - `POST /claim`           — claim one coupon for the calling client
/// - `POST /create`          — create a batch of coupons
/// - `GET  /`                — list coupons (`?status=claimed|unclaimed`)
/// - `GET  /dashboard-stats` — aggregate counts
pub fn router(engine: Arc<ClaimEngine>) -> Router {
    coupons::router(engine)
}
