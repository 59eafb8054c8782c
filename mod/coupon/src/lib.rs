pub mod api;
pub mod engine;
pub mod identity;
pub mod ledger;
pub mod model;
pub mod store;
pub mod worker;

use std::sync::Arc;

use axum::Router;
use coupond_core::{Module, ServiceError};
use coupond_sql::SQLStore;

use engine::ClaimEngine;
use worker::SweeperConfig;

/// Module configuration.
#[derive(Debug, Clone)]
pub struct CouponConfig {
    /// How long a successful claim bars its identity from claiming
    /// again (seconds).
    pub claim_window_secs: i64,
    /// Interval between expiry sweeps of the claim ledger (seconds).
    pub sweep_interval_secs: u64,
}

impl Default for CouponConfig {
    fn default() -> Self {
        Self {
            claim_window_secs: 3600,
            sweep_interval_secs: 60,
        }
    }
}

/// The Coupon module — single-use coupon distribution with a
/// time-windowed one-claim-per-client rule.
pub struct CouponModule {
    engine: Arc<ClaimEngine>,
    _sweeper_cancel: tokio_util::sync::CancellationToken,
}

impl CouponModule {
    /// Create the coupon module with default configuration and start
    /// the background expiry sweeper.
    pub fn new(db: Arc<dyn SQLStore>) -> Result<Self, ServiceError> {
        Self::with_config(db, CouponConfig::default())
    }

    /// Create with explicit configuration.
    pub fn with_config(db: Arc<dyn SQLStore>, config: CouponConfig) -> Result<Self, ServiceError> {
        let engine = Arc::new(ClaimEngine::new(db, config.claim_window_secs)?);
        let cancel = worker::start(
            Arc::clone(&engine),
            SweeperConfig {
                sweep_interval: config.sweep_interval_secs,
            },
        );

        Ok(Self {
            engine,
            _sweeper_cancel: cancel,
        })
    }

    /// Get a reference to the ClaimEngine for programmatic use.
    pub fn engine(&self) -> &Arc<ClaimEngine> {
        &self.engine
    }
}

impl Module for CouponModule {
    fn name(&self) -> &str {
        "coupon"
    }

    fn routes(&self) -> Router {
        api::router(Arc::clone(&self.engine))
    }
}
