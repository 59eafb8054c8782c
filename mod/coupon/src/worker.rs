use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::engine::ClaimEngine;

/// Configuration for the background ledger sweeper.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// How often to drop expired claim records (seconds).
    pub sweep_interval: u64,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self { sweep_interval: 60 }
    }
}

/// Start the background expiry sweeper.
///
/// Every read of the ledger already filters out expired records; the
/// sweeper only keeps the table bounded, so a missed tick costs
/// nothing but disk.
///
/// Returns a CancellationToken that stops the worker when cancelled.
pub fn start(engine: Arc<ClaimEngine>, config: SweeperConfig) -> CancellationToken {
    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        let interval = Duration::from_secs(config.sweep_interval);

        tokio::spawn(async move {
            info!("claim ledger sweeper started (interval={interval:?})");
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("claim ledger sweeper stopped");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        debug!("ledger sweep");
                        match engine.purge_expired() {
                            Ok(0) => {}
                            Ok(n) => info!("ledger sweeper: purged {n} expired claims"),
                            Err(e) => error!("ledger sweeper error: {e}"),
                        }
                    }
                }
            }
        });
    }

    cancel
}
