//! `coupond` — the coupon distribution server binary.
//!
//! Usage:
//!   coupond -c <context-name-or-path> [--listen <addr>]
//!
//! The context name resolves to `/etc/coupond/<name>.toml`.
//! If a path with `/` or `.` is given, it's used directly.

mod config;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use coupond_core::Module;
use tracing::info;

use config::ServerConfig;

/// Coupon distribution server.
#[derive(Parser, Debug)]
#[command(name = "coupond", about = "Coupon distribution server")]
struct Cli {
    /// Context name or path to config file.
    #[arg(short = 'c', long = "config", required = true)]
    config: String,

    /// Listen address (overrides default 0.0.0.0:8080).
    #[arg(long = "listen", default_value = "0.0.0.0:8080")]
    listen: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    // Load server configuration.
    let config_path = ServerConfig::resolve_path(&cli.config);
    info!("Loading configuration from {}", config_path.display());
    let server_config = ServerConfig::load(&config_path)?;

    // Initialize storage.
    let data_dir = std::path::PathBuf::from(&server_config.storage.data_dir);
    std::fs::create_dir_all(&data_dir)?;

    let db: Arc<dyn coupond_sql::SQLStore> = Arc::new(
        coupond_sql::SqliteStore::open(&server_config.resolve_sqlite_path())
            .map_err(|e| anyhow::anyhow!("failed to open SQL store: {e}"))?,
    );

    // Initialize the coupon module (claim allocator + expiry sweeper).
    let coupon_module = coupon::CouponModule::with_config(
        Arc::clone(&db),
        coupon::CouponConfig {
            claim_window_secs: server_config.claim.window_secs,
            sweep_interval_secs: server_config.claim.sweep_interval_secs,
        },
    )?;
    info!(
        "Coupon module initialized (claim window: {}s)",
        server_config.claim.window_secs
    );

    let module_routes = vec![(coupon_module.name(), coupon_module.routes())];

    // Build router.
    let app = routes::build_router(module_routes, &server_config.cors);

    // Start server. Peer addresses feed the identity resolver, so the
    // make-service must carry connect info.
    let listener = tokio::net::TcpListener::bind(&cli.listen).await?;
    info!("coupond listening on {}", cli.listen);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
