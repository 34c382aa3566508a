//! Bytecache demo
//!
//! Fronts a simulated slow data source with the cache, reporting statistics
//! periodically until interrupted.

use std::time::Duration;

use anyhow::{bail, Context};
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bytecache::{Cache, CacheConfig};

/// TTL for records loaded from the data source
const RECORD_TTL: Duration = Duration::from_secs(5);

/// Number of distinct records the demo requests
const KEY_SPACE: u64 = 64;

/// Main entry point for the demo.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the cache, which starts its scanner and reaper
/// 4. Serve simulated requests through get-or-compute
/// 5. On SIGINT/SIGTERM, signal the background tasks to stop
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bytecache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting bytecache demo");

    let config = CacheConfig::from_env();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let cache = Cache::new(shutdown_rx, config);

    let mut requests = tokio::time::interval(Duration::from_millis(50));
    let mut report = tokio::time::interval(Duration::from_secs(10));
    let mut request_id: u64 = 0;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = requests.tick() => {
                request_id += 1;
                let key = format!("record:{}", request_id.wrapping_mul(7919) % KEY_SPACE);
                if let Err(err) = cache.get_or_compute_with_ttl(&key, RECORD_TTL, load_record) {
                    warn!(key = %key, error = %err, "Data source lookup failed");
                }
            }
            _ = report.tick() => {
                let stats = serde_json::to_string(&cache.stats()).context("serializing cache stats")?;
                info!(stats = %stats, "Cache statistics");
            }
            _ = &mut shutdown => break,
        }
    }

    shutdown_tx
        .send(true)
        .context("signalling background tasks to stop")?;
    info!("Shutdown complete");
    Ok(())
}

/// Simulated slow data source. One record is permanently unavailable so
/// failed loads show up in the logs.
fn load_record(key: &str) -> anyhow::Result<Vec<u8>> {
    if key.ends_with(":13") {
        bail!("record {key} is unavailable");
    }

    std::thread::sleep(Duration::from_millis(5));
    let body = format!(
        r#"{{"key":"{}","loaded_at":"{}"}}"#,
        key,
        chrono::Utc::now().to_rfc3339()
    );
    Ok(body.into_bytes())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
