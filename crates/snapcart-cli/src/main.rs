use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};

use snapcart_clock::ClockSync;
use snapcart_core::{ActionExecutor, SnapcartConfig};
use snapcart_driver::WebDriverExecutor;
use snapcart_scheduler::{SchedulerEngine, SchedulerParams};
use snapcart_session::{SessionProvider, SessionStore};

/// Time-gated checkout automation: log in once, wait for the target
/// instant on remote-corrected time, fire the purchase with bounded retry.
#[derive(Parser)]
#[command(name = "snapcart", version)]
struct Cli {
    /// Path to snapcart.toml (default: $SNAPCART_CONFIG, then
    /// ~/.snapcart/snapcart.toml).
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.or_else(|| std::env::var("SNAPCART_CONFIG").ok());
    let config =
        SnapcartConfig::load(config_path.as_deref()).context("failed to load configuration")?;
    let params =
        SchedulerParams::from_config(&config).context("invalid scheduling configuration")?;

    info!(
        target_url = %config.target.url,
        target_time = %config.target.time,
        max_retry = config.target.max_retry,
        "snapcart starting"
    );

    // session cache — single SQLite file
    ensure_parent_dir(&config.database.path);
    let conn = rusqlite::Connection::open(&config.database.path)
        .context("failed to open session cache")?;
    snapcart_session::db::init_db(&conn)?;
    let store = Arc::new(SessionStore::new(conn));

    // Ctrl-C interrupts any wait via the shared shutdown channel.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, aborting run");
            let _ = shutdown_tx.send(true);
        }
    });

    let executor =
        WebDriverExecutor::connect(config.driver.clone(), config.session.login_url.clone())
            .await
            .context("failed to start browser session")?;

    let provider = SessionProvider::new(Arc::clone(&store), config.session.clone());
    let mut login_shutdown = shutdown_rx.clone();
    if let Err(e) = provider.obtain(&executor, &mut login_shutdown).await {
        error!("session acquisition failed: {e}");
        executor.close().await;
        return Ok(ExitCode::FAILURE);
    }
    info!("session ready");

    // Pre-arm: land on the cart page before the timing loop takes over.
    if let Err(e) = executor.navigate(&config.target.url).await {
        error!("failed to open target page: {e}");
        executor.close().await;
        return Ok(ExitCode::FAILURE);
    }

    let clock = ClockSync::new(
        config.clock.endpoint.clone(),
        Duration::from_millis(config.clock.timeout_ms),
    )?;

    let engine = SchedulerEngine::new(&executor, &clock, store, params);
    let outcome = engine.run(shutdown_rx).await;
    executor.close().await;

    match outcome {
        Ok(report) => {
            info!(
                attempts = report.attempts,
                coarse_sleeps = report.coarse_sleeps,
                fired_at = %report.fired_at.to_rfc3339(),
                "purchase succeeded"
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!("run failed: {e}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
