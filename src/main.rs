//! # Flight Scorer
//!
//! Connects to the simulator bridge, scores every flight, and prints each
//! notification as one JSON line on stdout.
//!
//! # Usage
//!
//! ```bash
//! flight-scorer                      # built-in defaults
//! flight-scorer config/default.toml  # explicit configuration
//! ```
//!
//! Logs go to stderr (and optionally a daily rolling file), so stdout stays
//! a clean JSON-lines stream:
//!
//! ```text
//! {"event":"connection-status","data":{"connected":true}}
//! {"event":"penalty-applied","data":{"message":"Excessive Bank Angle (> 40°)","points":2,"totalScore":98}}
//! ```

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use flight_scorer::config::{Config, LoggingConfig};
use flight_scorer::engine::Engine;
use flight_scorer::host::TcpSimConnector;
use flight_scorer::notify::Notification;

/// Log file name prefix inside `log_dir`
const LOG_FILE_PREFIX: &str = "flight-scorer.log";

#[tokio::main]
async fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(&path).with_context(|| format!("Failed to load config from {}", path))?,
        None => Config::default(),
    };

    let _log_guard = init_logging(&config.logging);

    info!("Flight Scorer v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Simulator bridge at {}", config.host.address);

    let connector = TcpSimConnector::new(config.host.address.clone(), config.host.connect_timeout());
    let (mut engine, mut notifications) = Engine::spawn(&config, connector);

    info!("Press Ctrl+C to exit");

    loop {
        tokio::select! {
            notification = notifications.recv() => match notification {
                Some(notification) => match to_json_line(&notification) {
                    Ok(line) => println!("{}", line),
                    Err(e) => warn!("Failed to serialize notification: {}", e),
                },
                None => break,
            },

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    engine.shutdown().await;
    info!("Shutdown complete");
    Ok(())
}

/// Install the tracing subscriber.
///
/// `RUST_LOG` wins over the configured level. With `log_dir` set, output goes
/// to a daily rolling file instead of stderr; the returned guard flushes it
/// on drop.
fn init_logging(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    match &logging.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            None
        }
    }
}

fn to_json_line(notification: &Notification) -> serde_json::Result<String> {
    serde_json::to_string(notification)
}
