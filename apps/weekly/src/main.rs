//! # Weekly
//!
//! The main binary for Weekly, a weekly work report tool.
//!
//! This application provides:
//! - CLI interface for reports, users and the configuration catalog
//! - Push/pull sync against a remote collection service (reqwest-based)
//! - Interactive composing with periodic autosave
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      apps/weekly (THE BINARY)                   │
//! │                                                                 │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────────┐   │
//! │  │   CLI       │    │ Sync Engine │    │    Autosave      │   │
//! │  │  (clap)     │    │  (reqwest)  │    │  (tokio timer)   │   │
//! │  └──────┬──────┘    └──────┬──────┘    └────────┬─────────┘   │
//! │         │                  │                    │              │
//! │         └──────────────────┼────────────────────┘              │
//! │                            ▼                                   │
//! │                    ┌───────────────┐                           │
//! │                    │  weekly-core  │                           │
//! │                    │ (THE LOGIC)   │                           │
//! │                    └───────────────┘                           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! weekly init
//! weekly login -u admin -p admin123
//! weekly report new --domain d1 --brand b1 --model m1 --baseline bl1 -m cam="fixed AF" --submit
//! weekly query --status submitted --format csv -o reports.csv
//! weekly sync push
//! ```

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use weekly::cli;

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // WEEKLY_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("WEEKLY_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "weekly=info,weekly_core=info".into());

    // Logs go to stderr so command output on stdout stays pipeable.
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
