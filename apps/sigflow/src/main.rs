//! # Sigflow - Functor Schedule Compiler
//!
//! The command-line binary for the Sigflow schedule compiler.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 apps/sigflow (THE BINARY)                │
//! │                                                          │
//! │  ┌─────────────┐   ┌─────────────┐   ┌───────────────┐   │
//! │  │    CLI      │   │  Manifest   │   │ Artifact I/O  │   │
//! │  │   (clap)    │   │ (toml/json) │   │   (std::fs)   │   │
//! │  └──────┬──────┘   └──────┬──────┘   └───────┬───────┘   │
//! │         └─────────────────┼──────────────────┘           │
//! │                           ▼                              │
//! │                  ┌─────────────────┐                     │
//! │                  │  sigflow-core   │                     │
//! │                  │  (THE LOGIC)    │                     │
//! │                  └─────────────────┘                     │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! sigflow -m graph.toml check
//! sigflow -m graph.toml plan --json-mode
//! sigflow -m graph.toml emit -o generated/
//! sigflow -m graph.toml simulate -e a -e none
//! ```

mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // Initialize tracing: SIGFLOW_LOG_FORMAT=json enables machine-parseable output.
    // Logs go to stderr so command output stays clean on stdout.
    let log_format = std::env::var("SIGFLOW_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sigflow=info,sigflow_core=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Banner would corrupt JSON output
    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Sigflow startup banner.
fn print_banner() {
    println!(
        r#"
  sigflow v{}
  layered, change-driven functor schedules
"#,
        env!("CARGO_PKG_VERSION")
    );
}
