//! Bridge every configured board to stdout.
//!
//! Demonstrates:
//! - Loading a board list from a JSON file
//! - Starting one connection per board
//! - Writing update and metadata batches as JSON lines
//! - Clean shutdown on Ctrl+C
//!
//! Usage:
//!   cargo run --example monitor -- boards.json
//!   cargo run --example monitor -- boards.json --debug
//!
//! Without a path, `~/.config/yarrboard/boards.json` is used. Logs go to
//! stderr so stdout stays a clean JSON-lines stream.

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use yarrboard_bridge::{BoardManager, BridgeConfig, JsonLinesSink, Result};

// ============================================================================
// Args
// ============================================================================

/// Command-line arguments.
#[derive(Debug, Clone)]
struct Args {
    config: PathBuf,
    debug: bool,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let config = args
            .iter()
            .find(|a| !a.starts_with("--"))
            .map(PathBuf::from)
            .unwrap_or_else(default_config_path);

        Self {
            config,
            debug: args.iter().any(|a| a == "--debug"),
        }
    }
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("yarrboard/boards.json")
}

/// `RUST_LOG` wins over `--debug`.
fn init_logging(debug: bool) {
    let fallback = if debug {
        "yarrboard_bridge=debug"
    } else {
        "yarrboard_bridge=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = BridgeConfig::from_file(&args.config)?;
    eprintln!(
        "[Setup] {} board(s) from {}",
        config.boards.len(),
        args.config.display()
    );

    let manager = BoardManager::start(&config, Arc::new(JsonLinesSink::stdout()))?;

    eprintln!("Press Ctrl+C to exit...");
    tokio::signal::ctrl_c().await?;

    eprintln!("[Shutdown] Closing boards...");
    manager.shutdown().await;

    Ok(())
}
