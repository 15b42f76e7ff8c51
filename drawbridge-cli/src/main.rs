//! Drawbridge CLI
//!
//! Runs the remote-control bridge or a headless client over an in-memory
//! diagram.

// Use mimalloc as the global allocator for better performance
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "drawbridge",
    author,
    version,
    about = "Remote-control bridge for a diagram editor",
    long_about = "Drawbridge relays commands from a tool layer to a diagram editor over a WebSocket.\n\n\
                  It can be used as a CLI tool or embedded directly into your applications.",
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bridge server
    Serve(commands::serve::ServeArgs),

    /// Run a headless remote-control client over an in-memory diagram
    Client(commands::client::ClientArgs),

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => commands::serve::run(args).await,
        Commands::Client(args) => commands::client::run(args).await,
        Commands::Version => {
            commands::version::run();
            Ok(())
        }
    }
}
