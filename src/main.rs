//! Pushbridge CLI - Web Push relay entry point.
//!
//! This is the main binary entry point. See the `pushbridge` library for the
//! verification/decryption pipeline and fan-out delivery.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use pushbridge::{config::Config, keygen, replay, server};

/// mimalloc provides better multi-threaded performance than the system allocator.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[command(
    name = "pushbridge",
    version,
    about = "Web Push verification/decryption relay with fan-out delivery"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP front door.
    Serve,
    /// Replay a captured push event file through the pipeline locally.
    Replay {
        /// Push event input file.
        #[arg(long, default_value = "event.json")]
        event: PathBuf,
        /// Environment override applied before config parsing; repeatable.
        #[arg(long = "env", value_name = "VAR=VAL")]
        env: Vec<String>,
    },
    /// Generate a fresh set of subscription keys and print them as JSON.
    Keygen,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => {
            let config = Config::from_env()?;
            server::serve(config).await
        }
        Command::Replay { event, env } => {
            replay::apply_env_overrides(&env)?;
            let mut config = Config::from_env()?;
            // Replay never talks to the real broker.
            config.dev_delivery = true;
            replay::run(&event, &config).await
        }
        Command::Keygen => keygen::print_keys(),
    }
}
