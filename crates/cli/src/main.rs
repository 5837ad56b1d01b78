mod config;
mod config_cmd;
mod lock;
mod log_cmd;
mod notify;
mod push_cmd;
mod trigger_cmd;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "autopush",
    version,
    about = "Mirror a local directory into a GitHub repository as one commit per push"
)]
struct Cli {
    /// Config file (default: $AUTOPUSH_CONFIG or ~/.config/autopush/autopush.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Push a full snapshot of the source folder now
    Push,

    /// Dispatch an event; pushes only if it matches the configured trigger
    Trigger {
        /// Event name
        event: String,

        /// Event arguments. JSON scalars (42, true) are compared by value.
        args: Vec<String>,
    },

    /// Show or clear the event log
    Logs(log_cmd::LogsArgs),

    /// Show or update settings
    Config(config_cmd::ConfigArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("autopush=info".parse().unwrap())
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = match config::resolve_config_path(cli.config) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Push => push_cmd::run_push(&config_path).await,
        Commands::Trigger { event, args } => {
            trigger_cmd::run_trigger(&config_path, &event, &args).await
        }
        Commands::Logs(args) => log_cmd::run(&config_path, args),
        Commands::Config(args) => config_cmd::run(&config_path, args),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
