use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "quizwatch-cli", version, about = "Quizwatch CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether the monthly quiz activates on a date
    Gate(commands::gate::GateArgs),
    /// Compute the phase of a scheduled quiz at an instant
    Phase(commands::phase::PhaseArgs),
    /// Select today's quiz from a file of candidate events
    Select(commands::select::SelectArgs),
    /// Run the countdown scheduler and stream its events as JSON lines
    Watch(commands::watch::WatchArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("quizwatch_core=info,quizwatch_cli=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Gate(args) => commands::gate::run(args),
        Commands::Phase(args) => commands::phase::run(args),
        Commands::Select(args) => commands::select::run(args),
        Commands::Watch(args) => commands::watch::run(args),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
