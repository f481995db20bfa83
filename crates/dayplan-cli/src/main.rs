use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "dayplan", version, about = "Dayplan CLI")]
struct Cli {
    /// User the command acts for
    #[arg(long, global = true, default_value = "default")]
    user: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Calendar synchronization
    Sync {
        #[command(subcommand)]
        action: commands::sync::SyncAction,
    },
    /// Daily planning
    Plan {
        #[command(subcommand)]
        action: commands::plan::PlanAction,
    },
    /// Task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Provider credential management
    Auth {
        #[command(subcommand)]
        action: commands::auth::AuthAction,
    },
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Sync { action } => commands::sync::run(&cli.user, action),
        Commands::Plan { action } => commands::plan::run(&cli.user, action),
        Commands::Task { action } => commands::task::run(&cli.user, action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Auth { action } => commands::auth::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
