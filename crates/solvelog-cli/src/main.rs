mod run;
mod summary;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "solvelog", about = "Solved-problem tracker and daily reminder bot")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the Discord bot and the reminder scheduler
    Run {
        /// Config file path (defaults to ~/.solvelog/config.json5)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Database path (overrides the config)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Print a user's solve summary from the local database
    Summary {
        /// Platform user id
        #[arg(long)]
        user: i64,

        /// Database path (overrides the config)
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, db } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run::run_bot(config, db))?;
        }
        Commands::Summary { user, db } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(summary::print_summary(user, db))?;
        }
    }

    Ok(())
}
