mod commands;
mod context;

use clap::{Parser, Subcommand};
use colored::Colorize;
use context::StackContext;
use pgstack_core::Revision;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pgstack")]
#[command(about = "Declare and converge a PostgreSQL flexible server on Azure", long_about = None)]
struct Cli {
    /// Stack name (defaults to the stack file's `stack` node, then "dev")
    #[arg(short = 's', long, env = "PGSTACK_STACK", global = true)]
    stack: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the changes `up` would make
    Preview {
        /// Topology revision (v1, v2, v3)
        #[arg(short, long, default_value_t = Revision::default())]
        revision: Revision,
    },
    /// Create or update the stack's resources
    Up {
        /// Topology revision (v1, v2, v3)
        #[arg(short, long, default_value_t = Revision::default())]
        revision: Revision,
        /// Apply without asking
        #[arg(short, long)]
        yes: bool,
    },
    /// Delete every resource recorded for the stack
    Destroy {
        /// Delete without asking
        #[arg(short, long)]
        yes: bool,
    },
    /// Show the stack's exported outputs
    Outputs {
        /// Print secret values instead of masking them
        #[arg(long)]
        show_secrets: bool,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check the stack file and declare the topology without touching Azure
    Validate {
        /// Topology revision (v1, v2, v3)
        #[arg(short, long, default_value_t = Revision::default())]
        revision: Revision,
    },
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    if matches!(cli.command, Commands::Version) {
        println!("pgstack {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let ctx = match StackContext::load(cli.stack) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("{}", "✗ Failed to load the stack file".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Preview { revision } => commands::preview::handle(&ctx, revision).await,
        Commands::Up { revision, yes } => commands::up::handle(&ctx, revision, yes).await,
        Commands::Destroy { yes } => commands::destroy::handle(&ctx, yes).await,
        Commands::Outputs { show_secrets, json } => {
            commands::outputs::handle(&ctx, show_secrets, json).await
        }
        Commands::Validate { revision } => commands::validate::handle(&ctx, revision),
        Commands::Version => Ok(()),
    }
}
