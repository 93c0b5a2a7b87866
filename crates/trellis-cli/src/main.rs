//! Trellis CLI - Dependency-ordered stack provisioning
//!
//! This CLI lets operators:
//! - Preview the deterministic provisioning order (`plan`)
//! - Converge a declared stack against the control plane (`apply`)
//! - Tear a stack down in exact reverse order (`destroy`)
//!
//! Exit codes: 0 converged, 1 partial (failed or skipped nodes), 2 usage or
//! validation error.

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod error;
mod output;

use commands::StackArgs;

/// Trellis CLI application
#[derive(Parser)]
#[command(name = "trellis")]
#[command(about = "Trellis - Dependency-ordered stack provisioning", long_about = None)]
#[command(version)]
struct Cli {
    /// Log level
    #[arg(long, env = "TRELLIS_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "TRELLIS_LOG_JSON")]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Show the provisioning order and per-node decision without remote calls
    Plan {
        #[command(flatten)]
        stack: StackArgs,
    },

    /// Converge the stack: create, update, or skip each node
    Apply {
        #[command(flatten)]
        stack: StackArgs,

        /// Skip every node in this group (repeatable)
        #[arg(long = "skip-group")]
        skip_group: Vec<String>,
    },

    /// Delete everything the state file knows about, in reverse order
    Destroy {
        #[command(flatten)]
        stack: StackArgs,

        /// Bypass the platform's in-use checks on delete
        #[arg(long)]
        force_teardown: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());
    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().without_time())
            .init();
    }

    match run(cli.command).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            output::print_error(&format!("{e:#}"));
            std::process::exit(2);
        }
    }
}

async fn run(command: Commands) -> anyhow::Result<i32> {
    let code = match command {
        Commands::Plan { stack } => commands::plan::execute(&stack).await?,
        Commands::Apply { stack, skip_group } => {
            commands::apply::execute(&stack, &skip_group).await?
        }
        Commands::Destroy {
            stack,
            force_teardown,
        } => commands::destroy::execute(&stack, force_teardown).await?,
    };
    Ok(code)
}
