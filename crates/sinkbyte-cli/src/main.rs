mod commands;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "sinkbyte",
    version,
    about = "Deliver pipeline outputs to destination connectors"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to settings YAML (defaults apply when omitted)
    #[arg(long, env = "SINKBYTE_SETTINGS", global = true)]
    settings: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered destination definitions
    Connectors,
    /// Check connectivity for a destination
    Check {
        /// Definition uid or id
        definition: String,
        /// Path to the connection config JSON
        #[arg(long)]
        config: PathBuf,
        /// Overall deadline in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Write pipeline payloads to a destination
    Write {
        /// Definition uid or id
        definition: String,
        /// Path to the connection config JSON
        #[arg(long)]
        config: PathBuf,
        /// Path to a JSON array of pipeline payloads
        #[arg(long)]
        input: PathBuf,
        /// Explicit idempotency key; derived from the input when omitted
        #[arg(long)]
        idempotency_key: Option<String>,
        /// Overall deadline in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    let settings = cli.settings.as_deref();
    match cli.command {
        Commands::Connectors => commands::connectors::execute(settings),
        Commands::Check {
            definition,
            config,
            timeout_secs,
        } => commands::check::execute(settings, &definition, &config, timeout_secs).await,
        Commands::Write {
            definition,
            config,
            input,
            idempotency_key,
            timeout_secs,
        } => {
            let args = commands::write::WriteArgs {
                definition,
                config,
                input,
                idempotency_key,
                timeout_secs,
            };
            commands::write::execute(settings, &args).await
        }
    }
}
