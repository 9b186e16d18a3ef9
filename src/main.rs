// Main entry point
mod application;
mod domain;
mod infrastructure;
mod interfaces;
mod presentation;
mod state;

use application::startup::{self, EXIT_FAILURE, EXIT_INTERRUPTED, EXIT_OK};
use clap::Parser;
use colored::Colorize;
use infrastructure::config::load_config;
use interfaces::cli::Cli;
use interfaces::protocol::ProtocolWriter;
use state::AppState;
use tokio::io::BufReader;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let code = if cli.is_protocol_mode() {
        run_protocol(&cli).await
    } else {
        match run_command(&cli).await {
            Ok(()) => EXIT_OK,
            Err(e) => {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
                EXIT_FAILURE
            }
        }
    };

    std::process::exit(code);
}

/// Serve the JSON protocol on stdin/stdout until input ends or SIGINT.
async fn run_protocol(cli: &Cli) -> i32 {
    let mut out = ProtocolWriter::new(tokio::io::stdout());

    let state = match prepare(cli) {
        Ok(state) => state,
        Err(e) => return startup::fail(&mut out, format!("{:#}", e)).await,
    };

    let input = BufReader::new(tokio::io::stdin());
    tokio::select! {
        code = startup::run(&state, input, &mut out) => code,
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => tracing::info!("Interrupted, shutting down"),
                Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
            }
            EXIT_INTERRUPTED
        }
    }
}

async fn run_command(cli: &Cli) -> anyhow::Result<()> {
    if cli.generate_config {
        let path = infrastructure::config::generate_config_sample(cli.config.as_deref())?;
        println!("Config file: {}", path.display());
        return Ok(());
    }

    let state = prepare(cli)?;
    if cli.status {
        presentation::status::print_status(&state, cli.config.as_deref()).await?;
    } else if cli.list_available {
        presentation::status::print_available(&state).await?;
    }
    Ok(())
}

fn prepare(cli: &Cli) -> anyhow::Result<AppState> {
    let config = load_config(cli.config.as_deref())?.with_overrides(cli);
    if config.logging.enable {
        init_logging(&config.logging)?;
    }
    Ok(AppState::new(config)?)
}

/// Initialize logging with path and level configuration.
///
/// Stdout belongs to the protocol, so the default sink is stderr.
fn init_logging(logging: &infrastructure::config::Logging) -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    let level = match logging.level.to_ascii_uppercase().as_str() {
        "TRACE" => "trace",
        "DEBUG" => "debug",
        "INFO" => "info",
        "WARN" => "warn",
        "ERROR" => "error",
        _ => "warn",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if let Some(path) = logging.path.as_deref().filter(|p| !p.is_empty()) {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .try_init()
            .map_err(|e| anyhow::anyhow!(e))?;
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))?;

    Ok(())
}

