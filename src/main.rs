//! pveha CLI entrypoint.
//!
//! This is the main entrypoint for the pveha command-line tool.

use std::process::ExitCode;

use pveha::cli::{Cli, Commands, GuestArgs, OutputFormatter, ResourceArgs};
use pveha::config::{self, ConnectionConfig};
use pveha::error::Result;
use pveha::reconciler::{Mode, Reconciler};
use pveha::PveClient;

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);

    // Load .env before resolving the credential fallback
    config::load_dotenv();

    let config = ConnectionConfig::resolve(
        cli.connection.api_host,
        cli.connection.api_port,
        cli.connection.api_user,
        cli.connection.api_password,
        cli.connection.validate_certs,
    )?;

    let client = PveClient::connect(&config).await?;

    match cli.command {
        Commands::Plan { resource } => cmd_reconcile(&client, &resource, Mode::Check, &formatter).await,
        Commands::Apply { resource } => cmd_reconcile(&client, &resource, Mode::Apply, &formatter).await,
        Commands::Status { guest } => cmd_status(&client, &guest, &formatter).await,
    }
}

/// Runs one reconciliation in the given mode and prints the report.
async fn cmd_reconcile(
    client: &PveClient,
    resource: &ResourceArgs,
    mode: Mode,
    formatter: &OutputFormatter,
) -> Result<()> {
    let reconciler = Reconciler::new(client, mode);
    let report = reconciler.run(&resource.to_request()).await?;

    println!("{}", formatter.format_report(&report));
    Ok(())
}

/// Shows the current HA configuration of a guest.
async fn cmd_status(
    client: &PveClient,
    guest: &GuestArgs,
    formatter: &OutputFormatter,
) -> Result<()> {
    let reconciler = Reconciler::new(client, Mode::Check);
    let (vmid, current) = reconciler.current(&guest.selector()).await?;

    println!("{}", formatter.format_status(vmid, current.as_ref()));
    Ok(())
}
