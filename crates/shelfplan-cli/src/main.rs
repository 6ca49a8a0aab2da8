use std::error::Error;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{advance, init, status};

#[derive(Parser, Debug)]
#[command(name = "shelfplan", about = "Weekly condition scheduling for incubator screens")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start an experiment and place its first cycle.
    Init(init::Args),
    /// Reconcile recorded outcomes and place the next cycle.
    Advance(advance::Args),
    /// Report ledger and completion for a cycle without writing.
    Status(status::Args),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Init(args) => init::run(&args),
        Command::Advance(args) => advance::run(&args),
        Command::Status(args) => status::run(&args),
    }
}
