use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use linkasm::runtime::{self, Commands, LogLevel, LogMode};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[arg(long = "log-level", global = true, default_value = "info")]
    log_level: LogLevel,

    #[arg(long = "log-mode", global = true, default_value = "terminal")]
    /// terminal, path or discard
    log_mode: LogMode,

    #[arg(long = "log-path", global = true)]
    log_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> ExitCode {
    let mut cli = Cli::parse();

    if let Err(e) = runtime::setup_global_logger(cli.log_level, cli.log_mode, cli.log_path.clone()) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }
    log::debug!("Running {:?}", cli.command);

    if let Err(e) = cli.command.try_execute() {
        eprintln!("Error: {:#}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
