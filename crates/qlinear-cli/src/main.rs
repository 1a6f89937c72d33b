//! Qlinear CLI - Command Line Interface for Qlinear Quantization
//!
//! The main entry point for the qlinear command-line tool.
//!
//! # Commands
//! - `qlinear params` - Compute scale, zero point and quantized values
//! - `qlinear range` - Show the representable range of a storage type
//! - `qlinear list` - List storage types and their ranges
//!
//! @version 0.1.0
//! @author Qlinear Development Team

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// CLI-specific allowances
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::format_push_string)]

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod config;
mod error;

use cli::{Cli, Commands};
use error::CliResult;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Err(e) = run(cli) {
        tracing::debug!(error = ?e, "command failed");
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default_filter = if verbose {
        "qlinear=debug,qlinear_quant=debug"
    } else if quiet {
        "qlinear=error,qlinear_quant=error"
    } else {
        "qlinear=info,qlinear_quant=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli) -> CliResult<()> {
    match cli.command {
        Commands::Params(args) => commands::params::execute(args, cli.quiet),
        Commands::Range(args) => commands::range::execute(args, cli.quiet),
        Commands::List => commands::list::execute(cli.quiet),
    }
}
