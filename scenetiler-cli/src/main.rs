//! SceneTiler CLI - Command-line interface
//!
//! This binary provides a command-line interface to the SceneTiler library.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::run::RunArgs;

#[derive(Parser)]
#[command(name = "scenetiler")]
#[command(version = scenetiler::VERSION)]
#[command(about = "Composite, mask and tile satellite scenes for regions of interest", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process every selected region: query, composite, mask and tile
    Run(RunArgs),

    /// Inspect the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Config(command) => commands::config::run(command),
    };

    if let Err(e) = result {
        e.exit();
    }
}
