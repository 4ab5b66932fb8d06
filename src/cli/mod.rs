pub mod config;
pub mod run;
pub mod target;

use std::{error::Error, io, path::PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};

use self::{
    config::{handle_config, ConfigCommand},
    run::{handle_run, RunOptions},
    target::{handle_targets, TargetsCommand},
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start a bus with a demonstration session (default)
    Run(RunOptions),
    /// Inspect supported targets
    Targets {
        #[command(subcommand)]
        cmd: TargetsCommand,
    },
    /// Inspect the bus configuration
    Config {
        #[command(subcommand)]
        cmd: ConfigCommand,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

pub async fn main_cli(args: Args) -> Result<(), Box<dyn Error>> {
    let cmd = args.cmd.unwrap_or(Commands::Run(RunOptions::default()));

    match cmd {
        Commands::Run(options) => handle_run(options).await?,
        Commands::Targets { cmd } => handle_targets(cmd)?,
        Commands::Config { cmd } => handle_config(cmd)?,
        Commands::Completions { shell } => {
            let mut command = Args::command();
            let name = command.get_name().to_string();
            generate(shell, &mut command, name, &mut io::stdout());
        }
    }

    Ok(())
}

/// Load the bus configuration from the given path, or discover it
pub fn load_config(path: Option<PathBuf>) -> Result<crate::config::BusConfig, Box<dyn Error>> {
    let config = match path {
        Some(path) => crate::config::BusConfig::from_yaml_file(path)?,
        None => crate::config::BusConfig::load(),
    };
    Ok(config)
}
