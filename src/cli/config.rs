use std::{error::Error, path::PathBuf};

use clap::Subcommand;

use super::load_config;

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Print the effective bus configuration as YAML
    Dump {
        /// Path to a bus configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

pub fn handle_config(cmd: ConfigCommand) -> Result<(), Box<dyn Error>> {
    match cmd {
        ConfigCommand::Dump { config } => {
            let config = load_config(config)?;
            print!("{}", config.to_yaml()?);
        }
    }

    Ok(())
}
