#[cfg(test)]
pub mod config_test;
pub mod path;

use std::{io, path::Path, time::Duration};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{bus::slot::DEFAULT_MAX_TARGETS, drivers::xgip::driver::XGIP_SYS_INIT_PERIOD};

/// File name of the bus configuration
pub const BUS_CONFIG_FILE: &str = "bus.yaml";

/// Default capacity of the bus command channel
pub const DEFAULT_COMMAND_BUFFER_SIZE: usize = 64;
/// Default number of notification requests a client keeps outstanding
pub const DEFAULT_NOTIFICATION_DEPTH: usize = 4;

/// Represents all possible errors loading a [BusConfig]
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Could not read: {0}")]
    IoError(#[from] io::Error),
    #[error("Unable to deserialize: {0}")]
    DeserializeError(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Configuration of a virtual gamepad bus
#[derive(Debug, Deserialize, Serialize, Clone, JsonSchema, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct BusConfig {
    pub version: u32,
    pub kind: String,
    pub name: String,
    /// Number of slots available for targets
    #[serde(default = "default_max_targets")]
    pub max_targets: usize,
    /// Capacity of the bus command channel
    #[serde(default = "default_command_buffer_size")]
    pub command_buffer_size: usize,
    /// Number of notification requests a client keeps outstanding per target
    #[serde(default = "default_notification_depth")]
    pub notification_depth: usize,
    #[serde(default)]
    pub xgip: XgipConfig,
}

/// Options for Xbox One (XGIP) targets
#[derive(Debug, Deserialize, Serialize, Clone, JsonSchema, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct XgipConfig {
    /// Interval in milliseconds between two init packets
    #[serde(default = "default_sys_init_period_ms")]
    pub sys_init_period_ms: u64,
}

impl Default for XgipConfig {
    fn default() -> Self {
        Self {
            sys_init_period_ms: default_sys_init_period_ms(),
        }
    }
}

fn default_max_targets() -> usize {
    DEFAULT_MAX_TARGETS
}

fn default_command_buffer_size() -> usize {
    DEFAULT_COMMAND_BUFFER_SIZE
}

fn default_notification_depth() -> usize {
    DEFAULT_NOTIFICATION_DEPTH
}

fn default_sys_init_period_ms() -> u64 {
    XGIP_SYS_INIT_PERIOD
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            version: 1,
            kind: "BusConfig".to_string(),
            name: "Virtual Gamepad Bus".to_string(),
            max_targets: default_max_targets(),
            command_buffer_size: default_command_buffer_size(),
            notification_depth: default_notification_depth(),
            xgip: XgipConfig::default(),
        }
    }
}

impl BusConfig {
    /// Load a [BusConfig] from the given YAML string
    pub fn from_yaml(content: String) -> Result<BusConfig, LoadError> {
        let config: BusConfig = serde_yaml::from_str(content.as_str())?;
        config.validate()?;
        Ok(config)
    }

    /// Load a [BusConfig] from the given YAML file
    pub fn from_yaml_file<P>(path: P) -> Result<BusConfig, LoadError>
    where
        P: AsRef<Path>,
    {
        let file = std::fs::File::open(path)?;
        let config: BusConfig = serde_yaml::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the bus configuration from the first config path that contains
    /// one. Falls back to the default configuration.
    pub fn load() -> BusConfig {
        for path in path::get_config_paths() {
            let file = path.join(BUS_CONFIG_FILE);
            if !file.exists() {
                continue;
            }
            match BusConfig::from_yaml_file(&file) {
                Ok(config) => {
                    log::debug!("Loaded bus config from {file:?}");
                    return config;
                }
                Err(e) => {
                    log::warn!("Failed to load bus config {file:?}: {e}");
                }
            }
        }
        log::debug!("No bus config found, using defaults");
        BusConfig::default()
    }

    /// Serialize the configuration as YAML
    pub fn to_yaml(&self) -> Result<String, LoadError> {
        Ok(serde_yaml::to_string(self)?)
    }

    fn validate(&self) -> Result<(), LoadError> {
        if self.max_targets == 0 {
            return Err(LoadError::InvalidConfig(
                "max_targets must be greater than zero".to_string(),
            ));
        }
        if self.command_buffer_size == 0 {
            return Err(LoadError::InvalidConfig(
                "command_buffer_size must be greater than zero".to_string(),
            ));
        }
        if self.notification_depth == 0 {
            return Err(LoadError::InvalidConfig(
                "notification_depth must be greater than zero".to_string(),
            ));
        }
        if self.xgip.sys_init_period_ms == 0 {
            return Err(LoadError::InvalidConfig(
                "xgip.sys_init_period_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Interval between two init packets of XGIP targets
    pub fn sys_init_period(&self) -> Duration {
        Duration::from_millis(self.xgip.sys_init_period_ms)
    }
}
