use std::{error::Error, time::Duration};

use crate::{
    bus::slot::DEFAULT_MAX_TARGETS,
    config::{BusConfig, LoadError, DEFAULT_COMMAND_BUFFER_SIZE, DEFAULT_NOTIFICATION_DEPTH},
};

const BUS_CONFIG_FILE: &str = "./rootfs/usr/share/padbus/bus.yaml";

/// The shipped bus configuration must parse and match the defaults
#[tokio::test]
async fn check_shipped_config() -> Result<(), Box<dyn Error>> {
    let config = BusConfig::from_yaml_file(BUS_CONFIG_FILE)?;
    assert_eq!(config, BusConfig::default());
    Ok(())
}

#[tokio::test]
async fn check_missing_fields_use_defaults() -> Result<(), Box<dyn Error>> {
    let yaml = "version: 1\nkind: BusConfig\nname: Test Bus\n".to_string();
    let config = BusConfig::from_yaml(yaml)?;

    assert_eq!(config.name, "Test Bus");
    assert_eq!(config.max_targets, DEFAULT_MAX_TARGETS);
    assert_eq!(config.command_buffer_size, DEFAULT_COMMAND_BUFFER_SIZE);
    assert_eq!(config.notification_depth, DEFAULT_NOTIFICATION_DEPTH);
    assert_eq!(config.sys_init_period(), Duration::from_millis(50));
    Ok(())
}

#[tokio::test]
async fn check_overrides() -> Result<(), Box<dyn Error>> {
    let yaml = r#"
version: 1
kind: BusConfig
name: Small Bus
max_targets: 2
notification_depth: 1
xgip:
  sys_init_period_ms: 1
"#
    .to_string();
    let config = BusConfig::from_yaml(yaml)?;

    assert_eq!(config.max_targets, 2);
    assert_eq!(config.notification_depth, 1);
    assert_eq!(config.sys_init_period(), Duration::from_millis(1));
    Ok(())
}

#[tokio::test]
async fn check_zero_values_rejected() -> Result<(), Box<dyn Error>> {
    for field in [
        "max_targets: 0",
        "command_buffer_size: 0",
        "notification_depth: 0",
        "xgip:\n  sys_init_period_ms: 0",
    ] {
        let yaml = format!("version: 1\nkind: BusConfig\nname: Bad Bus\n{field}\n");
        let result = BusConfig::from_yaml(yaml);
        assert!(
            matches!(result, Err(LoadError::InvalidConfig(_))),
            "expected '{field}' to be rejected, got {result:?}"
        );
    }
    Ok(())
}

#[tokio::test]
async fn check_malformed_yaml() -> Result<(), Box<dyn Error>> {
    let result = BusConfig::from_yaml("version: [1".to_string());
    assert!(matches!(result, Err(LoadError::DeserializeError(_))));
    Ok(())
}

#[tokio::test]
async fn check_yaml_round_trip() -> Result<(), Box<dyn Error>> {
    let mut config = BusConfig::default();
    config.max_targets = 4;
    let yaml = config.to_yaml()?;
    assert_eq!(BusConfig::from_yaml(yaml)?, config);
    Ok(())
}
