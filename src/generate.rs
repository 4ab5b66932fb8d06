use std::error::Error;
use std::fs::File;
use std::io::Write;

use padbus::config::{path::get_schema_path, BusConfig};
use schemars::schema_for;

fn main() -> Result<(), Box<dyn Error>> {
    let bus_config_schema = schema_for!(BusConfig);
    let mut file = File::create(get_schema_path().join("bus_config.json"))?;
    write!(
        file,
        "{}",
        serde_json::to_string_pretty(&bus_config_schema)?
    )?;

    Ok(())
}
