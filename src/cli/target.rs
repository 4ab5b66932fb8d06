use std::error::Error;

use clap::Subcommand;
use tabled::settings::{Panel, Style};
use tabled::{Table, Tabled};

use crate::target::TargetType;

#[derive(Subcommand, Debug, Clone)]
pub enum TargetsCommand {
    /// List all supported target devices
    Supported,
}

#[derive(Tabled)]
struct SupportedTargetRow {
    #[tabled(rename = "Id")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "VID:PID")]
    hardware_id: String,
    #[tabled(rename = "Report Size")]
    report_size: usize,
    #[tabled(rename = "Init Sequence")]
    init_sequence: String,
}

pub fn handle_targets(cmd: TargetsCommand) -> Result<(), Box<dyn Error>> {
    match cmd {
        TargetsCommand::Supported => {
            let supported = TargetType::supported_types();
            let supported: Vec<SupportedTargetRow> = supported
                .into_iter()
                .map(|kind| SupportedTargetRow {
                    id: kind.to_string(),
                    name: kind.name().to_string(),
                    hardware_id: format!(
                        "{:04x}:{:04x}",
                        kind.default_vendor_id(),
                        kind.default_product_id()
                    ),
                    report_size: kind.report_size(),
                    init_sequence: if kind.requires_init_sequence() {
                        "yes".to_string()
                    } else {
                        "no".to_string()
                    },
                })
                .collect();
            let count = supported.len();

            let mut table = Table::new(supported);
            table
                .with(Style::modern_rounded())
                .with(Panel::header("Supported Target Devices"));
            println!("{table}");
            println!("Found {count} supported target devices");
        }
    }

    Ok(())
}
