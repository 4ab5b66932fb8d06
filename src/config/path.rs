//! Module for searching for bus config files

use std::path::PathBuf;

/// Base system fallback path to use if one cannot be found with XDG
const FALLBACK_BASE_PATH: &str = "/usr/share/padbus";

/// Repository relative path used when running from a source checkout
const RELATIVE_BASE_PATH: &str = "./rootfs/usr/share/padbus";

/// Returns the base path for configuration data
pub fn get_base_path() -> PathBuf {
    let Ok(base_dirs) = xdg::BaseDirectories::with_prefix("padbus") else {
        log::warn!("Unable to determine config base path. Using fallback path.");
        return PathBuf::from(FALLBACK_BASE_PATH);
    };

    // Get the data directories in preference order
    let data_dirs = base_dirs.get_data_dirs();
    for dir in data_dirs {
        if dir.exists() {
            return dir;
        }
    }

    log::warn!("Config base path not found. Using fallback path.");
    PathBuf::from(FALLBACK_BASE_PATH)
}

/// Returns a list of directories in load order to find the bus configuration.
/// E.g. ["./rootfs/usr/share/padbus", "/etc/padbus", "/usr/share/padbus"]
pub fn get_config_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from(RELATIVE_BASE_PATH),
        PathBuf::from("/etc/padbus"),
        get_base_path(),
    ]
}

/// Returns the directory for generated schemas
pub fn get_schema_path() -> PathBuf {
    let rel_path = PathBuf::from(RELATIVE_BASE_PATH);
    if rel_path.exists() && rel_path.is_dir() {
        return rel_path.join("schema");
    }
    get_base_path().join("schema")
}
