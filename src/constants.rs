/// Version reported by the bus service
pub const BUS_VERSION: &str = env!("CARGO_PKG_VERSION");
/// Oldest bus version a client accepts
pub const MIN_SUPPORTED_BUS_VERSION: &str = "0.4.0";
/// Name of the bus
pub const BUS_NAME: &str = "padbus";
