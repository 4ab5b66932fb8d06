pub mod bus;
pub mod cli;
pub mod client;
pub mod config;
pub mod constants;
pub mod drivers;
pub mod error;
pub mod sync;
pub mod target;
