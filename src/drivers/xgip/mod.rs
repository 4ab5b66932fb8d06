pub mod descriptor;
pub mod driver;
pub mod hid_report;
pub mod init;
