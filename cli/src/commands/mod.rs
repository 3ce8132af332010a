pub mod compile;
pub mod config;
pub mod init;
pub mod list;
