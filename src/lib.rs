pub mod aggregate;
pub mod cli;
pub mod config;
pub mod entry;
pub mod sink;
pub mod store;
