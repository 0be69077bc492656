//! CLI module
//!
//! Command-line surface of the daemon client.

pub mod args;
pub mod config;
pub mod progress;
pub mod report;

pub use args::{Action, CliArgs};
pub use config::Config;
pub use report::Report;
