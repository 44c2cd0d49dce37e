//! CLI command handling module
//!
//! Handles all CLI subcommands; argument parsing lives in `main.rs`.

mod config;
mod discovery;
mod logging;
mod version;

pub use config::{ConfigSubcommand, handle_config_command};
pub use discovery::*;
pub use logging::*;
pub use version::display_version;
