//! CLI command handlers. Each command is in its own file.

mod completions;
mod config;
mod download;

pub use completions::run_completions;
pub use config::{run_config_set, run_config_show};
pub use download::run_download;
