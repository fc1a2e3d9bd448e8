//! Catalog binary library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations and logging bootstrap

pub mod cli;
pub mod commands;

pub use cli::{parse_field, Cli, Commands, OutputFormat};
pub use commands::{
    handle_complete, handle_flush, handle_lookup, handle_search, handle_stats, handle_submit,
    init_logging, load_settings, render_records, run, run_shell, ShellCommand,
};
