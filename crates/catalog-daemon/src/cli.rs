//! CLI argument parsing for the catalog binary.
//!
//! CLI flags override every other configuration source.

use clap::{Parser, Subcommand, ValueEnum};

/// Course catalog
///
/// Search, inspect and extend a tabular course catalog.
#[derive(Parser, Debug)]
#[command(name = "catalog")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/course-catalog/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Override the catalog CSV path
    #[arg(short, long, global = true)]
    pub data: Option<String>,

    /// Run without the result cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Catalog commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Find courses by name and instructor substrings
    Search {
        /// Substring of the course name
        #[arg(short, long, default_value = "")]
        name: String,

        /// Substring of the instructor
        #[arg(short, long, default_value = "")]
        instructor: String,
    },

    /// Show record counts
    Stats,

    /// Exact lookup on one column
    Lookup {
        /// Value to look up
        key: String,

        /// Column to index (default: the course name column)
        #[arg(long)]
        column: Option<String>,
    },

    /// Autocomplete: records whose column starts with a prefix
    Complete {
        /// Prefix to complete
        prefix: String,

        /// Column to index (default: the course name column)
        #[arg(long)]
        column: Option<String>,

        /// Maximum results
        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Submit a new course for review
    Submit {
        /// Course field as KEY=VALUE (repeatable)
        #[arg(short = 'F', long = "field", value_parser = parse_field, required = true)]
        fields: Vec<(String, String)>,
    },

    /// Clear the result cache
    FlushCache,

    /// Read commands from stdin against one running service
    Shell,
}

/// Parse a `KEY=VALUE` pair.
pub fn parse_field(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}
