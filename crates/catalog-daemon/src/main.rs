//! Course catalog CLI
//!
//! # Usage
//!
//! ```bash
//! catalog search --name Algo --instructor Lee
//! catalog stats --format json
//! catalog lookup "Data Structures"
//! catalog complete Data --column course_name
//! catalog submit -F course_name=Compilers -F grade=Unknown ...
//! catalog flush-cache
//! catalog shell < queries.tsv
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/course-catalog/config.toml)
//! 3. `--config` file
//! 4. Environment variables (CATALOG_*)
//! 5. CLI flags

use anyhow::Result;
use clap::Parser;

use catalog_daemon::{run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    run(Cli::parse()).await
}
