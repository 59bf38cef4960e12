//! Command-line arguments

use clap::Parser;
use std::path::PathBuf;

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "WB_RULES_CONFIG";

/// Configuration file used when none is given
pub const DEFAULT_CONFIG_PATH: &str = "wb-rules.yaml";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the YAML configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = CONFIG_ENV,
        default_value = DEFAULT_CONFIG_PATH
    )]
    pub config: PathBuf,
}
