//! CLI argument definitions using clap
//!
//! Commands:
//! - folio init --config <path>
//! - folio run --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Folio - chapter and version consistency engine
#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a default configuration file
    Init {
        /// Path to configuration file
        #[arg(long, default_value = "./folio.json")]
        config: PathBuf,
    },

    /// Read JSON requests from stdin, one per line
    Run {
        /// Path to configuration file
        #[arg(long, default_value = "./folio.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_with_config() {
        let cli = Cli::try_parse_from(["folio", "run", "--config", "/tmp/f.json"]).unwrap();
        match cli.command {
            Command::Run { config } => assert_eq!(config, PathBuf::from("/tmp/f.json")),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_init_default_path() {
        let cli = Cli::try_parse_from(["folio", "init"]).unwrap();
        assert!(matches!(cli.command, Command::Init { config } if config == PathBuf::from("./folio.json")));
    }
}
