//! CLI module for Folio
//!
//! Provides command-line interface for:
//! - init: Write a default configuration file
//! - run: Execute JSON requests from stdin against an in-memory store

mod args;
mod commands;
mod errors;
mod io;
mod request;

pub use args::{Cli, Command};
pub use commands::{init, run, run_command, run_session, Session};
pub use errors::{CliError, CliResult};
pub use io::{read_requests, write_error, write_response};
pub use request::Request;
