//! Driver errors.

use std::io;

use parley_core::StoreError;
use thiserror::Error;

/// Errors surfaced by the command-line driver.
#[derive(Debug, Error)]
pub enum CliError {
    /// Reading stdin or writing stdout failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The store stopped while commands were still arriving.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Input did not name a known command.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// A command argument was missing or malformed.
    #[error("{command}: expected {expected}")]
    InvalidArgument {
        /// Command being parsed.
        command: &'static str,
        /// Description of the expected argument.
        expected: &'static str,
    },
}
