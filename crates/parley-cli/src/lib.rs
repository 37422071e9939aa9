//! Headless driver for the parley engine.
//!
//! Reads commands from stdin, dispatches them into a running store and writes
//! a plain-text view of the state to stdout whenever it changes. Useful for
//! exercising a backend without a UI.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod command;
pub mod config;
mod error;
pub mod render;
pub mod runtime;

pub use command::Command;
pub use config::ClientConfig;
pub use error::CliError;
pub use runtime::Runtime;
