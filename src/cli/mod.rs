//! CLI module
//!
//! Command-line host for the sync engine.
//!
//! # Commands
//!
//! - `check` - Test connection to the store
//! - `resources` - List syncable resources
//! - `columns` - Show standard and custom-field columns
//! - `sync` - Run one slice (or all) and persist the continuation
//! - `update` - Apply row edits
//! - `delete` - Delete one record

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
