//! Command-line interface for docname.
//!
//! Provides argument parsing and command dispatch.

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, EditArgs, ListArgs, VocabAction};
