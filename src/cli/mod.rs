//! CLI module for projclose - command-line interface and subcommands.

pub mod commands;

pub use commands::Cli;
