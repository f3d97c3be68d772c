//! Subcommand implementations.

pub mod e2e;
pub mod generate;
