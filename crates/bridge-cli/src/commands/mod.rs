//! CLI subcommand implementations.

pub mod sessions;
