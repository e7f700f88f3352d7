//! Subcommand implementations.

pub mod list;
pub mod load;
pub mod platform;
pub mod sweep;
