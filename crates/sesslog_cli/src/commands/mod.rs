//! CLI commands.

pub mod hook;
pub mod rename;
