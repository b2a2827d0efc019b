//! Command-line front end for the segment store.
//!
//! Provides commands for:
//! - Running a storage node over a local directory
//! - Running a gateway that routes segments and manages membership
//! - Inspecting and changing ring membership
//! - Reading and writing individual segments through a gateway

pub mod commands;
pub mod config;

pub use commands::{Command, CommandResult};
pub use config::CliConfig;
