//! CLI module for the pveha tool.
//!
//! This module provides the command-line interface for reconciling
//! Proxmox VE HA resources.

mod commands;
mod output;

pub use commands::{
    Cli, Commands, ConnectionArgs, GuestArgs, OutputFormat, ResourceArgs, TargetStateArg,
};
pub use output::OutputFormatter;
