//! mlog CLI library.
//!
//! This crate provides the command-line interface and the shell-command
//! focus sensor used by `mlog record`.

mod cli;
pub mod commands;
mod config;
pub mod sensor;

pub use cli::{Cli, Commands, RangeArgs};
pub use config::Config;
