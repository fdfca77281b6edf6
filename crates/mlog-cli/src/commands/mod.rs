//! CLI subcommand implementations.

pub mod detail;
pub mod record;
pub mod report;
pub mod serve;
pub mod status;
