//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{RunCommand, StagesCommand, ValidateCommand};
use std::ffi::OsString;

/// Batch orchestrator for the handwritten notes pipeline
#[derive(Debug, Parser, Clone)]
#[command(name = "notepipe")]
#[command(version)]
#[command(about = "Load a definitions file and run the notes pipeline stages in order", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Load definitions and run every stage
    Run(RunCommand),

    /// Validate a pipeline file
    Validate(ValidateCommand),

    /// List the stages in execution order
    Stages(StagesCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
