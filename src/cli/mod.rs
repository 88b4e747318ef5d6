//! CLI surface for etiquetar.
//!
//! This module contains the argument definitions and command handlers.

mod commands;
mod logging;

pub use commands::run_command;
pub use logging::{log, LogLevel};

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// BiLSTM sequence-labeling trainer for social-media NER
#[derive(Parser)]
#[command(name = "etiquetar", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Suppress all output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Verbose output with additional details
    #[arg(long, global = true)]
    pub verbose: bool,
}

/// Subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Train a tagger from a YAML pipeline config
    Train {
        /// Pipeline config file
        config: PathBuf,

        /// Override the number of training epochs
        #[arg(long)]
        epochs: Option<usize>,

        /// Override the initial learning rate
        #[arg(long)]
        lr: Option<f32>,

        /// Override the batch size
        #[arg(long)]
        batch_size: Option<usize>,
    },
    /// Print corpus and vocabulary statistics without training
    Info {
        /// Pipeline config file
        config: PathBuf,
    },
}
