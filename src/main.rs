//! etiquetar CLI
//!
//! Single-command training entry point for the etiquetar library.
//!
//! # Usage
//!
//! ```bash
//! # Train from config
//! etiquetar train config.yaml
//!
//! # Train with overrides
//! etiquetar train config.yaml --epochs 10 --lr 0.001
//!
//! # Show corpus and vocabulary statistics
//! etiquetar info config.yaml
//! ```

use clap::Parser;
use etiquetar::cli::{run_command, Cli};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
