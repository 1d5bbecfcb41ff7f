//! # Sigflow CLI Module
//!
//! This module implements the CLI interface for Sigflow.
//!
//! ## Available Commands
//!
//! - `check` - Validate a manifest and summarize the plan
//! - `plan` - Show the layer table
//! - `emit` - Generate C sources for the plan
//! - `simulate` - Run startup and process passes for a list of events
//! - `export` - Write the compiled plan to a file
//! - `inspect` - Summarize a previously exported plan
//! - `hash` - Compute BLAKE3 cryptographic hash of the plan

mod commands;

use clap::{Parser, Subcommand};
use sigflow_core::SigflowError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Sigflow - Functor Schedule Compiler
///
/// Turns a declarative list of functors into layered, change-driven
/// evaluation schedules.
#[derive(Parser, Debug)]
#[command(name = "sigflow")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the functor manifest (TOML, or JSON by extension)
    #[arg(short, long, global = true, default_value = "sigflow.toml")]
    pub manifest: PathBuf,

    /// Accept consumed signals that no functor produces
    #[arg(long, global = true)]
    pub allow_dangling: bool,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate the manifest and summarize the compiled plan
    Check,

    /// Show the layer table of the compiled plan
    Plan,

    /// Generate C sources for the compiled plan
    Emit {
        /// Output directory
        #[arg(short, long, default_value = "generated")]
        output: PathBuf,

        /// C type used for signal storage
        #[arg(long, default_value = "uint8_t")]
        storage_type: String,
    },

    /// Run the startup pass, then one process pass per event
    Simulate {
        /// Impure functor whose event drives a pass ("none" for no event)
        #[arg(short, long = "event")]
        events: Vec<String>,
    },

    /// Export the compiled plan
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Export format (binary, json)
        #[arg(short = 't', long, default_value = "binary")]
        format: String,
    },

    /// Summarize a plan exported in binary format
    Inspect {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Compute BLAKE3 cryptographic hash of the compiled plan
    Hash,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), SigflowError> {
    let manifest = cli.manifest.as_path();
    let allow = cli.allow_dangling;
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Check) => cmd_check(manifest, allow, json_mode),
        Some(Commands::Plan) => cmd_plan(manifest, allow, json_mode),
        Some(Commands::Emit {
            output,
            storage_type,
        }) => cmd_emit(manifest, allow, &output, storage_type),
        Some(Commands::Simulate { events }) => cmd_simulate(manifest, allow, json_mode, &events),
        Some(Commands::Export { output, format }) => cmd_export(manifest, allow, &output, &format),
        Some(Commands::Inspect { input }) => cmd_inspect(&input, json_mode),
        Some(Commands::Hash) => cmd_hash(manifest, allow, json_mode),
        None => {
            // No subcommand - validate by default
            cmd_check(manifest, allow, json_mode)
        }
    }
}
