use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// macroscope - static deobfuscation of VBA macro parse trees
#[derive(Debug, Parser)]
#[command(name = "macroscope", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared across all subcommands.
#[derive(Debug, Parser)]
pub struct GlobalOptions {
    /// Emit output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose (debug-level) logging output.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Deobfuscate one or more JSON parse trees and print the resulting source.
    Deobfuscate {
        /// JSON parse tree files (one document each).
        #[arg(value_name = "FILE", required = true)]
        paths: Vec<PathBuf>,

        /// Run only the cosmetic passes (attributes, arithmetic, whitespace, identifiers).
        #[arg(long)]
        minimal: bool,

        /// Skip passes by name: attributes, arithmetic, whitespace, identifiers, dead-code,
        /// resolve, inline.
        #[arg(long, value_name = "PASS", value_delimiter = ',')]
        skip: Vec<String>,

        /// Cap on every fixed-point loop.
        #[arg(long)]
        max_iterations: Option<usize>,

        /// Evaluation step budget per call.
        #[arg(long)]
        max_steps: Option<u64>,

        /// Print the resolution outcome after the source.
        #[arg(long)]
        detailed: bool,
    },

    /// Print the unmodified text of a parse tree.
    Render {
        /// JSON parse tree file.
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },

    /// Display the procedure dependency graph.
    Deps {
        /// JSON parse tree file.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Show only names no procedure or global explains.
        #[arg(long)]
        unresolved: bool,
    },
}
