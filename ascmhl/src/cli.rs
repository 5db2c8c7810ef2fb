// Copyright (c) The ascmhl Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! CLI argument parsing structures (§6: the sealing command).

use ascmhl_metadata::AlgorithmId;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Seals directory trees with chained cryptographic manifests.
#[derive(Debug, Parser)]
#[command(name = "ascmhl", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Disable styled terminal output regardless of whether the output
    /// stream supports it.
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Verify a sealed root against its history and append a new generation.
    Create(CreateArgs),
}

#[derive(Debug, Parser)]
pub struct CreateArgs {
    /// Emit a progress line for every file, directory, and root processed.
    #[arg(short, long)]
    pub verbose: bool,

    /// Primary algorithm for hashes newly computed during this seal.
    #[arg(short = 'h', long = "hash", value_name = "ALGORITHM", default_value_t = AlgorithmId::Xxh64)]
    pub hash: AlgorithmId,

    /// Number of worker threads used for the hashing stage.
    ///
    /// Defaults to the number of available CPUs.
    #[arg(short = 'j', long = "jobs", value_name = "N")]
    pub jobs: Option<usize>,

    /// The directory to seal.
    pub path: Utf8PathBuf,
}
