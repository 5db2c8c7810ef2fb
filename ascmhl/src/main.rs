// Copyright (c) The ascmhl Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

mod cli;
mod errors;
mod progress;

use ascmhl_core::{ProgressSink, SealOptions};
use ascmhl_metadata::SealExitCode;
use clap::Parser;
use cli::{Cli, Command, CreateArgs};
use errors::{ExpectedError, Result};
use progress::CliProgressSink;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    if cli.no_color {
        owo_colors::set_override(false);
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("ASCMHL_LOG"))
        .with_writer(std::io::stderr)
        .init();

    let exit_code = match cli.command {
        Command::Create(args) => match run_create(args) {
            Ok(code) => code,
            Err(error) => {
                error.display_to_stderr();
                error.process_exit_code()
            }
        },
    };

    std::process::exit(exit_code);
}

fn run_create(args: CreateArgs) -> Result<i32> {
    if !args.path.is_dir() {
        return Err(ExpectedError::Config {
            reason: format!("`{}` is not a directory", args.path),
        });
    }

    let mut options = SealOptions::new(args.hash);
    if let Some(jobs) = args.jobs {
        options.worker_count = jobs.max(1);
    }

    let progress: Box<dyn ProgressSink> = Box::new(CliProgressSink::new(args.verbose));
    let report = ascmhl_core::seal(&args.path, &options, progress.as_ref())?;

    Ok(if report_is_clean(&report) {
        SealExitCode::OK
    } else {
        SealExitCode::VERIFICATION_FAILED
    })
}

fn report_is_clean(report: &ascmhl_core::SealReport) -> bool {
    report.success && report.nested.iter().all(report_is_clean)
}
