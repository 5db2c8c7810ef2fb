// Copyright (c) The ascmhl Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Top-level CLI error wrapper and exit-code mapping (§7, §6).

use ascmhl_core::{HashError, SealError, StoreError, WalkError};
use ascmhl_metadata::SealExitCode;
use owo_colors::OwoColorize;
use thiserror::Error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

/// An error expected to reach the CLI boundary: the kind of failure that
/// should print a clean message and a specific exit code rather than a
/// backtrace.
#[derive(Debug, Error)]
pub enum ExpectedError {
    /// A filesystem read or write failed.
    #[error(transparent)]
    Io(#[from] HashError),
    /// The manifest store could not be read or written, or violated an
    /// invariant.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The directory tree could not be walked.
    #[error(transparent)]
    Walk(#[from] WalkError),
    /// The requested algorithm or path was invalid.
    #[error("{reason}")]
    Config { reason: String },
    /// The seal was cancelled.
    #[error("seal of `{path}` was cancelled")]
    Cancelled { path: camino::Utf8PathBuf },
}

impl From<SealError> for ExpectedError {
    fn from(err: SealError) -> Self {
        match err {
            SealError::Io(err) => ExpectedError::Io(err),
            SealError::Store(err) => ExpectedError::Store(err),
            SealError::Walk(err) => ExpectedError::Walk(err),
            SealError::Config { reason } => ExpectedError::Config { reason },
            SealError::Cancelled { path } => ExpectedError::Cancelled { path },
            SealError::MissingRootDigest { root } => ExpectedError::Config {
                reason: format!("internal error: no root digest composed for `{root}`"),
            },
        }
    }
}

impl ExpectedError {
    /// Maps this error to the process exit code documented in §6.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            ExpectedError::Io(_) => SealExitCode::IO_ERROR,
            ExpectedError::Store(StoreError::CorruptHistory { .. }) => SealExitCode::CORRUPT_HISTORY,
            ExpectedError::Store(_) => SealExitCode::IO_ERROR,
            ExpectedError::Walk(_) => SealExitCode::IO_ERROR,
            ExpectedError::Config { .. } => SealExitCode::CONFIG_ERROR,
            ExpectedError::Cancelled { .. } => SealExitCode::IO_ERROR,
        }
    }

    /// Prints a colorized one-line message to stderr, matching the
    /// teacher's `display_to_stderr` convention.
    pub fn display_to_stderr(&self) {
        eprintln!("{}: {}", "error".if_supports_color(owo_colors::Stream::Stderr, |s| s.bold().red()), self);
    }
}
