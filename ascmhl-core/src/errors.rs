// Copyright (c) The ascmhl Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by the sealing engine.

use ascmhl_metadata::AlgorithmError;
use camino::Utf8PathBuf;
use thiserror::Error;

/// An error that occurred while computing a hash or directory digest.
#[derive(Debug, Error)]
pub enum HashError {
    /// Reading the byte source failed partway through.
    #[error("failed to read `{path}` while hashing")]
    Io {
        /// The file being hashed when the read failed.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// An error that occurred while reading or writing a sealed root's manifest store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Creating the `ascmhl/` directory failed.
    #[error("failed to create manifest store at `{path}`")]
    DirCreate {
        /// The `ascmhl/` directory that could not be created.
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A generation file could not be read.
    #[error("failed to read generation file `{path}`")]
    GenerationRead {
        /// The generation file that could not be read.
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A generation file's JSON could not be parsed.
    #[error("failed to parse generation file `{path}`")]
    GenerationParse {
        /// The generation file that could not be parsed.
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// A new generation could not be written atomically.
    #[error("failed to write generation file `{path}`")]
    GenerationWrite {
        /// The generation file that could not be written.
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The lock file used to serialize concurrent seals could not be acquired.
    #[error("failed to acquire lock on manifest store at `{path}`")]
    Lock {
        /// The `ascmhl/` directory whose lock could not be acquired.
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Acquiring the lock timed out.
    #[error("timed out waiting {timeout_secs}s for the lock on `{path}`")]
    LockTimeout {
        /// The `ascmhl/` directory whose lock timed out.
        path: Utf8PathBuf,
        /// How long the engine waited before giving up.
        timeout_secs: u64,
    },
    /// The manifest store violates one of the invariants in the data model:
    /// generation numbers aren't contiguous, a generation's previous-reference
    /// doesn't match its predecessor, or a generation file's name can't be
    /// parsed.
    #[error("corrupt history at `{path}`: {reason}")]
    CorruptHistory {
        /// The `ascmhl/` directory whose history is corrupt.
        path: Utf8PathBuf,
        /// A human-readable description of the violated invariant.
        reason: String,
    },
}

/// An error that occurred while walking a directory tree.
#[derive(Debug, Error)]
pub enum WalkError {
    /// Reading a directory entry failed.
    #[error("failed to read directory entry under `{path}`")]
    Io {
        /// The directory being walked when the read failed.
        path: Utf8PathBuf,
        #[source]
        source: walkdir::Error,
    },
    /// A root's `.mhlignore` file exists but could not be read.
    #[error("failed to read ignore file `{path}`")]
    IgnoreFile {
        /// The `.mhlignore` file that could not be read.
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// An error that aborts the current sealed root's seal outright.
///
/// Per the propagation policy, `Io` and `CorruptHistory` are the only
/// structural failures; verification failures (`HashMismatch`, `Missing`) are
/// recorded in the new generation instead of raised here.
#[derive(Debug, Error)]
pub enum SealError {
    /// A filesystem read or write failed.
    #[error(transparent)]
    Io(#[from] HashError),
    /// The manifest store could not be read or written.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The directory tree could not be walked.
    #[error(transparent)]
    Walk(#[from] WalkError),
    /// The requested algorithm or path was invalid before any filesystem work
    /// was attempted.
    #[error("configuration error: {reason}")]
    Config {
        /// A human-readable description of the problem.
        reason: String,
    },
    /// The seal was cancelled before it could complete; no generation was written.
    #[error("seal of `{path}` was cancelled")]
    Cancelled {
        /// The sealed root whose seal was cancelled.
        path: Utf8PathBuf,
    },
    /// The root directory's digest composition did not produce a value in
    /// the seal's primary algorithm; this indicates a bug in digest
    /// composition, not a filesystem or configuration problem.
    #[error("root digest for `{root}` was not composed in the requested algorithm")]
    MissingRootDigest {
        /// The sealed root whose digest composition came up short.
        root: Utf8PathBuf,
    },
}

impl From<AlgorithmError> for SealError {
    fn from(err: AlgorithmError) -> Self {
        SealError::Config {
            reason: err.to_string(),
        }
    }
}
