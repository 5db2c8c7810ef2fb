// Copyright (c) The ascmhl Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `ascmhl create` failures.
///
/// Unknown/unexpected failures (panics, I/O errors the CLI didn't anticipate)
/// always fall back to exit code 1.
pub enum SealExitCode {}

impl SealExitCode {
    /// The seal completed with every file `NewFile`, `Verified`, or
    /// `VerifiedAndExtended`.
    pub const OK: i32 = 0;

    /// At least one file recorded a `HashMismatch` or `Missing` outcome.
    ///
    /// The generation was still written; this code only reflects the
    /// verification result.
    pub const VERIFICATION_FAILED: i32 = 1;

    /// The manifest store violated one of the generation invariants
    /// (non-contiguous generations, a mismatched previous-reference, or an
    /// unparseable generation document).
    pub const CORRUPT_HISTORY: i32 = 2;

    /// A filesystem read or write failed.
    pub const IO_ERROR: i32 = 3;

    /// The requested algorithm or path was invalid before any filesystem work
    /// was attempted.
    pub const CONFIG_ERROR: i32 = 4;
}
