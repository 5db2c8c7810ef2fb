// Copyright (c) The ascmhl Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The concrete, styled [`ProgressSink`] that prints the stable lines
//! documented in §6. These lines are a scripted-consumption contract, not
//! `tracing` diagnostics, so they go straight to stdout via `Write` rather
//! than through the logging subscriber.

use ascmhl_core::ProgressSink;
use ascmhl_metadata::AlgorithmId;
use camino::Utf8Path;
use owo_colors::{OwoColorize, Stream};
use std::io::{self, Write};
use std::sync::Mutex;

/// Prints every event; verbose mode also prints `verified` lines for files
/// that didn't change.
pub struct CliProgressSink {
    verbose: bool,
    out: Mutex<io::Stdout>,
}

impl CliProgressSink {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            out: Mutex::new(io::stdout()),
        }
    }

    fn line(&self, text: std::fmt::Arguments<'_>) {
        let mut out = self.out.lock().unwrap();
        let _ = writeln!(out, "{text}");
    }
}

impl ProgressSink for CliProgressSink {
    fn created_original_hash(&self, path: &Utf8Path, algorithm: AlgorithmId, encoded: &str) {
        if self.verbose {
            self.line(format_args!(
                "created original hash for     {path}  {algorithm}: {encoded}"
            ));
        }
    }

    fn verified(&self, path: &Utf8Path) {
        if self.verbose {
            self.line(format_args!("verified                      {path}  OK"));
        }
    }

    fn created_new_hash(&self, path: &Utf8Path, algorithm: AlgorithmId, encoded: &str) {
        if self.verbose {
            self.line(format_args!(
                "created new hash for          {path}  {algorithm}: {encoded}"
            ));
        }
    }

    fn hash_mismatch(&self, path: &Utf8Path, algorithm: AlgorithmId, old_encoded: &str, new_encoded: &str) {
        let mut out = self.out.lock().unwrap();
        let _ = writeln!(
            out,
            "{}: hash mismatch for      {path}  {algorithm} (old): {old_encoded}, {algorithm} (new): {new_encoded}",
            "ERROR".if_supports_color(Stream::Stdout, |s| s.bold().red()),
        );
    }

    fn missing(&self, path: &Utf8Path) {
        let mut out = self.out.lock().unwrap();
        let _ = writeln!(
            out,
            "{}: missing entry          {path}",
            "ERROR".if_supports_color(Stream::Stdout, |s| s.bold().red()),
        );
    }

    fn unsupported(&self, path: &Utf8Path, reason: &str) {
        if self.verbose {
            self.line(format_args!("unsupported entry             {path}  ({reason})"));
        }
    }

    fn directory_hash(&self, path: &Utf8Path, algorithm: AlgorithmId, content_encoded: &str, structure_encoded: &str) {
        if self.verbose {
            self.line(format_args!(
                "calculated directory hash for {path}  {algorithm}: {content_encoded} (content), {structure_encoded} (structure)"
            ));
        }
    }

    fn root_hash(&self, algorithm: AlgorithmId, content_encoded: &str, structure_encoded: &str) {
        self.line(format_args!(
            "calculated root hash          {algorithm}: {content_encoded} (content), {structure_encoded} (structure)"
        ));
    }

    fn new_generation(&self, manifest_relative_path: &Utf8Path) {
        self.line(format_args!("Created new generation {manifest_relative_path}"));
    }
}
