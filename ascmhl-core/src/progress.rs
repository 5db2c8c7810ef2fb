// Copyright (c) The ascmhl Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The stable, scripted-consumption progress channel (§6), kept separate
//! from `tracing` diagnostics: these lines are a contract callers may parse,
//! not log output.

use ascmhl_metadata::AlgorithmId;
use camino::Utf8Path;

/// Receives progress events as a seal proceeds. The CLI implements this with
/// styled, line-buffered `Write` output; tests and library callers that
/// don't care about progress can use [`NoopProgressSink`].
pub trait ProgressSink: Send + Sync {
    fn created_original_hash(&self, _path: &Utf8Path, _algorithm: AlgorithmId, _encoded: &str) {}
    fn verified(&self, _path: &Utf8Path) {}
    fn created_new_hash(&self, _path: &Utf8Path, _algorithm: AlgorithmId, _encoded: &str) {}
    fn hash_mismatch(
        &self,
        _path: &Utf8Path,
        _algorithm: AlgorithmId,
        _old_encoded: &str,
        _new_encoded: &str,
    ) {
    }
    fn missing(&self, _path: &Utf8Path) {}
    fn unsupported(&self, _path: &Utf8Path, _reason: &str) {}
    fn directory_hash(
        &self,
        _path: &Utf8Path,
        _algorithm: AlgorithmId,
        _content_encoded: &str,
        _structure_encoded: &str,
    ) {
    }
    fn root_hash(&self, _algorithm: AlgorithmId, _content_encoded: &str, _structure_encoded: &str) {}
    fn new_generation(&self, _manifest_relative_path: &Utf8Path) {}
}

/// A [`ProgressSink`] that discards every event, for non-interactive callers.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgressSink;

impl ProgressSink for NoopProgressSink {}
